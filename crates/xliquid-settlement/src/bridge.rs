//! Cross-chain message bus seam and an in-process outbound queue.
//!
//! Sending is fire-and-forget: a [`MessageId`] only means the bridge accepted
//! the message into its outbound queue. Delivery happens later, when a
//! relayer drains the queue and invokes the remote module's inbound callback.
//! Until then a message can be retracted.

use std::sync::Arc;

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use xliquid_types::{ChainId, Clock, MessageId, Result, XliquidError};

/// The transport the settlement module sends through.
pub trait Bridge {
    /// Fee the bridge charges to carry one message.
    fn quote_fee(&self, remote_chain: ChainId, gas_limit: u64) -> U256;

    /// Fail unless `messages` more sends would be accepted.
    fn ensure_capacity(&self, messages: usize) -> Result<()>;

    /// Accept a message for delivery.
    fn send(&mut self, remote_chain: ChainId, payload: Vec<u8>, gas_limit: u64) -> Result<MessageId>;

    /// Take back a message accepted by `send` that no relayer has picked up.
    fn retract(&mut self, id: MessageId) -> Result<()>;
}

/// A message accepted by the bridge and awaiting delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub id: MessageId,
    pub remote_chain: ChainId,
    pub payload: Vec<u8>,
    pub gas_limit: u64,
    pub fee: U256,
    /// Unix seconds at acceptance.
    pub queued_at: u64,
}

/// Append-only outbound queue with monotonic message ids.
///
/// Fees are `base_fee + fee_per_gas * gas_limit`, identical for every chain.
pub struct OutboundQueue {
    next_id: MessageId,
    pending: Vec<OutboundMessage>,
    base_fee: U256,
    fee_per_gas: U256,
    capacity: Option<usize>,
    clock: Arc<dyn Clock>,
}

impl OutboundQueue {
    /// Free, unbounded queue.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            next_id: MessageId(0),
            pending: Vec::new(),
            base_fee: U256::ZERO,
            fee_per_gas: U256::ZERO,
            capacity: None,
            clock,
        }
    }

    #[must_use]
    pub fn with_fees(mut self, base_fee: U256, fee_per_gas: U256) -> Self {
        self.base_fee = base_fee;
        self.fee_per_gas = fee_per_gas;
        self
    }

    /// Limit the number of undelivered messages.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Messages accepted and not yet drained, oldest first.
    #[must_use]
    pub fn pending(&self) -> &[OutboundMessage] {
        &self.pending
    }

    /// Hand every pending message to the caller, oldest first.
    pub fn drain(&mut self) -> Vec<OutboundMessage> {
        std::mem::take(&mut self.pending)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Bridge for OutboundQueue {
    fn quote_fee(&self, _remote_chain: ChainId, gas_limit: u64) -> U256 {
        self.base_fee
            .saturating_add(self.fee_per_gas.saturating_mul(U256::from(gas_limit)))
    }

    fn ensure_capacity(&self, messages: usize) -> Result<()> {
        match self.capacity {
            Some(cap) if self.pending.len() + messages > cap => Err(XliquidError::BridgeRejected {
                reason: format!(
                    "queue holds {} of {cap} messages, cannot accept {messages} more",
                    self.pending.len()
                ),
            }),
            _ => Ok(()),
        }
    }

    fn send(&mut self, remote_chain: ChainId, payload: Vec<u8>, gas_limit: u64) -> Result<MessageId> {
        self.ensure_capacity(1)?;
        let id = self.next_id;
        self.next_id = id.next();
        let fee = self.quote_fee(remote_chain, gas_limit);
        self.pending.push(OutboundMessage {
            id,
            remote_chain,
            payload,
            gas_limit,
            fee,
            queued_at: self.clock.now(),
        });
        Ok(id)
    }

    fn retract(&mut self, id: MessageId) -> Result<()> {
        let position = self
            .pending
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| XliquidError::Internal(format!("message {id} is not pending")))?;
        self.pending.remove(position);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xliquid_types::ManualClock;

    fn queue() -> OutboundQueue {
        OutboundQueue::new(Arc::new(ManualClock::new(500)))
    }

    #[test]
    fn ids_are_monotonic() {
        let mut q = queue();
        let a = q.send(ChainId(10), vec![1], 100).unwrap();
        let b = q.send(ChainId(10), vec![2], 100).unwrap();
        assert_eq!(b, a.next());
        assert_eq!(q.len(), 2);
        assert_eq!(q.pending()[0].queued_at, 500);
    }

    #[test]
    fn drain_empties_but_ids_keep_counting() {
        let mut q = queue();
        q.send(ChainId(10), vec![1], 100).unwrap();
        let drained = q.drain();
        assert_eq!(drained.len(), 1);
        assert!(q.is_empty());
        let next = q.send(ChainId(10), vec![2], 100).unwrap();
        assert_eq!(next, MessageId(1));
    }

    #[test]
    fn fee_quote() {
        let q = queue().with_fees(U256::from(10u64), U256::from(2u64));
        assert_eq!(q.quote_fee(ChainId(1), 100), U256::from(210u64));
    }

    #[test]
    fn retract_removes_only_that_message() {
        let mut q = queue();
        let a = q.send(ChainId(10), vec![1], 100).unwrap();
        let b = q.send(ChainId(56), vec![2], 100).unwrap();
        q.retract(b).unwrap();
        assert_eq!(q.len(), 1);
        assert_eq!(q.pending()[0].id, a);
        assert!(q.retract(b).is_err());

        q.drain();
        assert!(matches!(q.retract(a), Err(XliquidError::Internal(_))));
    }

    #[test]
    fn capacity_enforced() {
        let mut q = queue().with_capacity(1);
        assert!(q.ensure_capacity(2).is_err());
        q.send(ChainId(10), vec![1], 100).unwrap();
        let err = q.send(ChainId(10), vec![2], 100).unwrap_err();
        assert!(matches!(err, XliquidError::BridgeRejected { .. }));
        q.drain();
        assert!(q.ensure_capacity(1).is_ok());
    }
}
