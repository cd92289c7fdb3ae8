//! Seams between the vault and the settlement layer.
//!
//! The vault calls [`Settlement::dispatch`] as the last step of a claim and
//! routes inbound bridge callbacks through [`Settlement::on_message_received`],
//! lending its ledger as a [`CreditSink`]. Neither crate depends on the other.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::{ChainId, MessageId, ReclaimPlan, Result, TransactionId};

/// A credit produced by an inbound settlement message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCredit {
    pub token: Address,
    pub recipient: Address,
    pub amount: U256,
}

/// Ledger side of inbound settlement.
pub trait CreditSink {
    /// Apply every credit or none of them.
    fn apply_remote_credits(&mut self, transaction_id: TransactionId, credits: &[RemoteCredit]) -> Result<()>;
}

/// What happened to an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InboundOutcome {
    /// Credits were applied to the ledger.
    Applied {
        transaction_id: TransactionId,
        credits: usize,
    },
    /// This batch was applied before; nothing changed.
    AlreadyApplied { transaction_id: TransactionId },
}

/// Cross-chain settlement as seen by the vault.
pub trait Settlement {
    /// Hand the plan to the bridge. Either every batch is accepted or the
    /// call fails without side effects.
    fn dispatch(&mut self, plan: &ReclaimPlan, transaction_id: TransactionId) -> Result<Vec<MessageId>>;

    /// Bridge callback. `caller` is the account invoking the callback and
    /// `origin` the remote module the bridge attests as sender.
    fn on_message_received(
        &mut self,
        caller: Address,
        source_chain: ChainId,
        origin: Address,
        payload: &[u8],
        sink: &mut dyn CreditSink,
    ) -> Result<InboundOutcome>;
}
