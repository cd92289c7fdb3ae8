//! Settlement message wire format.
//!
//! ```text
//!  0               32            40            44            48
//!  | transactionId | sourceChain | batchIndex  | batchCount  | reclaim entries (ABI array) ...
//!      32 B           u64 BE        u32 BE        u32 BE
//! ```
//!
//! The body reuses the reclaim-plan codec, so a batch decodes under the
//! same rules (canonical padding, exact stride, non-empty) as a full plan.

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use xliquid_types::constants::SETTLEMENT_HEADER_SIZE;
use xliquid_types::{ChainId, ReclaimEntry, ReclaimPlan, Result, TransactionId, XliquidError, reclaim_plan};

/// One batch of a reclaim plan, addressed to a single remote chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementMessage {
    pub transaction_id: TransactionId,
    /// Chain the claim was executed on.
    pub source_chain: ChainId,
    /// Position of this batch among the batches sent to the same chain.
    pub batch_index: u32,
    pub batch_count: u32,
    pub entries: ReclaimPlan,
}

impl SettlementMessage {
    /// Build a batch message.
    ///
    /// # Errors
    /// `EmptyPlan` if `entries` is empty, `MalformedMessage` if
    /// `batch_index >= batch_count`.
    pub fn new(
        transaction_id: TransactionId,
        source_chain: ChainId,
        batch_index: u32,
        batch_count: u32,
        entries: Vec<ReclaimEntry>,
    ) -> Result<Self> {
        if batch_index >= batch_count {
            return Err(XliquidError::malformed_message(format!(
                "batch index {batch_index} out of range for {batch_count} batches"
            )));
        }
        Ok(Self {
            transaction_id,
            source_chain,
            batch_index,
            batch_count,
            entries: ReclaimPlan::new(entries)?,
        })
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let body = self.entries.to_bytes();
        let mut out = Vec::with_capacity(SETTLEMENT_HEADER_SIZE + body.len());
        out.extend_from_slice(self.transaction_id.as_bytes());
        out.extend_from_slice(&self.source_chain.0.to_be_bytes());
        out.extend_from_slice(&self.batch_index.to_be_bytes());
        out.extend_from_slice(&self.batch_count.to_be_bytes());
        out.extend_from_slice(&body);
        out
    }

    /// Parse a payload received from the bridge.
    ///
    /// # Errors
    /// `MalformedMessage` on a short or inconsistent header; reclaim-plan
    /// errors for a bad body.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.len() < SETTLEMENT_HEADER_SIZE {
            return Err(XliquidError::malformed_message(format!(
                "{} bytes is shorter than the {SETTLEMENT_HEADER_SIZE}-byte header",
                payload.len()
            )));
        }
        let (head, body) = payload.split_at(SETTLEMENT_HEADER_SIZE);

        let mut chain = [0u8; 8];
        chain.copy_from_slice(&head[32..40]);
        let mut index = [0u8; 4];
        index.copy_from_slice(&head[40..44]);
        let mut count = [0u8; 4];
        count.copy_from_slice(&head[44..48]);

        let batch_index = u32::from_be_bytes(index);
        let batch_count = u32::from_be_bytes(count);
        if batch_index >= batch_count {
            return Err(XliquidError::malformed_message(format!(
                "batch index {batch_index} out of range for {batch_count} batches"
            )));
        }

        Ok(Self {
            transaction_id: TransactionId(B256::from_slice(&head[..32])),
            source_chain: ChainId(u64::from_be_bytes(chain)),
            batch_index,
            batch_count,
            entries: reclaim_plan::decode(body)?,
        })
    }
}
