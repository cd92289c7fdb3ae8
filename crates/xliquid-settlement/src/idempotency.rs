//! Inbound idempotency guard: prevents applying the same batch twice.
//!
//! Bridges deliver at least once. Each batch is identified by
//! `(source chain, transaction id, batch index)`; a second delivery of the
//! same key is reported as already applied and changes nothing.
//!
//! Keys are kept permanently. Evicting them would let a late redelivery
//! credit twice.

use std::collections::HashSet;

use xliquid_types::{ChainId, TransactionId};

/// Identity of one inbound settlement batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InboundKey {
    pub source_chain: ChainId,
    pub transaction_id: TransactionId,
    pub batch_index: u32,
}

/// Set of inbound batches already applied to the ledger.
#[derive(Debug, Default, Clone)]
pub struct InboundGuard {
    applied: HashSet<InboundKey>,
}

impl InboundGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `key` as applied. Returns `false` if it already was.
    pub fn mark_applied(&mut self, key: InboundKey) -> bool {
        self.applied.insert(key)
    }

    #[must_use]
    pub fn is_applied(&self, key: &InboundKey) -> bool {
        self.applied.contains(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.applied.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }
}
