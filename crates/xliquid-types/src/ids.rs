//! Identifiers used throughout xliquid.
//!
//! Claim and transaction identities are keccak-256 digests so they can be
//! recomputed byte-for-byte by off-chain signers. Outbound message ids are
//! plain monotonic counters assigned by the bridge queue.

use std::fmt;

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ChainId
// ---------------------------------------------------------------------------

/// EVM-style numeric chain identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ChainId(pub u64);

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chain:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ClaimHash
// ---------------------------------------------------------------------------

/// Identity of a claim authorization. Consumed at most once per vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ClaimHash(pub B256);

impl ClaimHash {
    pub const ZERO: Self = Self(B256::ZERO);

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0.0
    }

    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for ClaimHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "claim:0x{}", hex::encode(self.0))
    }
}

// ---------------------------------------------------------------------------
// TransactionId
// ---------------------------------------------------------------------------

/// Cross-chain identity of a committed claim:
/// `keccak256(abi.encode(localChainId, user, claimNonce))`.
///
/// Inbound settlement is idempotent per transaction id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct TransactionId(pub B256);

impl TransactionId {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0.0
    }

    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx:0x{}", hex::encode(self.0))
    }
}

// ---------------------------------------------------------------------------
// MessageId
// ---------------------------------------------------------------------------

/// Monotonic id assigned to a message when the bridge accepts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct MessageId(pub u64);

impl MessageId {
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg:{}", self.0)
    }
}
