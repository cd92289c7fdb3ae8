//! Used-claim set: each claim hash can be consumed exactly once.
//!
//! Unlike an eviction cache, entries are never dropped. A consumed claim
//! stays consumed for the lifetime of the vault.
//!
//! Claims are also indexed by the signature that authorized them. The claim
//! hash binds the user's nonce, so resubmitting an already-consumed claim
//! hashes differently once the nonce has moved on; the signature index is
//! what recognizes it as a replay.

use std::collections::{HashMap, HashSet};

use alloy_primitives::{B256, keccak256};
use xliquid_types::{ClaimHash, Result, XliquidError};

/// Permanent record of consumed claims.
#[derive(Debug, Default, Clone)]
pub struct UsedClaims {
    consumed: HashSet<ClaimHash>,
    /// `keccak256(signature)` → claim it authorized.
    by_signature: HashMap<B256, ClaimHash>,
}

/// Key under which a signature is indexed.
#[must_use]
pub fn signature_key(signature: &[u8]) -> B256 {
    keccak256(signature)
}

impl UsedClaims {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail if `signature` already authorized a consumed claim.
    ///
    /// # Errors
    /// Returns [`XliquidError::ReplayedClaim`] naming the original claim.
    pub fn check_signature(&self, signature: &[u8]) -> Result<()> {
        match self.by_signature.get(&signature_key(signature)) {
            Some(hash) => Err(XliquidError::ReplayedClaim(*hash)),
            None => Ok(()),
        }
    }

    /// Mark `hash` consumed under `signature`.
    ///
    /// # Errors
    /// Returns [`XliquidError::ReplayedClaim`] if the hash or the signature
    /// has been consumed before.
    pub fn consume(&mut self, hash: ClaimHash, signature: &[u8]) -> Result<()> {
        if self.consumed.contains(&hash) {
            return Err(XliquidError::ReplayedClaim(hash));
        }
        self.check_signature(signature)?;
        self.consumed.insert(hash);
        self.by_signature.insert(signature_key(signature), hash);
        Ok(())
    }

    /// Undo a consumption that belonged to a rolled-back transaction.
    pub(crate) fn release(&mut self, hash: &ClaimHash, signature_key: &B256) {
        self.consumed.remove(hash);
        self.by_signature.remove(signature_key);
    }

    #[must_use]
    pub fn is_consumed(&self, hash: &ClaimHash) -> bool {
        self.consumed.contains(hash)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.consumed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.consumed.is_empty()
    }
}
