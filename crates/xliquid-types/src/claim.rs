//! # Claim authorizations
//!
//! A claim is a manager-signed, one-time instruction that releases vault
//! liquidity to a user, paired with the reclaim plan that repays it on other
//! chains.
//!
//! ## Lifecycle
//!
//! ```text
//!   Received ─▶ Verified ─▶ LiquidityChecked ─▶ Committed ─▶ SettlementDispatched
//! ```
//!
//! Rejection is not a stage. A failure at any stage returns an error naming
//! the stage it failed from, and the vault's state is left unchanged.
//!
//! ## Identity
//!
//! ```text
//! claimHash = keccak256(abi.encode(
//!     vault, user, validUntil, validAfter, token,
//!     creditAmount, debitAmount, keccak256(reclaimPlan), claimNonce[user]))
//! ```
//!
//! [`ClaimAuthorization::claim_hash`] is the only implementation of this
//! layout; signer-side helpers and the vault both call it.

use alloy_primitives::{Address, B256, U256, keccak256};
use serde::{Deserialize, Serialize};

use crate::abi::AbiWriter;
use crate::constants::WITHDRAW_DOMAIN_TAG;
use crate::{ChainId, ClaimHash, MessageId, ReclaimPlan, Result, TransactionId, XliquidError};

/// Processing stage of a claim inside the vault. There is no terminal
/// failure stage; a rejected claim is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClaimStage {
    Received,
    Verified,
    LiquidityChecked,
    Committed,
    SettlementDispatched,
}

impl ClaimStage {
    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Received => Some(Self::Verified),
            Self::Verified => Some(Self::LiquidityChecked),
            Self::LiquidityChecked => Some(Self::Committed),
            Self::Committed => Some(Self::SettlementDispatched),
            Self::SettlementDispatched => None,
        }
    }
}

impl std::fmt::Display for ClaimStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Received => write!(f, "RECEIVED"),
            Self::Verified => write!(f, "VERIFIED"),
            Self::LiquidityChecked => write!(f, "LIQUIDITY_CHECKED"),
            Self::Committed => write!(f, "COMMITTED"),
            Self::SettlementDispatched => write!(f, "SETTLEMENT_DISPATCHED"),
        }
    }
}

/// Check `valid_after <= now < valid_until`.
///
/// # Errors
/// Returns `OutsideValidityWindow` otherwise.
pub fn check_validity_window(now: u64, valid_after: u64, valid_until: u64) -> Result<()> {
    if now < valid_after || now >= valid_until {
        return Err(XliquidError::OutsideValidityWindow {
            now,
            valid_after,
            valid_until,
        });
    }
    Ok(())
}

/// A manager-signed claim against a vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimAuthorization {
    /// Account receiving the credit and paying the debit.
    pub user: Address,
    /// Exclusive upper bound of the validity window (uint48 seconds).
    pub valid_until: u64,
    /// Inclusive lower bound of the validity window (uint48 seconds).
    pub valid_after: u64,
    /// Local token being released and debited.
    pub token: Address,
    /// Amount released from pool liquidity to the user.
    pub credit_amount: U256,
    /// Amount taken from the user's own deposit.
    pub debit_amount: U256,
    /// Remote repayment obligations.
    pub reclaim_plan: ReclaimPlan,
    /// `r || s || v` over the personal-message digest of the claim hash.
    pub signature: Vec<u8>,
}

impl ClaimAuthorization {
    /// Canonical claim hash for `vault` at the user's current `nonce`.
    #[must_use]
    pub fn claim_hash(&self, vault: Address, nonce: u64) -> ClaimHash {
        let mut w = AbiWriter::with_words(9);
        w.address(vault)
            .address(self.user)
            .uint64(self.valid_until)
            .uint64(self.valid_after)
            .address(self.token)
            .uint(self.credit_amount)
            .uint(self.debit_amount)
            .bytes32(self.reclaim_plan.hash())
            .uint64(nonce);
        ClaimHash(keccak256(w.finish()))
    }

    /// Check the validity window against `now`.
    pub fn check_window(&self, now: u64) -> Result<()> {
        check_validity_window(now, self.valid_after, self.valid_until)
    }
}

/// Cross-chain identity of a committed claim.
#[must_use]
pub fn transaction_id(chain: ChainId, user: Address, nonce: u64) -> TransactionId {
    let mut w = AbiWriter::with_words(3);
    w.uint64(chain.0).address(user).uint64(nonce);
    TransactionId(keccak256(w.finish()))
}

/// Result of a successful claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimReceipt {
    pub claim_hash: ClaimHash,
    pub transaction_id: TransactionId,
    /// Nonce the claim was signed against.
    pub nonce: u64,
    /// Messages accepted by the bridge for the reclaim plan.
    pub message_ids: Vec<MessageId>,
}

// ---------------------------------------------------------------------------
// Withdrawals
// ---------------------------------------------------------------------------

/// A depositor's withdrawal request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawRequest {
    pub token: Address,
    /// Account whose deposit is reduced.
    pub depositor: Address,
    /// Account receiving the tokens.
    pub recipient: Address,
    pub amount: U256,
    /// Exclusive deadline for signed withdrawals.
    pub valid_until: u64,
}

impl WithdrawRequest {
    /// Hash a manager co-signs for this withdrawal at the depositor's
    /// current withdrawal `nonce`.
    #[must_use]
    pub fn withdraw_hash(&self, vault: Address, nonce: u64) -> B256 {
        let mut w = AbiWriter::with_words(8);
        w.raw_word(WITHDRAW_DOMAIN_TAG)
            .address(vault)
            .address(self.token)
            .address(self.depositor)
            .address(self.recipient)
            .uint(self.amount)
            .uint64(self.valid_until)
            .uint64(nonce);
        keccak256(w.finish())
    }
}

/// How a withdrawal is authorized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WithdrawAuthorization {
    /// A vault manager signed [`WithdrawRequest::withdraw_hash`].
    ManagerSignature(Vec<u8>),
    /// The vault owner is executing the withdrawal directly.
    Owner,
}

/// Claim builders for tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
pub mod testing {
    use alloy_primitives::{Address, U256};

    use super::{ClaimAuthorization, WithdrawRequest};
    use crate::signature::testing::ManagerKey;
    use crate::{ChainId, ReclaimEntry, ReclaimPlan};

    /// Single-entry plan repaying `amount` of `token` on `chain`.
    pub fn single_entry_plan(chain: u64, token: Address, amount: U256, solver: Address, user: Address) -> ReclaimPlan {
        ReclaimPlan::new(vec![ReclaimEntry {
            chain_id: ChainId(chain),
            token,
            amount,
            solver,
            user,
        }])
        .expect("one entry is a valid plan")
    }

    /// Unsigned claim with the given window.
    #[allow(clippy::too_many_arguments)]
    pub fn unsigned_claim(
        user: Address,
        token: Address,
        credit: U256,
        debit: U256,
        valid_after: u64,
        valid_until: u64,
        plan: ReclaimPlan,
    ) -> ClaimAuthorization {
        ClaimAuthorization {
            user,
            valid_until,
            valid_after,
            token,
            credit_amount: credit,
            debit_amount: debit,
            reclaim_plan: plan,
            signature: Vec::new(),
        }
    }

    /// Sign `claim` for `vault` at `nonce` in place.
    pub fn sign_claim(key: &ManagerKey, vault: Address, nonce: u64, claim: &mut ClaimAuthorization) {
        let hash = claim.claim_hash(vault, nonce);
        claim.signature = key.sign(hash.0);
    }

    /// Manager signature over a withdrawal.
    pub fn sign_withdraw(key: &ManagerKey, vault: Address, nonce: u64, request: &WithdrawRequest) -> Vec<u8> {
        key.sign(request.withdraw_hash(vault, nonce))
    }
}
