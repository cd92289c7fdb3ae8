//! Error types for the xliquid settlement engine.
//!
//! All errors use the `XL_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Authorization errors (signatures, validity windows, replay)
//! - 2xx: Ledger errors
//! - 3xx: Codec errors (reclaim plans, paymasterAndData, settlement messages)
//! - 4xx: Settlement errors
//! - 5xx: Paymaster errors
//! - 8xx: Invariant violations
//! - 9xx: General / internal errors
//!
//! Every error is terminal for the call that produced it. Nothing is retried
//! internally and no error leaves partially applied state behind.

use alloy_primitives::{Address, U256};
use thiserror::Error;

use crate::{ChainId, ClaimHash};

/// Central error enum for all xliquid operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XliquidError {
    // =================================================================
    // Authorization Errors (1xx)
    // =================================================================
    /// Signature recovery failed or the recovered signer is not a manager.
    #[error("XL_ERR_100: Invalid signature: {reason}")]
    InvalidSignature { reason: String },

    /// `now` falls outside `[valid_after, valid_until)`.
    #[error("XL_ERR_101: Outside validity window: now={now}, window=[{valid_after}, {valid_until})")]
    OutsideValidityWindow {
        now: u64,
        valid_after: u64,
        valid_until: u64,
    },

    /// The claim hash has already been consumed.
    #[error("XL_ERR_102: Claim already consumed: {0}")]
    ReplayedClaim(ClaimHash),

    /// The caller lacks permission for an owner- or role-gated operation.
    #[error("XL_ERR_103: Unauthorized caller {caller}: {reason}")]
    Unauthorized { caller: Address, reason: String },

    // =================================================================
    // Ledger Errors (2xx)
    // =================================================================
    /// Depositor balance is lower than the requested debit.
    #[error("XL_ERR_200: Insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: U256, available: U256 },

    /// Pool liquidity cannot cover the requested release.
    #[error("XL_ERR_201: Insufficient liquidity for token {token}: need {needed}, have {available}")]
    InsufficientLiquidity {
        token: Address,
        needed: U256,
        available: U256,
    },

    /// Zero-amount deposits and withdrawals are rejected.
    #[error("XL_ERR_202: Amount must be non-zero")]
    ZeroAmount,

    /// An addition would exceed `U256::MAX`.
    #[error("XL_ERR_203: Amount overflow")]
    AmountOverflow,

    // =================================================================
    // Codec Errors (3xx)
    // =================================================================
    /// A reclaim plan must carry at least one entry.
    #[error("XL_ERR_300: Reclaim plan is empty")]
    EmptyPlan,

    /// Reclaim plan bytes do not match the fixed-stride layout.
    #[error("XL_ERR_301: Malformed reclaim plan: {reason}")]
    MalformedPlan { reason: String },

    /// `paymasterAndData` is too short or carries out-of-range fields.
    #[error("XL_ERR_302: Malformed paymasterAndData: {reason}")]
    MalformedPaymasterData { reason: String },

    /// A settlement message payload could not be decoded.
    #[error("XL_ERR_303: Malformed settlement message: {reason}")]
    MalformedMessage { reason: String },

    // =================================================================
    // Settlement Errors (4xx)
    // =================================================================
    /// No plug is connected for the remote chain.
    #[error("XL_ERR_400: No plug connected for chain {0}")]
    UnconnectedChain(ChainId),

    /// Inbound message did not come from the bridge or the connected plug.
    #[error("XL_ERR_401: Unauthorized settlement source on chain {chain}: {reason}")]
    UnauthorizedSource { chain: ChainId, reason: String },

    /// The gas escrow cannot pay for the outbound messages.
    #[error("XL_ERR_402: Insufficient gas funds: need {needed}, have {available}")]
    InsufficientGasFunds { needed: U256, available: U256 },

    /// The bridge refused to accept a message into its outbound queue.
    #[error("XL_ERR_403: Bridge rejected message: {reason}")]
    BridgeRejected { reason: String },

    // =================================================================
    // Paymaster Errors (5xx)
    // =================================================================
    /// `paymasterAndData` names a different vault.
    #[error("XL_ERR_500: Vault mismatch: expected {expected}, got {actual}")]
    VaultMismatch { expected: Address, actual: Address },

    /// Actual gas cost exceeds what `validate` pre-authorized.
    #[error("XL_ERR_501: Gas cost {actual} exceeds authorized debit {authorized}")]
    GasCostExceedsAuthorization { actual: U256, authorized: U256 },

    /// No sponsored claim with this hash is awaiting reconciliation.
    #[error("XL_ERR_502: No outstanding sponsorship for claim {0}")]
    UnknownSponsorship(ClaimHash),

    // =================================================================
    // Invariant Errors (8xx)
    // =================================================================
    /// Supply conservation invariant violated.
    #[error("XL_ERR_800: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("XL_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("XL_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config file, missing fields, etc.).
    #[error("XL_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

impl XliquidError {
    /// Shorthand for [`XliquidError::InvalidSignature`].
    pub fn invalid_signature(reason: impl Into<String>) -> Self {
        Self::InvalidSignature {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`XliquidError::MalformedPlan`].
    pub fn malformed_plan(reason: impl Into<String>) -> Self {
        Self::MalformedPlan {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`XliquidError::MalformedPaymasterData`].
    pub fn malformed_paymaster_data(reason: impl Into<String>) -> Self {
        Self::MalformedPaymasterData {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`XliquidError::MalformedMessage`].
    pub fn malformed_message(reason: impl Into<String>) -> Self {
        Self::MalformedMessage {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`XliquidError::Unauthorized`].
    pub fn unauthorized(caller: Address, reason: impl Into<String>) -> Self {
        Self::Unauthorized {
            caller,
            reason: reason.into(),
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, XliquidError>;

impl From<serde_json::Error> for XliquidError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
