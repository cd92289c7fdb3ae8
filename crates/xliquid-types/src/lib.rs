//! # xliquid-types
//!
//! Shared types, codecs, errors, and configuration for the **xliquid**
//! cross-chain settlement engine.
//!
//! This crate is the leaf dependency of the workspace. It defines:
//!
//! - **Identifiers**: [`ChainId`], [`ClaimHash`], [`TransactionId`], [`MessageId`]
//! - **Claim model**: [`ClaimAuthorization`], [`ClaimReceipt`], [`WithdrawRequest`]
//! - **Reclaim plans**: [`ReclaimPlan`], [`ReclaimEntry`] and their ABI codec
//! - **paymasterAndData**: [`PaymasterAndData`] fixed-offset codec
//! - **Authorization**: [`AuthorizationPolicy`], [`SignatureAuthorizer`]
//! - **Settlement seams**: [`Settlement`], [`CreditSink`]
//! - **Configuration**: [`EngineConfig`], [`VaultConfig`], [`SettlementConfig`], [`PaymasterConfig`]
//! - **Errors**: [`XliquidError`] with `XL_ERR_` prefix codes
//! - **Constants**: wire layout offsets and defaults

pub mod abi;
pub mod claim;
pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod paymaster_data;
pub mod policy;
pub mod reclaim_plan;
pub mod settlement;
pub mod signature;

pub use claim::*;
pub use clock::*;
pub use config::*;
pub use error::*;
pub use ids::*;
pub use paymaster_data::PaymasterAndData;
pub use policy::{AuthorizationPolicy, SharedPolicy};
pub use reclaim_plan::{ReclaimEntry, ReclaimPlan};
pub use settlement::*;
pub use signature::SignatureAuthorizer;

pub use alloy_primitives::{Address, B256, U256};

// Constants are accessed via `xliquid_types::constants::FOO`
// (not re-exported to avoid name collisions).
