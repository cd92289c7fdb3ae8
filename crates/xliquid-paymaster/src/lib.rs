//! # xliquid-paymaster
//!
//! Gas sponsorship backed by vault claims. A user operation carries a
//! manager-signed claim in its `paymasterAndData`; the claim's debit pays for
//! gas and its credit and reclaim plan flow through the vault as usual.

pub mod paymaster;
pub mod user_op;

pub use paymaster::{Paymaster, SponsorshipContext, Validation};
pub use user_op::UserOperation;
