//! # xliquid-vault
//!
//! **Vault plane**: pooled deposits on one chain, released by manager-signed
//! claims instead of on-chain consensus.
//!
//! ## Architecture
//!
//! A [`Vault`] receives a [`ClaimAuthorization`](xliquid_types::ClaimAuthorization) and:
//! 1. Rejects replays (used-claim set, indexed by hash and signature)
//! 2. Recovers the signer and checks it against the manager set
//! 3. Checks the `[validAfter, validUntil)` window
//! 4. Debits the user's deposit and commits the credit against liquidity
//! 5. Consumes the claim hash and advances the user's nonce
//! 6. Dispatches the reclaim plan through its [`Settlement`](xliquid_types::Settlement)
//!
//! Steps 4–6 share one [`LedgerStore`] checkpoint; any failure rolls back.
//! [`SupplyConservation`] tracks every flow so the ledger can prove it never
//! mints or burns value outside deposits, withdrawals, debits and credits.
//!
//! Claims executed for the paymaster hold their debit as a [`Sponsorship`]
//! until the gas cost is known. Each is settled, and refunded, exactly once.

pub mod ledger;
pub mod replay;
pub mod supply_conservation;
pub mod vault;

pub use ledger::{Checkpoint, LedgerStore, Sponsorship};
pub use replay::UsedClaims;
pub use supply_conservation::{SupplyConservation, SupplyFlow};
pub use vault::Vault;
