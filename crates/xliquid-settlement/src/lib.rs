//! # xliquid-settlement
//!
//! **Settlement plane**: propagates reclaim plans between vaults on
//! different chains.
//!
//! ## Architecture
//!
//! On a successful claim the vault hands its [`ReclaimPlan`](xliquid_types::ReclaimPlan)
//! to a [`SettlementModule`], which:
//! 1. Groups entries by remote chain and checks every chain has a plug
//! 2. Splits each group into batches of at most `max_batch_size`
//! 3. Pays the bridge fee for each batch out of its gas escrow
//! 4. Queues one [`SettlementMessage`] per batch on the [`Bridge`]
//!
//! On the remote chain the bridge's relayer calls back into that chain's
//! module, which authenticates the source, decodes the batch and credits the
//! local ledger exactly once per `(source chain, transaction, batch)`.
//!
//! Settlement is eventually consistent. Nothing waits for delivery, and an
//! undelivered message has no on-chain timeout or refund.

pub mod bridge;
pub mod idempotency;
pub mod message;
pub mod module;
pub mod plug_table;

pub use bridge::{Bridge, OutboundMessage, OutboundQueue};
pub use idempotency::{InboundGuard, InboundKey};
pub use message::SettlementMessage;
pub use module::SettlementModule;
pub use plug_table::PlugTable;
