//! The settlement module: outbound reclaim-plan dispatch and inbound credits.
//!
//! ## Outbound
//!
//! ```text
//! ReclaimPlan ─▶ group by chain (first appearance) ─▶ split into batches
//!             ─▶ check plugs, gas escrow, bridge capacity ─▶ send every batch
//! ```
//!
//! All checks run before the first send. If the bridge still refuses a later
//! batch, the batches already queued are retracted and their fees returned to
//! the escrow, so a dispatch either queues every batch or queues nothing.
//!
//! ## Inbound
//!
//! Only the configured bridge may call in, and only on behalf of the plug
//! connected for the source chain. Each batch is applied at most once.

use alloy_primitives::{Address, U256};
use xliquid_types::{
    ChainId, CreditSink, InboundOutcome, MessageId, ReclaimEntry, ReclaimPlan, RemoteCredit, Result,
    Settlement, SettlementConfig, SharedPolicy, TransactionId, XliquidError,
};

use crate::bridge::Bridge;
use crate::idempotency::{InboundGuard, InboundKey};
use crate::message::SettlementMessage;
use crate::plug_table::PlugTable;

/// Per-chain settlement module.
pub struct SettlementModule<B> {
    config: SettlementConfig,
    policy: SharedPolicy,
    plugs: PlugTable,
    bridge: B,
    inbound: InboundGuard,
    gas_escrow: U256,
}

impl<B: Bridge> SettlementModule<B> {
    pub fn new(config: SettlementConfig, policy: SharedPolicy, bridge: B) -> Self {
        Self {
            config,
            policy,
            plugs: PlugTable::new(),
            bridge,
            inbound: InboundGuard::new(),
            gas_escrow: U256::ZERO,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }

    #[must_use]
    pub fn plugs(&self) -> &PlugTable {
        &self.plugs
    }

    #[must_use]
    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    pub fn bridge_mut(&mut self) -> &mut B {
        &mut self.bridge
    }

    #[must_use]
    pub fn inbound(&self) -> &InboundGuard {
        &self.inbound
    }

    #[must_use]
    pub fn gas_balance(&self) -> U256 {
        self.gas_escrow
    }

    /// Owner-only. Connect (or reconnect) the remote module for `chain`.
    pub fn connect_to_plug(&mut self, caller: Address, chain: ChainId, remote: Address) -> Result<()> {
        self.policy.read().require_owner(caller)?;
        if remote.is_zero() {
            return Err(XliquidError::Configuration(format!(
                "plug for {chain} must not be the zero address"
            )));
        }
        let previous = self.plugs.connect(chain, remote);
        tracing::info!(
            module = %self.config.module_address,
            %chain,
            %remote,
            replaced = ?previous,
            "Plug connected"
        );
        Ok(())
    }

    /// Fund the escrow that pays bridge fees. Returns the new balance.
    pub fn deposit_gas(&mut self, amount: U256) -> Result<U256> {
        if amount.is_zero() {
            return Err(XliquidError::ZeroAmount);
        }
        self.gas_escrow = self
            .gas_escrow
            .checked_add(amount)
            .ok_or(XliquidError::AmountOverflow)?;
        tracing::info!(%amount, balance = %self.gas_escrow, "Gas escrow funded");
        Ok(self.gas_escrow)
    }

    /// Owner-only. Pay `amount` out of the gas escrow to `to`.
    pub fn withdraw_gas(&mut self, caller: Address, to: Address, amount: U256) -> Result<U256> {
        self.policy.read().require_owner(caller)?;
        let available = self.gas_escrow;
        self.gas_escrow = available
            .checked_sub(amount)
            .ok_or(XliquidError::InsufficientGasFunds {
                needed: amount,
                available,
            })?;
        tracing::info!(%to, %amount, balance = %self.gas_escrow, "Gas escrow withdrawn");
        Ok(self.gas_escrow)
    }

    /// Split `plan` into per-chain batch messages.
    ///
    /// # Errors
    /// `UnconnectedChain` for the first chain without a plug.
    pub fn plan_batches(
        &self,
        plan: &ReclaimPlan,
        transaction_id: TransactionId,
    ) -> Result<Vec<(ChainId, SettlementMessage)>> {
        let max = self.config.max_batch_size.max(1);
        let chains = plan.chains();
        for chain in &chains {
            self.plugs.require(*chain)?;
        }

        let mut batches = Vec::new();
        for chain in chains {
            let entries: Vec<ReclaimEntry> = plan.entries_for(chain).copied().collect();
            let chunks: Vec<&[ReclaimEntry]> = entries.chunks(max).collect();
            let count = u32::try_from(chunks.len())
                .map_err(|_| XliquidError::Internal(format!("too many batches for {chain}")))?;
            for (index, chunk) in (0..count).zip(chunks) {
                let message = SettlementMessage::new(
                    transaction_id,
                    self.config.chain_id,
                    index,
                    count,
                    chunk.to_vec(),
                )?;
                batches.push((chain, message));
            }
        }
        Ok(batches)
    }

    /// Total bridge fee for dispatching `plan`.
    pub fn quote(&self, plan: &ReclaimPlan, transaction_id: TransactionId) -> Result<U256> {
        self.plan_batches(plan, transaction_id)?
            .iter()
            .try_fold(U256::ZERO, |acc, (chain, _)| {
                acc.checked_add(self.bridge.quote_fee(*chain, self.config.message_gas_limit))
            })
            .ok_or(XliquidError::AmountOverflow)
    }

    /// Retract `sent` newest first and restore the escrow. Returns the error
    /// to report for the failed dispatch.
    fn unwind(
        &mut self,
        transaction_id: TransactionId,
        sent: &[MessageId],
        escrow: U256,
        cause: XliquidError,
    ) -> XliquidError {
        for id in sent.iter().rev() {
            if let Err(err) = self.bridge.retract(*id) {
                tracing::error!(
                    tx = %transaction_id.short(),
                    message_id = %id,
                    error = %err,
                    "Settlement batch could not be retracted"
                );
                return XliquidError::Internal(format!(
                    "dispatch of {} failed ({cause}) and batch {id} could not be retracted: {err}",
                    transaction_id.short()
                ));
            }
        }
        self.gas_escrow = escrow;
        tracing::warn!(
            tx = %transaction_id.short(),
            retracted = sent.len(),
            error = %cause,
            "Dispatch unwound"
        );
        cause
    }

    fn reject_source(chain: ChainId, caller: Address, reason: &str) -> XliquidError {
        tracing::warn!(%chain, %caller, reason, "Inbound settlement rejected");
        XliquidError::UnauthorizedSource {
            chain,
            reason: reason.to_string(),
        }
    }
}

impl<B: Bridge> Settlement for SettlementModule<B> {
    fn dispatch(&mut self, plan: &ReclaimPlan, transaction_id: TransactionId) -> Result<Vec<MessageId>> {
        let gas_limit = self.config.message_gas_limit;
        let batches = self.plan_batches(plan, transaction_id)?;
        let fees: Vec<U256> = batches
            .iter()
            .map(|(chain, _)| self.bridge.quote_fee(*chain, gas_limit))
            .collect();
        let needed = fees
            .iter()
            .try_fold(U256::ZERO, |acc, fee| acc.checked_add(*fee))
            .ok_or(XliquidError::AmountOverflow)?;
        if needed > self.gas_escrow {
            return Err(XliquidError::InsufficientGasFunds {
                needed,
                available: self.gas_escrow,
            });
        }
        self.bridge.ensure_capacity(batches.len())?;

        let escrow_before = self.gas_escrow;
        let mut ids = Vec::with_capacity(batches.len());
        for ((chain, message), fee) in batches.into_iter().zip(fees) {
            let id = match self.bridge.send(chain, message.encode(), gas_limit) {
                Ok(id) => id,
                Err(err) => return Err(self.unwind(transaction_id, &ids, escrow_before, err)),
            };
            self.gas_escrow = self.gas_escrow.saturating_sub(fee);
            tracing::debug!(
                tx = %transaction_id.short(),
                %chain,
                batch = message.batch_index,
                of = message.batch_count,
                entries = message.entries.len(),
                message_id = %id,
                %fee,
                "Settlement batch queued"
            );
            ids.push(id);
        }

        tracing::info!(
            tx = %transaction_id.short(),
            messages = ids.len(),
            fees = %needed,
            gas_left = %self.gas_escrow,
            "Reclaim plan dispatched"
        );
        Ok(ids)
    }

    fn on_message_received(
        &mut self,
        caller: Address,
        source_chain: ChainId,
        origin: Address,
        payload: &[u8],
        sink: &mut dyn CreditSink,
    ) -> Result<InboundOutcome> {
        if caller != self.config.bridge {
            return Err(Self::reject_source(source_chain, caller, "caller is not the configured bridge"));
        }
        match self.plugs.get(source_chain) {
            None => return Err(Self::reject_source(source_chain, caller, "no plug connected")),
            Some(plug) if plug != origin => {
                return Err(Self::reject_source(source_chain, caller, "origin is not the connected plug"));
            }
            Some(_) => {}
        }

        let message = SettlementMessage::decode(payload)?;
        if message.source_chain != source_chain {
            return Err(XliquidError::malformed_message(format!(
                "payload names source {} but arrived from {source_chain}",
                message.source_chain
            )));
        }
        if let Some(entry) = message
            .entries
            .entries()
            .iter()
            .find(|e| e.chain_id != self.config.chain_id)
        {
            return Err(XliquidError::malformed_message(format!(
                "entry for {} delivered to {}",
                entry.chain_id, self.config.chain_id
            )));
        }

        let transaction_id = message.transaction_id;
        let key = InboundKey {
            source_chain,
            transaction_id,
            batch_index: message.batch_index,
        };
        if self.inbound.is_applied(&key) {
            tracing::warn!(
                tx = %transaction_id.short(),
                chain = %source_chain,
                batch = message.batch_index,
                "Inbound settlement already applied, ignoring redelivery"
            );
            return Ok(InboundOutcome::AlreadyApplied { transaction_id });
        }

        let credits: Vec<RemoteCredit> = message
            .entries
            .entries()
            .iter()
            .map(|e| RemoteCredit {
                token: e.token,
                recipient: e.recipient(),
                amount: e.amount,
            })
            .collect();
        sink.apply_remote_credits(transaction_id, &credits)?;
        self.inbound.mark_applied(key);

        tracing::info!(
            tx = %transaction_id.short(),
            chain = %source_chain,
            batch = message.batch_index,
            of = message.batch_count,
            credits = credits.len(),
            "Inbound settlement applied"
        );
        Ok(InboundOutcome::Applied {
            transaction_id,
            credits: credits.len(),
        })
    }
}
