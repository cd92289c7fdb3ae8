//! Configuration types for vaults, settlement modules and paymasters.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::{AuthorizationPolicy, ChainId, Result, XliquidError, constants};

/// Configuration for one chain's vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Chain this vault lives on.
    pub chain_id: ChainId,
    /// The vault's own address, bound into every claim hash.
    pub address: Address,
    /// Paymaster allowed to reconcile sponsored debits, if any.
    #[serde(default)]
    pub paymaster: Option<Address>,
}

/// Configuration for one chain's settlement module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementConfig {
    /// Chain this module lives on.
    pub chain_id: ChainId,
    /// The module's own address, as seen by remote plugs.
    pub module_address: Address,
    /// The only account allowed to invoke the inbound callback.
    pub bridge: Address,
    /// Gas limit attached to each outbound message.
    #[serde(default = "default_message_gas_limit")]
    pub message_gas_limit: u64,
    /// Maximum reclaim entries per outbound message.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
}

fn default_message_gas_limit() -> u64 {
    constants::DEFAULT_MESSAGE_GAS_LIMIT
}

fn default_max_batch_size() -> usize {
    constants::DEFAULT_MAX_BATCH_SIZE
}

impl SettlementConfig {
    /// Config with default gas limit and batch size.
    #[must_use]
    pub fn new(chain_id: ChainId, module_address: Address, bridge: Address) -> Self {
        Self {
            chain_id,
            module_address,
            bridge,
            message_gas_limit: constants::DEFAULT_MESSAGE_GAS_LIMIT,
            max_batch_size: constants::DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

/// Configuration for the gas-sponsorship adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymasterConfig {
    /// The paymaster's own address.
    pub address: Address,
    /// Vault whose claims finance sponsorship.
    pub vault: Address,
}

/// Everything needed to stand up one chain's deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Owner of the vault and settlement module.
    pub governance: Address,
    /// Initial vault managers.
    #[serde(default)]
    pub managers: Vec<Address>,
    pub vault: VaultConfig,
    pub settlement: SettlementConfig,
    #[serde(default)]
    pub paymaster: Option<PaymasterConfig>,
}

impl EngineConfig {
    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot run with.
    ///
    /// # Errors
    /// Returns [`XliquidError::Configuration`] describing the first problem.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(XliquidError::Configuration(msg));

        if self.governance.is_zero() {
            return fail("governance must not be the zero address".into());
        }
        if self.vault.address.is_zero() {
            return fail("vault address must not be zero".into());
        }
        if self.settlement.module_address.is_zero() || self.settlement.bridge.is_zero() {
            return fail("settlement module and bridge addresses must not be zero".into());
        }
        if self.vault.chain_id != self.settlement.chain_id {
            return fail(format!(
                "vault on {} but settlement module on {}",
                self.vault.chain_id, self.settlement.chain_id
            ));
        }
        if self.settlement.max_batch_size == 0 {
            return fail("max_batch_size must be > 0".into());
        }
        if self.settlement.max_batch_size > constants::MAX_RECLAIM_ENTRIES {
            return fail(format!(
                "max_batch_size {} exceeds {}",
                self.settlement.max_batch_size,
                constants::MAX_RECLAIM_ENTRIES
            ));
        }
        if self.settlement.message_gas_limit == 0 {
            return fail("message_gas_limit must be > 0".into());
        }
        if let Some(pm) = &self.paymaster {
            if pm.vault != self.vault.address {
                return fail(format!(
                    "paymaster targets vault {} but vault is {}",
                    pm.vault, self.vault.address
                ));
            }
            if self.vault.paymaster != Some(pm.address) {
                return fail("vault.paymaster must name the configured paymaster".into());
            }
        }
        Ok(())
    }

    /// Initial authorization policy described by this config.
    #[must_use]
    pub fn policy(&self) -> AuthorizationPolicy {
        AuthorizationPolicy::with_managers(self.governance, self.managers.iter().copied())
    }
}
