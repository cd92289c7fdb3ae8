//! Paymaster adapter: sponsors gas with a vault claim.
//!
//! `validate` decodes `paymasterAndData`, checks it targets our vault and
//! runs the embedded claim through the vault for `userOp.sender`. The claim's
//! debit pre-pays gas in units of the claim token. `post_op` refunds whatever
//! the operation did not use.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use xliquid_types::{
    ClaimHash, PaymasterAndData, PaymasterConfig, Result, Settlement, TransactionId, XliquidError,
};
use xliquid_vault::Vault;

use crate::user_op::UserOperation;

/// Carried from `validate` to `post_op`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SponsorshipContext {
    pub user: Address,
    pub token: Address,
    /// Gas budget the user pre-paid.
    pub debit_amount: U256,
    pub claim_hash: ClaimHash,
    pub transaction_id: TransactionId,
}

/// Result of a successful `validate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    pub context: SponsorshipContext,
    pub valid_after: u64,
    pub valid_until: u64,
}

pub struct Paymaster {
    config: PaymasterConfig,
}

impl Paymaster {
    #[must_use]
    pub fn new(config: PaymasterConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn address(&self) -> Address {
        self.config.address
    }

    /// Decode `paymasterAndData`.
    ///
    /// # Errors
    /// `MalformedPaymasterData` on short input, plan errors on a bad tail.
    pub fn parse_paymaster_and_data(bytes: &[u8]) -> Result<PaymasterAndData> {
        PaymasterAndData::decode(bytes)
    }

    /// Validate a user operation and execute its claim.
    ///
    /// # Errors
    /// - `MalformedPaymasterData` / plan errors from decoding
    /// - `VaultMismatch` if the blob names another vault
    /// - `GasCostExceedsAuthorization` if `max_cost` exceeds the debit
    /// - any claim error from the vault
    pub fn validate<S: Settlement>(
        &self,
        vault: &mut Vault<S>,
        op: &UserOperation,
        max_cost: U256,
    ) -> Result<Validation> {
        if vault.address() != self.config.vault {
            return Err(XliquidError::Configuration(format!(
                "paymaster is bound to vault {} but was handed {}",
                self.config.vault,
                vault.address()
            )));
        }
        let data = Self::parse_paymaster_and_data(&op.paymaster_and_data)?;
        if data.vault != self.config.vault {
            return Err(XliquidError::VaultMismatch {
                expected: self.config.vault,
                actual: data.vault,
            });
        }
        if max_cost > data.debit_amount {
            return Err(XliquidError::GasCostExceedsAuthorization {
                actual: max_cost,
                authorized: data.debit_amount,
            });
        }

        let claim = data.into_claim(op.sender);
        let receipt = vault.claim_sponsored(self.config.address, &claim)?;
        tracing::info!(
            user = %op.sender,
            token = %claim.token,
            debit = %claim.debit_amount,
            %max_cost,
            claim = %receipt.claim_hash.short(),
            "User operation sponsored"
        );

        Ok(Validation {
            context: SponsorshipContext {
                user: op.sender,
                token: claim.token,
                debit_amount: claim.debit_amount,
                claim_hash: receipt.claim_hash,
                transaction_id: receipt.transaction_id,
            },
            valid_after: claim.valid_after,
            valid_until: claim.valid_until,
        })
    }

    /// Settle the actual gas cost. Returns the amount refunded to the user.
    ///
    /// # Errors
    /// - `GasCostExceedsAuthorization` if `actual_gas_cost` exceeds the
    ///   pre-paid debit; nothing changes in that case
    /// - `UnknownSponsorship` if this context was already settled
    pub fn post_op<S: Settlement>(
        &self,
        vault: &mut Vault<S>,
        context: &SponsorshipContext,
        actual_gas_cost: U256,
    ) -> Result<U256> {
        let refund = vault.reconcile_sponsorship(self.config.address, context.claim_hash, actual_gas_cost)?;
        tracing::debug!(
            user = %context.user,
            %actual_gas_cost,
            %refund,
            claim = %context.claim_hash.short(),
            "Sponsorship settled"
        );
        Ok(refund)
    }
}
