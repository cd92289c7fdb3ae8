//! `paymasterAndData` codec.
//!
//! Fixed, offset-addressed layout (not self-describing):
//!
//! ```text
//!  0      20           26           32      52             84            116         181
//!  | vault | validUntil | validAfter | token | creditAmount | debitAmount | signature | reclaimPlan ... |
//!    20 B      6 B          6 B        20 B      32 B           32 B          65 B        tail (ABI)
//! ```
//!
//! This module is the single source of truth for the layout. Signers build
//! the blob with [`PaymasterAndData::encode`], verifiers read it with
//! [`PaymasterAndData::decode`]. Nothing else does offset arithmetic.
//! Changing any field order or width is a breaking protocol change.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::constants::{
    MAX_TIMESTAMP, PMD_CREDIT_OFFSET, PMD_DEBIT_OFFSET, PMD_RECLAIM_PLAN_OFFSET,
    PMD_SIGNATURE_OFFSET, PMD_TOKEN_OFFSET, PMD_VALID_AFTER_OFFSET, PMD_VALID_UNTIL_OFFSET,
    PMD_VAULT_OFFSET, SIGNATURE_LENGTH, TIMESTAMP_WIDTH,
};
use crate::{ClaimAuthorization, ReclaimPlan, Result, XliquidError, reclaim_plan};

/// Decoded `paymasterAndData`.
///
/// The claim's `user` is not part of the blob; it is the sender of the user
/// operation carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymasterAndData {
    pub vault: Address,
    pub valid_until: u64,
    pub valid_after: u64,
    pub token: Address,
    pub credit_amount: U256,
    pub debit_amount: U256,
    pub signature: Vec<u8>,
    pub reclaim_plan: ReclaimPlan,
}

fn write_u48(out: &mut Vec<u8>, value: u64, field: &str) -> Result<()> {
    if value > MAX_TIMESTAMP {
        return Err(XliquidError::malformed_paymaster_data(format!(
            "{field} {value} does not fit in uint48"
        )));
    }
    out.extend_from_slice(&value.to_be_bytes()[8 - TIMESTAMP_WIDTH..]);
    Ok(())
}

fn read_u48(bytes: &[u8], offset: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf[8 - TIMESTAMP_WIDTH..].copy_from_slice(&bytes[offset..offset + TIMESTAMP_WIDTH]);
    u64::from_be_bytes(buf)
}

impl PaymasterAndData {
    /// Build from a claim targeting `vault`.
    #[must_use]
    pub fn from_claim(vault: Address, claim: &ClaimAuthorization) -> Self {
        Self {
            vault,
            valid_until: claim.valid_until,
            valid_after: claim.valid_after,
            token: claim.token,
            credit_amount: claim.credit_amount,
            debit_amount: claim.debit_amount,
            signature: claim.signature.clone(),
            reclaim_plan: claim.reclaim_plan.clone(),
        }
    }

    /// The claim this blob carries on behalf of `user`.
    #[must_use]
    pub fn into_claim(self, user: Address) -> ClaimAuthorization {
        ClaimAuthorization {
            user,
            valid_until: self.valid_until,
            valid_after: self.valid_after,
            token: self.token,
            credit_amount: self.credit_amount,
            debit_amount: self.debit_amount,
            reclaim_plan: self.reclaim_plan,
            signature: self.signature,
        }
    }

    /// Serialize to the bit-exact wire layout.
    ///
    /// # Errors
    /// `MalformedPaymasterData` if a timestamp exceeds uint48 or the
    /// signature is not 65 bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.signature.len() != SIGNATURE_LENGTH {
            return Err(XliquidError::malformed_paymaster_data(format!(
                "signature is {} bytes, expected {SIGNATURE_LENGTH}",
                self.signature.len()
            )));
        }
        let plan = self.reclaim_plan.to_bytes();
        let mut out = Vec::with_capacity(PMD_RECLAIM_PLAN_OFFSET + plan.len());
        out.extend_from_slice(self.vault.as_slice());
        write_u48(&mut out, self.valid_until, "validUntil")?;
        write_u48(&mut out, self.valid_after, "validAfter")?;
        out.extend_from_slice(self.token.as_slice());
        out.extend_from_slice(&self.credit_amount.to_be_bytes::<32>());
        out.extend_from_slice(&self.debit_amount.to_be_bytes::<32>());
        out.extend_from_slice(&self.signature);
        out.extend_from_slice(&plan);
        debug_assert_eq!(out.len(), PMD_RECLAIM_PLAN_OFFSET + plan.len());
        Ok(out)
    }

    /// Parse the wire layout.
    ///
    /// # Errors
    /// - `MalformedPaymasterData` if `bytes` is shorter than the fixed head
    /// - `MalformedPlan` / `EmptyPlan` if the tail is not a valid reclaim plan
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < PMD_RECLAIM_PLAN_OFFSET {
            return Err(XliquidError::malformed_paymaster_data(format!(
                "{} bytes is shorter than the {PMD_RECLAIM_PLAN_OFFSET}-byte head",
                bytes.len()
            )));
        }

        let word = |offset: usize| {
            let mut w = [0u8; 32];
            w.copy_from_slice(&bytes[offset..offset + 32]);
            U256::from_be_bytes(w)
        };

        Ok(Self {
            vault: Address::from_slice(&bytes[PMD_VAULT_OFFSET..PMD_VALID_UNTIL_OFFSET]),
            valid_until: read_u48(bytes, PMD_VALID_UNTIL_OFFSET),
            valid_after: read_u48(bytes, PMD_VALID_AFTER_OFFSET),
            token: Address::from_slice(&bytes[PMD_TOKEN_OFFSET..PMD_CREDIT_OFFSET]),
            credit_amount: word(PMD_CREDIT_OFFSET),
            debit_amount: word(PMD_DEBIT_OFFSET),
            signature: bytes[PMD_SIGNATURE_OFFSET..PMD_RECLAIM_PLAN_OFFSET].to_vec(),
            reclaim_plan: reclaim_plan::decode(&bytes[PMD_RECLAIM_PLAN_OFFSET..])?,
        })
    }
}
