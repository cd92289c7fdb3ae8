//! The slice of an account-abstraction user operation the paymaster reads.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// A user operation as handed to the paymaster by the entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserOperation {
    /// Smart account submitting the operation; the claim's user.
    pub sender: Address,
    pub nonce: U256,
    pub call_data: Vec<u8>,
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    pub paymaster_and_data: Vec<u8>,
    pub signature: Vec<u8>,
}

impl UserOperation {
    /// An operation from `sender` carrying `paymaster_and_data`, other
    /// fields zeroed.
    #[must_use]
    pub fn sponsored(sender: Address, paymaster_and_data: Vec<u8>) -> Self {
        Self {
            sender,
            nonce: U256::ZERO,
            call_data: Vec::new(),
            call_gas_limit: U256::ZERO,
            verification_gas_limit: U256::ZERO,
            pre_verification_gas: U256::ZERO,
            max_fee_per_gas: U256::ZERO,
            max_priority_fee_per_gas: U256::ZERO,
            paymaster_and_data,
            signature: Vec::new(),
        }
    }
}
