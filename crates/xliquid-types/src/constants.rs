//! System-wide constants for the xliquid settlement engine.

/// Size of one ABI word in bytes.
pub const ABI_WORD: usize = 32;

/// Number of ABI words per reclaim plan entry
/// `(chainId, token, amount, solver, user)`.
pub const RECLAIM_ENTRY_WORDS: usize = 5;

/// Encoded size of a single reclaim plan entry.
pub const RECLAIM_ENTRY_SIZE: usize = RECLAIM_ENTRY_WORDS * ABI_WORD;

/// Encoded reclaim plan head: array offset word + length word.
pub const RECLAIM_PLAN_HEAD_SIZE: usize = 2 * ABI_WORD;

/// Upper bound on entries in one reclaim plan.
pub const MAX_RECLAIM_ENTRIES: usize = 256;

// ---------------------------------------------------------------------------
// paymasterAndData layout
// ---------------------------------------------------------------------------

pub const PMD_VAULT_OFFSET: usize = 0;
pub const PMD_VALID_UNTIL_OFFSET: usize = 20;
pub const PMD_VALID_AFTER_OFFSET: usize = 26;
pub const PMD_TOKEN_OFFSET: usize = 32;
pub const PMD_CREDIT_OFFSET: usize = 52;
pub const PMD_DEBIT_OFFSET: usize = 84;
pub const PMD_SIGNATURE_OFFSET: usize = 116;
pub const PMD_RECLAIM_PLAN_OFFSET: usize = 181;

/// Width of the `validUntil` / `validAfter` fields (uint48).
pub const TIMESTAMP_WIDTH: usize = 6;

/// Largest value representable in a uint48 timestamp.
pub const MAX_TIMESTAMP: u64 = (1 << 48) - 1;

/// Length of an `r || s || v` secp256k1 signature.
pub const SIGNATURE_LENGTH: usize = 65;

// ---------------------------------------------------------------------------
// Settlement defaults
// ---------------------------------------------------------------------------

/// Default gas limit attached to each outbound settlement message.
pub const DEFAULT_MESSAGE_GAS_LIMIT: u64 = 500_000;

/// Default maximum reclaim entries carried by one settlement message.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 16;

/// Settlement message header: transactionId(32) | sourceChain(8) | batchIndex(4) | batchCount(4).
pub const SETTLEMENT_HEADER_SIZE: usize = 48;

/// Domain tag mixed into manager-signed withdrawal hashes.
pub const WITHDRAW_DOMAIN_TAG: &[u8; 32] = b"xliquid:withdraw:v1\0\0\0\0\0\0\0\0\0\0\0\0\0";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "xliquid";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paymaster_offsets_are_contiguous() {
        assert_eq!(PMD_VALID_UNTIL_OFFSET, PMD_VAULT_OFFSET + 20);
        assert_eq!(PMD_VALID_AFTER_OFFSET, PMD_VALID_UNTIL_OFFSET + TIMESTAMP_WIDTH);
        assert_eq!(PMD_TOKEN_OFFSET, PMD_VALID_AFTER_OFFSET + TIMESTAMP_WIDTH);
        assert_eq!(PMD_CREDIT_OFFSET, PMD_TOKEN_OFFSET + 20);
        assert_eq!(PMD_DEBIT_OFFSET, PMD_CREDIT_OFFSET + ABI_WORD);
        assert_eq!(PMD_SIGNATURE_OFFSET, PMD_DEBIT_OFFSET + ABI_WORD);
        assert_eq!(PMD_RECLAIM_PLAN_OFFSET, PMD_SIGNATURE_OFFSET + SIGNATURE_LENGTH);
    }

    #[test]
    fn withdraw_tag_is_one_word() {
        assert_eq!(WITHDRAW_DOMAIN_TAG.len(), ABI_WORD);
    }
}
