//! Minimal Solidity ABI word encoding.
//!
//! Only static types are needed: every value occupies one 32-byte word,
//! addresses are left-padded with 12 zero bytes and integers are big-endian.
//! Claim hashes, transaction ids and reclaim plans are all built from these
//! words so signer and verifier share one byte layout.

use alloy_primitives::{Address, B256, U256};

use crate::constants::ABI_WORD;

/// Append-only ABI word buffer.
#[derive(Debug, Default, Clone)]
pub struct AbiWriter {
    buf: Vec<u8>,
}

impl AbiWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_words(words: usize) -> Self {
        Self {
            buf: Vec::with_capacity(words * ABI_WORD),
        }
    }

    pub fn address(&mut self, value: Address) -> &mut Self {
        self.buf.extend_from_slice(value.into_word().as_slice());
        self
    }

    pub fn uint(&mut self, value: U256) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes::<32>());
        self
    }

    pub fn uint64(&mut self, value: u64) -> &mut Self {
        self.uint(U256::from(value))
    }

    pub fn bytes32(&mut self, value: B256) -> &mut Self {
        self.buf.extend_from_slice(value.as_slice());
        self
    }

    /// Raw, already word-aligned bytes.
    pub fn raw_word(&mut self, word: &[u8; 32]) -> &mut Self {
        self.buf.extend_from_slice(word);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Read word `index` from `bytes`. Returns `None` when out of range.
#[must_use]
pub fn word(bytes: &[u8], index: usize) -> Option<&[u8; 32]> {
    let start = index.checked_mul(ABI_WORD)?;
    let end = start.checked_add(ABI_WORD)?;
    bytes.get(start..end)?.try_into().ok()
}

/// Decode an address word. Rejects non-zero padding.
#[must_use]
pub fn word_to_address(word: &[u8; 32]) -> Option<Address> {
    if word[..12].iter().any(|b| *b != 0) {
        return None;
    }
    Some(Address::from_slice(&word[12..]))
}

#[must_use]
pub fn word_to_uint(word: &[u8; 32]) -> U256 {
    U256::from_be_bytes(*word)
}

/// Decode a uint word that must fit in `u64`.
#[must_use]
pub fn word_to_u64(word: &[u8; 32]) -> Option<u64> {
    if word[..24].iter().any(|b| *b != 0) {
        return None;
    }
    let mut tail = [0u8; 8];
    tail.copy_from_slice(&word[24..]);
    Some(u64::from_be_bytes(tail))
}
