//! # Reclaim plans
//!
//! A reclaim plan is the ordered list of cross-chain repayment obligations
//! attached to a claim: "the liquidity released here is repaid by crediting
//! `amount` of `token` to `solver` (or `user`) on `chain_id`".
//!
//! ## Wire format
//!
//! The plan is the Solidity ABI encoding of a single dynamic parameter
//! `(uint256,address,uint256,address,address)[]`:
//!
//! ```text
//!   offset (= 0x20) | count | entry[0] | entry[1] | ... | entry[count-1]
//!        32 bytes     32 B     160 B      160 B
//! ```
//!
//! Every entry is five static words, so the total length is always
//! `64 + 160 * count`. Decoding rejects anything else.

use alloy_primitives::{Address, U256, keccak256};
use serde::{Deserialize, Serialize};

use crate::abi::{self, AbiWriter};
use crate::constants::{
    ABI_WORD, MAX_RECLAIM_ENTRIES, RECLAIM_ENTRY_SIZE, RECLAIM_ENTRY_WORDS, RECLAIM_PLAN_HEAD_SIZE,
};
use crate::{ChainId, Result, XliquidError};

/// One repayment obligation on a remote chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReclaimEntry {
    /// Chain on which the obligation is settled.
    pub chain_id: ChainId,
    /// Token credited on the remote chain.
    pub token: Address,
    /// Amount credited.
    pub amount: U256,
    /// Liquidity provider being repaid.
    pub solver: Address,
    /// User the obligation belongs to.
    pub user: Address,
}

impl ReclaimEntry {
    /// The remote account that receives the credit: the solver, or the user
    /// when no solver is named.
    #[must_use]
    pub fn recipient(&self) -> Address {
        if self.solver.is_zero() {
            self.user
        } else {
            self.solver
        }
    }

    fn write(&self, w: &mut AbiWriter) {
        w.uint64(self.chain_id.0)
            .address(self.token)
            .uint(self.amount)
            .address(self.solver)
            .address(self.user);
    }

    fn read(bytes: &[u8], index: usize) -> Result<Self> {
        let base = RECLAIM_PLAN_HEAD_SIZE / ABI_WORD + index * RECLAIM_ENTRY_WORDS;
        let at = |i: usize| {
            abi::word(bytes, base + i)
                .ok_or_else(|| XliquidError::malformed_plan(format!("entry {index} truncated")))
        };
        let address = |i: usize, field: &str| -> Result<Address> {
            abi::word_to_address(at(i)?).ok_or_else(|| {
                XliquidError::malformed_plan(format!("entry {index}: dirty {field} padding"))
            })
        };

        let chain_id = abi::word_to_u64(at(0)?).ok_or_else(|| {
            XliquidError::malformed_plan(format!("entry {index}: chain id exceeds u64"))
        })?;

        Ok(Self {
            chain_id: ChainId(chain_id),
            token: address(1, "token")?,
            amount: abi::word_to_uint(at(2)?),
            solver: address(3, "solver")?,
            user: address(4, "user")?,
        })
    }
}

/// Ordered, non-empty list of [`ReclaimEntry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ReclaimEntry>", into = "Vec<ReclaimEntry>")]
pub struct ReclaimPlan {
    entries: Vec<ReclaimEntry>,
}

impl ReclaimPlan {
    /// Build a plan.
    ///
    /// # Errors
    /// - `EmptyPlan` if `entries` is empty
    /// - `MalformedPlan` if it exceeds [`MAX_RECLAIM_ENTRIES`]
    pub fn new(entries: Vec<ReclaimEntry>) -> Result<Self> {
        if entries.is_empty() {
            return Err(XliquidError::EmptyPlan);
        }
        if entries.len() > MAX_RECLAIM_ENTRIES {
            return Err(XliquidError::malformed_plan(format!(
                "{} entries exceeds maximum of {MAX_RECLAIM_ENTRIES}",
                entries.len()
            )));
        }
        Ok(Self { entries })
    }

    #[must_use]
    pub fn entries(&self) -> &[ReclaimEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false`; plans are non-empty by construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Canonical ABI bytes of this plan.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = AbiWriter::with_words(2 + self.entries.len() * RECLAIM_ENTRY_WORDS);
        w.uint64(ABI_WORD as u64).uint64(self.entries.len() as u64);
        for entry in &self.entries {
            entry.write(&mut w);
        }
        w.finish()
    }

    /// `keccak256` of the canonical bytes, as committed to by claim hashes.
    #[must_use]
    pub fn hash(&self) -> alloy_primitives::B256 {
        keccak256(self.to_bytes())
    }

    /// Distinct chains in first-appearance order.
    #[must_use]
    pub fn chains(&self) -> Vec<ChainId> {
        let mut chains: Vec<ChainId> = Vec::new();
        for entry in &self.entries {
            if !chains.contains(&entry.chain_id) {
                chains.push(entry.chain_id);
            }
        }
        chains
    }

    /// Entries for `chain`, preserving plan order.
    pub fn entries_for(&self, chain: ChainId) -> impl Iterator<Item = &ReclaimEntry> {
        self.entries.iter().filter(move |e| e.chain_id == chain)
    }
}

impl TryFrom<Vec<ReclaimEntry>> for ReclaimPlan {
    type Error = XliquidError;

    fn try_from(entries: Vec<ReclaimEntry>) -> Result<Self> {
        Self::new(entries)
    }
}

impl From<ReclaimPlan> for Vec<ReclaimEntry> {
    fn from(plan: ReclaimPlan) -> Self {
        plan.entries
    }
}

/// Encode reclaim entries into canonical bytes.
///
/// # Errors
/// Returns `EmptyPlan` if `entries` is empty.
pub fn encode(entries: &[ReclaimEntry]) -> Result<Vec<u8>> {
    Ok(ReclaimPlan::new(entries.to_vec())?.to_bytes())
}

/// Decode canonical reclaim plan bytes.
///
/// # Errors
/// - `MalformedPlan` if the length does not match `64 + 160 * count`, the
///   offset word is not `0x20`, or any word carries non-canonical padding
/// - `EmptyPlan` if the declared count is zero
pub fn decode(bytes: &[u8]) -> Result<ReclaimPlan> {
    if bytes.len() < RECLAIM_PLAN_HEAD_SIZE {
        return Err(XliquidError::malformed_plan(format!(
            "{} bytes is shorter than the {RECLAIM_PLAN_HEAD_SIZE}-byte head",
            bytes.len()
        )));
    }

    let offset = abi::word(bytes, 0)
        .and_then(abi::word_to_u64)
        .ok_or_else(|| XliquidError::malformed_plan("offset word out of range"))?;
    if offset != ABI_WORD as u64 {
        return Err(XliquidError::malformed_plan(format!(
            "array offset {offset}, expected {ABI_WORD}"
        )));
    }

    let count = abi::word(bytes, 1)
        .and_then(abi::word_to_u64)
        .and_then(|c| usize::try_from(c).ok())
        .ok_or_else(|| XliquidError::malformed_plan("count word out of range"))?;
    if count == 0 {
        return Err(XliquidError::EmptyPlan);
    }
    if count > MAX_RECLAIM_ENTRIES {
        return Err(XliquidError::malformed_plan(format!(
            "{count} entries exceeds maximum of {MAX_RECLAIM_ENTRIES}"
        )));
    }

    let expected = RECLAIM_PLAN_HEAD_SIZE + count * RECLAIM_ENTRY_SIZE;
    if bytes.len() != expected {
        return Err(XliquidError::malformed_plan(format!(
            "length {} does not match {expected} for {count} entries",
            bytes.len()
        )));
    }

    let entries = (0..count)
        .map(|i| ReclaimEntry::read(bytes, i))
        .collect::<Result<Vec<_>>>()?;
    ReclaimPlan::new(entries)
}
