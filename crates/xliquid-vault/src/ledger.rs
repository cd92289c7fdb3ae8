//! Ledger store: the single owner of a vault's financial state.
//!
//! Tracks per-(token, depositor) deposits, per-token totals and committed
//! obligations, per-user claim and withdrawal nonces, the used-claim set and
//! the gas pre-payments of sponsored claims awaiting reconciliation.
//!
//! ```text
//! liquidity(token) = totalDeposits[token] − committed[token]
//! ```
//!
//! Multi-step operations run between [`LedgerStore::checkpoint`] and
//! [`LedgerStore::commit`]. While a checkpoint is open every mutation
//! journals the value it overwrote, and [`LedgerStore::rollback`] restores
//! the exact prior state.

use std::collections::HashMap;
use std::hash::Hash;

use alloy_primitives::{Address, B256, U256};
use xliquid_types::{ClaimHash, CreditSink, RemoteCredit, Result, TransactionId, XliquidError};

use crate::replay::{UsedClaims, signature_key};
use crate::supply_conservation::{SupplyConservation, SupplyFlow};

/// Position in the journal to roll back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a checkpoint must be committed or rolled back"]
pub struct Checkpoint {
    mark: usize,
}

/// Gas pre-paid by a sponsored claim's debit, refundable once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sponsorship {
    pub user: Address,
    pub token: Address,
    pub debit: U256,
}

#[derive(Debug, Clone)]
enum Undo {
    Balance {
        token: Address,
        depositor: Address,
        prev: Option<U256>,
    },
    Total {
        token: Address,
        prev: Option<U256>,
    },
    Committed {
        token: Address,
        prev: Option<U256>,
    },
    ClaimNonce {
        user: Address,
        prev: Option<u64>,
    },
    WithdrawNonce {
        depositor: Address,
        prev: Option<u64>,
    },
    UsedClaim {
        hash: ClaimHash,
        signature_key: B256,
    },
    Supply {
        token: Address,
        flow: SupplyFlow,
        prev: Option<U256>,
    },
    Sponsorship {
        hash: ClaimHash,
        prev: Option<Sponsorship>,
    },
}

fn restore<K: Hash + Eq, V>(map: &mut HashMap<K, V>, key: K, prev: Option<V>) {
    match prev {
        Some(value) => {
            map.insert(key, value);
        }
        None => {
            map.remove(&key);
        }
    }
}

/// Per-vault financial state.
#[derive(Debug, Default)]
pub struct LedgerStore {
    deposits: HashMap<(Address, Address), U256>,
    total_deposits: HashMap<Address, U256>,
    committed: HashMap<Address, U256>,
    claim_nonces: HashMap<Address, u64>,
    withdraw_nonces: HashMap<Address, u64>,
    used: UsedClaims,
    sponsorships: HashMap<ClaimHash, Sponsorship>,
    supply: SupplyConservation,
    journal: Vec<Undo>,
    open: usize,
}

impl LedgerStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    #[must_use]
    pub fn balance(&self, token: Address, depositor: Address) -> U256 {
        self.deposits
            .get(&(token, depositor))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    #[must_use]
    pub fn total_deposits(&self, token: Address) -> U256 {
        self.total_deposits.get(&token).copied().unwrap_or(U256::ZERO)
    }

    /// Credits released by claims and not yet reconciled.
    #[must_use]
    pub fn committed(&self, token: Address) -> U256 {
        self.committed.get(&token).copied().unwrap_or(U256::ZERO)
    }

    /// Pool liquidity available to new claims and withdrawals.
    #[must_use]
    pub fn liquidity(&self, token: Address) -> U256 {
        self.total_deposits(token).saturating_sub(self.committed(token))
    }

    /// Nonce the user's next claim must be signed against.
    #[must_use]
    pub fn next_claim_nonce(&self, user: Address) -> u64 {
        self.claim_nonces.get(&user).copied().unwrap_or(0)
    }

    /// Nonce the depositor's next signed withdrawal must carry.
    #[must_use]
    pub fn next_withdraw_nonce(&self, depositor: Address) -> u64 {
        self.withdraw_nonces.get(&depositor).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn is_claim_consumed(&self, hash: &ClaimHash) -> bool {
        self.used.is_consumed(hash)
    }

    #[must_use]
    pub fn used_claims(&self) -> &UsedClaims {
        &self.used
    }

    /// Outstanding gas pre-payment of a sponsored claim.
    #[must_use]
    pub fn sponsorship(&self, hash: &ClaimHash) -> Option<&Sponsorship> {
        self.sponsorships.get(hash)
    }

    #[must_use]
    pub fn supply(&self) -> &SupplyConservation {
        &self.supply
    }

    // ------------------------------------------------------------------
    // Checkpoints
    // ------------------------------------------------------------------

    /// Open a checkpoint. Checkpoints nest.
    pub fn checkpoint(&mut self) -> Checkpoint {
        self.open += 1;
        Checkpoint {
            mark: self.journal.len(),
        }
    }

    /// Keep every mutation made since `checkpoint`.
    pub fn commit(&mut self, checkpoint: Checkpoint) {
        debug_assert!(checkpoint.mark <= self.journal.len());
        self.close();
    }

    /// Undo every mutation made since `checkpoint`.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        while self.journal.len() > checkpoint.mark {
            if let Some(undo) = self.journal.pop() {
                self.undo(undo);
            }
        }
        self.close();
    }

    /// Run `op` inside a checkpoint, rolling back if it fails.
    pub fn atomically<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let cp = self.checkpoint();
        match op(self) {
            Ok(value) => {
                self.commit(cp);
                Ok(value)
            }
            Err(err) => {
                self.rollback(cp);
                Err(err)
            }
        }
    }

    fn close(&mut self) {
        self.open = self.open.saturating_sub(1);
        if self.open == 0 {
            self.journal.clear();
        }
    }

    fn record(&mut self, undo: Undo) {
        if self.open > 0 {
            self.journal.push(undo);
        }
    }

    fn undo(&mut self, undo: Undo) {
        match undo {
            Undo::Balance {
                token,
                depositor,
                prev,
            } => restore(&mut self.deposits, (token, depositor), prev),
            Undo::Total { token, prev } => restore(&mut self.total_deposits, token, prev),
            Undo::Committed { token, prev } => restore(&mut self.committed, token, prev),
            Undo::ClaimNonce { user, prev } => restore(&mut self.claim_nonces, user, prev),
            Undo::WithdrawNonce { depositor, prev } => {
                restore(&mut self.withdraw_nonces, depositor, prev);
            }
            Undo::UsedClaim {
                hash,
                signature_key,
            } => self.used.release(&hash, &signature_key),
            Undo::Supply { token, flow, prev } => self.supply.restore(token, flow, prev),
            Undo::Sponsorship { hash, prev } => restore(&mut self.sponsorships, hash, prev),
        }
    }

    // ------------------------------------------------------------------
    // Journaled setters
    // ------------------------------------------------------------------

    fn set_balance(&mut self, token: Address, depositor: Address, value: U256) {
        let prev = self.deposits.insert((token, depositor), value);
        self.record(Undo::Balance {
            token,
            depositor,
            prev,
        });
    }

    fn set_total(&mut self, token: Address, value: U256) {
        let prev = self.total_deposits.insert(token, value);
        self.record(Undo::Total { token, prev });
    }

    fn record_flow(&mut self, token: Address, flow: SupplyFlow, amount: U256) -> Result<()> {
        let prev = self.supply.record(token, flow, amount)?;
        self.record(Undo::Supply { token, flow, prev });
        Ok(())
    }

    fn credit(&mut self, token: Address, depositor: Address, amount: U256, flow: SupplyFlow) -> Result<U256> {
        let balance = self
            .balance(token, depositor)
            .checked_add(amount)
            .ok_or(XliquidError::AmountOverflow)?;
        let total = self
            .total_deposits(token)
            .checked_add(amount)
            .ok_or(XliquidError::AmountOverflow)?;
        self.record_flow(token, flow, amount)?;
        self.set_balance(token, depositor, balance);
        self.set_total(token, total);
        Ok(balance)
    }

    fn take(&mut self, token: Address, depositor: Address, amount: U256, flow: SupplyFlow) -> Result<U256> {
        let available = self.balance(token, depositor);
        let balance = available
            .checked_sub(amount)
            .ok_or(XliquidError::InsufficientBalance {
                needed: amount,
                available,
            })?;
        let total = self.total_deposits(token).checked_sub(amount).ok_or_else(|| {
            XliquidError::Internal(format!("totalDeposits for {token} below a member balance"))
        })?;
        self.record_flow(token, flow, amount)?;
        self.set_balance(token, depositor, balance);
        self.set_total(token, total);
        Ok(balance)
    }

    // ------------------------------------------------------------------
    // Deposits and withdrawals
    // ------------------------------------------------------------------

    /// Add `amount` to the depositor's balance. Returns the new balance.
    ///
    /// # Errors
    /// `ZeroAmount` or `AmountOverflow`.
    pub fn deposit(&mut self, token: Address, depositor: Address, amount: U256) -> Result<U256> {
        if amount.is_zero() {
            return Err(XliquidError::ZeroAmount);
        }
        self.credit(token, depositor, amount, SupplyFlow::Deposit)
    }

    /// Remove `amount` from the depositor's balance. Returns the new balance.
    ///
    /// # Errors
    /// - `ZeroAmount`
    /// - `InsufficientBalance` if the depositor holds less than `amount`
    /// - `InsufficientLiquidity` if the pool would drop below committed credits
    pub fn withdraw(&mut self, token: Address, depositor: Address, amount: U256) -> Result<U256> {
        if amount.is_zero() {
            return Err(XliquidError::ZeroAmount);
        }
        let available = self.balance(token, depositor);
        if available < amount {
            return Err(XliquidError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        let liquidity = self.liquidity(token);
        if liquidity < amount {
            return Err(XliquidError::InsufficientLiquidity {
                token,
                needed: amount,
                available: liquidity,
            });
        }
        self.take(token, depositor, amount, SupplyFlow::Withdrawal)
    }

    // ------------------------------------------------------------------
    // Claims
    // ------------------------------------------------------------------

    /// Take a claim's debit from the user's own deposit.
    ///
    /// # Errors
    /// `InsufficientBalance` if the user's deposit is short.
    pub fn debit_claim(&mut self, token: Address, user: Address, amount: U256) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }
        self.take(token, user, amount, SupplyFlow::ClaimDebit)?;
        Ok(())
    }

    /// Release `amount` of pool liquidity as a committed obligation.
    ///
    /// # Errors
    /// `InsufficientLiquidity` if the pool cannot cover it.
    pub fn commit_credit(&mut self, token: Address, amount: U256) -> Result<()> {
        let liquidity = self.liquidity(token);
        if liquidity < amount {
            return Err(XliquidError::InsufficientLiquidity {
                token,
                needed: amount,
                available: liquidity,
            });
        }
        let committed = self
            .committed(token)
            .checked_add(amount)
            .ok_or(XliquidError::AmountOverflow)?;
        let prev = self.committed.insert(token, committed);
        self.record(Undo::Committed { token, prev });
        Ok(())
    }

    /// Hold a sponsored claim's debit until its gas cost is known.
    ///
    /// # Errors
    /// `ReplayedClaim` if the claim already has a sponsorship on record.
    pub fn open_sponsorship(&mut self, hash: ClaimHash, sponsorship: Sponsorship) -> Result<()> {
        if self.sponsorships.contains_key(&hash) {
            return Err(XliquidError::ReplayedClaim(hash));
        }
        let prev = self.sponsorships.insert(hash, sponsorship);
        self.record(Undo::Sponsorship { hash, prev });
        Ok(())
    }

    /// Close a sponsorship, refunding `debit − actual_gas_cost` to the user.
    /// Returns the closed record and the refund.
    ///
    /// # Errors
    /// - `UnknownSponsorship` if nothing is outstanding for `hash`
    /// - `GasCostExceedsAuthorization` if the cost exceeds the debit; the
    ///   sponsorship stays open
    pub fn settle_sponsorship(&mut self, hash: ClaimHash, actual_gas_cost: U256) -> Result<(Sponsorship, U256)> {
        let sponsorship = *self
            .sponsorships
            .get(&hash)
            .ok_or(XliquidError::UnknownSponsorship(hash))?;
        let refund = sponsorship
            .debit
            .checked_sub(actual_gas_cost)
            .ok_or(XliquidError::GasCostExceedsAuthorization {
                actual: actual_gas_cost,
                authorized: sponsorship.debit,
            })?;
        self.atomically(|ledger| {
            let prev = ledger.sponsorships.remove(&hash);
            ledger.record(Undo::Sponsorship { hash, prev });
            if !refund.is_zero() {
                ledger.credit(sponsorship.token, sponsorship.user, refund, SupplyFlow::Refund)?;
            }
            Ok(())
        })?;
        Ok((sponsorship, refund))
    }

    /// Fail if `signature` already authorized a consumed claim.
    pub fn check_replay(&self, signature: &[u8]) -> Result<()> {
        self.used.check_signature(signature)
    }

    /// Mark a claim consumed.
    ///
    /// # Errors
    /// `ReplayedClaim` if it was consumed before.
    pub fn consume_claim(&mut self, hash: ClaimHash, signature: &[u8]) -> Result<()> {
        self.used.consume(hash, signature)?;
        self.record(Undo::UsedClaim {
            hash,
            signature_key: signature_key(signature),
        });
        Ok(())
    }

    /// Move the user's claim nonce forward. Returns the new value.
    pub fn advance_claim_nonce(&mut self, user: Address) -> u64 {
        let next = self.next_claim_nonce(user) + 1;
        let prev = self.claim_nonces.insert(user, next);
        self.record(Undo::ClaimNonce { user, prev });
        next
    }

    /// Move the depositor's withdrawal nonce forward. Returns the new value.
    pub fn advance_withdraw_nonce(&mut self, depositor: Address) -> u64 {
        let next = self.next_withdraw_nonce(depositor) + 1;
        let prev = self.withdraw_nonces.insert(depositor, next);
        self.record(Undo::WithdrawNonce { depositor, prev });
        next
    }

    // ------------------------------------------------------------------
    // Invariants
    // ------------------------------------------------------------------

    /// Verify supply conservation for `token`.
    ///
    /// # Errors
    /// `SupplyInvariantViolation` on any mismatch.
    pub fn verify_supply(&self, token: Address) -> Result<()> {
        let balance_sum = self
            .deposits
            .iter()
            .filter(|((t, _), _)| *t == token)
            .fold(U256::ZERO, |acc, (_, amount)| acc.saturating_add(*amount));
        self.supply.verify(
            token,
            balance_sum,
            self.total_deposits(token),
            self.committed(token),
        )
    }

    /// Verify supply conservation for every token the ledger has seen.
    pub fn verify_all_supply(&self) -> Result<()> {
        self.supply
            .tracked_tokens()
            .into_iter()
            .try_for_each(|token| self.verify_supply(token))
    }
}

impl CreditSink for LedgerStore {
    fn apply_remote_credits(&mut self, transaction_id: TransactionId, credits: &[RemoteCredit]) -> Result<()> {
        self.atomically(|ledger| {
            for c in credits {
                ledger.credit(c.token, c.recipient, c.amount, SupplyFlow::RemoteCredit)?;
            }
            Ok(())
        })?;
        tracing::debug!(
            tx = %transaction_id.short(),
            credits = credits.len(),
            "Remote credits applied to ledger"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USDC: Address = Address::repeat_byte(0xaa);
    const ALICE: Address = Address::repeat_byte(0x01);
    const BOB: Address = Address::repeat_byte(0x02);

    fn amt(n: u64) -> U256 {
        U256::from(n)
    }

    fn funded() -> LedgerStore {
        let mut ledger = LedgerStore::new();
        ledger.deposit(USDC, ALICE, amt(1000)).unwrap();
        ledger
    }

    #[test]
    fn deposit_increases_balance_and_total() {
        let mut ledger = funded();
        ledger.deposit(USDC, BOB, amt(500)).unwrap();
        assert_eq!(ledger.balance(USDC, ALICE), amt(1000));
        assert_eq!(ledger.total_deposits(USDC), amt(1500));
        assert_eq!(ledger.liquidity(USDC), amt(1500));
        ledger.verify_supply(USDC).unwrap();
    }

    #[test]
    fn zero_deposit_rejected() {
        let mut ledger = LedgerStore::new();
        assert_eq!(ledger.deposit(USDC, ALICE, U256::ZERO), Err(XliquidError::ZeroAmount));
    }

    #[test]
    fn deposit_overflow_rejected() {
        let mut ledger = LedgerStore::new();
        ledger.deposit(USDC, ALICE, U256::MAX).unwrap();
        let err = ledger.deposit(USDC, BOB, amt(1)).unwrap_err();
        assert_eq!(err, XliquidError::AmountOverflow);
        assert_eq!(ledger.balance(USDC, BOB), U256::ZERO);
        ledger.verify_supply(USDC).unwrap();
    }

    #[test]
    fn withdraw_insufficient_balance() {
        let mut ledger = funded();
        let err = ledger.withdraw(USDC, ALICE, amt(1001)).unwrap_err();
        assert!(matches!(err, XliquidError::InsufficientBalance { .. }));
        assert_eq!(ledger.balance(USDC, ALICE), amt(1000));
    }

    #[test]
    fn withdraw_cannot_undercut_committed_credit() {
        let mut ledger = funded();
        ledger.commit_credit(USDC, amt(900)).unwrap();
        assert_eq!(ledger.liquidity(USDC), amt(100));
        let err = ledger.withdraw(USDC, ALICE, amt(101)).unwrap_err();
        assert!(matches!(
            err,
            XliquidError::InsufficientLiquidity { available, .. } if available == amt(100)
        ));
        ledger.withdraw(USDC, ALICE, amt(100)).unwrap();
        assert_eq!(ledger.liquidity(USDC), U256::ZERO);
        ledger.verify_supply(USDC).unwrap();
    }

    #[test]
    fn commit_credit_bounded_by_liquidity() {
        let mut ledger = funded();
        ledger.commit_credit(USDC, amt(100)).unwrap();
        assert_eq!(ledger.liquidity(USDC), amt(900));
        assert!(ledger.commit_credit(USDC, amt(901)).is_err());
        assert_eq!(ledger.committed(USDC), amt(100));
    }

    #[test]
    fn debit_claim_reduces_user_deposit() {
        let mut ledger = funded();
        ledger.debit_claim(USDC, ALICE, amt(40)).unwrap();
        assert_eq!(ledger.balance(USDC, ALICE), amt(960));
        assert_eq!(ledger.total_deposits(USDC), amt(960));
        let err = ledger.debit_claim(USDC, BOB, amt(1)).unwrap_err();
        assert!(matches!(err, XliquidError::InsufficientBalance { .. }));
        ledger.verify_supply(USDC).unwrap();
    }

    #[test]
    fn rollback_restores_exact_state() {
        let mut ledger = funded();
        let cp = ledger.checkpoint();
        ledger.consume_claim(ClaimHash(B256::repeat_byte(1)), &[1u8; 65]).unwrap();
        ledger.advance_claim_nonce(ALICE);
        ledger.debit_claim(USDC, ALICE, amt(10)).unwrap();
        ledger.commit_credit(USDC, amt(100)).unwrap();
        ledger.deposit(USDC, BOB, amt(7)).unwrap();
        ledger.rollback(cp);

        assert_eq!(ledger.balance(USDC, ALICE), amt(1000));
        assert_eq!(ledger.balance(USDC, BOB), U256::ZERO);
        assert_eq!(ledger.total_deposits(USDC), amt(1000));
        assert_eq!(ledger.committed(USDC), U256::ZERO);
        assert_eq!(ledger.next_claim_nonce(ALICE), 0);
        assert!(ledger.used_claims().is_empty());
        ledger.verify_supply(USDC).unwrap();
    }

    #[test]
    fn commit_keeps_changes_and_clears_journal() {
        let mut ledger = funded();
        let cp = ledger.checkpoint();
        ledger.advance_withdraw_nonce(ALICE);
        ledger.commit(cp);
        assert_eq!(ledger.next_withdraw_nonce(ALICE), 1);
        assert!(ledger.journal.is_empty());
    }

    #[test]
    fn nested_rollback_only_undoes_inner() {
        let mut ledger = funded();
        let outer = ledger.checkpoint();
        ledger.deposit(USDC, BOB, amt(1)).unwrap();
        let inner = ledger.checkpoint();
        ledger.deposit(USDC, BOB, amt(2)).unwrap();
        ledger.rollback(inner);
        assert_eq!(ledger.balance(USDC, BOB), amt(1));
        ledger.rollback(outer);
        assert_eq!(ledger.balance(USDC, BOB), U256::ZERO);
    }

    #[test]
    fn remote_credits_all_or_nothing() {
        let mut ledger = LedgerStore::new();
        ledger.deposit(USDC, ALICE, U256::MAX - amt(5)).unwrap();
        let tx = TransactionId(B256::repeat_byte(9));
        let credits = [
            RemoteCredit {
                token: USDC,
                recipient: BOB,
                amount: amt(5),
            },
            RemoteCredit {
                token: USDC,
                recipient: BOB,
                amount: amt(1),
            },
        ];
        assert_eq!(
            ledger.apply_remote_credits(tx, &credits),
            Err(XliquidError::AmountOverflow)
        );
        assert_eq!(ledger.balance(USDC, BOB), U256::ZERO);

        ledger.apply_remote_credits(tx, &credits[..1]).unwrap();
        assert_eq!(ledger.balance(USDC, BOB), amt(5));
        ledger.verify_supply(USDC).unwrap();
    }

    fn sponsored(ledger: &mut LedgerStore, debit: u64) -> ClaimHash {
        let hash = ClaimHash(B256::repeat_byte(4));
        ledger.debit_claim(USDC, ALICE, amt(debit)).unwrap();
        ledger
            .open_sponsorship(
                hash,
                Sponsorship {
                    user: ALICE,
                    token: USDC,
                    debit: amt(debit),
                },
            )
            .unwrap();
        hash
    }

    #[test]
    fn sponsorship_refunds_once() {
        let mut ledger = funded();
        let hash = sponsored(&mut ledger, 50);

        let (closed, refund) = ledger.settle_sponsorship(hash, amt(30)).unwrap();
        assert_eq!((closed.user, refund), (ALICE, amt(20)));
        assert_eq!(ledger.balance(USDC, ALICE), amt(970));
        assert!(ledger.sponsorship(&hash).is_none());

        assert_eq!(
            ledger.settle_sponsorship(hash, U256::ZERO),
            Err(XliquidError::UnknownSponsorship(hash))
        );
        assert_eq!(ledger.balance(USDC, ALICE), amt(970));
        ledger.verify_all_supply().unwrap();
    }

    #[test]
    fn sponsorship_overrun_keeps_it_open() {
        let mut ledger = funded();
        let hash = sponsored(&mut ledger, 50);
        assert!(matches!(
            ledger.settle_sponsorship(hash, amt(51)),
            Err(XliquidError::GasCostExceedsAuthorization { .. })
        ));
        assert_eq!(ledger.sponsorship(&hash).map(|s| s.debit), Some(amt(50)));
        assert_eq!(ledger.settle_sponsorship(hash, amt(50)).unwrap().1, U256::ZERO);
        assert_eq!(ledger.balance(USDC, ALICE), amt(950));
    }

    #[test]
    fn rolled_back_sponsorship_disappears() {
        let mut ledger = funded();
        let cp = ledger.checkpoint();
        let hash = sponsored(&mut ledger, 10);
        ledger.rollback(cp);
        assert!(ledger.sponsorship(&hash).is_none());
        assert_eq!(ledger.balance(USDC, ALICE), amt(1000));
    }

    #[test]
    fn nonces_are_monotonic() {
        let mut ledger = LedgerStore::new();
        assert_eq!(ledger.next_claim_nonce(ALICE), 0);
        assert_eq!(ledger.advance_claim_nonce(ALICE), 1);
        assert_eq!(ledger.advance_claim_nonce(ALICE), 2);
        assert_eq!(ledger.next_claim_nonce(BOB), 0);
    }
}
