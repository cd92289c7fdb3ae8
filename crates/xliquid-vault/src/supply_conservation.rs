//! Supply conservation invariant checker.
//!
//! Invariant enforced by [`crate::LedgerStore::verify_supply`]:
//! ```text
//! ∀ token: Σ deposits[token][*] == totalDeposits[token]
//!                               == in(deposit + remote credit + refund)
//!                                  − out(withdrawal + claim debit)
//! ∀ token: committed[token] <= totalDeposits[token]
//! ∀ token: Σ refund[token] <= Σ claim debit[token]
//! ```
//!
//! Refunds only ever return part of a sponsored debit, so more refunded than
//! debited means value was minted through the refund path.
//!
//! A violation means the ledger minted or destroyed value outside the
//! recorded flows.

use std::collections::{HashMap, HashSet};
use std::fmt;

use alloy_primitives::{Address, U256};
use xliquid_types::{Result, XliquidError};

/// A ledger flow that changes the supply of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupplyFlow {
    Deposit,
    Withdrawal,
    ClaimDebit,
    RemoteCredit,
    Refund,
}

impl SupplyFlow {
    /// Whether the flow adds to supply.
    #[must_use]
    pub fn is_inflow(self) -> bool {
        matches!(self, Self::Deposit | Self::RemoteCredit | Self::Refund)
    }
}

impl fmt::Display for SupplyFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deposit => write!(f, "deposit"),
            Self::Withdrawal => write!(f, "withdrawal"),
            Self::ClaimDebit => write!(f, "claim_debit"),
            Self::RemoteCredit => write!(f, "remote_credit"),
            Self::Refund => write!(f, "refund"),
        }
    }
}

/// Cumulative per-token flow totals since genesis.
#[derive(Debug, Default, Clone)]
pub struct SupplyConservation {
    flows: HashMap<(Address, SupplyFlow), U256>,
}

impl SupplyConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` to a flow. Returns the previous total for journaling.
    ///
    /// # Errors
    /// Returns [`XliquidError::AmountOverflow`] if the total would exceed `U256::MAX`.
    pub fn record(&mut self, token: Address, flow: SupplyFlow, amount: U256) -> Result<Option<U256>> {
        let prev = self.flows.get(&(token, flow)).copied();
        let next = prev
            .unwrap_or(U256::ZERO)
            .checked_add(amount)
            .ok_or(XliquidError::AmountOverflow)?;
        self.flows.insert((token, flow), next);
        Ok(prev)
    }

    pub(crate) fn restore(&mut self, token: Address, flow: SupplyFlow, prev: Option<U256>) {
        match prev {
            Some(value) => self.flows.insert((token, flow), value),
            None => self.flows.remove(&(token, flow)),
        };
    }

    /// Cumulative total of one flow.
    #[must_use]
    pub fn total(&self, token: Address, flow: SupplyFlow) -> U256 {
        self.flows.get(&(token, flow)).copied().unwrap_or(U256::ZERO)
    }

    /// Expected supply: inflows − outflows.
    ///
    /// # Errors
    /// Returns [`XliquidError::SupplyInvariantViolation`] if outflows exceed inflows.
    pub fn expected_supply(&self, token: Address) -> Result<U256> {
        let (inflow, outflow) = self
            .flows
            .iter()
            .filter(|((t, _), _)| *t == token)
            .fold((U256::ZERO, U256::ZERO), |(i, o), ((_, flow), amount)| {
                if flow.is_inflow() {
                    (i.saturating_add(*amount), o)
                } else {
                    (i, o.saturating_add(*amount))
                }
            });
        inflow
            .checked_sub(outflow)
            .ok_or_else(|| XliquidError::SupplyInvariantViolation {
                reason: format!("token {token}: outflows {outflow} exceed inflows {inflow}"),
            })
    }

    /// Check the ledger's figures for `token` against the recorded flows.
    ///
    /// # Errors
    /// Returns [`XliquidError::SupplyInvariantViolation`] on any mismatch.
    pub fn verify(&self, token: Address, balance_sum: U256, total_deposits: U256, committed: U256) -> Result<()> {
        let expected = self.expected_supply(token)?;
        if balance_sum != total_deposits {
            return Err(XliquidError::SupplyInvariantViolation {
                reason: format!(
                    "token {token}: balances sum to {balance_sum} but totalDeposits is {total_deposits}"
                ),
            });
        }
        if total_deposits != expected {
            return Err(XliquidError::SupplyInvariantViolation {
                reason: format!(
                    "token {token}: totalDeposits {total_deposits} != expected {expected} \
                     (deposits={}, remote_credits={}, refunds={}, withdrawals={}, debits={})",
                    self.total(token, SupplyFlow::Deposit),
                    self.total(token, SupplyFlow::RemoteCredit),
                    self.total(token, SupplyFlow::Refund),
                    self.total(token, SupplyFlow::Withdrawal),
                    self.total(token, SupplyFlow::ClaimDebit),
                ),
            });
        }
        let refunds = self.total(token, SupplyFlow::Refund);
        let debits = self.total(token, SupplyFlow::ClaimDebit);
        if refunds > debits {
            return Err(XliquidError::SupplyInvariantViolation {
                reason: format!("token {token}: refunds {refunds} exceed claim debits {debits}"),
            });
        }
        if committed > total_deposits {
            return Err(XliquidError::SupplyInvariantViolation {
                reason: format!(
                    "token {token}: committed {committed} exceeds totalDeposits {total_deposits}"
                ),
            });
        }
        Ok(())
    }

    /// Every token with at least one recorded flow.
    #[must_use]
    pub fn tracked_tokens(&self) -> Vec<Address> {
        let tokens: HashSet<Address> = self.flows.keys().map(|(t, _)| *t).collect();
        tokens.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USDC: Address = Address::repeat_byte(0xaa);
    const WETH: Address = Address::repeat_byte(0xbb);

    fn amt(n: u64) -> U256 {
        U256::from(n)
    }

    #[test]
    fn empty_supply_is_zero() {
        let sc = SupplyConservation::new();
        assert_eq!(sc.expected_supply(USDC).unwrap(), U256::ZERO);
        assert!(sc.verify(USDC, U256::ZERO, U256::ZERO, U256::ZERO).is_ok());
    }

    #[test]
    fn inflows_and_outflows_net_out() {
        let mut sc = SupplyConservation::new();
        sc.record(USDC, SupplyFlow::Deposit, amt(1000)).unwrap();
        sc.record(USDC, SupplyFlow::RemoteCredit, amt(50)).unwrap();
        sc.record(USDC, SupplyFlow::Withdrawal, amt(300)).unwrap();
        sc.record(USDC, SupplyFlow::ClaimDebit, amt(20)).unwrap();
        sc.record(USDC, SupplyFlow::Refund, amt(5)).unwrap();
        assert_eq!(sc.expected_supply(USDC).unwrap(), amt(735));
    }

    #[test]
    fn verify_fails_when_imbalanced() {
        let mut sc = SupplyConservation::new();
        sc.record(USDC, SupplyFlow::Deposit, amt(10)).unwrap();
        let err = sc.verify(USDC, amt(11), amt(11), U256::ZERO).unwrap_err();
        assert!(matches!(err, XliquidError::SupplyInvariantViolation { .. }));
    }

    #[test]
    fn verify_fails_when_balances_disagree_with_total() {
        let mut sc = SupplyConservation::new();
        sc.record(USDC, SupplyFlow::Deposit, amt(10)).unwrap();
        assert!(sc.verify(USDC, amt(9), amt(10), U256::ZERO).is_err());
    }

    #[test]
    fn verify_fails_when_overcommitted() {
        let mut sc = SupplyConservation::new();
        sc.record(USDC, SupplyFlow::Deposit, amt(10)).unwrap();
        assert!(sc.verify(USDC, amt(10), amt(10), amt(10)).is_ok());
        assert!(sc.verify(USDC, amt(10), amt(10), amt(11)).is_err());
    }

    #[test]
    fn verify_fails_when_refunds_exceed_debits() {
        let mut sc = SupplyConservation::new();
        sc.record(USDC, SupplyFlow::Deposit, amt(1000)).unwrap();
        sc.record(USDC, SupplyFlow::ClaimDebit, amt(300)).unwrap();
        sc.record(USDC, SupplyFlow::Refund, amt(300)).unwrap();
        assert!(sc.verify(USDC, amt(1000), amt(1000), U256::ZERO).is_ok());

        sc.record(USDC, SupplyFlow::Refund, amt(300)).unwrap();
        let err = sc.verify(USDC, amt(1300), amt(1300), U256::ZERO).unwrap_err();
        assert!(matches!(
            err,
            XliquidError::SupplyInvariantViolation { ref reason } if reason.contains("refunds")
        ));
    }

    #[test]
    fn restore_rewinds_a_flow() {
        let mut sc = SupplyConservation::new();
        let prev = sc.record(WETH, SupplyFlow::Deposit, amt(5)).unwrap();
        assert_eq!(prev, None);
        let prev = sc.record(WETH, SupplyFlow::Deposit, amt(5)).unwrap();
        sc.restore(WETH, SupplyFlow::Deposit, prev);
        assert_eq!(sc.total(WETH, SupplyFlow::Deposit), amt(5));
    }

    #[test]
    fn tokens_tracked_independently() {
        let mut sc = SupplyConservation::new();
        sc.record(USDC, SupplyFlow::Deposit, amt(5)).unwrap();
        sc.record(WETH, SupplyFlow::Deposit, amt(7)).unwrap();
        assert_eq!(sc.expected_supply(USDC).unwrap(), amt(5));
        assert_eq!(sc.expected_supply(WETH).unwrap(), amt(7));
        assert_eq!(sc.tracked_tokens().len(), 2);
    }
}
