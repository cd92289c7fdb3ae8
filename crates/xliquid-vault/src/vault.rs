//! The vault: deposits, withdrawals and signed claims on one chain.
//!
//! ## Claim flow
//!
//! ```text
//! Received ──(replay + signature + window)──▶ Verified
//!          ──(debit user, commit credit)───▶ LiquidityChecked
//!          ──(consume hash, advance nonce)─▶ Committed
//!          ──(Settlement::dispatch)────────▶ SettlementDispatched
//! ```
//!
//! Everything from the debit onwards runs inside one ledger checkpoint. A
//! failure at any stage, including the bridge refusing a message, rolls the
//! ledger back to exactly where it was.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use xliquid_types::{
    ChainId, ClaimAuthorization, ClaimHash, ClaimReceipt, ClaimStage, Clock, InboundOutcome,
    MessageId, Result, Settlement, SharedPolicy, SignatureAuthorizer, TransactionId, VaultConfig,
    WithdrawAuthorization, WithdrawRequest, XliquidError, check_validity_window, transaction_id,
};

use crate::ledger::{LedgerStore, Sponsorship};

/// A pooled-deposit vault unlocked by manager-signed claims.
pub struct Vault<S> {
    config: VaultConfig,
    policy: SharedPolicy,
    ledger: LedgerStore,
    settlement: S,
    clock: Arc<dyn Clock>,
}

impl<S: Settlement> Vault<S> {
    pub fn new(config: VaultConfig, policy: SharedPolicy, settlement: S, clock: Arc<dyn Clock>) -> Self {
        tracing::info!(
            vault = %config.address,
            chain = %config.chain_id,
            "Vault initialized"
        );
        Self {
            config,
            policy,
            ledger: LedgerStore::new(),
            settlement,
            clock,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    #[must_use]
    pub fn address(&self) -> Address {
        self.config.address
    }

    #[must_use]
    pub fn chain_id(&self) -> ChainId {
        self.config.chain_id
    }

    #[must_use]
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    #[must_use]
    pub fn policy(&self) -> &SharedPolicy {
        &self.policy
    }

    #[must_use]
    pub fn ledger(&self) -> &LedgerStore {
        &self.ledger
    }

    #[must_use]
    pub fn settlement(&self) -> &S {
        &self.settlement
    }

    pub fn settlement_mut(&mut self) -> &mut S {
        &mut self.settlement
    }

    #[must_use]
    pub fn balance(&self, token: Address, depositor: Address) -> U256 {
        self.ledger.balance(token, depositor)
    }

    #[must_use]
    pub fn liquidity(&self, token: Address) -> U256 {
        self.ledger.liquidity(token)
    }

    #[must_use]
    pub fn next_claim_nonce(&self, user: Address) -> u64 {
        self.ledger.next_claim_nonce(user)
    }

    #[must_use]
    pub fn next_withdraw_nonce(&self, depositor: Address) -> u64 {
        self.ledger.next_withdraw_nonce(depositor)
    }

    #[must_use]
    pub fn is_vault_manager(&self, address: Address) -> bool {
        self.policy.read().is_vault_manager(address)
    }

    // ------------------------------------------------------------------
    // Governance
    // ------------------------------------------------------------------

    /// Owner-only. Returns `true` if the manager was newly added.
    pub fn add_vault_manager(&self, caller: Address, manager: Address) -> Result<bool> {
        let added = self.policy.write().add_manager(caller, manager)?;
        tracing::info!(vault = %self.config.address, %manager, added, "Vault manager added");
        Ok(added)
    }

    /// Owner-only. Returns `true` if the manager was present.
    pub fn remove_vault_manager(&self, caller: Address, manager: Address) -> Result<bool> {
        let removed = self.policy.write().remove_manager(caller, manager)?;
        tracing::info!(vault = %self.config.address, %manager, removed, "Vault manager removed");
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Deposits and withdrawals
    // ------------------------------------------------------------------

    /// Deposit `amount` of `token` for `depositor`. Returns the new balance.
    pub fn deposit(&mut self, depositor: Address, token: Address, amount: U256) -> Result<U256> {
        let balance = self.ledger.deposit(token, depositor, amount)?;
        tracing::info!(
            %token,
            %depositor,
            %amount,
            %balance,
            "Deposit"
        );
        Ok(balance)
    }

    /// Withdraw on behalf of `request.depositor`. Returns the depositor's
    /// remaining balance.
    ///
    /// Signed withdrawals must be submitted by the depositor before
    /// `valid_until`, and consume the depositor's withdrawal nonce. The owner
    /// may withdraw for any depositor.
    pub fn withdraw(
        &mut self,
        caller: Address,
        request: &WithdrawRequest,
        authorization: &WithdrawAuthorization,
    ) -> Result<U256> {
        let signed = match authorization {
            WithdrawAuthorization::ManagerSignature(signature) => {
                if caller != request.depositor {
                    return Err(XliquidError::unauthorized(
                        caller,
                        "signed withdrawals must be submitted by the depositor",
                    ));
                }
                check_validity_window(self.clock.now(), 0, request.valid_until)?;
                let nonce = self.ledger.next_withdraw_nonce(request.depositor);
                let hash = request.withdraw_hash(self.config.address, nonce);
                let policy = self.policy.read();
                SignatureAuthorizer::verify(policy.managers(), hash, signature)?;
                true
            }
            WithdrawAuthorization::Owner => {
                self.policy.read().require_owner(caller)?;
                false
            }
        };

        let balance = self.ledger.atomically(|ledger| {
            let balance = ledger.withdraw(request.token, request.depositor, request.amount)?;
            if signed {
                ledger.advance_withdraw_nonce(request.depositor);
            }
            Ok(balance)
        })?;

        tracing::info!(
            token = %request.token,
            depositor = %request.depositor,
            to = %request.recipient,
            amount = %request.amount,
            signed,
            "Withdrawal transfer"
        );
        Ok(balance)
    }

    // ------------------------------------------------------------------
    // Claims
    // ------------------------------------------------------------------

    /// Execute a manager-signed claim.
    ///
    /// # Errors
    /// - `ReplayedClaim` if this claim was executed before
    /// - `InvalidSignature` if the signer is not a vault manager
    /// - `OutsideValidityWindow`
    /// - `InsufficientBalance` if the debit exceeds the user's deposit
    /// - `InsufficientLiquidity` if the pool cannot cover the credit
    /// - any dispatch error (`UnconnectedChain`, `InsufficientGasFunds`, ...)
    ///
    /// Every error leaves the ledger unchanged.
    pub fn claim(&mut self, claim: &ClaimAuthorization) -> Result<ClaimReceipt> {
        self.execute(claim, false)
    }

    /// Paymaster-only. Execute a claim whose debit pre-pays gas, and hold
    /// that debit until [`Self::reconcile_sponsorship`] settles it.
    ///
    /// # Errors
    /// `Unauthorized` unless `caller` is the configured paymaster, then
    /// everything [`Self::claim`] returns.
    pub fn claim_sponsored(&mut self, caller: Address, claim: &ClaimAuthorization) -> Result<ClaimReceipt> {
        self.require_paymaster(caller)?;
        self.execute(claim, true)
    }

    fn execute(&mut self, claim: &ClaimAuthorization, sponsored: bool) -> Result<ClaimReceipt> {
        let now = self.clock.now();
        let nonce = self.ledger.next_claim_nonce(claim.user);
        let claim_hash = claim.claim_hash(self.config.address, nonce);

        let signer = self
            .verify(claim, claim_hash, now)
            .map_err(|err| Self::rejected(claim_hash, ClaimStage::Received, err))?;
        tracing::debug!(claim = %claim_hash.short(), %signer, "Claim verified");

        let transaction_id = transaction_id(self.config.chain_id, claim.user, nonce);
        let cp = self.ledger.checkpoint();
        match self.commit_and_dispatch(claim, claim_hash, transaction_id, sponsored) {
            Ok(message_ids) => {
                self.ledger.commit(cp);
                tracing::info!(
                    claim = %claim_hash.short(),
                    tx = %transaction_id.short(),
                    user = %claim.user,
                    token = %claim.token,
                    credit = %claim.credit_amount,
                    debit = %claim.debit_amount,
                    nonce,
                    sponsored,
                    messages = message_ids.len(),
                    "Claim committed, transfer to user"
                );
                Ok(ClaimReceipt {
                    claim_hash,
                    transaction_id,
                    nonce,
                    message_ids,
                })
            }
            Err((stage, err)) => {
                self.ledger.rollback(cp);
                Err(Self::rejected(claim_hash, stage, err))
            }
        }
    }

    fn verify(&self, claim: &ClaimAuthorization, claim_hash: ClaimHash, now: u64) -> Result<Address> {
        self.ledger.check_replay(&claim.signature)?;
        let signer = {
            let policy = self.policy.read();
            SignatureAuthorizer::verify(policy.managers(), claim_hash.0, &claim.signature)?
        };
        claim.check_window(now)?;
        Ok(signer)
    }

    fn commit_and_dispatch(
        &mut self,
        claim: &ClaimAuthorization,
        claim_hash: ClaimHash,
        transaction_id: TransactionId,
        sponsored: bool,
    ) -> std::result::Result<Vec<MessageId>, (ClaimStage, XliquidError)> {
        let at = |stage: ClaimStage| move |err: XliquidError| (stage, err);

        self.ledger
            .debit_claim(claim.token, claim.user, claim.debit_amount)
            .map_err(at(ClaimStage::Verified))?;
        self.ledger
            .commit_credit(claim.token, claim.credit_amount)
            .map_err(at(ClaimStage::Verified))?;

        self.ledger
            .consume_claim(claim_hash, &claim.signature)
            .map_err(at(ClaimStage::LiquidityChecked))?;
        self.ledger.advance_claim_nonce(claim.user);
        if sponsored {
            let sponsorship = Sponsorship {
                user: claim.user,
                token: claim.token,
                debit: claim.debit_amount,
            };
            self.ledger
                .open_sponsorship(claim_hash, sponsorship)
                .map_err(at(ClaimStage::LiquidityChecked))?;
        }

        self.settlement
            .dispatch(&claim.reclaim_plan, transaction_id)
            .map_err(at(ClaimStage::Committed))
    }

    fn rejected(claim_hash: ClaimHash, stage: ClaimStage, err: XliquidError) -> XliquidError {
        tracing::warn!(
            claim = %claim_hash.short(),
            %stage,
            error = %err,
            "Claim rejected"
        );
        err
    }

    // ------------------------------------------------------------------
    // Settlement and sponsorship callbacks
    // ------------------------------------------------------------------

    /// Bridge callback: hand an inbound settlement message to the
    /// settlement module, which credits this vault's ledger.
    pub fn receive_settlement(
        &mut self,
        caller: Address,
        source_chain: ChainId,
        origin: Address,
        payload: &[u8],
    ) -> Result<InboundOutcome> {
        self.settlement
            .on_message_received(caller, source_chain, origin, payload, &mut self.ledger)
    }

    /// Paymaster-only. Settle the gas cost of a sponsored claim, returning
    /// the unused part of its debit to the user. Returns the refund.
    ///
    /// # Errors
    /// - `Unauthorized` unless `caller` is the configured paymaster
    /// - `UnknownSponsorship` if the claim was not sponsored or is already settled
    /// - `GasCostExceedsAuthorization` if the cost exceeds the debit
    pub fn reconcile_sponsorship(
        &mut self,
        caller: Address,
        claim_hash: ClaimHash,
        actual_gas_cost: U256,
    ) -> Result<U256> {
        self.require_paymaster(caller)?;
        let (sponsorship, refund) = self.ledger.settle_sponsorship(claim_hash, actual_gas_cost)?;
        tracing::info!(
            claim = %claim_hash.short(),
            user = %sponsorship.user,
            token = %sponsorship.token,
            %actual_gas_cost,
            %refund,
            "Sponsorship reconciled"
        );
        Ok(refund)
    }

    fn require_paymaster(&self, caller: Address) -> Result<()> {
        if self.config.paymaster != Some(caller) {
            return Err(XliquidError::unauthorized(caller, "caller is not the vault's paymaster"));
        }
        Ok(())
    }

    /// Verify supply conservation for every token this vault has seen.
    pub fn verify_supply(&self) -> Result<()> {
        self.ledger.verify_all_supply()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;
    use xliquid_types::claim::testing::{sign_claim, sign_withdraw, single_entry_plan, unsigned_claim};
    use xliquid_types::policy::shared;
    use xliquid_types::signature::testing::ManagerKey;
    use xliquid_types::{AuthorizationPolicy, CreditSink, ManualClock, ReclaimPlan, RemoteCredit};

    const VAULT: Address = Address::repeat_byte(0x0a);
    const OWNER: Address = Address::repeat_byte(0x0f);
    const PAYMASTER: Address = Address::repeat_byte(0x0e);
    const USDC: Address = Address::repeat_byte(0xaa);
    const ALICE: Address = Address::repeat_byte(0x01);
    const BOB: Address = Address::repeat_byte(0x02);
    const SOLVER: Address = Address::repeat_byte(0x03);
    const T0: u64 = 1_700_000_000;

    /// Records dispatched plans; optionally fails every dispatch.
    #[derive(Default)]
    struct RecordingSettlement {
        dispatched: Vec<(ReclaimPlan, TransactionId)>,
        fail_with: Option<XliquidError>,
    }

    impl Settlement for RecordingSettlement {
        fn dispatch(&mut self, plan: &ReclaimPlan, transaction_id: TransactionId) -> Result<Vec<MessageId>> {
            if let Some(err) = &self.fail_with {
                return Err(err.clone());
            }
            self.dispatched.push((plan.clone(), transaction_id));
            Ok(vec![MessageId(self.dispatched.len() as u64)])
        }

        fn on_message_received(
            &mut self,
            _caller: Address,
            _source_chain: ChainId,
            _origin: Address,
            payload: &[u8],
            sink: &mut dyn CreditSink,
        ) -> Result<InboundOutcome> {
            let transaction_id = TransactionId(B256::repeat_byte(payload[0]));
            sink.apply_remote_credits(
                transaction_id,
                &[RemoteCredit {
                    token: USDC,
                    recipient: SOLVER,
                    amount: U256::from(payload[1]),
                }],
            )?;
            Ok(InboundOutcome::Applied {
                transaction_id,
                credits: 1,
            })
        }
    }

    struct Fixture {
        vault: Vault<RecordingSettlement>,
        clock: ManualClock,
        manager: ManagerKey,
    }

    fn fixture() -> Fixture {
        let manager = ManagerKey::from_seed(1);
        let policy = shared(AuthorizationPolicy::with_managers(OWNER, [manager.address()]));
        let clock = ManualClock::new(T0);
        let config = VaultConfig {
            chain_id: ChainId(1),
            address: VAULT,
            paymaster: Some(PAYMASTER),
        };
        let mut vault = Vault::new(config, policy, RecordingSettlement::default(), Arc::new(clock.clone()));
        vault.deposit(ALICE, USDC, U256::from(1000u64)).unwrap();
        Fixture { vault, clock, manager }
    }

    fn signed_claim(f: &Fixture, user: Address, credit: u64, debit: u64) -> ClaimAuthorization {
        let mut claim = unsigned_claim(
            user,
            USDC,
            U256::from(credit),
            U256::from(debit),
            T0,
            T0 + 3600,
            single_entry_plan(10, USDC, U256::from(credit), SOLVER, user),
        );
        let nonce = f.vault.next_claim_nonce(user);
        sign_claim(&f.manager, VAULT, nonce, &mut claim);
        claim
    }

    #[test]
    fn claim_releases_liquidity_once() {
        let mut f = fixture();
        f.clock.set(T0 + 10);
        let claim = signed_claim(&f, BOB, 100, 0);

        let receipt = f.vault.claim(&claim).unwrap();
        assert_eq!(receipt.nonce, 0);
        assert_eq!(receipt.message_ids.len(), 1);
        assert_eq!(f.vault.liquidity(USDC), U256::from(900u64));
        assert_eq!(f.vault.next_claim_nonce(BOB), 1);
        assert!(f.vault.ledger().is_claim_consumed(&receipt.claim_hash));
        assert_eq!(
            receipt.transaction_id,
            transaction_id(ChainId(1), BOB, 0)
        );

        let err = f.vault.claim(&claim).unwrap_err();
        assert_eq!(err, XliquidError::ReplayedClaim(receipt.claim_hash));
        assert_eq!(f.vault.liquidity(USDC), U256::from(900u64));
        assert_eq!(f.vault.settlement().dispatched.len(), 1);
        f.vault.verify_supply().unwrap();
    }

    #[test]
    fn window_bounds() {
        let mut f = fixture();
        let claim = signed_claim(&f, BOB, 10, 0);

        f.clock.set(T0 - 1);
        assert!(matches!(
            f.vault.claim(&claim),
            Err(XliquidError::OutsideValidityWindow { .. })
        ));
        f.clock.set(T0 + 3600);
        assert!(matches!(
            f.vault.claim(&claim),
            Err(XliquidError::OutsideValidityWindow { .. })
        ));
        assert_eq!(f.vault.next_claim_nonce(BOB), 0);

        f.clock.set(T0);
        assert!(f.vault.claim(&claim).is_ok());
    }

    #[test]
    fn non_manager_signature_rejected() {
        let mut f = fixture();
        let mut claim = signed_claim(&f, BOB, 10, 0);
        sign_claim(&ManagerKey::from_seed(9), VAULT, 0, &mut claim);
        let err = f.vault.claim(&claim).unwrap_err();
        assert!(matches!(err, XliquidError::InvalidSignature { .. }));
        assert_eq!(f.vault.liquidity(USDC), U256::from(1000u64));
    }

    #[test]
    fn empty_manager_set_freezes_claims() {
        let mut f = fixture();
        let manager = f.manager.address();
        assert!(f.vault.remove_vault_manager(OWNER, manager).unwrap());
        assert!(!f.vault.is_vault_manager(manager));
        let claim = signed_claim(&f, BOB, 10, 0);
        assert!(matches!(
            f.vault.claim(&claim),
            Err(XliquidError::InvalidSignature { .. })
        ));
    }

    #[test]
    fn only_owner_manages_managers() {
        let f = fixture();
        let err = f.vault.add_vault_manager(ALICE, BOB).unwrap_err();
        assert!(matches!(err, XliquidError::Unauthorized { .. }));
        assert!(f.vault.add_vault_manager(OWNER, BOB).unwrap());
        assert!(f.vault.is_vault_manager(BOB));
    }

    #[test]
    fn credit_beyond_liquidity_rejected() {
        let mut f = fixture();
        let claim = signed_claim(&f, BOB, 1001, 0);
        let err = f.vault.claim(&claim).unwrap_err();
        assert!(matches!(err, XliquidError::InsufficientLiquidity { .. }));
        assert_eq!(f.vault.next_claim_nonce(BOB), 0);
        assert!(f.vault.ledger().used_claims().is_empty());
    }

    #[test]
    fn debit_beyond_deposit_rejected() {
        let mut f = fixture();
        let claim = signed_claim(&f, BOB, 10, 5);
        let err = f.vault.claim(&claim).unwrap_err();
        assert!(matches!(err, XliquidError::InsufficientBalance { .. }));
    }

    #[test]
    fn debit_reduces_users_own_deposit() {
        let mut f = fixture();
        let claim = signed_claim(&f, ALICE, 100, 40);
        f.vault.claim(&claim).unwrap();
        assert_eq!(f.vault.balance(USDC, ALICE), U256::from(960u64));
        assert_eq!(f.vault.liquidity(USDC), U256::from(860u64));
        f.vault.verify_supply().unwrap();
    }

    #[test]
    fn dispatch_failure_rolls_back_everything() {
        let mut f = fixture();
        f.vault.settlement_mut().fail_with = Some(XliquidError::UnconnectedChain(ChainId(10)));
        let claim = signed_claim(&f, ALICE, 100, 40);

        let err = f.vault.claim(&claim).unwrap_err();
        assert_eq!(err, XliquidError::UnconnectedChain(ChainId(10)));
        assert_eq!(f.vault.liquidity(USDC), U256::from(1000u64));
        assert_eq!(f.vault.balance(USDC, ALICE), U256::from(1000u64));
        assert_eq!(f.vault.next_claim_nonce(ALICE), 0);
        assert!(f.vault.ledger().used_claims().is_empty());

        f.vault.settlement_mut().fail_with = None;
        assert!(f.vault.claim(&claim).is_ok());
    }

    #[test]
    fn signed_withdraw_consumes_nonce() {
        let mut f = fixture();
        let request = WithdrawRequest {
            token: USDC,
            depositor: ALICE,
            recipient: BOB,
            amount: U256::from(300u64),
            valid_until: T0 + 60,
        };
        let sig = sign_withdraw(&f.manager, VAULT, 0, &request);
        let auth = WithdrawAuthorization::ManagerSignature(sig);

        assert!(matches!(
            f.vault.withdraw(BOB, &request, &auth),
            Err(XliquidError::Unauthorized { .. })
        ));
        let remaining = f.vault.withdraw(ALICE, &request, &auth).unwrap();
        assert_eq!(remaining, U256::from(700u64));
        assert_eq!(f.vault.next_withdraw_nonce(ALICE), 1);

        let err = f.vault.withdraw(ALICE, &request, &auth).unwrap_err();
        assert!(matches!(err, XliquidError::InvalidSignature { .. }));
        f.vault.verify_supply().unwrap();
    }

    #[test]
    fn expired_signed_withdraw_rejected() {
        let mut f = fixture();
        let request = WithdrawRequest {
            token: USDC,
            depositor: ALICE,
            recipient: ALICE,
            amount: U256::from(1u64),
            valid_until: T0,
        };
        let auth = WithdrawAuthorization::ManagerSignature(sign_withdraw(&f.manager, VAULT, 0, &request));
        assert!(matches!(
            f.vault.withdraw(ALICE, &request, &auth),
            Err(XliquidError::OutsideValidityWindow { .. })
        ));
    }

    #[test]
    fn owner_withdraw_respects_committed_liquidity() {
        let mut f = fixture();
        let claim = signed_claim(&f, BOB, 900, 0);
        f.vault.claim(&claim).unwrap();

        let request = WithdrawRequest {
            token: USDC,
            depositor: ALICE,
            recipient: ALICE,
            amount: U256::from(200u64),
            valid_until: 0,
        };
        assert!(matches!(
            f.vault.withdraw(ALICE, &request, &WithdrawAuthorization::Owner),
            Err(XliquidError::Unauthorized { .. })
        ));
        assert!(matches!(
            f.vault.withdraw(OWNER, &request, &WithdrawAuthorization::Owner),
            Err(XliquidError::InsufficientLiquidity { .. })
        ));
        assert_eq!(f.vault.next_withdraw_nonce(ALICE), 0);
    }

    #[test]
    fn sponsored_claim_only_from_paymaster() {
        let mut f = fixture();
        let claim = signed_claim(&f, ALICE, 0, 50);
        assert!(matches!(
            f.vault.claim_sponsored(ALICE, &claim),
            Err(XliquidError::Unauthorized { .. })
        ));
        let receipt = f.vault.claim_sponsored(PAYMASTER, &claim).unwrap();
        assert_eq!(
            f.vault.ledger().sponsorship(&receipt.claim_hash).map(|s| s.debit),
            Some(U256::from(50u64))
        );

        assert!(f.vault.reconcile_sponsorship(ALICE, receipt.claim_hash, U256::ZERO).is_err());
        let refund = f
            .vault
            .reconcile_sponsorship(PAYMASTER, receipt.claim_hash, U256::from(30u64))
            .unwrap();
        assert_eq!(refund, U256::from(20u64));
        assert_eq!(f.vault.balance(USDC, ALICE), U256::from(970u64));
        f.vault.verify_supply().unwrap();
    }

    #[test]
    fn sponsorship_refunds_at_most_once() {
        let mut f = fixture();
        let receipt = f
            .vault
            .claim_sponsored(PAYMASTER, &signed_claim(&f, ALICE, 0, 300))
            .unwrap();
        f.vault
            .reconcile_sponsorship(PAYMASTER, receipt.claim_hash, U256::ZERO)
            .unwrap();
        for _ in 0..3 {
            assert_eq!(
                f.vault.reconcile_sponsorship(PAYMASTER, receipt.claim_hash, U256::ZERO),
                Err(XliquidError::UnknownSponsorship(receipt.claim_hash))
            );
        }
        assert_eq!(f.vault.balance(USDC, ALICE), U256::from(1000u64));
        f.vault.verify_supply().unwrap();
    }

    #[test]
    fn unsponsored_claim_cannot_be_refunded() {
        let mut f = fixture();
        let receipt = f.vault.claim(&signed_claim(&f, ALICE, 0, 50)).unwrap();
        assert_eq!(
            f.vault.reconcile_sponsorship(PAYMASTER, receipt.claim_hash, U256::ZERO),
            Err(XliquidError::UnknownSponsorship(receipt.claim_hash))
        );
        assert_eq!(f.vault.balance(USDC, ALICE), U256::from(950u64));
    }

    #[test]
    fn failed_sponsored_claim_leaves_no_record() {
        let mut f = fixture();
        f.vault.settlement_mut().fail_with = Some(XliquidError::UnconnectedChain(ChainId(10)));
        let claim = signed_claim(&f, ALICE, 0, 50);
        let nonce = f.vault.next_claim_nonce(ALICE);
        let hash = claim.claim_hash(VAULT, nonce);
        assert!(f.vault.claim_sponsored(PAYMASTER, &claim).is_err());
        assert!(f.vault.ledger().sponsorship(&hash).is_none());
        assert_eq!(f.vault.balance(USDC, ALICE), U256::from(1000u64));
    }

    #[test]
    fn inbound_settlement_credits_ledger() {
        let mut f = fixture();
        let outcome = f
            .vault
            .receive_settlement(Address::ZERO, ChainId(10), Address::ZERO, &[7, 25])
            .unwrap();
        assert!(matches!(outcome, InboundOutcome::Applied { credits: 1, .. }));
        assert_eq!(f.vault.balance(USDC, SOLVER), U256::from(25u64));
        f.vault.verify_supply().unwrap();
    }
}
