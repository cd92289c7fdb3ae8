//! Authorization policy: the vault manager set and its governance key.
//!
//! The policy is an explicit object rather than ambient state. A single
//! governance address (the owner) may add or remove managers; managers sign
//! claims and withdrawals. An empty manager set is valid and freezes every
//! signed operation until a manager is added.
//!
//! The same policy is injected into the vault and the settlement module, so
//! it is shared behind a lock via [`SharedPolicy`].

use std::collections::HashSet;
use std::sync::Arc;

use alloy_primitives::Address;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::{Result, XliquidError};

/// Manager set plus the governance key allowed to change it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationPolicy {
    governance: Address,
    managers: HashSet<Address>,
}

impl AuthorizationPolicy {
    #[must_use]
    pub fn new(governance: Address) -> Self {
        Self {
            governance,
            managers: HashSet::new(),
        }
    }

    #[must_use]
    pub fn with_managers(governance: Address, managers: impl IntoIterator<Item = Address>) -> Self {
        Self {
            governance,
            managers: managers.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn governance(&self) -> Address {
        self.governance
    }

    #[must_use]
    pub fn managers(&self) -> &HashSet<Address> {
        &self.managers
    }

    #[must_use]
    pub fn is_vault_manager(&self, address: Address) -> bool {
        self.managers.contains(&address)
    }

    #[must_use]
    pub fn is_owner(&self, address: Address) -> bool {
        self.governance == address
    }

    /// Fail unless `caller` is the governance key.
    pub fn require_owner(&self, caller: Address) -> Result<()> {
        if self.is_owner(caller) {
            Ok(())
        } else {
            Err(XliquidError::unauthorized(caller, "caller is not the owner"))
        }
    }

    /// Add a manager. Returns `true` if it was not already present.
    pub fn add_manager(&mut self, caller: Address, manager: Address) -> Result<bool> {
        self.require_owner(caller)?;
        Ok(self.managers.insert(manager))
    }

    /// Remove a manager. Returns `true` if it was present.
    pub fn remove_manager(&mut self, caller: Address, manager: Address) -> Result<bool> {
        self.require_owner(caller)?;
        Ok(self.managers.remove(&manager))
    }

    /// Hand governance to a new key.
    pub fn transfer_governance(&mut self, caller: Address, new_governance: Address) -> Result<()> {
        self.require_owner(caller)?;
        if new_governance.is_zero() {
            return Err(XliquidError::unauthorized(
                caller,
                "governance cannot be the zero address",
            ));
        }
        self.governance = new_governance;
        Ok(())
    }
}

/// Policy shared between components.
pub type SharedPolicy = Arc<RwLock<AuthorizationPolicy>>;

/// Wrap a policy for sharing.
#[must_use]
pub fn shared(policy: AuthorizationPolicy) -> SharedPolicy {
    Arc::new(RwLock::new(policy))
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: Address = Address::repeat_byte(0x01);
    const MANAGER: Address = Address::repeat_byte(0x02);
    const STRANGER: Address = Address::repeat_byte(0x03);

    #[test]
    fn owner_adds_and_removes_managers() {
        let mut policy = AuthorizationPolicy::new(OWNER);
        assert!(policy.add_manager(OWNER, MANAGER).unwrap());
        assert!(!policy.add_manager(OWNER, MANAGER).unwrap());
        assert!(policy.is_vault_manager(MANAGER));
        assert!(policy.remove_manager(OWNER, MANAGER).unwrap());
        assert!(!policy.is_vault_manager(MANAGER));
    }

    #[test]
    fn stranger_cannot_add_manager() {
        let mut policy = AuthorizationPolicy::new(OWNER);
        let err = policy.add_manager(STRANGER, STRANGER).unwrap_err();
        assert!(matches!(err, XliquidError::Unauthorized { caller, .. } if caller == STRANGER));
        assert!(policy.managers().is_empty());
    }

    #[test]
    fn empty_manager_set_is_valid() {
        let policy = AuthorizationPolicy::new(OWNER);
        assert!(!policy.is_vault_manager(OWNER));
        assert!(policy.managers().is_empty());
    }

    #[test]
    fn governance_transfer() {
        let mut policy = AuthorizationPolicy::new(OWNER);
        policy.transfer_governance(OWNER, STRANGER).unwrap();
        assert!(policy.is_owner(STRANGER));
        assert!(policy.require_owner(OWNER).is_err());
        assert!(policy.transfer_governance(STRANGER, Address::ZERO).is_err());
    }

    #[test]
    fn shared_policy_sees_updates() {
        let policy = shared(AuthorizationPolicy::new(OWNER));
        let other = Arc::clone(&policy);
        policy.write().add_manager(OWNER, MANAGER).unwrap();
        assert!(other.read().is_vault_manager(MANAGER));
    }
}
