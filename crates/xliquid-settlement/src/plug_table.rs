//! Remote chain → remote settlement module ("plug") connections.

use std::collections::HashMap;

use alloy_primitives::Address;
use xliquid_types::{ChainId, Result, XliquidError};

/// Connected plugs, one per remote chain.
#[derive(Debug, Default, Clone)]
pub struct PlugTable {
    plugs: HashMap<ChainId, Address>,
}

impl PlugTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the plug for `chain`. Returns the previous plug.
    pub fn connect(&mut self, chain: ChainId, remote: Address) -> Option<Address> {
        self.plugs.insert(chain, remote)
    }

    #[must_use]
    pub fn get(&self, chain: ChainId) -> Option<Address> {
        self.plugs.get(&chain).copied()
    }

    /// The plug for `chain`.
    ///
    /// # Errors
    /// Returns [`XliquidError::UnconnectedChain`] if none is connected.
    pub fn require(&self, chain: ChainId) -> Result<Address> {
        self.get(chain).ok_or(XliquidError::UnconnectedChain(chain))
    }

    #[must_use]
    pub fn is_connected(&self, chain: ChainId) -> bool {
        self.plugs.contains_key(&chain)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.plugs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugs.is_empty()
    }
}
