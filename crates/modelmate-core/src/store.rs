//! In-memory token store.

use std::sync::{PoisonError, RwLock};

use crate::TokenPair;
use crate::traits::TokenStore;

/// A token store that lives as long as the process.
///
/// Used by tests and by embedders that keep credentials elsewhere.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    pair: RwLock<TokenPair>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store seeded with a pair.
    pub fn with_pair(pair: TokenPair) -> Self {
        Self {
            pair: RwLock::new(pair),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> TokenPair {
        self.pair
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, pair: &TokenPair) {
        *self.pair.write().unwrap_or_else(PoisonError::into_inner) = pair.clone();
    }

    fn clear(&self) {
        *self.pair.write().unwrap_or_else(PoisonError::into_inner) = TokenPair::empty();
    }
}
