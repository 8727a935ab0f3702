//! Credential pair storage trait.

use crate::TokenPair;

/// Durable storage for the credential pair.
///
/// Storage is an advisory cache: the server is the source of truth, so
/// implementations never fail. A missing, unreadable or corrupt value reads
/// as [`TokenPair::empty`], and write failures are logged and dropped.
pub trait TokenStore: Send + Sync {
    /// Returns the stored pair, or an empty pair.
    fn get(&self) -> TokenPair;

    /// Replaces the stored pair.
    fn set(&self, pair: &TokenPair);

    /// Removes the stored pair. Idempotent.
    fn clear(&self);
}
