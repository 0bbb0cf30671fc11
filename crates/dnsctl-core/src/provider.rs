//! The backend capability every provider implements.
//!
//! A provider is the only thing that talks to a backend (cloud DNS API,
//! authoritative server, ...). No operation here caches: every call reads
//! or writes through, so the backend stays the single source of truth.
//!
//! # Thread safety
//!
//! One provider instance may back several zones and is called from
//! arbitrarily many concurrent tasks with no synchronization by the
//! engine. Implementations must keep their internal client state
//! thread-safe.

use crate::error::Result;
use crate::record::{ChangeSet, Record, RecordType};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Uniform contract over heterogeneous DNS backends.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Return the current record set of a zone.
    ///
    /// Fails with `ZoneNotFound` if the backend does not know the zone, or
    /// `BackendUnavailable` if it cannot be reached.
    async fn list(&self, zone: &str) -> Result<Vec<Record>>;

    /// Idempotently ensure exactly one record set of (name, type) exists
    /// with the given value and TTL: delete whatever matched before, then
    /// create the replacement.
    ///
    /// The returned change set describes exactly what was deleted and
    /// added. On partial failure (deletes done, create failed) the error
    /// carries the changes applied so far; see
    /// [`Error::partial_changes`](crate::Error::partial_changes).
    async fn present(
        &self,
        zone: &str,
        name: &str,
        rtype: RecordType,
        value: &str,
        ttl: u32,
    ) -> Result<ChangeSet>;

    /// Delete all records matching (name, type).
    ///
    /// Fails with `NotFound` when nothing matched; callers can distinguish
    /// "nothing to do" from "deleted something".
    async fn absent(&self, zone: &str, name: &str, rtype: RecordType) -> Result<ChangeSet>;
}

/// Constructs a provider from its opaque configuration settings.
///
/// Settings are the per-backend key/value map from the configuration
/// file; missing required keys are a configuration error, which the
/// binary treats as fatal at startup.
pub trait ProviderFactory: Send + Sync {
    /// Create a provider instance from configuration settings.
    fn create(&self, settings: &HashMap<String, String>) -> Result<Arc<dyn DnsProvider>>;
}
