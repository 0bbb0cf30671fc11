//! Shared test doubles for engine and router tests.

use async_trait::async_trait;
use dnsctl_core::{ChangeSet, DnsProvider, Error, Record, RecordType, Result};
use dnsctl_core::record::names_equal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory backend with real present/absent semantics.
#[derive(Default)]
pub struct MemoryProvider {
    zones: Mutex<HashMap<String, Vec<Record>>>,
}

impl MemoryProvider {
    pub fn with_zone(zone: &str, records: Vec<Record>) -> Arc<Self> {
        let provider = Self::default();
        provider
            .zones
            .lock()
            .unwrap()
            .insert(zone.to_string(), records);
        Arc::new(provider)
    }

    pub fn records(&self, zone: &str) -> Vec<Record> {
        self.zones
            .lock()
            .unwrap()
            .get(zone)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl DnsProvider for MemoryProvider {
    async fn list(&self, zone: &str) -> Result<Vec<Record>> {
        let zones = self.zones.lock().unwrap();
        zones
            .get(zone)
            .cloned()
            .ok_or_else(|| Error::ZoneNotFound(zone.to_string()))
    }

    async fn present(
        &self,
        zone: &str,
        name: &str,
        rtype: RecordType,
        value: &str,
        ttl: u32,
    ) -> Result<ChangeSet> {
        let mut zones = self.zones.lock().unwrap();
        let records = zones
            .get_mut(zone)
            .ok_or_else(|| Error::ZoneNotFound(zone.to_string()))?;

        let mut changes = ChangeSet::default();
        records.retain(|record| {
            let matched = record.rtype == rtype && names_equal(&record.name, name);
            if matched {
                changes.deletions.push(record.clone());
            }
            !matched
        });
        let record = Record::new(name, rtype, ttl, vec![value.to_string()]);
        changes.additions.push(record.clone());
        records.push(record);
        Ok(changes)
    }

    async fn absent(&self, zone: &str, name: &str, rtype: RecordType) -> Result<ChangeSet> {
        let mut zones = self.zones.lock().unwrap();
        let records = zones
            .get_mut(zone)
            .ok_or_else(|| Error::ZoneNotFound(zone.to_string()))?;

        let mut changes = ChangeSet::default();
        records.retain(|record| {
            let matched = record.rtype == rtype && names_equal(&record.name, name);
            if matched {
                changes.deletions.push(record.clone());
            }
            !matched
        });
        if changes.is_empty() {
            return Err(Error::not_found(format!("{name}/{rtype}")));
        }
        Ok(changes)
    }
}

/// Backend whose mutating calls fail after the first `allow` successes,
/// reporting the changes applied so far.
pub struct FlakyProvider {
    pub inner: Arc<MemoryProvider>,
    calls: AtomicUsize,
    allow: usize,
}

impl FlakyProvider {
    pub fn new(inner: Arc<MemoryProvider>, allow: usize) -> Arc<Self> {
        Arc::new(Self {
            inner,
            calls: AtomicUsize::new(0),
            allow,
        })
    }
}

#[async_trait]
impl DnsProvider for FlakyProvider {
    async fn list(&self, zone: &str) -> Result<Vec<Record>> {
        self.inner.list(zone).await
    }

    async fn present(
        &self,
        zone: &str,
        name: &str,
        rtype: RecordType,
        value: &str,
        ttl: u32,
    ) -> Result<ChangeSet> {
        if self.calls.fetch_add(1, Ordering::SeqCst) >= self.allow {
            return Err(Error::backend("injected failure"));
        }
        self.inner.present(zone, name, rtype, value, ttl).await
    }

    async fn absent(&self, zone: &str, name: &str, rtype: RecordType) -> Result<ChangeSet> {
        if self.calls.fetch_add(1, Ordering::SeqCst) >= self.allow {
            return Err(Error::backend("injected failure"));
        }
        self.inner.absent(zone, name, rtype).await
    }
}
