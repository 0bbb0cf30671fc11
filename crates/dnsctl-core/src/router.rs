//! Longest-suffix routing from a name to the zone binding that owns it.
//!
//! The zone table is built once at startup and never mutated while the
//! listeners run, so it needs no locking. Provider instances are shared:
//! one backend account can serve many zones.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::provider::DnsProvider;
use crate::record::{fqdn, unfqdn};
use crate::registry::ProviderRegistry;
use std::collections::HashMap;
use std::sync::Arc;

/// One configured zone and the provider that serves it.
pub struct ZoneBinding {
    /// Fully-qualified zone name
    pub zone: String,
    /// The backend serving this zone, shared with other bindings
    pub provider: Arc<dyn DnsProvider>,
}

/// Maps fully-qualified names to the most specific configured zone.
pub struct DomainRouter {
    zones: Vec<ZoneBinding>,
}

impl DomainRouter {
    /// Build a router from explicit bindings. Zone names are normalized
    /// to fully-qualified form.
    pub fn new(zones: Vec<ZoneBinding>) -> Self {
        let zones = zones
            .into_iter()
            .map(|binding| ZoneBinding {
                zone: fqdn(&binding.zone),
                provider: binding.provider,
            })
            .collect();
        Self { zones }
    }

    /// Build the zone table from configuration, constructing each named
    /// provider exactly once and sharing it across the zones bound to it.
    pub fn from_config(config: &Config, registry: &ProviderRegistry) -> Result<Self> {
        let mut instances: HashMap<&str, Arc<dyn DnsProvider>> = HashMap::new();
        let mut zones = Vec::new();

        for (zone, provider_name) in &config.domains {
            let provider = match instances.get(provider_name.as_str()) {
                Some(provider) => provider.clone(),
                None => {
                    let settings = config.providers.get(provider_name).ok_or_else(|| {
                        Error::config(format!(
                            "domain '{zone}' references unknown provider '{provider_name}'"
                        ))
                    })?;
                    let provider = registry.create(settings)?;
                    instances.insert(provider_name, provider.clone());
                    provider
                }
            };
            zones.push(ZoneBinding {
                zone: fqdn(zone),
                provider,
            });
        }

        Ok(Self { zones })
    }

    /// Resolve a name to the configured zone with the longest matching
    /// label suffix, or `None` if no configured zone is a suffix.
    ///
    /// Linear in (zones x labels); zone counts are small, no index needed.
    pub fn resolve(&self, name: &str) -> Option<&ZoneBinding> {
        let name = fqdn(name).to_ascii_lowercase();
        let name_labels: Vec<&str> = unfqdn(&name).split('.').collect();

        let mut best: Option<(&ZoneBinding, usize)> = None;
        for binding in &self.zones {
            let zone = binding.zone.to_ascii_lowercase();
            let zone_labels: Vec<&str> = unfqdn(&zone).split('.').collect();
            if zone_labels.len() > name_labels.len() {
                continue;
            }
            let tail = &name_labels[name_labels.len() - zone_labels.len()..];
            if tail != zone_labels.as_slice() {
                continue;
            }
            match best {
                Some((_, labels)) if labels >= zone_labels.len() => {}
                _ => best = Some((binding, zone_labels.len())),
            }
        }
        best.map(|(binding, _)| binding)
    }

    /// All configured zone bindings, in configuration order.
    pub fn zones(&self) -> &[ZoneBinding] {
        &self.zones
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ChangeSet, Record, RecordType};
    use async_trait::async_trait;

    struct NullProvider;

    #[async_trait]
    impl DnsProvider for NullProvider {
        async fn list(&self, _zone: &str) -> Result<Vec<Record>> {
            Ok(Vec::new())
        }

        async fn present(
            &self,
            _zone: &str,
            _name: &str,
            _rtype: RecordType,
            _value: &str,
            _ttl: u32,
        ) -> Result<ChangeSet> {
            Ok(ChangeSet::default())
        }

        async fn absent(
            &self,
            _zone: &str,
            _name: &str,
            _rtype: RecordType,
        ) -> Result<ChangeSet> {
            Ok(ChangeSet::default())
        }
    }

    fn router(zones: &[&str]) -> DomainRouter {
        DomainRouter::new(
            zones
                .iter()
                .map(|zone| ZoneBinding {
                    zone: zone.to_string(),
                    provider: Arc::new(NullProvider),
                })
                .collect(),
        )
    }

    #[test]
    fn longest_suffix_wins() {
        let router = router(&["example.com.", "b.example.com."]);
        let binding = router.resolve("x.b.example.com.").unwrap();
        assert_eq!(binding.zone, "b.example.com.");

        let binding = router.resolve("x.example.com.").unwrap();
        assert_eq!(binding.zone, "example.com.");
    }

    #[test]
    fn zone_name_itself_resolves() {
        let router = router(&["example.com"]);
        let binding = router.resolve("example.com").unwrap();
        assert_eq!(binding.zone, "example.com.");
    }

    #[test]
    fn label_boundaries_are_respected() {
        // "badexample.com" must not match the zone "example.com"
        let router = router(&["example.com."]);
        assert!(router.resolve("badexample.com.").is_none());
        assert!(router.resolve("other.org.").is_none());
    }

    #[test]
    fn matching_ignores_case() {
        let router = router(&["Example.COM."]);
        assert!(router.resolve("www.example.com").is_some());
    }
}
