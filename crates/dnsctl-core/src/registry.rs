//! Plugin-style provider registry.
//!
//! Maps a backend-type tag (the `Type` key of a provider's settings) to a
//! factory. Adding a backend means registering a new tag; the engine and
//! router never change.

use crate::error::{Error, Result};
use crate::provider::{DnsProvider, ProviderFactory};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Registry of provider factories keyed by backend-type tag.
#[derive(Default)]
pub struct ProviderRegistry {
    factories: RwLock<HashMap<String, Box<dyn ProviderFactory>>>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider factory under a backend-type tag
    pub fn register(&self, tag: impl Into<String>, factory: Box<dyn ProviderFactory>) {
        let mut factories = self.factories.write().unwrap();
        factories.insert(tag.into(), factory);
    }

    /// Create a provider from its settings map.
    ///
    /// The `Type` key selects the factory; everything else is interpreted
    /// only by that factory.
    pub fn create(&self, settings: &HashMap<String, String>) -> Result<Arc<dyn DnsProvider>> {
        let tag = settings
            .get("Type")
            .ok_or_else(|| Error::config("provider settings missing 'Type'"))?;

        let factories = self.factories.read().unwrap();
        let factory = factories
            .get(tag)
            .ok_or_else(|| Error::config(format!("unknown provider type: {tag}")))?;

        factory.create(settings)
    }

    /// Check whether a backend-type tag is registered
    pub fn has(&self, tag: &str) -> bool {
        self.factories.read().unwrap().contains_key(tag)
    }

    /// List all registered backend-type tags
    pub fn registered(&self) -> Vec<String> {
        self.factories.read().unwrap().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullFactory;

    impl ProviderFactory for NullFactory {
        fn create(&self, _settings: &HashMap<String, String>) -> Result<Arc<dyn DnsProvider>> {
            Err(Error::config("null factory creates nothing"))
        }
    }

    #[test]
    fn registration_and_lookup() {
        let registry = ProviderRegistry::new();
        assert!(!registry.has("null"));

        registry.register("null", Box::new(NullFactory));
        assert!(registry.has("null"));
        assert!(registry.registered().contains(&"null".to_string()));
    }

    #[test]
    fn create_requires_type_tag() {
        let registry = ProviderRegistry::new();
        registry.register("null", Box::new(NullFactory));

        let err = registry.create(&HashMap::new()).err().unwrap();
        assert!(matches!(err, Error::Config(_)));

        let settings = HashMap::from([("Type".to_string(), "missing".to_string())]);
        let err = registry.create(&settings).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }
}
