//! Core library for dnsctl.
//!
//! Everything backend-independent lives here:
//! - **Record model**: [`Record`], [`ChangeSet`], and the reversed-label
//!   ordering used for listings and diffs
//! - **Provider capability**: the [`DnsProvider`] trait every backend
//!   implements, plus the factory/registry machinery to construct them
//!   from configuration
//! - **Domain router**: longest-suffix matching from a name to the zone
//!   binding that owns it
//! - **Update engine**: RFC2136-style prerequisite checking and update
//!   application on top of the routed provider
//!
//! The protocol listener (`dnsctl-server`) and the concrete backends are
//! separate crates; they only ever talk to this one through the types
//! re-exported below.

pub mod config;
pub mod engine;
pub mod error;
pub mod provider;
pub mod record;
pub mod registry;
pub mod router;
pub mod wire;

pub use config::{Config, TsigAlgorithmName, TsigCredential};
pub use engine::{
    Directive, LookupOutcome, Prerequisite, Rcode, RrClass, TypeSelector, UpdateEngine,
    UpdateOutcome, UpdateRequest,
};
pub use error::{Error, Result};
pub use provider::{DnsProvider, ProviderFactory};
pub use record::{sort_records, ChangeSet, Record, RecordType};
pub use registry::ProviderRegistry;
pub use router::{DomainRouter, ZoneBinding};
