//! RFC2136 backend: manages records on an authoritative server via
//! dynamic updates, with zone contents read over AXFR.
//!
//! The hickory client is synchronous, so every operation runs inside
//! `spawn_blocking` with a fresh TCP connection. AXFR responses that
//! span multiple messages are not followed; zones large enough to need
//! that should use a narrower transfer mechanism.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use dnsctl_core::wire::{record_from_wire, record_to_wire, wire_type};
use dnsctl_core::{
    ChangeSet, DnsProvider, Error, ProviderFactory, Record, RecordType, Result, TsigAlgorithmName,
    TsigCredential,
};
use hickory_client::client::{Client, SyncClient};
use hickory_client::tcp::TcpClientConnection;
use hickory_proto::op::ResponseCode;
use hickory_proto::rr::dnssec::rdata::tsig::TsigAlgorithm;
use hickory_proto::rr::dnssec::tsig::TSigner;
use hickory_proto::rr::{DNSClass, Name, Record as WireRecord, RecordType as WireType};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

const TSIG_FUDGE_SECS: u16 = 300;

/// Backend speaking RFC2136 to one authoritative server.
#[derive(Clone)]
pub struct Rfc2136Provider {
    host: SocketAddr,
    credential: TsigCredential,
}

impl Rfc2136Provider {
    pub fn new(host: SocketAddr, credential: TsigCredential) -> Self {
        Self { host, credential }
    }

    fn connect(&self) -> Result<SyncClient<TcpClientConnection>> {
        let key = BASE64
            .decode(&self.credential.secret)
            .map_err(|err| Error::config(format!("TSIG secret is not valid base64: {err}")))?;
        let key_name = Name::from_str(&self.credential.key_name)
            .map_err(|err| Error::config(format!("bad TSIG key name: {err}")))?;
        let algorithm = match self.credential.algorithm {
            TsigAlgorithmName::HmacSha1 => TsigAlgorithm::HmacSha1,
            TsigAlgorithmName::HmacSha224 => TsigAlgorithm::HmacSha224,
            TsigAlgorithmName::HmacSha256 => TsigAlgorithm::HmacSha256,
            TsigAlgorithmName::HmacSha384 => TsigAlgorithm::HmacSha384,
            TsigAlgorithmName::HmacSha512 => TsigAlgorithm::HmacSha512,
        };
        let signer = TSigner::new(key, algorithm, key_name, TSIG_FUDGE_SECS)
            .map_err(|err| Error::config(format!("cannot build TSIG signer: {err}")))?;
        let conn = TcpClientConnection::new(self.host)
            .map_err(|err| Error::BackendUnavailable(format!("{}: {err}", self.host)))?;
        Ok(SyncClient::with_tsigner(conn, signer))
    }
}

fn parse_name(name: &str) -> Result<Name> {
    Name::from_str(name).map_err(|err| Error::invalid_record(format!("bad name '{name}': {err}")))
}

fn check_rcode(what: &str, rcode: ResponseCode) -> Result<()> {
    if rcode == ResponseCode::NoError {
        Ok(())
    } else {
        Err(Error::backend(format!("{what} returned {rcode}")))
    }
}

#[async_trait]
impl DnsProvider for Rfc2136Provider {
    async fn list(&self, zone: &str) -> Result<Vec<Record>> {
        let provider = self.clone();
        let zone = zone.to_string();
        tokio::task::spawn_blocking(move || {
            let client = provider.connect()?;
            let zone_name = parse_name(&zone)?;
            let response = client
                .query(&zone_name, DNSClass::IN, WireType::AXFR)
                .map_err(|err| Error::backend(format!("AXFR of {zone} failed: {err}")))?;
            if response.response_code() == ResponseCode::Refused {
                return Err(Error::ZoneNotFound(zone));
            }
            check_rcode("AXFR", response.response_code())?;
            // skip what the model cannot represent; the opening and
            // closing SOA appear as one record each
            Ok(response
                .answers()
                .iter()
                .filter_map(record_from_wire)
                .collect())
        })
        .await
        .map_err(|err| Error::backend(format!("AXFR task failed: {err}")))?
    }

    async fn present(
        &self,
        zone: &str,
        name: &str,
        rtype: RecordType,
        value: &str,
        ttl: u32,
    ) -> Result<ChangeSet> {
        let provider = self.clone();
        let zone = zone.to_string();
        let name = name.to_string();
        let value = value.to_string();
        tokio::task::spawn_blocking(move || {
            let client = provider.connect()?;
            let zone_name = parse_name(&zone)?;
            let fqdn = parse_name(&name)?;

            let response = client
                .query(&fqdn, DNSClass::IN, wire_type(rtype))
                .map_err(|err| Error::backend(format!("query for {name} failed: {err}")))?;
            let existing: Vec<Record> = response
                .answers()
                .iter()
                .filter(|record| record.record_type() == wire_type(rtype))
                .filter_map(record_from_wire)
                .collect();

            let mut changes = ChangeSet::default();
            if !existing.is_empty() {
                let mut rrset = WireRecord::new();
                rrset.set_name(fqdn.clone());
                rrset.set_record_type(wire_type(rtype));
                rrset.set_dns_class(DNSClass::IN);
                let response = client
                    .delete_rrset(rrset, zone_name.clone())
                    .map_err(|err| Error::backend(format!("delete of {name} failed: {err}")))?;
                check_rcode("delete", response.response_code())?;
                changes.deletions.extend(existing);
            }

            let record = Record::new(&name, rtype, ttl, vec![value]);
            let wire = record_to_wire(&record)?;
            let response = client.append(wire, zone_name, false).map_err(|err| {
                Error::backend_partial(format!("create of {name} failed: {err}"), changes.clone())
            })?;
            if response.response_code() != ResponseCode::NoError {
                return Err(Error::backend_partial(
                    format!("create of {name} returned {}", response.response_code()),
                    changes,
                ));
            }
            debug!(%name, %rtype, "record replaced");
            changes.additions.push(record);
            Ok(changes)
        })
        .await
        .map_err(|err| Error::backend(format!("update task failed: {err}")))?
    }

    async fn absent(&self, zone: &str, name: &str, rtype: RecordType) -> Result<ChangeSet> {
        let provider = self.clone();
        let zone = zone.to_string();
        let name = name.to_string();
        tokio::task::spawn_blocking(move || {
            let client = provider.connect()?;
            let zone_name = parse_name(&zone)?;
            let fqdn = parse_name(&name)?;

            let response = client
                .query(&fqdn, DNSClass::IN, wire_type(rtype))
                .map_err(|err| Error::backend(format!("query for {name} failed: {err}")))?;
            let existing: Vec<Record> = response
                .answers()
                .iter()
                .filter(|record| record.record_type() == wire_type(rtype))
                .filter_map(record_from_wire)
                .collect();
            if existing.is_empty() {
                return Err(Error::not_found(format!("{name}/{rtype}")));
            }

            let mut rrset = WireRecord::new();
            rrset.set_name(fqdn);
            rrset.set_record_type(wire_type(rtype));
            rrset.set_dns_class(DNSClass::IN);
            let response = client
                .delete_rrset(rrset, zone_name)
                .map_err(|err| Error::backend(format!("delete of {name} failed: {err}")))?;
            check_rcode("delete", response.response_code())?;
            debug!(%name, %rtype, "record set deleted");
            Ok(ChangeSet {
                additions: Vec::new(),
                deletions: existing,
            })
        })
        .await
        .map_err(|err| Error::backend(format!("delete task failed: {err}")))?
    }
}

/// Builds [`Rfc2136Provider`] from `Host` and `Tsig` settings.
pub struct Rfc2136Factory;

impl ProviderFactory for Rfc2136Factory {
    fn create(&self, settings: &HashMap<String, String>) -> Result<Arc<dyn DnsProvider>> {
        let host = settings
            .get("Host")
            .ok_or_else(|| Error::config("rfc2136 provider needs a 'Host' setting"))?;
        let host: SocketAddr = host
            .parse()
            .map_err(|_| Error::config(format!("bad rfc2136 host '{host}', want ip:port")))?;
        let credential: TsigCredential = settings
            .get("Tsig")
            .ok_or_else(|| Error::config("rfc2136 provider needs a 'Tsig' setting"))?
            .parse()?;
        Ok(Arc::new(Rfc2136Provider::new(host, credential)))
    }
}

/// Register this backend under the `rfc2136` type tag.
pub fn register(registry: &dnsctl_core::ProviderRegistry) {
    registry.register("rfc2136", Box::new(Rfc2136Factory));
}
