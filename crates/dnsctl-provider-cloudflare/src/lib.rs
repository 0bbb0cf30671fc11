//! Cloudflare DNS backend.
//!
//! Talks to the Cloudflare API v4. Every operation resolves the zone ID
//! first and works on individual record objects; `present` deletes the
//! matching records before creating the replacement, so a mid-sequence
//! failure reports the deletions already applied.
//!
//! API reference: <https://developers.cloudflare.com/api/>
//! - List zones: GET `/zones?name=...`
//! - List DNS records: GET `/zones/:zone_id/dns_records?name=...&type=...`
//! - Create DNS record: POST `/zones/:zone_id/dns_records`
//! - Delete DNS record: DELETE `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use dnsctl_core::record::unfqdn;
use dnsctl_core::{
    ChangeSet, DnsProvider, Error, ProviderFactory, ProviderRegistry, Record, RecordType, Result,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const API_BASE: &str = "https://api.cloudflare.com/client/v4";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const PAGE_SIZE: u32 = 1000;

/// How a request authenticates against the API.
///
/// Never logged; the Debug implementation redacts both forms.
#[derive(Clone)]
enum Auth {
    Token(String),
    KeyEmail { key: String, email: String },
}

pub struct CloudflareProvider {
    client: reqwest::Client,
    auth: Auth,
}

impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let auth = match self.auth {
            Auth::Token(_) => "token <REDACTED>",
            Auth::KeyEmail { .. } => "key+email <REDACTED>",
        };
        f.debug_struct("CloudflareProvider")
            .field("auth", &auth)
            .finish()
    }
}

#[derive(Deserialize)]
struct ApiEnvelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiError>,
    result: Option<T>,
}

#[derive(Deserialize)]
struct ApiError {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct ApiZone {
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct ApiRecord {
    id: String,
    name: String,
    #[serde(rename = "type")]
    rtype: String,
    content: String,
    ttl: u32,
    priority: Option<u16>,
}

impl ApiRecord {
    /// Fold the API shape into a model record. MX priority lives in its
    /// own field on the API side but in the value string on ours.
    fn to_record(&self) -> Option<Record> {
        let rtype: RecordType = self.rtype.parse().ok()?;
        let value = match (rtype, self.priority) {
            (RecordType::Mx, Some(priority)) => format!("{priority} {}", self.content),
            _ => self.content.clone(),
        };
        Some(Record::new(&self.name, rtype, self.ttl, vec![value]))
    }
}

impl CloudflareProvider {
    fn new(auth: Auth) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|err| Error::config(format!("cannot build HTTP client: {err}")))?;
        Ok(Self { client, auth })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Auth::Token(token) => request.bearer_auth(token),
            Auth::KeyEmail { key, email } => request
                .header("X-Auth-Key", key)
                .header("X-Auth-Email", email),
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|err| Error::BackendUnavailable(format!("cloudflare: {err}")))?;
        let envelope: ApiEnvelope<T> = response
            .json()
            .await
            .map_err(|err| Error::backend(format!("cloudflare: unreadable response: {err}")))?;
        if !envelope.success {
            let details: Vec<String> = envelope
                .errors
                .iter()
                .map(|e| format!("{} ({})", e.message, e.code))
                .collect();
            return Err(Error::backend(format!(
                "cloudflare: {}",
                details.join("; ")
            )));
        }
        envelope
            .result
            .ok_or_else(|| Error::backend("cloudflare: response carried no result"))
    }

    async fn zone_id(&self, zone: &str) -> Result<String> {
        let zone = unfqdn(zone).to_string();
        let url = format!("{API_BASE}/zones?name={zone}");
        let zones: Vec<ApiZone> = self.send(self.client.get(&url)).await?;
        zones
            .into_iter()
            .find(|z| z.name.eq_ignore_ascii_case(&zone))
            .map(|z| z.id)
            .ok_or_else(|| Error::ZoneNotFound(zone))
    }

    async fn find_records(
        &self,
        zone_id: &str,
        name: &str,
        rtype: RecordType,
    ) -> Result<Vec<ApiRecord>> {
        let name = unfqdn(name);
        let url =
            format!("{API_BASE}/zones/{zone_id}/dns_records?name={name}&type={rtype}&per_page={PAGE_SIZE}");
        self.send(self.client.get(&url)).await
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<()> {
        #[derive(Deserialize)]
        struct Deleted {
            #[allow(dead_code)]
            id: String,
        }
        let url = format!("{API_BASE}/zones/{zone_id}/dns_records/{record_id}");
        let _: Deleted = self.send(self.client.delete(&url)).await?;
        Ok(())
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    async fn list(&self, zone: &str) -> Result<Vec<Record>> {
        let zone_id = self.zone_id(zone).await?;
        let url = format!("{API_BASE}/zones/{zone_id}/dns_records?per_page={PAGE_SIZE}");
        let records: Vec<ApiRecord> = self.send(self.client.get(&url)).await?;
        // record types the model does not carry are skipped
        Ok(records.iter().filter_map(ApiRecord::to_record).collect())
    }

    async fn present(
        &self,
        zone: &str,
        name: &str,
        rtype: RecordType,
        value: &str,
        ttl: u32,
    ) -> Result<ChangeSet> {
        let zone_id = self.zone_id(zone).await?;
        let existing = self.find_records(&zone_id, name, rtype).await?;

        let mut changes = ChangeSet::default();
        for record in &existing {
            self.delete_record(&zone_id, &record.id)
                .await
                .map_err(|err| {
                    Error::backend_partial(err.to_string(), changes.clone())
                })?;
            if let Some(deleted) = record.to_record() {
                changes.deletions.push(deleted);
            }
        }

        // MX priority is a separate API field
        let (priority, content) = match rtype {
            RecordType::Mx => {
                let mut parts = value.splitn(2, ' ');
                let (Some(priority), Some(exchange)) = (parts.next(), parts.next()) else {
                    return Err(Error::invalid_record(format!(
                        "MX value must be '<preference> <exchange>', got '{value}'"
                    )));
                };
                let priority: u16 = priority.parse().map_err(|_| {
                    Error::invalid_record(format!("bad MX preference '{priority}'"))
                })?;
                (Some(priority), exchange.to_string())
            }
            _ => (None, value.to_string()),
        };

        let body = serde_json::json!({
            "name": unfqdn(name),
            "type": rtype.to_string(),
            "content": content,
            "ttl": ttl,
            "priority": priority,
        });
        let url = format!("{API_BASE}/zones/{zone_id}/dns_records");
        let created: ApiRecord = self
            .send(self.client.post(&url).json(&body))
            .await
            .map_err(|err| Error::backend_partial(err.to_string(), changes.clone()))?;
        debug!(%name, %rtype, "record replaced");

        if let Some(added) = created.to_record() {
            changes.additions.push(added);
        }
        Ok(changes)
    }

    async fn absent(&self, zone: &str, name: &str, rtype: RecordType) -> Result<ChangeSet> {
        let zone_id = self.zone_id(zone).await?;
        let existing = self.find_records(&zone_id, name, rtype).await?;
        if existing.is_empty() {
            return Err(Error::not_found(format!("{name}/{rtype}")));
        }

        let mut changes = ChangeSet::default();
        for record in &existing {
            self.delete_record(&zone_id, &record.id)
                .await
                .map_err(|err| {
                    Error::backend_partial(err.to_string(), changes.clone())
                })?;
            if let Some(deleted) = record.to_record() {
                changes.deletions.push(deleted);
            }
        }
        debug!(%name, %rtype, "record set deleted");
        Ok(changes)
    }
}

/// Builds [`CloudflareProvider`] from either a `Token` setting or the
/// legacy `Key` + `Email` pair.
pub struct CloudflareFactory;

impl ProviderFactory for CloudflareFactory {
    fn create(&self, settings: &HashMap<String, String>) -> Result<Arc<dyn DnsProvider>> {
        let auth = if let Some(token) = settings.get("Token") {
            if token.is_empty() {
                return Err(Error::config("cloudflare 'Token' must not be empty"));
            }
            Auth::Token(token.clone())
        } else {
            match (settings.get("Key"), settings.get("Email")) {
                (Some(key), Some(email)) if !key.is_empty() && !email.is_empty() => {
                    Auth::KeyEmail {
                        key: key.clone(),
                        email: email.clone(),
                    }
                }
                _ => {
                    return Err(Error::config(
                        "cloudflare provider needs 'Token', or 'Key' and 'Email'",
                    ))
                }
            }
        };
        Ok(Arc::new(CloudflareProvider::new(auth)?))
    }
}

/// Register this backend under the `cloudflare` type tag.
pub fn register(registry: &ProviderRegistry) {
    registry.register("cloudflare", Box::new(CloudflareFactory));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn factory_accepts_token_auth() {
        let factory = CloudflareFactory;
        assert!(factory.create(&settings(&[("Token", "abc")])).is_ok());
        assert!(factory.create(&settings(&[("Token", "")])).is_err());
    }

    #[test]
    fn factory_accepts_key_email_auth() {
        let factory = CloudflareFactory;
        assert!(factory
            .create(&settings(&[("Key", "abc"), ("Email", "a@example.com")]))
            .is_ok());
        assert!(factory.create(&settings(&[("Key", "abc")])).is_err());
        assert!(factory.create(&settings(&[])).is_err());
    }

    #[test]
    fn debug_never_shows_credentials() {
        let provider = CloudflareProvider::new(Auth::Token("secret-token-123".to_string()))
            .unwrap();
        let debug = format!("{provider:?}");
        assert!(!debug.contains("secret-token-123"));
    }

    #[test]
    fn api_record_folds_mx_priority_into_value() {
        let record = ApiRecord {
            id: "1".to_string(),
            name: "example.com".to_string(),
            rtype: "MX".to_string(),
            content: "mail.example.com".to_string(),
            ttl: 300,
            priority: Some(10),
        };
        let record = record.to_record().unwrap();
        assert_eq!(record.rtype, RecordType::Mx);
        assert_eq!(record.values, vec!["10 mail.example.com"]);

        let unknown = ApiRecord {
            id: "2".to_string(),
            name: "example.com".to_string(),
            rtype: "CAA".to_string(),
            content: "0 issue \"ca.example.net\"".to_string(),
            ttl: 300,
            priority: None,
        };
        assert!(unknown.to_record().is_none());
    }
}
