//! Configuration file model and TSIG credential parsing.
//!
//! Configuration is a single JSON file with PascalCase keys:
//!
//! ```json
//! {
//!   "Providers": { "cf": { "Type": "cloudflare", "Token": "..." } },
//!   "Domains": { "example.com.": "cf" },
//!   "Tsig": "hmac-sha256:update-key:c2VjcmV0",
//!   "Listen": "[::]:53"
//! }
//! ```

use crate::error::{Error, Result};
use crate::record::fqdn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::str::FromStr;

/// Environment variable naming the configuration file when no path is
/// given on the command line.
pub const CONFIG_ENV: &str = "DNSCTL_CONFIG";

const DEFAULT_LISTEN: &str = "[::]:53";

/// Top-level configuration file contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Config {
    /// Named provider settings; each map needs at least a `Type` key
    pub providers: HashMap<String, HashMap<String, String>>,
    /// Zone name to provider name
    pub domains: HashMap<String, String>,
    /// TSIG credential string, `[algorithm:]name:base64-secret`
    pub tsig: String,
    /// Listen address for the update listener
    pub listen: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            domains: HashMap::new(),
            tsig: String::new(),
            listen: DEFAULT_LISTEN.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from `$DNSCTL_CONFIG` when no
    /// path is given.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_string(),
            None => std::env::var(CONFIG_ENV).map_err(|_| {
                Error::config(format!("no config path given and {CONFIG_ENV} is not set"))
            })?,
        };
        let data = fs::read_to_string(&path)
            .map_err(|err| Error::config(format!("cannot read {path}: {err}")))?;
        let config: Config = serde_json::from_str(&data)
            .map_err(|err| Error::config(format!("cannot parse {path}: {err}")))?;
        Ok(config)
    }

    /// Parse the configured TSIG credential.
    pub fn tsig_credential(&self) -> Result<TsigCredential> {
        if self.tsig.is_empty() {
            return Err(Error::config("no Tsig credential configured"));
        }
        self.tsig.parse()
    }
}

/// HMAC algorithms accepted for TSIG signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TsigAlgorithmName {
    HmacSha1,
    HmacSha224,
    HmacSha256,
    HmacSha384,
    HmacSha512,
}

impl fmt::Display for TsigAlgorithmName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::HmacSha1 => "hmac-sha1",
            Self::HmacSha224 => "hmac-sha224",
            Self::HmacSha256 => "hmac-sha256",
            Self::HmacSha384 => "hmac-sha384",
            Self::HmacSha512 => "hmac-sha512",
        };
        f.write_str(s)
    }
}

impl FromStr for TsigAlgorithmName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hmac-sha1" => Ok(Self::HmacSha1),
            "hmac-sha224" => Ok(Self::HmacSha224),
            "hmac-sha256" => Ok(Self::HmacSha256),
            "hmac-sha384" => Ok(Self::HmacSha384),
            "hmac-sha512" => Ok(Self::HmacSha512),
            other => Err(Error::config(format!("unknown TSIG algorithm '{other}'"))),
        }
    }
}

/// A parsed TSIG key: algorithm, key name, and base64-encoded secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsigCredential {
    pub algorithm: TsigAlgorithmName,
    /// Fully-qualified key name
    pub key_name: String,
    /// Base64-encoded shared secret
    pub secret: String,
}

impl FromStr for TsigCredential {
    type Err = Error;

    /// Parse `algorithm:name:secret`, or `name:secret` defaulting the
    /// algorithm to hmac-sha1.
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.splitn(3, ':').collect();
        let (algorithm, key_name, secret) = match parts.as_slice() {
            [algorithm, name, secret] => (algorithm.parse()?, *name, *secret),
            [name, secret] => (TsigAlgorithmName::HmacSha1, *name, *secret),
            _ => {
                return Err(Error::config(
                    "TSIG credential must be '[algorithm:]name:base64-secret'",
                ))
            }
        };
        if key_name.is_empty() || secret.is_empty() {
            return Err(Error::config("TSIG key name and secret must be non-empty"));
        }
        Ok(Self {
            algorithm,
            key_name: fqdn(key_name),
            secret: secret.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tsig_three_part_form() {
        let cred: TsigCredential = "hmac-sha256:update-key:c2VjcmV0".parse().unwrap();
        assert_eq!(cred.algorithm, TsigAlgorithmName::HmacSha256);
        assert_eq!(cred.key_name, "update-key.");
        assert_eq!(cred.secret, "c2VjcmV0");
    }

    #[test]
    fn tsig_two_part_form_defaults_algorithm() {
        let cred: TsigCredential = "update-key:c2VjcmV0".parse().unwrap();
        assert_eq!(cred.algorithm, TsigAlgorithmName::HmacSha1);
        assert_eq!(cred.key_name, "update-key.");
    }

    #[test]
    fn tsig_rejects_bad_forms() {
        assert!("just-a-name".parse::<TsigCredential>().is_err());
        assert!("hmac-md5:key:secret".parse::<TsigCredential>().is_err());
        assert!(":secret".parse::<TsigCredential>().is_err());
    }

    #[test]
    fn config_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.listen, "[::]:53");
        assert!(config.providers.is_empty());
        assert!(config.tsig_credential().is_err());
    }

    #[test]
    fn config_parses_pascal_case_keys() {
        let config: Config = serde_json::from_str(
            r#"{
                "Providers": { "cf": { "Type": "cloudflare", "Token": "t" } },
                "Domains": { "example.com.": "cf" },
                "Tsig": "hmac-sha256:k:c2VjcmV0",
                "Listen": "127.0.0.1:5353"
            }"#,
        )
        .unwrap();
        assert_eq!(config.domains["example.com."], "cf");
        assert_eq!(config.providers["cf"]["Type"], "cloudflare");
        assert_eq!(config.listen, "127.0.0.1:5353");
        let cred = config.tsig_credential().unwrap();
        assert_eq!(cred.algorithm, TsigAlgorithmName::HmacSha256);
    }
}
