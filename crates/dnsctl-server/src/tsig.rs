//! TSIG verification and response signing.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use dnsctl_core::{Error, Result, TsigAlgorithmName, TsigCredential};
use hickory_proto::op::Message;
use hickory_proto::rr::dnssec::rdata::tsig::TsigAlgorithm;
use hickory_proto::rr::dnssec::tsig::TSigner;
use hickory_proto::rr::Name;
use std::str::FromStr;

/// Allowed clock skew between signer and verifier, in seconds.
const TSIG_FUDGE_SECS: u16 = 300;

/// Verifies request signatures and signs responses with one shared key.
pub struct TsigAuth {
    signer: TSigner,
    key_name: Name,
}

impl TsigAuth {
    /// Build a signer from a parsed credential. Fails if the secret is
    /// not valid base64 or the algorithm is not usable for signing.
    pub fn new(credential: &TsigCredential) -> Result<Self> {
        let key = BASE64
            .decode(&credential.secret)
            .map_err(|err| Error::config(format!("TSIG secret is not valid base64: {err}")))?;
        let key_name = Name::from_str(&credential.key_name)
            .map_err(|err| Error::config(format!("bad TSIG key name: {err}")))?;
        let algorithm = match credential.algorithm {
            TsigAlgorithmName::HmacSha1 => TsigAlgorithm::HmacSha1,
            TsigAlgorithmName::HmacSha224 => TsigAlgorithm::HmacSha224,
            TsigAlgorithmName::HmacSha256 => TsigAlgorithm::HmacSha256,
            TsigAlgorithmName::HmacSha384 => TsigAlgorithm::HmacSha384,
            TsigAlgorithmName::HmacSha512 => TsigAlgorithm::HmacSha512,
        };
        let signer = TSigner::new(key, algorithm, key_name.clone(), TSIG_FUDGE_SECS)
            .map_err(|err| Error::config(format!("cannot build TSIG signer: {err}")))?;
        Ok(Self { signer, key_name })
    }

    /// Name of the key this listener accepts.
    pub fn key_name(&self) -> &Name {
        &self.key_name
    }

    /// Verify a signed request against the raw message bytes.
    ///
    /// Checks both the MAC and that the current time falls inside the
    /// signature's validity window.
    pub fn verify(&self, bytes: &[u8]) -> Result<()> {
        let (_, valid_range, _) = self
            .signer
            .verify_message_byte(None, bytes, true)
            .map_err(|err| Error::auth(format!("signature verification failed: {err}")))?;
        let now = Utc::now().timestamp() as u64;
        if !valid_range.contains(&now) {
            return Err(Error::auth("signature time outside the allowed window"));
        }
        Ok(())
    }

    /// Append a TSIG signature to a response message.
    pub fn sign(&self, message: &mut Message) -> Result<()> {
        let now = Utc::now().timestamp() as u32;
        message
            .finalize(&self.signer, now)
            .map_err(|err| Error::auth(format!("signing response failed: {err}")))?;
        Ok(())
    }
}
