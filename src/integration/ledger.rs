use std::fmt;
use std::io;

use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{AnnounceError, ConfigError};
use crate::jhu::USER_AGENT;
use crate::report::OutboundReport;

pub type Acknowledgement = serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkType {
    TestNet,
    MainNet
}

impl NetworkType {
    pub fn from_name(name: &str) -> Result<NetworkType, ConfigError> {
        match name.to_lowercase().as_ref() {
            "test" | "testnet" => { Ok(NetworkType::TestNet) },
            "main" | "mainnet" => { Ok(NetworkType::MainNet) },
            other => { Err(ConfigError::Network(other.to_owned())) }
        }
    }

    fn prefix(self) -> char {
        match self {
            NetworkType::TestNet => { 'T' },
            NetworkType::MainNet => { 'N' }
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct AccountAddress(pub String);

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The reporting account. Holds the private key, which never leaves this type
/// except as part of a digest.
#[derive(Clone)]
pub struct Account {
    key: Vec<u8>,
    pub network: NetworkType,
    pub address: AccountAddress
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}

impl Account {
    pub fn from_private_key(private_key: &str, network: NetworkType) -> Result<Account, ConfigError> {
        lazy_static! {
            static ref RE_PRIVATE_KEY: Regex = Regex::new(r"^[0-9A-Fa-f]{64}$").unwrap();
        }

        let private_key = private_key.trim();
        if !RE_PRIVATE_KEY.is_match(private_key) {
            return Err(ConfigError::PrivateKey);
        }

        let mut key = Vec::with_capacity(32);
        for i in (0..private_key.len()).step_by(2) {
            let byte = u8::from_str_radix(&private_key[i..i+2], 16).map_err(|_| ConfigError::PrivateKey)?;
            key.push(byte);
        }

        let hashed = Sha256::digest(&key);
        let address = AccountAddress(format!("{}{}", network.prefix(), to_hex(&hashed[..20])));

        Ok(Account { key, network, address })
    }

    /// SHA-256 over the key bytes followed by `payload`, upper-case hex.
    pub fn digest(&self, payload: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.key);
        hasher.update(payload);
        to_hex(&hasher.finalize())
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("network", &self.network)
            .field("address", &self.address)
            .field("key", &"<redacted>")
            .finish()
    }
}

#[derive(Serialize, Debug)]
pub struct AnnounceEnvelope<'a> {
    pub channel: &'a str,
    pub tag: &'a str,
    pub signer: &'a AccountAddress,
    pub report: &'a OutboundReport,
    pub digest: String
}

impl<'a> AnnounceEnvelope<'a> {
    pub fn new(signer: &'a Account, report: &'a OutboundReport, channel: &'a str, tag: &'a str) -> Result<AnnounceEnvelope<'a>, AnnounceError> {
        let payload = serde_json::to_vec(report)?;

        Ok(AnnounceEnvelope {
            channel,
            tag,
            signer: &signer.address,
            report,
            digest: signer.digest(&payload)
        })
    }
}

/// Submits a finished report to the archive.
pub trait Announce {
    fn announce(&self, signer: &Account, report: &OutboundReport, channel: &str, tag: &str) -> Result<Acknowledgement, AnnounceError>;
}

impl<T: Announce + ?Sized> Announce for &T {
    fn announce(&self, signer: &Account, report: &OutboundReport, channel: &str, tag: &str) -> Result<Acknowledgement, AnnounceError> {
        (**self).announce(signer, report, channel, tag)
    }
}

pub struct HttpLedger {
    pub node_url: String,
    pub connect_timeout: u64,
    pub receive_timeout: u64
}

impl HttpLedger {
    pub fn announce_url(&self) -> String {
        format!("{}/archive/reports", self.node_url.trim_end_matches('/'))
    }
}

impl Announce for HttpLedger {
    fn announce(&self, signer: &Account, report: &OutboundReport, channel: &str, tag: &str) -> Result<Acknowledgement, AnnounceError> {
        let envelope = AnnounceEnvelope::new(signer, report, channel, tag)?;
        let body = serde_json::to_string(&envelope)?;
        let target_url = self.announce_url();
        debug!("Announcing {} bytes to {}", body.len(), target_url);

        let response = ureq::post(&target_url)
            .set("User-Agent", USER_AGENT)
            .set("Content-Type", "application/json")
            .timeout_connect(self.connect_timeout)
            .timeout_read(self.receive_timeout)
            .send_string(&body);

        if let Some(error) = response.synthetic_error() {
            return Err(AnnounceError::Transport { url: target_url, message: error.to_string() });
        }

        if !response.ok() {
            let status = response.status();
            let status_text = response.status_text().to_owned();
            return Err(rejected(status, status_text, response.into_string()));
        }

        response.into_json().map_err(AnnounceError::Acknowledgement)
    }
}

fn rejected(status: u16, status_text: String, body: io::Result<String>) -> AnnounceError {
    let body = match body {
        Ok(b) => { b },
        Err(e) => {
            debug!("Failed to read rejection body: {}", e);
            format!("<unreadable body: {}>", e)
        }
    };

    AnnounceError::Rejected { status, status_text, body }
}

/// Prints the envelope instead of sending it.
pub struct DryRunLedger;

impl Announce for DryRunLedger {
    fn announce(&self, signer: &Account, report: &OutboundReport, channel: &str, tag: &str) -> Result<Acknowledgement, AnnounceError> {
        let envelope = AnnounceEnvelope::new(signer, report, channel, tag)?;
        println!("{}", serde_json::to_string_pretty(&envelope)?);

        Ok(serde_json::json!({ "dry_run": true, "digest": envelope.digest }))
    }
}
