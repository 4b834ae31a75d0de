use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;

use rpassword::prompt_password_stdout;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::integration::ledger::NetworkType;
use crate::jhu::DAILY_REPORTS_BASE_URL;
use crate::scheduler::DailyTrigger;

const DEFAULT_TRIGGER: &str = "23:59";
const HTTP_CONNECT_TIMEOUT: u64 = 30000;
const HTTP_RECEIVE_TIMEOUT: u64 = 60000;   // the US daily files run to several MB

#[derive(Deserialize, Debug)]
pub struct LedgerSection {
    pub node_url: String,
    #[serde(default = "default_network")]
    pub network: String,
    #[serde(default = "default_channel")]
    pub channel: String,
    #[serde(default = "default_tag")]
    pub tag: String
}

#[derive(Deserialize, Debug)]
pub struct ScheduleSection {
    #[serde(default = "default_trigger")]
    pub trigger: String
}

#[derive(Deserialize, Debug)]
pub struct HttpSection {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
    #[serde(default = "default_receive_timeout")]
    pub receive_timeout: u64,
    #[serde(default = "default_abort")]
    pub abort_on_fetch_failure: bool
}

/// Layout of `bot.toml`.
#[derive(Deserialize, Debug)]
pub struct FileConfig {
    pub ledger: LedgerSection,
    #[serde(default)]
    pub schedule: ScheduleSection,
    #[serde(default)]
    pub http: HttpSection
}

fn default_network() -> String { "test".to_owned() }
fn default_channel() -> String { "covid".to_owned() }
fn default_tag() -> String { "covidtrackertest".to_owned() }
fn default_trigger() -> String { DEFAULT_TRIGGER.to_owned() }
fn default_connect_timeout() -> u64 { HTTP_CONNECT_TIMEOUT }
fn default_receive_timeout() -> u64 { HTTP_RECEIVE_TIMEOUT }
fn default_abort() -> bool { true }

impl Default for ScheduleSection {
    fn default() -> Self {
        ScheduleSection { trigger: default_trigger() }
    }
}

impl Default for HttpSection {
    fn default() -> Self {
        HttpSection {
            connect_timeout: HTTP_CONNECT_TIMEOUT,
            receive_timeout: HTTP_RECEIVE_TIMEOUT,
            abort_on_fetch_failure: true
        }
    }
}

/// Everything a run needs, fixed at startup.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub base_url: String,
    pub node_url: String,
    pub network: NetworkType,
    pub channel: String,
    pub tag: String,
    pub trigger: DailyTrigger,
    pub connect_timeout: u64,
    pub receive_timeout: u64,
    pub abort_on_fetch_failure: bool
}

impl BotConfig {
    pub fn from_file_config(file: FileConfig) -> Result<BotConfig, ConfigError> {
        Ok(BotConfig {
            base_url: DAILY_REPORTS_BASE_URL.to_owned(),
            node_url: file.ledger.node_url,
            network: NetworkType::from_name(&file.ledger.network)?,
            channel: file.ledger.channel,
            tag: file.ledger.tag,
            trigger: DailyTrigger::parse(&file.schedule.trigger)?,
            connect_timeout: file.http.connect_timeout,
            receive_timeout: file.http.receive_timeout,
            abort_on_fetch_failure: file.http.abort_on_fetch_failure
        })
    }
}

pub fn parse_config(text: &str, path: &str) -> Result<BotConfig, ConfigError> {
    let file: FileConfig = toml::from_str(text).map_err(|source| ConfigError::Toml { path: path.to_owned(), source })?;
    BotConfig::from_file_config(file)
}

pub fn load_config(path: &str) -> Result<BotConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.to_owned(), source })?;
    parse_config(&text, path)
}

/// `[ledger] private_key` from the secret config, if the file exists and has one.
pub fn secret_private_key(text: &str, path: &str) -> Result<Option<String>, ConfigError> {
    let secret: HashMap<String, HashMap<String, String>> = toml::from_str(text).map_err(|source| ConfigError::Toml { path: path.to_owned(), source })?;

    Ok(secret.get("ledger").and_then(|ledger| ledger.get("private_key")).cloned())
}

/// Reads the private key from the secret config, falling back to a prompt
/// only when the file does not exist.
pub fn load_private_key(path: &str) -> Result<String, ConfigError> {
    let from_file = match fs::read_to_string(path) {
        Ok(s) => { secret_private_key(&s, path)? },
        Err(e) if e.kind() == ErrorKind::NotFound => { None },
        Err(source) => { return Err(ConfigError::Read { path: path.to_owned(), source }) }
    };

    match from_file {
        Some(key) => { Ok(key) },
        None => { prompt_password_stdout("Private key: ").map_err(ConfigError::Prompt) }
    }
}
