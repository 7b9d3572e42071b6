use chatty_core::RelayConfig;
use chatty_server::{DEFAULT_HOST, DEFAULT_PORT};
use serde::{Deserialize, Serialize};

/// Server URL the terminal client talks to when nothing else is configured
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8080";

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawChattyConfig {
    #[serde(default)]
    pub server: RawServerSection,

    #[serde(default)]
    pub relay: RawRelaySection,

    #[serde(default)]
    pub client: RawClientSection,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawRelaySection {
    pub sweep_interval_secs: Option<u64>,
    pub inactivity_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawClientSection {
    pub server_url: Option<String>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ChattyConfig {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub relay: RelayConfig,

    #[serde(default)]
    pub client: ClientSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSection {
    /// Address the relay binds to
    pub host: String,
    /// Port the relay listens on
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSection {
    /// Base HTTP URL of the relay for `chatty chat`
    pub server_url: String,
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
        }
    }
}
