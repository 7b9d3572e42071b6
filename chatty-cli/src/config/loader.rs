use super::types::{
    ChattyConfig, ClientSection, RawChattyConfig, RawClientSection, RawRelaySection,
    RawServerSection, ServerSection,
};
use anyhow::{Context, Result};
use chatty_core::RelayConfig;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Environment variable that relocates the project config directory
pub const PROJECT_CONFIG_DIR_ENV: &str = "CHATTY_PROJECT_CONFIG_DIR";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<ChattyConfig> {
        let mut layers = Vec::new();
        if let Some(user_path) = Self::user_config_path() {
            layers.push(user_path);
        }
        layers.push(Self::project_config_path());

        Self::load_layers(&layers)
    }

    /// Load and merge the given files in order; later files win, missing files are skipped
    pub fn load_layers(paths: &[PathBuf]) -> Result<ChattyConfig> {
        let mut raw = RawChattyConfig::default();
        for path in paths {
            if let Some(layer) = Self::read_layer(path)? {
                raw = Self::merge_raw(raw, layer);
            }
        }
        Ok(Self::finalize(raw))
    }

    /// Get user config path (platform-specific)
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "chatty").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get project config path
    /// Can be overridden with CHATTY_PROJECT_CONFIG_DIR
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var(PROJECT_CONFIG_DIR_ENV) {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".chatty/config.toml")
        }
    }

    fn read_layer(path: &Path) -> Result<Option<RawChattyConfig>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let layer = toml::from_str(&contents)
            .with_context(|| format!("Invalid config in {}", path.display()))?;
        Ok(Some(layer))
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawChattyConfig, overlay: RawChattyConfig) -> RawChattyConfig {
        RawChattyConfig {
            server: RawServerSection {
                host: overlay.server.host.or(base.server.host),
                port: overlay.server.port.or(base.server.port),
            },
            relay: RawRelaySection {
                sweep_interval_secs: overlay
                    .relay
                    .sweep_interval_secs
                    .or(base.relay.sweep_interval_secs),
                inactivity_timeout_secs: overlay
                    .relay
                    .inactivity_timeout_secs
                    .or(base.relay.inactivity_timeout_secs),
            },
            client: RawClientSection {
                server_url: overlay.client.server_url.or(base.client.server_url),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawChattyConfig) -> ChattyConfig {
        let server_defaults = ServerSection::default();
        let relay_defaults = RelayConfig::default();

        ChattyConfig {
            server: ServerSection {
                host: raw.server.host.unwrap_or(server_defaults.host),
                port: raw.server.port.unwrap_or(server_defaults.port),
            },
            relay: RelayConfig {
                sweep_interval_secs: raw
                    .relay
                    .sweep_interval_secs
                    .unwrap_or(relay_defaults.sweep_interval_secs),
                inactivity_timeout_secs: raw
                    .relay
                    .inactivity_timeout_secs
                    .unwrap_or(relay_defaults.inactivity_timeout_secs),
            },
            client: raw
                .client
                .server_url
                .map(|server_url| ClientSection { server_url })
                .unwrap_or_default(),
        }
    }
}
