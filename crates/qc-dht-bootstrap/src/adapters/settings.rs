//! Settings sources: in-memory and TOML file.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::Deserialize;

use crate::config::DhtSettings;
use crate::domain::{ConfigError, LayerId};
use crate::ports::DhtSettingsSource;

// ============================================================================
// StaticSettingsProvider - In-memory settings for testing/development
// ============================================================================

/// Settings held in memory; `update` changes what the next read returns.
#[derive(Debug, Default)]
pub struct StaticSettingsProvider {
    settings: RwLock<DhtSettings>,
}

impl StaticSettingsProvider {
    /// Provider returning `settings`.
    pub fn new(settings: DhtSettings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }

    /// Modify the live settings.
    pub fn update<F: FnOnce(&mut DhtSettings)>(&self, change: F) {
        change(&mut *self.settings.write());
    }
}

impl DhtSettingsSource for StaticSettingsProvider {
    fn settings(&self) -> DhtSettings {
        self.settings.read().clone()
    }
}

// ============================================================================
// TomlSettingsProvider - Settings loaded from a TOML file
// ============================================================================

#[derive(Debug, Deserialize, Default)]
struct SettingsFile {
    #[serde(default)]
    dht: DhtSection,
    #[serde(default)]
    kademlia: KademliaSection,
}

#[derive(Debug, Deserialize, Default)]
struct DhtSection {
    udp_port: Option<u16>,
    data_dir: Option<PathBuf>,
    known_nodes: Option<String>,
    attached_layers: Option<String>,
    open_layers: Option<Vec<LayerId>>,
}

#[derive(Debug, Deserialize, Default)]
struct KademliaSection {
    bucket_size: Option<usize>,
    parallel_calls: Option<usize>,
    default_age_secs: Option<u64>,
    max_age_secs: Option<u64>,
    refresh_timeout_secs: Option<u64>,
    rpc_timeout_secs: Option<u64>,
}

/// DHT settings loaded from a TOML file.
///
/// # Config File Format
///
/// ```toml
/// [dht]
/// udp_port = 14441
/// data_dir = "/var/lib/quantum-chain/dht"
/// known_nodes = "seed-1.quantum-chain.net:14441, seed-2.quantum-chain.net:14441"
/// attached_layers = "1,2"
/// open_layers = [0, 1, 2]
///
/// [kademlia]
/// bucket_size = 20
/// parallel_calls = 3
/// rpc_timeout_secs = 10
/// ```
#[derive(Debug)]
pub struct TomlSettingsProvider {
    path: Option<PathBuf>,
    settings: RwLock<DhtSettings>,
}

impl TomlSettingsProvider {
    /// Load settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Self::read(path.as_ref())?;
        Ok(Self {
            path: Some(path.as_ref().to_path_buf()),
            settings: RwLock::new(settings),
        })
    }

    /// Parse settings from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            path: None,
            settings: RwLock::new(Self::parse_settings(content)?),
        })
    }

    /// Re-read the file this provider was loaded from.
    ///
    /// Returns `(old, new)` when the UDP port changed, so the caller can
    /// forward it to `DhtBootstrapCoordinator::on_udp_port_modified`.
    pub fn reload(&self) -> Result<Option<(u16, u16)>, ConfigError> {
        let Some(path) = &self.path else {
            return Ok(None);
        };
        let fresh = Self::read(path)?;

        let mut settings = self.settings.write();
        let old_port = settings.udp_port;
        let new_port = fresh.udp_port;
        *settings = fresh;
        Ok((old_port != new_port).then_some((old_port, new_port)))
    }

    fn read(path: &Path) -> Result<DhtSettings, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse_settings(&content)
    }

    fn parse_settings(content: &str) -> Result<DhtSettings, ConfigError> {
        let file: SettingsFile =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let defaults = DhtSettings::default();
        let (dht, kad) = (file.dht, file.kademlia);
        Ok(DhtSettings {
            udp_port: dht.udp_port.unwrap_or(defaults.udp_port),
            data_dir: dht.data_dir.unwrap_or(defaults.data_dir),
            known_nodes: dht.known_nodes.unwrap_or(defaults.known_nodes),
            attached_layers: dht.attached_layers.unwrap_or(defaults.attached_layers),
            open_layers: dht.open_layers.unwrap_or(defaults.open_layers),
            bucket_size: kad.bucket_size.unwrap_or(defaults.bucket_size),
            parallel_calls: kad.parallel_calls.unwrap_or(defaults.parallel_calls),
            default_age_secs: kad.default_age_secs.unwrap_or(defaults.default_age_secs),
            max_age_secs: kad.max_age_secs.unwrap_or(defaults.max_age_secs),
            refresh_timeout_secs: kad
                .refresh_timeout_secs
                .unwrap_or(defaults.refresh_timeout_secs),
            rpc_timeout_secs: kad.rpc_timeout_secs.unwrap_or(defaults.rpc_timeout_secs),
        })
    }
}

impl DhtSettingsSource for TomlSettingsProvider {
    fn settings(&self) -> DhtSettings {
        self.settings.read().clone()
    }
}
