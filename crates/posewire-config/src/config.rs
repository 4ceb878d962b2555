//! Configuration structs with sensible defaults and RON persistence.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File name used inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.ron";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Listening endpoint and framing limits.
    pub server: ServerSection,
    /// Consumer-side reconciliation settings.
    pub sync: SyncSection,
    /// Outbound liveness signal.
    pub heartbeat: HeartbeatSection,
    /// Debug/development settings.
    pub debug: DebugSection,
}

/// Which message layout a deployment receives. Exactly one per session.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
pub enum MessageShape {
    /// `{resp, id, x, y, z}` marker pose updates.
    #[default]
    Pose,
    /// Flat left hand / right hand / head snapshot.
    Joints,
}

/// How the recency window hides old entities.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
pub enum EvictionPolicy {
    /// Hide the single oldest entity as soon as capacity is exceeded.
    #[default]
    SlidingWindow,
    /// Wait for `capacity + 1` creations, then hide the first `capacity` at once.
    BatchSweep,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerSection {
    /// IP address to listen on.
    pub bind_address: String,
    /// TCP port to listen on.
    pub port: u16,
    /// Message layout expected from the sender.
    pub shape: MessageShape,
    /// Upper bound on a single undelimited frame, in bytes.
    pub max_frame_len: usize,
    /// Size of the per-read socket buffer, in bytes.
    pub read_buffer_size: usize,
}

/// Reconciler configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncSection {
    /// Per-axis absolute difference treated as noise.
    pub tolerance: f32,
    /// Number of recently created entities kept visible.
    pub window_capacity: usize,
    /// Eviction strategy for the recency window.
    pub eviction: EvictionPolicy,
    /// Consumer tick rate (Hz).
    pub tick_hz: u32,
    /// Send an `anchor_created` message back for every new entity.
    pub announce_created: bool,
}

/// Heartbeat configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HeartbeatSection {
    /// Whether heartbeats are sent at all.
    pub enabled: bool,
    /// Seconds of consumer clock time between heartbeats.
    pub interval_secs: f64,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugSection {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Directory for the JSON log file. `None` disables file logging.
    pub log_dir: Option<PathBuf>,
}

// --- Default implementations ---

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 54750,
            shape: MessageShape::Pose,
            max_frame_len: 64 * 1024,
            read_buffer_size: 1024,
        }
    }
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            tolerance: 0.01,
            window_capacity: 2,
            eviction: EvictionPolicy::SlidingWindow,
            tick_hz: 60,
            announce_created: false,
        }
    }
}

impl Default for HeartbeatSection {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 2.0,
        }
    }
}

impl Default for DebugSection {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl ServerSection {
    /// Resolve `bind_address` and `port` into a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .bind_address
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(self.bind_address.clone()))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Platform config directory for posewire, e.g. `~/.config/posewire` on Linux.
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("posewire"))
}

// --- Load / Save ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::debug!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::debug!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }
}
