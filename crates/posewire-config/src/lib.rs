//! Configuration system for posewire.
//!
//! Settings persist to disk as a RON file. Supports CLI overrides via clap
//! and forward/backward compatible serialization.

mod cli;
mod config;
mod error;

pub use cli::{CliArgs, Command};
pub use config::{
    CONFIG_FILE_NAME, Config, DebugSection, EvictionPolicy, HeartbeatSection, MessageShape,
    ServerSection, SyncSection, default_config_dir,
};
pub use error::ConfigError;
