//! Command-line argument parsing for posewire.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::{Config, EvictionPolicy, MessageShape};

/// posewire command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug)]
#[command(name = "posewire", about = "Pose telemetry ingest server")]
pub struct CliArgs {
    /// What to run. Defaults to `serve`.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Address to listen on.
    #[arg(long, global = true)]
    pub bind: Option<String>,

    /// Port to listen on.
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Message layout expected from the sender.
    #[arg(long, value_enum, global = true)]
    pub shape: Option<MessageShape>,

    /// Per-axis jitter tolerance.
    #[arg(long, global = true)]
    pub tolerance: Option<f32>,

    /// Number of recently created markers kept visible.
    #[arg(long, global = true)]
    pub window: Option<usize>,

    /// Recency window eviction strategy.
    #[arg(long, value_enum, global = true)]
    pub eviction: Option<EvictionPolicy>,

    /// Consumer tick rate in Hz.
    #[arg(long, global = true)]
    pub tick_hz: Option<u32>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Listen for a sender and reconcile its messages.
    Serve,
    /// Connect to a server and echo every message back.
    Echo {
        /// Server address, e.g. `127.0.0.1:54750`.
        #[arg(long)]
        addr: String,
    },
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref addr) = args.bind {
            self.server.bind_address = addr.clone();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }
        if let Some(shape) = args.shape {
            self.server.shape = shape;
        }
        if let Some(tolerance) = args.tolerance {
            self.sync.tolerance = tolerance;
        }
        if let Some(window) = args.window {
            self.sync.window_capacity = window;
        }
        if let Some(eviction) = args.eviction {
            self.sync.eviction = eviction;
        }
        if let Some(hz) = args.tick_hz {
            self.sync.tick_hz = hz;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
