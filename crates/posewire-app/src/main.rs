//! The binary entry point for posewire.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use posewire_app::startup::load_config;
use posewire_app::{echo, serve};
use posewire_config::{CliArgs, Command, default_config_dir};

fn main() {
    let args = CliArgs::parse();

    let config_dir = args.config.clone().or_else(default_config_dir);
    let (mut config, source) = match load_config(config_dir.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };
    config.apply_cli_overrides(&args);

    posewire_log::init_logging(Some(&config));
    source.log();

    let result = match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let running = Arc::new(AtomicBool::new(true));
            let flag = Arc::clone(&running);
            if let Err(e) = ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst)) {
                tracing::warn!("Could not install Ctrl-C handler: {e}");
            }
            serve::run(&config, &running)
        }
        Command::Echo { addr } => echo::run(&addr, config.server.shape).map(|_| ()),
    };

    if let Err(e) = result {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
