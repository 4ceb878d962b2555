//! posewire application: wires config, logging, the ingest server and the
//! consumer tick loop into the `serve` and `echo` commands.

pub mod echo;
pub mod error;
pub mod serve;
pub mod sinks;
pub mod startup;
pub mod tick;

pub use error::AppError;
