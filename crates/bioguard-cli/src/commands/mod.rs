//! Command implementations for the CLI.

mod config;
mod decode;
mod monitor;

pub use config::cmd_config;
pub use decode::cmd_decode;
pub use monitor::{MonitorArgs, cmd_monitor};
