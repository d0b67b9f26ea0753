//! Logging utilities.
//!
//! Centralizes logger initialization behind the standard `log` facade so the
//! harness and its consumers share one configuration point.

mod init;

pub use init::{init_logging, LoggingConfig};
