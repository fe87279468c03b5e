//! Common infrastructure shared by the ShopCall crates.
//!
//! Holds the logging bootstrap used by every binary in the workspace and the
//! small error type it reports through.

pub mod errors;
pub mod logging;

pub use errors::types::{Error, Result};
pub use logging::setup::{log_welcome, parse_log_level, setup_logging, LoggingConfig};
