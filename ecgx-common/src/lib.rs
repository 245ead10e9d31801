//! # ECGX Common Library
//!
//! Shared code for the ECGX crates:
//! - Error type used by configuration and setup code
//! - Configuration loading (TOML file, environment, command line)
//! - Tracing subscriber initialization

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
