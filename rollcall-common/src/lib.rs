//! # Rollcall Common Library
//!
//! Shared code for the rollcall crates:
//! - Error taxonomy (run-level vs. recoverable faults)
//! - TOML bootstrap configuration and credential resolution
//! - Logging initialization

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
