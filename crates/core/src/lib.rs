//! Core types and configuration for the cross-venue analysis engine.
//!
//! This crate provides shared types used across all other crates:
//! - Raw and paired market samples
//! - Correlation and presence result rows
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use types::*;
