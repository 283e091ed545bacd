//! Core types and shared functionality for transclusion.
//!
//! This crate provides:
//! - Unified error types
//! - Layered configuration
//! - Diagnostic reporting

pub mod config;
pub mod diagnostics;
pub mod error;

pub use config::{AppConfig, ConfigError};
pub use diagnostics::{CollectingSink, Diagnostic, DiagnosticSink, Level, Reporter, TracingSink};
pub use error::Error;
