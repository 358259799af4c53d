// src/utils/errors.rs
//! Crate-wide error type
//!
//! Errors here cover configuration and observability setup only. Admission
//! outcomes (denials, timeouts, aborts) are declarative result values in
//! `capacity`, never errors: the admission path must stay total on
//! caller-controlled input.

use thiserror::Error;

/// Engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration could not be loaded or parsed
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Configuration loaded but failed validation
    #[error("invalid limits: {0}")]
    InvalidLimits(String),

    /// Tracing subscriber installation failed
    #[error("tracing init error: {0}")]
    TracingInit(String),

    /// Metrics exporter installation failed
    #[error("metrics init error: {0}")]
    MetricsInit(String),
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, EngineError>;
