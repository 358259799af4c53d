// src/utils/mod.rs
//! Common utilities and helpers
//!
//! - **Errors**: crate-wide error type and `Result` alias
//! - **Config**: layered configuration loading (file + environment)
//! - **Time**: epoch-millisecond clock helper

pub mod config;
pub mod errors;
pub mod time;

pub use config::EngineConfig;
pub use errors::{EngineError, Result};
pub use time::now_ms;
