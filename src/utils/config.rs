// src/utils/config.rs
//! Engine configuration loading
//!
//! Layered loading through the `config` crate: an optional `capacity.toml`
//! file, overridden by `CAPACITY_*` environment variables
//! (e.g. `CAPACITY_LIMITS__MAX_TOTAL_ACTIVE_LLM=4`).

use crate::capacity::limits::CapacityLimits;
use crate::utils::errors::{EngineError, Result};
use serde::{Deserialize, Serialize};

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Capacity ceilings and timing knobs
    pub limits: CapacityLimits,

    /// Log filter directive (tracing env-filter syntax)
    pub log_filter: Option<String>,
}

impl EngineConfig {
    /// Load configuration from `capacity.toml` (if present) and environment
    pub fn load() -> Result<Self> {
        Self::load_from(Some("capacity"))
    }

    /// Load configuration from an explicit file stem (no extension), or
    /// environment only when `None`
    pub fn load_from(file_stem: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(stem) = file_stem {
            builder = builder.add_source(config::File::with_name(stem).required(false));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix("CAPACITY").separator("__"))
            .build()?;

        let engine: EngineConfig = settings.try_deserialize()?;
        engine.limits.validate().map_err(EngineError::InvalidLimits)?;

        Ok(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_when_no_file() {
        let cfg = EngineConfig::load_from(None).unwrap();
        assert_eq!(cfg.limits, CapacityLimits::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capacity.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[limits]\nmax_total_active_requests = 5\nmax_total_active_llm = 3"
        )
        .unwrap();

        let stem = path.with_extension("");
        let cfg = EngineConfig::load_from(Some(stem.to_str().unwrap())).unwrap();
        assert_eq!(cfg.limits.max_total_active_requests, 5);
        assert_eq!(cfg.limits.max_total_active_llm, 3);
        // Unspecified fields keep defaults
        assert_eq!(
            cfg.limits.max_queue_depth,
            CapacityLimits::default().max_queue_depth
        );
    }

    #[test]
    fn test_invalid_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capacity.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[limits]\nmax_total_active_requests = 0").unwrap();

        let stem = path.with_extension("");
        let result = EngineConfig::load_from(Some(stem.to_str().unwrap()));
        assert!(matches!(result, Err(EngineError::InvalidLimits(_))));
    }
}
