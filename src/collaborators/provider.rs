// src/collaborators/provider.rs
//! Provider limits resolver interface
//!
//! Static, tier-dependent provider ceilings. The default implementation
//! carries a small built-in table; hosts plug in a real resolver at
//! composition time.

use serde::{Deserialize, Serialize};

/// Provider subscription tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderTier {
    Free,
    Standard,
    Scale,
}

/// Static ceilings a provider imposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderLimits {
    /// Concurrent requests the provider tolerates
    pub max_concurrent_requests: u64,

    /// Concurrent inference calls the provider tolerates
    pub max_concurrent_llm: u64,
}

/// Static/tiered provider ceilings
pub trait ProviderLimitResolver: Send + Sync {
    /// Ceilings for a provider at its detected tier
    fn resolve_limits(&self, provider: &str) -> ProviderLimits;

    /// Subscription tier for a provider
    fn detect_tier(&self, provider: &str) -> ProviderTier;

    /// Concurrency ceiling for one provider/model pair
    fn concurrency_limit(&self, provider: &str, model: &str) -> u64;
}

/// Default resolver with a conservative built-in table.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticProviderLimits;

impl StaticProviderLimits {
    fn tier_limits(tier: ProviderTier) -> ProviderLimits {
        match tier {
            ProviderTier::Free => ProviderLimits {
                max_concurrent_requests: 4,
                max_concurrent_llm: 2,
            },
            ProviderTier::Standard => ProviderLimits {
                max_concurrent_requests: 16,
                max_concurrent_llm: 8,
            },
            ProviderTier::Scale => ProviderLimits {
                max_concurrent_requests: 64,
                max_concurrent_llm: 32,
            },
        }
    }
}

impl ProviderLimitResolver for StaticProviderLimits {
    fn resolve_limits(&self, provider: &str) -> ProviderLimits {
        Self::tier_limits(self.detect_tier(provider))
    }

    fn detect_tier(&self, _provider: &str) -> ProviderTier {
        // Without account metadata every provider is assumed Standard
        ProviderTier::Standard
    }

    fn concurrency_limit(&self, provider: &str, _model: &str) -> u64 {
        self.resolve_limits(provider).max_concurrent_llm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_resolver_assumes_standard_tier() {
        let resolver = StaticProviderLimits;
        assert_eq!(resolver.detect_tier("openai"), ProviderTier::Standard);
        assert_eq!(resolver.concurrency_limit("openai", "gpt-4o"), 8);
    }

    #[test]
    fn test_tier_limits_scale_up() {
        let free = StaticProviderLimits::tier_limits(ProviderTier::Free);
        let scale = StaticProviderLimits::tier_limits(ProviderTier::Scale);
        assert!(scale.max_concurrent_llm > free.max_concurrent_llm);
        assert!(scale.max_concurrent_requests > free.max_concurrent_requests);
    }
}
