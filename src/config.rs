use crate::error::{ResolveError, Result};
use std::time::Duration;

/// Public catalog search page the HTTP front talks to by default.
pub const DEFAULT_BASE_URL: &str = "https://idm-tmng.uspto.gov/id-master-list-public.html";
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 20;
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Runtime configuration for term resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Catalog search page URL
    pub base_url: String,
    /// Max number of terms resolved against the catalog at once
    pub concurrency_limit: usize,
    /// How long a single probe may wait for its results summary
    pub probe_timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

impl ResolverConfig {
    /// Load from `.env` and the process environment, falling back to defaults.
    ///
    /// - `TERM_RESOLVER_BASE_URL`
    /// - `TERM_RESOLVER_CONCURRENCY`
    /// - `TERM_RESOLVER_PROBE_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` but reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("TERM_RESOLVER_BASE_URL") {
            config.base_url = url;
        }
        if let Some(limit) = lookup("TERM_RESOLVER_CONCURRENCY") {
            config.concurrency_limit = limit.trim().parse().map_err(|e| {
                ResolveError::Config(format!("TERM_RESOLVER_CONCURRENCY '{}': {}", limit, e))
            })?;
        }
        if let Some(secs) = lookup("TERM_RESOLVER_PROBE_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|e| {
                ResolveError::Config(format!("TERM_RESOLVER_PROBE_TIMEOUT_SECS '{}': {}", secs, e))
            })?;
            config.probe_timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency_limit == 0 {
            return Err(ResolveError::Config(
                "concurrency limit must be at least 1".to_string(),
            ));
        }
        if self.probe_timeout.is_zero() {
            return Err(ResolveError::Config(
                "probe timeout must be greater than zero".to_string(),
            ));
        }
        if self.base_url.trim().is_empty() {
            return Err(ResolveError::Config("base URL is empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ResolverConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ResolverConfig::default());
        assert_eq!(config.concurrency_limit, 20);
    }

    #[test]
    fn test_overrides() {
        let config = ResolverConfig::from_lookup(lookup(&[
            ("TERM_RESOLVER_BASE_URL", "http://localhost:9000/search"),
            ("TERM_RESOLVER_CONCURRENCY", "4"),
            ("TERM_RESOLVER_PROBE_TIMEOUT_SECS", " 5 "),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "http://localhost:9000/search");
        assert_eq!(config.concurrency_limit, 4);
        assert_eq!(config.probe_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            ResolverConfig::from_lookup(lookup(&[("TERM_RESOLVER_CONCURRENCY", "many")])),
            Err(ResolveError::Config(_))
        ));
        assert!(matches!(
            ResolverConfig::from_lookup(lookup(&[("TERM_RESOLVER_CONCURRENCY", "0")])),
            Err(ResolveError::Config(_))
        ));
        assert!(matches!(
            ResolverConfig::from_lookup(lookup(&[("TERM_RESOLVER_PROBE_TIMEOUT_SECS", "0")])),
            Err(ResolveError::Config(_))
        ));
    }
}
