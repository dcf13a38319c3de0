//! Resolution cache
//!
//! Maps the exact input string of a term to its verdict. Entries live as long as
//! the cache and are never expired, so the cache grows with every distinct term.

use crate::verdict::MatchVerdict;
use dashmap::DashMap;
use std::sync::Arc;

/// Shared, cheaply cloneable verdict store
#[derive(Clone, Default)]
pub struct ResolutionCache {
    entries: Arc<DashMap<String, MatchVerdict>>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, term: &str) -> Option<MatchVerdict> {
        self.entries.get(term).map(|entry| entry.value().clone())
    }

    /// Store a verdict. Error verdicts are skipped so the term can be retried.
    /// Returns whether the verdict was stored.
    pub fn insert(&self, term: &str, verdict: &MatchVerdict) -> bool {
        if !verdict.is_cacheable() {
            return false;
        }
        self.entries.insert(term.to_string(), verdict.clone());
        true
    }

    pub fn contains(&self, term: &str) -> bool {
        self.entries.contains_key(term)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_exact_strings() {
        let cache = ResolutionCache::new();
        cache.insert("running shoe", &MatchVerdict::full("1"));
        assert!(cache.contains("running shoe"));
        assert!(!cache.contains("running  shoe"));
        assert!(!cache.contains("Running shoe"));
    }

    #[test]
    fn test_errors_are_not_stored() {
        let cache = ResolutionCache::new();
        assert!(!cache.insert("x", &MatchVerdict::error("Remote timeout")));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clones_share_entries() {
        let cache = ResolutionCache::new();
        let other = cache.clone();
        other.insert("x", &MatchVerdict::NoMatch);
        assert_eq!(cache.get("x"), Some(MatchVerdict::NoMatch));
        assert_eq!(cache.len(), 1);
    }
}
