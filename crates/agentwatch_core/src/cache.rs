use std::collections::BTreeMap;
use std::fmt;

use agentwatch_logging::sync_debug;

use crate::ReportKey;

/// The (ticker, date) pair whose results are currently of interest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Context {
    pub ticker: String,
    pub date: String,
}

impl Context {
    pub fn new(ticker: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            date: date.into(),
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.ticker, self.date)
    }
}

/// Report content cached for exactly one live context.
///
/// Every entry implicitly belongs to the stored context. Changing the context
/// is the only eviction path and it evicts everything at once.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReportCache {
    context: Option<Context>,
    entries: BTreeMap<ReportKey, String>,
}

impl ReportCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switches the live context. Returns `true` when the context differed and
    /// the cache was cleared; an identical context keeps every entry.
    pub fn set_context(&mut self, ticker: &str, date: &str) -> bool {
        if let Some(current) = &self.context {
            if current.ticker == ticker && current.date == date {
                return false;
            }
        }
        let evicted = self.entries.len();
        self.entries.clear();
        self.context = Some(Context::new(ticker, date));
        sync_debug!(
            "report cache context -> {}/{} ({} entries evicted)",
            ticker,
            date,
            evicted
        );
        true
    }

    pub fn context(&self) -> Option<&Context> {
        self.context.as_ref()
    }

    pub fn get(&self, key: ReportKey) -> Option<&str> {
        self.entries.get(&key).map(String::as_str)
    }

    pub fn has(&self, key: ReportKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn set(&mut self, key: ReportKey, content: impl Into<String>) {
        self.entries.insert(key, content.into());
    }

    /// Drops every entry but keeps the context.
    pub fn clear(&mut self) {
        self.entries.clear();
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
    use super::{Context, ReportCache};
    use crate::ReportKey;

    fn cache_with_market() -> ReportCache {
        let mut cache = ReportCache::new();
        cache.set_context("AAPL", "2024-01-01");
        cache.set(ReportKey::Market, "X");
        cache
    }

    #[test]
    fn same_context_keeps_entries() {
        let mut cache = cache_with_market();
        assert!(!cache.set_context("AAPL", "2024-01-01"));
        assert_eq!(cache.get(ReportKey::Market), Some("X"));
    }

    #[test]
    fn date_change_clears_everything() {
        let mut cache = cache_with_market();
        cache.set(ReportKey::News, "Y");
        assert!(cache.set_context("AAPL", "2024-01-02"));
        assert!(!cache.has(ReportKey::Market));
        assert!(!cache.has(ReportKey::News));
        assert_eq!(cache.context(), Some(&Context::new("AAPL", "2024-01-02")));
    }

    #[test]
    fn ticker_change_clears_everything() {
        let mut cache = cache_with_market();
        assert!(cache.set_context("MSFT", "2024-01-01"));
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_keeps_context() {
        let mut cache = cache_with_market();
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.context(), Some(&Context::new("AAPL", "2024-01-01")));
    }

    #[test]
    fn set_overwrites_existing_entry() {
        let mut cache = cache_with_market();
        cache.set(ReportKey::Market, "Z");
        assert_eq!(cache.get(ReportKey::Market), Some("Z"));
        assert_eq!(cache.len(), 1);
    }
}
