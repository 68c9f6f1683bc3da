//! Bounded memo of anchor (parent work) titles.
//!
//! Advisory only: a miss costs one index lookup. Concurrent misses for the
//! same key may both look up and both insert; the second insert wins.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use crate::config::DEFAULT_ANCHOR_CACHE_CAPACITY;
use crate::error::Result;

#[derive(Debug, Default)]
struct Entries {
    titles: HashMap<String, String>,
    order: VecDeque<String>,
}

/// FIFO cache from anchor `IDDOC` to title.
#[derive(Debug)]
pub struct AnchorTitleCache {
    entries: Mutex<Entries>,
    capacity: usize,
}

impl AnchorTitleCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
            capacity: capacity.max(1),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.titles.get(key).cloned()
    }

    pub fn insert(&self, key: &str, title: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries
            .titles
            .insert(key.to_string(), title.to_string())
            .is_some()
        {
            return;
        }
        entries.order.push_back(key.to_string());
        while entries.order.len() > self.capacity {
            if let Some(oldest) = entries.order.pop_front() {
                entries.titles.remove(&oldest);
            }
        }
    }

    /// Return the cached title or compute it with `fetch`. The lock is not
    /// held while fetching. Absent titles are not cached.
    pub fn get_or_fetch(
        &self,
        key: &str,
        fetch: impl FnOnce() -> Result<Option<String>>,
    ) -> Result<Option<String>> {
        if let Some(title) = self.get(key) {
            return Ok(Some(title));
        }
        let fetched = fetch()?;
        if let Some(title) = &fetched {
            self.insert(key, title);
        }
        Ok(fetched)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .titles
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AnchorTitleCache {
    fn default() -> Self {
        Self::new(DEFAULT_ANCHOR_CACHE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_fetch_once() {
        let cache = AnchorTitleCache::new(10);
        let calls = Cell::new(0);
        let fetch = || {
            calls.set(calls.get() + 1);
            Ok(Some("Zeitschrift".to_string()))
        };
        assert_eq!(cache.get_or_fetch("1", fetch).unwrap().as_deref(), Some("Zeitschrift"));
        assert_eq!(cache.get_or_fetch("1", fetch).unwrap().as_deref(), Some("Zeitschrift"));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_evicts_oldest() {
        let cache = AnchorTitleCache::new(2);
        cache.insert("a", "A");
        cache.insert("b", "B");
        cache.insert("c", "C");
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert_eq!(cache.get("c").as_deref(), Some("C"));
    }

    #[test]
    fn test_absent_titles_not_cached() {
        let cache = AnchorTitleCache::new(2);
        assert!(cache.get_or_fetch("x", || Ok(None)).unwrap().is_none());
        assert!(cache.is_empty());
    }
}
