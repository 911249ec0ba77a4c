use std::collections::HashMap;

use crate::page::Fragment;

/// Rendered contents of both panes for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FragmentPair {
    pub selected: Fragment,
    pub unselected: Fragment,
}

/// Rendered fragments keyed by the exact request URL. Entries are never evicted.
#[derive(Debug, Clone, Default)]
pub struct FetchCache {
    entries: HashMap<String, FragmentPair>,
}

impl FetchCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<&FragmentPair> {
        self.entries.get(url)
    }

    pub fn insert(&mut self, url: impl Into<String>, pair: FragmentPair) {
        self.entries.insert(url.into(), pair);
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
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
    use crate::page::OptionRecord;

    #[test]
    fn keyed_by_exact_url() {
        let mut cache = FetchCache::new();
        let pair = FragmentPair {
            selected: Fragment::default(),
            unselected: Fragment::new(vec![OptionRecord::new("1", "a")]),
        };
        cache.insert("/items?product=7", pair.clone());
        cache.insert("/items?product=9", pair.clone());

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("/items?product=7"), Some(&pair));
        assert!(!cache.contains("/items?product=7&for_suite=1"));
        assert!(cache.get("/items?product=").is_none());
    }
}
