//! Feed addressing: filter keys and fetched pages

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{ALL_CATEGORY_ID, Article, CategoryId};

/// Identifies a logical feed: a category filter plus a search query.
///
/// Keys are normalized on construction: category `0` ("All") means no
/// category filter and a blank query means no search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterKey {
    category: Option<CategoryId>,
    search: Option<String>,
}

impl FilterKey {
    /// Build a key from optional parts
    pub fn new(category: Option<CategoryId>, search: Option<&str>) -> Self {
        Self {
            category: category.filter(|&id| id != ALL_CATEGORY_ID),
            search: search
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(str::to_string),
        }
    }

    /// The unfiltered feed
    pub fn all() -> Self {
        Self::default()
    }

    /// Feed for one category
    pub fn category(id: CategoryId) -> Self {
        Self::new(Some(id), None)
    }

    /// Search across all categories
    pub fn search(query: &str) -> Self {
        Self::new(None, Some(query))
    }

    /// Category filter, if any
    pub fn category_id(&self) -> Option<CategoryId> {
        self.category
    }

    /// Search query, if any
    pub fn search_query(&self) -> Option<&str> {
        self.search.as_deref()
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.category, &self.search) {
            (None, None) => f.write_str("all"),
            (Some(c), None) => write!(f, "category={c}"),
            (None, Some(q)) => write!(f, "search={q:?}"),
            (Some(c), Some(q)) => write!(f, "category={c} search={q:?}"),
        }
    }
}

/// One fetched batch of articles
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Feed the page belongs to
    pub key: FilterKey,
    /// 1-based page number
    pub number: u32,
    /// Articles new to the feed, in provider order
    pub articles: Vec<Article>,
    /// Whether the provider returned a full page
    pub has_more: bool,
    /// Whether the slice is part of the assembled feed yet. A page that
    /// arrives before a lower page is held back until that page lands.
    pub committed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_category_normalizes_to_unfiltered() {
        assert_eq!(FilterKey::category(0), FilterKey::all());
        assert_eq!(FilterKey::new(Some(0), Some("   ")), FilterKey::all());
    }

    #[test]
    fn test_search_is_trimmed() {
        let key = FilterKey::search("  election ");
        assert_eq!(key.search_query(), Some("election"));
        assert_eq!(key.to_string(), "search=\"election\"");
    }
}
