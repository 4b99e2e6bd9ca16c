//! Page assembly for a single feed

use std::collections::{BTreeMap, HashSet};

use crate::models::{Article, ArticleId, FilterKey, Page};

#[derive(Debug, Clone)]
struct StoredPage {
    articles: Vec<Article>,
    has_more: bool,
}

/// Snapshot of a feed's progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedStatus {
    /// Contiguous pages assembled so far (1..=loaded_pages)
    pub loaded_pages: u32,
    /// Pages that arrived early and wait for a lower page
    pub buffered_pages: Vec<u32>,
    /// Whether the last assembled page was full
    pub has_more: bool,
    /// Number of assembled articles
    pub len: usize,
}

/// Pages of one [`FilterKey`].
///
/// `committed[i]` holds page `i + 1`, already deduplicated against every
/// earlier page. Pages that complete ahead of a lower page wait in
/// `buffered` (as fetched) and are deduplicated when they are committed.
#[derive(Debug, Default)]
pub(crate) struct FeedState {
    generation: u64,
    committed: Vec<StoredPage>,
    buffered: BTreeMap<u32, StoredPage>,
    seen: HashSet<ArticleId>,
}

impl FeedState {
    pub(crate) const fn generation(&self) -> u64 {
        self.generation
    }

    /// Drop every page and invalidate fetches started before now
    pub(crate) fn reset(&mut self) {
        self.generation += 1;
        self.committed.clear();
        self.buffered.clear();
        self.seen.clear();
    }

    fn next_page(&self) -> u32 {
        self.committed.len() as u32 + 1
    }

    /// A committed page already held in memory, if any
    pub(crate) fn committed_page(&self, key: &FilterKey, page: u32) -> Option<Page> {
        let index = page.checked_sub(1)? as usize;
        self.committed.get(index).map(|stored| Page {
            key: key.clone(),
            number: page,
            articles: stored.articles.clone(),
            has_more: stored.has_more,
            committed: true,
        })
    }

    /// Placeholder for a buffered page. Its articles are withheld until the
    /// page is committed.
    pub(crate) fn pending_page(&self, key: &FilterKey, page: u32) -> Option<Page> {
        self.buffered.get(&page).map(|stored| Page {
            key: key.clone(),
            number: page,
            articles: Vec::new(),
            has_more: stored.has_more,
            committed: false,
        })
    }

    pub(crate) fn is_buffered(&self, page: u32) -> bool {
        self.buffered.contains_key(&page)
    }

    /// Take a freshly fetched page into the feed
    pub(crate) fn accept(
        &mut self,
        key: &FilterKey,
        page: u32,
        fetched: Vec<Article>,
        page_size: u32,
    ) -> Page {
        let has_more = fetched.len() == page_size as usize;

        if let Some(existing) = self.committed_page(key, page) {
            return existing;
        }

        if page > self.next_page() {
            self.buffered.insert(
                page,
                StoredPage {
                    articles: fetched,
                    has_more,
                },
            );
            return Page {
                key: key.clone(),
                number: page,
                articles: Vec::new(),
                has_more,
                committed: false,
            };
        }

        let articles = self.commit(fetched, has_more);
        while let Some(stored) = self.buffered.remove(&self.next_page()) {
            self.commit(stored.articles, stored.has_more);
        }

        Page {
            key: key.clone(),
            number: page,
            articles,
            has_more,
            committed: true,
        }
    }

    fn commit(&mut self, fetched: Vec<Article>, has_more: bool) -> Vec<Article> {
        let seen = &mut self.seen;
        let fresh: Vec<Article> = fetched
            .into_iter()
            .filter(|a| seen.insert(a.id.clone()))
            .collect();

        self.committed.push(StoredPage {
            articles: fresh.clone(),
            has_more,
        });
        fresh
    }

    /// Assembled sequence in page order
    pub(crate) fn articles(&self) -> Vec<Article> {
        self.committed
            .iter()
            .flat_map(|stored| stored.articles.iter().cloned())
            .collect()
    }

    pub(crate) fn find(&self, id: &ArticleId) -> Option<Article> {
        if !self.seen.contains(id) {
            return None;
        }
        self.committed
            .iter()
            .flat_map(|stored| stored.articles.iter())
            .find(|a| &a.id == id)
            .cloned()
    }

    pub(crate) fn status(&self) -> FeedStatus {
        FeedStatus {
            loaded_pages: self.committed.len() as u32,
            buffered_pages: self.buffered.keys().copied().collect(),
            has_more: self.committed.last().is_none_or(|stored| stored.has_more),
            len: self.committed.iter().map(|stored| stored.articles.len()).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::articles;

    fn ids(list: &[Article]) -> Vec<&str> {
        list.iter().map(|a| a.id.as_str()).collect()
    }

    #[test]
    fn test_commit_dedupes_across_pages() {
        let key = FilterKey::all();
        let mut feed = FeedState::default();

        feed.accept(&key, 1, articles("a", 0..3), 3);
        let mut second = articles("a", 2..4);
        second.push(Article::new("a3", "repeat within page"));
        let page = feed.accept(&key, 2, second, 3);

        assert_eq!(ids(&page.articles), ["a3"]);
        assert_eq!(ids(&feed.articles()), ["a0", "a1", "a2", "a3"]);
        assert!(page.has_more);
    }

    #[test]
    fn test_early_page_waits_for_lower_page() {
        let key = FilterKey::all();
        let mut feed = FeedState::default();

        let third = feed.accept(&key, 3, articles("c", 0..2), 2);
        assert!(!third.committed);
        assert!(third.articles.is_empty());
        let second = feed.accept(&key, 2, articles("b", 0..2), 2);
        assert!(!second.committed);
        assert!(feed.articles().is_empty());
        assert_eq!(feed.status().buffered_pages, vec![2, 3]);
        assert!(feed.is_buffered(3));
        assert_eq!(feed.pending_page(&key, 3).map(|p| p.committed), Some(false));

        feed.accept(&key, 1, articles("a", 0..2), 2);
        assert_eq!(
            ids(&feed.articles()),
            ["a0", "a1", "b0", "b1", "c0", "c1"]
        );
        let status = feed.status();
        assert_eq!(status.loaded_pages, 3);
        assert!(status.buffered_pages.is_empty());
    }

    #[test]
    fn test_reset_bumps_generation_and_clears() {
        let key = FilterKey::all();
        let mut feed = FeedState::default();
        feed.accept(&key, 1, articles("a", 0..2), 2);

        feed.reset();
        assert_eq!(feed.generation(), 1);
        assert!(feed.committed_page(&key, 1).is_none());
        assert_eq!(feed.status().len, 0);
    }

    #[test]
    fn test_only_a_full_page_has_more() {
        let key = FilterKey::all();
        let mut feed = FeedState::default();

        assert!(!feed.accept(&key, 1, articles("a", 0..12), 10).has_more);
        feed.reset();
        assert!(feed.accept(&key, 1, articles("a", 0..10), 10).has_more);
        feed.reset();
        assert!(!feed.accept(&key, 1, articles("a", 0..9), 10).has_more);
    }

    #[test]
    fn test_empty_feed_reports_more_available() {
        assert!(FeedState::default().status().has_more);
    }
}
