//! Device-local bookmark set

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::ArticleId;

/// Set of bookmarked article ids. Stored as a JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookmarkSet(BTreeSet<ArticleId>);

impl BookmarkSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `id` is bookmarked
    pub fn contains(&self, id: &ArticleId) -> bool {
        self.0.contains(id)
    }

    /// Flip membership of `id`. Returns the new membership.
    pub fn toggle(&mut self, id: &ArticleId) -> bool {
        if self.0.remove(id) {
            false
        } else {
            self.0.insert(id.clone());
            true
        }
    }

    /// Number of bookmarks
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing is bookmarked
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate ids in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &ArticleId> {
        self.0.iter()
    }

    /// Decode the stored JSON form
    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    /// Encode to the stored JSON form
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

impl FromIterator<ArticleId> for BookmarkSet {
    fn from_iter<T: IntoIterator<Item = ArticleId>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_twice_restores_membership() {
        let mut set = BookmarkSet::new();
        let id = ArticleId::from(9);
        assert!(set.toggle(&id));
        assert!(set.contains(&id));
        assert!(!set.toggle(&id));
        assert_eq!(set, BookmarkSet::new());
    }

    #[test]
    fn test_reads_plain_json_array() {
        let set = BookmarkSet::from_json(br#"["12","40"]"#).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&ArticleId::from(40)));
    }

    #[test]
    fn test_collected_ids_encode_sorted_without_duplicates() {
        let set: BookmarkSet = ["7", "3", "7"].into_iter().map(ArticleId::from).collect();
        assert_eq!(set.to_json().unwrap(), br#"["3","7"]"#.to_vec());
    }
}
