//! Category model and the synthetic "All" entry

use serde::{Deserialize, Serialize};

/// Category identifier. `0` is reserved for "All".
pub type CategoryId = u64;

/// Identifier of the synthetic "All" category
pub const ALL_CATEGORY_ID: CategoryId = 0;

const ALL_CATEGORY_SLUG: &str = "all";

/// A content category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Server identifier
    pub id: CategoryId,
    /// Display name
    pub name: String,
    /// URL slug
    pub slug: String,
    /// Number of published articles, when known
    #[serde(default)]
    pub count: Option<u32>,
}

impl Category {
    /// Create a category
    pub fn new(id: CategoryId, name: &str, slug: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            slug: slug.to_string(),
            count: None,
        }
    }

    /// The synthetic "All" category
    pub fn all() -> Self {
        Self::new(ALL_CATEGORY_ID, "All", ALL_CATEGORY_SLUG)
    }

    /// Whether this is the "All" category (by id or slug)
    pub fn is_all(&self) -> bool {
        self.id == ALL_CATEGORY_ID || self.slug.eq_ignore_ascii_case(ALL_CATEGORY_SLUG)
    }
}

/// Prepend "All" to a server-provided list, dropping any server entry that
/// would duplicate it.
pub fn with_all_category(server: Vec<Category>) -> Vec<Category> {
    let mut categories = Vec::with_capacity(server.len() + 1);
    categories.push(Category::all());
    categories.extend(server.into_iter().filter(|c| !c.is_all()));
    categories
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_is_prepended() {
        let list = with_all_category(vec![
            Category::new(3, "Politics", "politics"),
            Category::new(7, "Sport", "sport"),
        ]);
        assert_eq!(list.len(), 3);
        assert_eq!(list[0], Category::all());
        assert_eq!(list[1].slug, "politics");
    }

    #[test]
    fn test_server_all_is_not_duplicated() {
        let list = with_all_category(vec![
            Category::new(12, "All", "ALL"),
            Category::new(0, "Whatever", "whatever"),
            Category::new(3, "Politics", "politics"),
        ]);
        assert_eq!(list.len(), 2);
        assert_eq!(list.iter().filter(|c| c.is_all()).count(), 1);
    }

    #[test]
    fn test_empty_server_list() {
        assert_eq!(with_all_category(Vec::new()), vec![Category::all()]);
    }
}
