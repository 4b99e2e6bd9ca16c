//! Article model (a single news post)

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CategoryId;

/// Opaque article identifier.
///
/// Servers hand these out as numbers or strings; both are kept as text so
/// that identifiers compare the same way wherever they came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(String);

impl ArticleId {
    /// Create an identifier from any textual form
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for ArticleId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for ArticleId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ArticleId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A fetched article. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Server identifier
    pub id: ArticleId,
    /// Title (plain text, entities decoded)
    pub title: String,
    /// Body as rich text (HTML)
    pub body: String,
    /// Author display name
    pub author_name: String,
    /// Author avatar URL
    pub author_avatar: Option<String>,
    /// When the article was published
    pub published_at: DateTime<Utc>,
    /// Categories the article is filed under
    #[serde(default)]
    pub categories: BTreeSet<CategoryId>,
    /// Featured image URL
    pub featured_image: Option<String>,
    /// Permalink on the web
    pub link: Option<String>,
}

impl Article {
    /// Create an article with only an id and title set
    pub fn new(id: impl Into<ArticleId>, title: &str) -> Self {
        Self {
            id: id.into(),
            title: title.to_string(),
            body: String::new(),
            author_name: String::new(),
            author_avatar: None,
            published_at: Utc::now(),
            categories: BTreeSet::new(),
            featured_image: None,
            link: None,
        }
    }

    /// Whether the article is filed under `category`
    pub fn in_category(&self, category: CategoryId) -> bool {
        self.categories.contains(&category)
    }

    /// Body with markup removed
    pub fn plain_text(&self) -> String {
        html_to_text(&self.body)
    }

    /// Short single-line preview of the body
    pub fn preview(&self, max_chars: usize) -> String {
        let text = self.plain_text().replace('\n', " ");
        if text.chars().count() <= max_chars {
            text
        } else {
            let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
            format!("{}...", cut.trim_end())
        }
    }

    /// Age relative to `now` (e.g. "5m", "2h", "3d")
    pub fn relative_time(&self, now: DateTime<Utc>) -> String {
        let age = now.signed_duration_since(self.published_at);

        if age.num_minutes() < 1 {
            "now".to_string()
        } else if age.num_hours() < 1 {
            format!("{}m", age.num_minutes())
        } else if age.num_days() < 1 {
            format!("{}h", age.num_hours())
        } else if age.num_days() < 7 {
            format!("{}d", age.num_days())
        } else {
            self.published_at.format("%b %d").to_string()
        }
    }
}

/// Reduce an HTML fragment to readable text.
pub(crate) fn html_to_text(html: &str) -> String {
    let text = html
        .replace("<br>", "\n")
        .replace("<br/>", "\n")
        .replace("<br />", "\n")
        .replace("</p>\n<p>", "\n\n")
        .replace("</p><p>", "\n\n");

    let text = regex_lite::Regex::new(r"<[^>]+>")
        .map(|re| re.replace_all(&text, "").to_string())
        .unwrap_or(text);

    html_escape::decode_html_entities(text.trim()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_plain_text_strips_markup_and_entities() {
        let mut article = Article::new(1, "t");
        article.body = "<p>Lagos &amp; Abuja</p><p>Second <b>para</b></p>".to_string();
        assert_eq!(article.plain_text(), "Lagos & Abuja\n\nSecond para");
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let mut article = Article::new("a", "t");
        article.body = "<p>Ọjọ́ àìkú is a long day indeed</p>".to_string();
        let preview = article.preview(10);
        assert!(preview.ends_with("..."));
        assert!(preview.chars().count() <= 10);
    }

    #[test]
    fn test_relative_time() {
        let now = Utc.with_ymd_and_hms(2024, 10, 21, 12, 0, 0).unwrap();
        let mut article = Article::new(1, "t");

        article.published_at = now - chrono::Duration::minutes(5);
        assert_eq!(article.relative_time(now), "5m");

        article.published_at = now - chrono::Duration::hours(3);
        assert_eq!(article.relative_time(now), "3h");

        article.published_at = now - chrono::Duration::days(30);
        assert_eq!(article.relative_time(now), "Sep 21");
    }

    #[test]
    fn test_article_id_from_number_and_text_compare_equal() {
        assert_eq!(ArticleId::from(42), ArticleId::from("42"));
    }
}
