//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ArticleId;

/// A reader comment on an article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    /// Server identifier
    pub id: u64,
    /// Article the comment belongs to
    pub article_id: ArticleId,
    /// Commenter display name
    pub author_name: String,
    /// Comment text (plain)
    pub content: String,
    /// When the comment was written
    pub created_at: DateTime<Utc>,
}

/// A comment about to be posted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommentDraft {
    /// Comment text
    pub content: String,
    /// Name to post under (servers default to the token's user)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    /// Contact email
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_email: Option<String>,
}

impl CommentDraft {
    /// Draft with only content set
    pub fn new(content: &str) -> Self {
        Self {
            content: content.to_string(),
            ..Default::default()
        }
    }

    /// Whether there is anything to post
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}
