//! Remote content providers
//!
//! The cache only knows the [`ContentProvider`] contract: a paginated
//! article resource, a category list, comments, a bearer-token login, and
//! the authenticated writes (posts with media and tags, profile edits).
//! [`wordpress::WordPressClient`] implements it against the WordPress REST API.

#[cfg(test)]
pub(crate) mod mock;
pub mod wordpress;

use async_trait::async_trait;
use thiserror::Error;

use serde::Serialize;

use crate::models::{
    Article, ArticleId, Category, CategoryId, Comment, CommentDraft, Credentials, MediaUpload,
    Profile, ProfileUpdate, PublishedPost,
};

pub use wordpress::WordPressClient;

/// Errors raised by a provider
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// Transport failure (DNS, connection, timeout)
    #[error("network error: {0}")]
    Network(String),
    /// Server answered with an error status
    #[error("server returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly truncated
        body: String,
    },
    /// Server rejected the credentials
    #[error("not authorized ({0})")]
    Unauthorized(u16),
    /// Response could not be decoded
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Parameters for one page of articles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleQuery {
    /// Category filter
    pub category: Option<CategoryId>,
    /// Free-text search
    pub search: Option<String>,
    /// 1-based page number
    pub page: u32,
    /// Requested page size
    pub per_page: u32,
}

/// A post ready for the provider, with tags and media resolved to ids
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostSubmission {
    /// Post title
    pub title: String,
    /// Post body
    pub content: String,
    /// Publication status requested
    pub status: String,
    /// Category ids
    pub categories: Vec<CategoryId>,
    /// Tag ids
    pub tags: Vec<u64>,
    /// Featured media id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_media: Option<u64>,
}

/// Contract the cache requires from a remote content source.
///
/// `auth` is the bearer token of the current session, if any. Returning
/// fewer than `per_page` articles signals the end of the data.
#[async_trait]
pub trait ContentProvider: Send + Sync + 'static {
    /// Fetch one page of articles
    async fn fetch_articles(
        &self,
        query: &ArticleQuery,
        auth: Option<&str>,
    ) -> Result<Vec<Article>, ProviderError>;

    /// Fetch the server's category list
    async fn fetch_categories(&self, auth: Option<&str>) -> Result<Vec<Category>, ProviderError>;

    /// Fetch a single article
    async fn fetch_article(
        &self,
        id: &ArticleId,
        auth: Option<&str>,
    ) -> Result<Article, ProviderError>;

    /// Fetch comments on an article
    async fn fetch_comments(
        &self,
        article: &ArticleId,
        auth: Option<&str>,
    ) -> Result<Vec<Comment>, ProviderError>;

    /// Post a comment as the token's user
    async fn post_comment(
        &self,
        article: &ArticleId,
        draft: &CommentDraft,
        token: &str,
    ) -> Result<Comment, ProviderError>;

    /// Exchange a username and password for a bearer token
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Credentials, ProviderError>;

    /// Upload an image, returning its media id
    async fn upload_media(&self, media: &MediaUpload, token: &str) -> Result<u64, ProviderError>;

    /// Id of the tag named `name`, creating it when the server has none
    async fn find_or_create_tag(&self, name: &str, token: &str) -> Result<u64, ProviderError>;

    /// Create a post
    async fn create_post(
        &self,
        post: &PostSubmission,
        token: &str,
    ) -> Result<PublishedPost, ProviderError>;

    /// Profile of the token's user
    async fn fetch_profile(&self, token: &str) -> Result<Profile, ProviderError>;

    /// Change the token's user profile
    async fn update_profile(
        &self,
        update: &ProfileUpdate,
        token: &str,
    ) -> Result<Profile, ProviderError>;
}
