//! Authored content: new posts, attached media and the user profile

use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{ALL_CATEGORY_ID, ArticleId, CategoryId};

/// A post written by the signed-in user, submitted as a draft for review
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    /// Post title
    pub title: String,
    /// Post body
    pub content: String,
    /// Category the post is filed under
    pub category: CategoryId,
    /// Tag names, trimmed and without duplicates
    pub tags: Vec<String>,
}

impl PostDraft {
    /// Create a draft without tags
    pub fn new(title: &str, content: &str, category: CategoryId) -> Self {
        Self {
            title: title.to_string(),
            content: content.to_string(),
            category,
            tags: Vec::new(),
        }
    }

    /// Add tags from a comma separated list (e.g. `"news, lagos, events"`)
    pub fn with_tags(mut self, list: &str) -> Self {
        for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            if !self.tags.iter().any(|t| t.eq_ignore_ascii_case(name)) {
                self.tags.push(name.to_string());
            }
        }
        self
    }

    /// Title, content and a real category are all present
    pub fn is_complete(&self) -> bool {
        !self.title.trim().is_empty()
            && !self.content.trim().is_empty()
            && self.category != ALL_CATEGORY_ID
    }
}

/// Image attached to a post as its featured media
#[derive(Clone, PartialEq, Eq)]
pub struct MediaUpload {
    /// File name reported to the server
    pub file_name: String,
    /// MIME type
    pub content_type: String,
    /// File contents
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for MediaUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl MediaUpload {
    /// Wrap in-memory bytes
    pub fn new(file_name: &str, content_type: &str, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            bytes,
        }
    }

    /// Read an image from disk, typing it by extension
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map_or_else(|| "upload".to_string(), |n| n.to_string_lossy().into_owned());
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        Ok(Self {
            file_name,
            content_type: content_type_for(&extension).to_string(),
            bytes,
        })
    }
}

fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

/// A post created on the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedPost {
    /// Server id
    pub id: ArticleId,
    /// Publication status (`draft` until an editor publishes it)
    pub status: String,
    /// Permalink, if the server reported one
    pub link: Option<String>,
}

/// The signed-in user's profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// User id
    pub id: u64,
    /// Display name
    pub name: String,
    /// Avatar URL
    pub avatar_url: Option<String>,
}

/// Profile fields to change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    /// New display name
    pub name: String,
}
