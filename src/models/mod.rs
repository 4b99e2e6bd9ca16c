//! Data models for wpreader

mod article;
mod bookmarks;
mod category;
mod comment;
mod feed;
mod post;
mod session;

pub use article::{Article, ArticleId};
pub(crate) use article::html_to_text;
pub use bookmarks::BookmarkSet;
pub use category::{ALL_CATEGORY_ID, Category, CategoryId, with_all_category};
pub use comment::{Comment, CommentDraft};
pub use feed::{FilterKey, Page};
pub use post::{MediaUpload, PostDraft, Profile, ProfileUpdate, PublishedPost};
pub use session::{Credentials, Session};
