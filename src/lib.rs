//! # wpreader
//!
//! Client-side content sync and cache layer for a WordPress news site.
//!
//! ## Overview
//!
//! wpreader pages through a site's articles by category or search, keeps the
//! assembled feed free of duplicates, coalesces overlapping requests, and
//! persists the reader's bookmarks and session between runs.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       ContentCache                          │
//! │  Feeds, categories, bookmarks, session, comments            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!          ┌───────────────────┼───────────────────┐
//!          ▼                   ▼                   ▼
//! ┌─────────────────┐ ┌─────────────────┐ ┌─────────────────┐
//! │       API       │ │      Store      │ │      Auth       │
//! │                 │ │                 │ │                 │
//! │ • Provider trait│ │ • KeyValueStore │ │ • Session seal  │
//! │ • WordPress REST│ │ • SQLite / mem  │ │ • AES-256-GCM   │
//! └─────────────────┘ └─────────────────┘ └─────────────────┘
//!          │                   │                   │
//!          └───────────────────┴───────────────────┘
//!                              │
//!                     ┌─────────────────┐
//!                     │     Models      │
//!                     │ • Article       │
//!                     │ • Category      │
//!                     │ • FilterKey     │
//!                     └─────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`api`] — Content provider trait and the WordPress REST client (reads, comments, posts, profile)
//! - [`auth`] — Session record sealing
//! - [`cache`] — The content cache
//! - [`config`] — Configuration management
//! - [`db`] — `SQLite` key-value store
//! - [`models`] — Data models (Article, Category, Session)
//! - [`store`] — Key-value store trait and in-memory store
//!
//! ## Example
//!
//! ```no_run
//! use wpreader::api::WordPressClient;
//! use wpreader::models::FilterKey;
//! use wpreader::{CacheSettings, ContentCache, Database};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let cache = ContentCache::open(
//!     WordPressClient::new("https://lagosnawa.com"),
//!     Database::open()?,
//!     CacheSettings::default(),
//! )?;
//! let page = cache.load_page(&FilterKey::all(), 1).await?;
//! println!("{} articles", page.articles.len());
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/wpreader/0.1.0")]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::return_self_not_must_use)]

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod paths;
pub mod store;

// Re-export main types for convenience
pub use cache::{CacheError, CacheSettings, ContentCache, FeedStatus};
pub use config::Config;
pub use db::Database;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
