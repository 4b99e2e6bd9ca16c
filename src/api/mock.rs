//! Scripted provider for cache tests.
//!
//! Pages are scripted per filter, failures are injected per page number, and
//! a page can be held behind a gate so tests control completion order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;

use super::{ArticleQuery, ContentProvider, PostSubmission, ProviderError};
use crate::models::{
    Article, ArticleId, Category, CategoryId, Comment, CommentDraft, Credentials, FilterKey,
    MediaUpload, Profile, ProfileUpdate, PublishedPost,
};

/// Token the mock rejects on writes, as a server rejects an expired JWT
pub(crate) const EXPIRED_TOKEN: &str = "expired";

type PageKey = (Option<CategoryId>, Option<String>, u32);

#[derive(Debug, Clone, Default)]
pub(crate) struct MockProvider {
    inner: Arc<Mutex<MockInner>>,
}

#[derive(Debug, Default)]
struct MockInner {
    pages: HashMap<PageKey, Vec<Article>>,
    failing_pages: HashMap<u32, String>,
    gates: HashMap<u32, Arc<Notify>>,
    categories: Vec<Category>,
    fail_categories: Option<String>,
    articles: HashMap<ArticleId, Article>,
    comments: Vec<Comment>,
    accounts: HashMap<String, (String, Credentials)>,
    article_calls: Vec<(ArticleQuery, Option<String>)>,
    category_calls: usize,
    posted: Vec<(ArticleId, CommentDraft, String)>,
    tags: Vec<(u64, String)>,
    failing_tags: Vec<String>,
    fail_uploads: bool,
    uploads: Vec<MediaUpload>,
    posts: Vec<PostSubmission>,
    profile: Option<Profile>,
    profile_calls: usize,
}

/// Articles with ids `{prefix}{n}` for each `n` in `range`
pub(crate) fn articles(prefix: &str, range: std::ops::Range<u32>) -> Vec<Article> {
    range
        .map(|n| Article::new(format!("{prefix}{n}"), &format!("{prefix} story {n}")))
        .collect()
}

impl MockProvider {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_page(&self, key: &FilterKey, page: u32, articles: Vec<Article>) {
        let page_key = (
            key.category_id(),
            key.search_query().map(str::to_string),
            page,
        );
        self.lock().pages.insert(page_key, articles);
    }

    pub(crate) fn fail_page(&self, page: u32, reason: &str) {
        self.lock().failing_pages.insert(page, reason.to_string());
    }

    pub(crate) fn heal_page(&self, page: u32) {
        self.lock().failing_pages.remove(&page);
    }

    /// Hold the next fetch of `page` until the returned gate is notified
    pub(crate) fn gate_page(&self, page: u32) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.lock().gates.insert(page, Arc::clone(&gate));
        gate
    }

    pub(crate) fn set_categories(&self, categories: Vec<Category>) {
        self.lock().categories = categories;
    }

    pub(crate) fn fail_categories(&self, reason: &str) {
        self.lock().fail_categories = Some(reason.to_string());
    }

    pub(crate) fn heal_categories(&self) {
        self.lock().fail_categories = None;
    }

    pub(crate) fn add_article(&self, article: Article) {
        self.lock().articles.insert(article.id.clone(), article);
    }

    pub(crate) fn add_comment(&self, comment: Comment) {
        self.lock().comments.push(comment);
    }

    pub(crate) fn add_account(&self, username: &str, password: &str, creds: Credentials) {
        self.lock()
            .accounts
            .insert(username.to_string(), (password.to_string(), creds));
    }

    pub(crate) fn article_calls(&self) -> Vec<ArticleQuery> {
        self.lock()
            .article_calls
            .iter()
            .map(|(query, _)| query.clone())
            .collect()
    }

    pub(crate) fn tokens_seen(&self) -> Vec<Option<String>> {
        self.lock()
            .article_calls
            .iter()
            .map(|(_, token)| token.clone())
            .collect()
    }

    pub(crate) fn category_calls(&self) -> usize {
        self.lock().category_calls
    }

    pub(crate) fn posted_comments(&self) -> Vec<(ArticleId, CommentDraft, String)> {
        self.lock().posted.clone()
    }

    pub(crate) fn add_tag(&self, id: u64, name: &str) {
        self.lock().tags.push((id, name.to_string()));
    }

    pub(crate) fn fail_tag(&self, name: &str) {
        self.lock().failing_tags.push(name.to_string());
    }

    pub(crate) fn tag_names(&self) -> Vec<String> {
        self.lock().tags.iter().map(|(_, name)| name.clone()).collect()
    }

    pub(crate) fn fail_uploads(&self) {
        self.lock().fail_uploads = true;
    }

    pub(crate) fn uploads(&self) -> Vec<MediaUpload> {
        self.lock().uploads.clone()
    }

    pub(crate) fn submitted_posts(&self) -> Vec<PostSubmission> {
        self.lock().posts.clone()
    }

    pub(crate) fn set_profile(&self, profile: Profile) {
        self.lock().profile = Some(profile);
    }

    pub(crate) fn profile_calls(&self) -> usize {
        self.lock().profile_calls
    }
}

#[async_trait]
impl ContentProvider for MockProvider {
    async fn fetch_articles(
        &self,
        query: &ArticleQuery,
        auth: Option<&str>,
    ) -> Result<Vec<Article>, ProviderError> {
        let gate = {
            let mut inner = self.lock();
            inner
                .article_calls
                .push((query.clone(), auth.map(str::to_string)));
            inner.gates.remove(&query.page)
        };

        if let Some(gate) = gate {
            gate.notified().await;
        }

        let inner = self.lock();
        if let Some(reason) = inner.failing_pages.get(&query.page) {
            return Err(ProviderError::Network(reason.clone()));
        }
        let key = (query.category, query.search.clone(), query.page);
        Ok(inner.pages.get(&key).cloned().unwrap_or_default())
    }

    async fn fetch_categories(&self, _auth: Option<&str>) -> Result<Vec<Category>, ProviderError> {
        let mut inner = self.lock();
        inner.category_calls += 1;
        match &inner.fail_categories {
            Some(reason) => Err(ProviderError::Network(reason.clone())),
            None => Ok(inner.categories.clone()),
        }
    }

    async fn fetch_article(
        &self,
        id: &ArticleId,
        _auth: Option<&str>,
    ) -> Result<Article, ProviderError> {
        self.lock()
            .articles
            .get(id)
            .cloned()
            .ok_or_else(|| ProviderError::Status {
                status: 404,
                body: format!("no article {id}"),
            })
    }

    async fn fetch_comments(
        &self,
        article: &ArticleId,
        _auth: Option<&str>,
    ) -> Result<Vec<Comment>, ProviderError> {
        Ok(self
            .lock()
            .comments
            .iter()
            .filter(|c| &c.article_id == article)
            .cloned()
            .collect())
    }

    async fn post_comment(
        &self,
        article: &ArticleId,
        draft: &CommentDraft,
        token: &str,
    ) -> Result<Comment, ProviderError> {
        if token == EXPIRED_TOKEN {
            return Err(ProviderError::Unauthorized(401));
        }

        let mut inner = self.lock();
        inner
            .posted
            .push((article.clone(), draft.clone(), token.to_string()));
        let comment = Comment {
            id: inner.posted.len() as u64,
            article_id: article.clone(),
            author_name: draft.author_name.clone().unwrap_or_default(),
            content: draft.content.clone(),
            created_at: Utc::now(),
        };
        inner.comments.push(comment.clone());
        Ok(comment)
    }

    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Credentials, ProviderError> {
        match self.lock().accounts.get(username) {
            Some((expected, creds)) if expected == password => Ok(creds.clone()),
            _ => Err(ProviderError::Unauthorized(403)),
        }
    }

    async fn upload_media(&self, media: &MediaUpload, token: &str) -> Result<u64, ProviderError> {
        if token == EXPIRED_TOKEN {
            return Err(ProviderError::Unauthorized(401));
        }
        let mut inner = self.lock();
        if inner.fail_uploads {
            return Err(ProviderError::Status {
                status: 413,
                body: "file too large".to_string(),
            });
        }
        inner.uploads.push(media.clone());
        Ok(1000 + inner.uploads.len() as u64)
    }

    async fn find_or_create_tag(&self, name: &str, _token: &str) -> Result<u64, ProviderError> {
        let mut inner = self.lock();
        if inner.failing_tags.iter().any(|t| t == name) {
            return Err(ProviderError::Network(format!("tag {name} unavailable")));
        }
        if let Some((id, _)) = inner.tags.iter().find(|(_, t)| t.eq_ignore_ascii_case(name)) {
            return Ok(*id);
        }
        let id = 500 + inner.tags.len() as u64;
        inner.tags.push((id, name.to_string()));
        Ok(id)
    }

    async fn create_post(
        &self,
        post: &PostSubmission,
        token: &str,
    ) -> Result<PublishedPost, ProviderError> {
        if token == EXPIRED_TOKEN {
            return Err(ProviderError::Unauthorized(401));
        }
        let mut inner = self.lock();
        inner.posts.push(post.clone());
        Ok(PublishedPost {
            id: ArticleId::from(9000 + inner.posts.len() as u64),
            status: post.status.clone(),
            link: None,
        })
    }

    async fn fetch_profile(&self, token: &str) -> Result<Profile, ProviderError> {
        if token == EXPIRED_TOKEN {
            return Err(ProviderError::Unauthorized(401));
        }
        let mut inner = self.lock();
        inner.profile_calls += 1;
        inner.profile.clone().ok_or_else(|| ProviderError::Status {
            status: 404,
            body: "no profile".to_string(),
        })
    }

    async fn update_profile(
        &self,
        update: &ProfileUpdate,
        token: &str,
    ) -> Result<Profile, ProviderError> {
        if token == EXPIRED_TOKEN {
            return Err(ProviderError::Unauthorized(401));
        }
        let mut inner = self.lock();
        let profile = inner.profile.get_or_insert_with(|| Profile {
            id: 1,
            name: String::new(),
            avatar_url: None,
        });
        profile.name.clone_from(&update.name);
        Ok(profile.clone())
    }
}
