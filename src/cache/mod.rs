//! Content cache: the single authority feed consumers talk to
//!
//! [`ContentCache`] sits between a [`ContentProvider`] and the screens that
//! render articles. It pages feeds, deduplicates articles, coalesces
//! duplicate requests, memoizes categories, and owns the two pieces of
//! durable local state: the bookmark set and the session.
//!
//! All shared state sits behind one mutex that is never held across an
//! `.await`. Every in-flight page fetch is a [`Shared`] future stored per
//! `(FilterKey, page)`; the shared future commits its own result, so the
//! commit happens once however many callers are waiting on it.

mod error;
mod feed;

pub use error::CacheError;
pub use feed::FeedStatus;

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared, join_all};
use tracing::{debug, warn};

use crate::api::{ArticleQuery, ContentProvider, PostSubmission, ProviderError};
use crate::auth::SessionCipher;
use crate::models::{
    Article, ArticleId, BookmarkSet, Category, Comment, CommentDraft, FilterKey, MediaUpload,
    Page, PostDraft, Profile, ProfileUpdate, PublishedPost, Session, with_all_category,
};
use crate::store::{BOOKMARKS_KEY, KeyValueStore, SESSION_KEY};

use feed::FeedState;

type PageFuture = Shared<BoxFuture<'static, Result<Page, CacheError>>>;

/// Cache tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    /// Articles requested per page
    pub page_size: u32,
    /// Upper bound on a single provider call
    pub request_timeout: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            page_size: 10,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Client-side content cache. Cheap to clone; clones share state.
pub struct ContentCache<P, S> {
    inner: Arc<Inner<P, S>>,
}

impl<P, S> Clone for ContentCache<P, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<P, S> {
    provider: P,
    store: S,
    settings: CacheSettings,
    cipher: Option<SessionCipher>,
    state: Mutex<CacheState>,
}

struct InFlight {
    id: u64,
    generation: u64,
    future: PageFuture,
}

#[derive(Default)]
struct CacheState {
    feeds: HashMap<FilterKey, FeedState>,
    in_flight: HashMap<(FilterKey, u32), InFlight>,
    active: Option<FilterKey>,
    categories: Option<Vec<Category>>,
    bookmarks: BookmarkSet,
    session: Session,
    next_fetch_id: u64,
}

impl CacheState {
    fn reset_feed(&mut self, key: &FilterKey) {
        self.feeds.entry(key.clone()).or_default().reset();
        self.in_flight.retain(|(flight_key, _), _| flight_key != key);
    }

    fn invalidate_feeds(&mut self) {
        for feed in self.feeds.values_mut() {
            feed.reset();
        }
        self.in_flight.clear();
    }
}

fn decode_session(bytes: &[u8], cipher: Option<&SessionCipher>) -> anyhow::Result<Session> {
    let plain = match cipher {
        Some(cipher) => cipher.open(bytes)?,
        None => bytes.to_vec(),
    };
    Ok(serde_json::from_slice(&plain)?)
}

fn encode_session(session: &Session, cipher: Option<&SessionCipher>) -> anyhow::Result<Vec<u8>> {
    let plain = serde_json::to_vec(session)?;
    match cipher {
        Some(cipher) => cipher.seal(&plain),
        None => Ok(plain),
    }
}

impl<P: ContentProvider, S: KeyValueStore> Inner<P, S> {
    fn lock_state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_token(&self) -> Option<String> {
        self.lock_state().session.token().map(str::to_string)
    }

    /// Run a provider call under the configured timeout
    async fn bounded<T>(
        &self,
        request: impl Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, ProviderError> {
        let limit = self.settings.request_timeout;
        tokio::time::timeout(limit, request)
            .await
            .unwrap_or_else(|_| Err(ProviderError::Network(format!("timed out after {limit:?}"))))
    }

    /// Wait for the lower pages in flight, then report `page` as committed
    /// or still pending
    async fn settle(
        &self,
        key: &FilterKey,
        page: u32,
        generation: u64,
    ) -> Result<Page, CacheError> {
        loop {
            let lower: Vec<PageFuture> = {
                let mut guard = self.lock_state();
                let state = &mut *guard;

                let feed = state.feeds.entry(key.clone()).or_default();
                if feed.generation() != generation {
                    return Err(CacheError::Superseded {
                        key: key.clone(),
                        page,
                    });
                }
                if let Some(committed) = feed.committed_page(key, page) {
                    return Ok(committed);
                }

                let lower: Vec<PageFuture> = state
                    .in_flight
                    .iter()
                    .filter(|((flight_key, number), flight)| {
                        flight_key == key && *number < page && flight.generation == generation
                    })
                    .map(|(_, flight)| flight.future.clone())
                    .collect();
                if lower.is_empty() {
                    debug!(%key, page, "page buffered until lower pages load");
                    return feed
                        .pending_page(key, page)
                        .ok_or_else(|| CacheError::Superseded {
                            key: key.clone(),
                            page,
                        });
                }
                lower
            };

            // Outcomes are read back from the feed on the next pass
            join_all(lower).await;
        }
    }

    fn persist_session(&self, session: &Session) -> Result<(), CacheError> {
        let written = if session.is_authenticated() {
            let bytes = encode_session(session, self.cipher.as_ref())
                .map_err(CacheError::persistence)?;
            self.store.set(SESSION_KEY, &bytes)
        } else {
            self.store.remove(SESSION_KEY)
        };
        written.map_err(|err| {
            warn!(error = %err, "session change not persisted");
            CacheError::persistence(err)
        })
    }

    fn require_token(&self) -> Result<String, CacheError> {
        self.current_token()
            .ok_or(CacheError::AuthenticationRequired)
    }

    async fn fetch_page(
        self: Arc<Self>,
        key: FilterKey,
        page: u32,
        generation: u64,
        id: u64,
        token: Option<String>,
    ) -> Result<Page, CacheError> {
        let query = ArticleQuery {
            category: key.category_id(),
            search: key.search_query().map(str::to_string),
            page,
            per_page: self.settings.page_size,
        };
        debug!(%key, page, "fetching page");
        let outcome = self
            .bounded(self.provider.fetch_articles(&query, token.as_deref()))
            .await;

        let mut state = self.lock_state();
        let slot = (key.clone(), page);
        if state.in_flight.get(&slot).is_some_and(|flight| flight.id == id) {
            state.in_flight.remove(&slot);
        }

        let feed = state.feeds.entry(key.clone()).or_default();
        if feed.generation() != generation {
            debug!(%key, page, "discarding page fetched for a reset feed");
            return Err(CacheError::Superseded { key, page });
        }

        match outcome {
            Ok(articles) => Ok(feed.accept(&key, page, articles, self.settings.page_size)),
            Err(err) => {
                warn!(%key, page, error = %err, "page fetch failed");
                Err(CacheError::FetchFailed {
                    key,
                    page,
                    reason: err.to_string(),
                })
            }
        }
    }
}

impl<P: ContentProvider, S: KeyValueStore> ContentCache<P, S> {
    /// Open a cache, restoring bookmarks and session from `store`
    pub fn open(provider: P, store: S, settings: CacheSettings) -> Result<Self, CacheError> {
        Self::open_with(provider, store, settings, None)
    }

    /// Like [`open`](Self::open), with the session record sealed by `cipher`
    pub fn open_sealed(
        provider: P,
        store: S,
        settings: CacheSettings,
        cipher: SessionCipher,
    ) -> Result<Self, CacheError> {
        Self::open_with(provider, store, settings, Some(cipher))
    }

    fn open_with(
        provider: P,
        store: S,
        settings: CacheSettings,
        cipher: Option<SessionCipher>,
    ) -> Result<Self, CacheError> {
        let bookmarks = match store.get(BOOKMARKS_KEY).map_err(CacheError::persistence)? {
            Some(bytes) => BookmarkSet::from_json(&bytes).unwrap_or_else(|err| {
                warn!(error = %err, "stored bookmarks are unreadable, starting empty");
                BookmarkSet::new()
            }),
            None => BookmarkSet::new(),
        };

        let session = match store.get(SESSION_KEY).map_err(CacheError::persistence)? {
            Some(bytes) => decode_session(&bytes, cipher.as_ref()).unwrap_or_else(|err| {
                warn!(error = %err, "stored session is unreadable, continuing anonymously");
                Session::anonymous()
            }),
            None => Session::anonymous(),
        };

        debug!(
            bookmarks = bookmarks.len(),
            signed_in = session.is_authenticated(),
            "content cache opened"
        );

        let state = CacheState {
            bookmarks,
            session,
            ..CacheState::default()
        };

        Ok(Self {
            inner: Arc::new(Inner {
                provider,
                store,
                settings,
                cipher,
                state: Mutex::new(state),
            }),
        })
    }

    /// Settings this cache was opened with
    pub fn settings(&self) -> CacheSettings {
        self.inner.settings
    }

    // ==================== Categories ====================

    /// Category list with "All" first. Fetched once, then memoized.
    pub async fn load_categories(&self) -> Result<Vec<Category>, CacheError> {
        let cached = self.inner.lock_state().categories.clone();
        if let Some(categories) = cached {
            return Ok(categories);
        }
        self.refresh_categories().await
    }

    /// Refetch categories. On failure the memoized list is served if there
    /// is one.
    pub async fn refresh_categories(&self) -> Result<Vec<Category>, CacheError> {
        let token = self.inner.current_token();
        let outcome = self
            .inner
            .bounded(self.inner.provider.fetch_categories(token.as_deref()))
            .await;

        let mut state = self.inner.lock_state();
        match outcome {
            Ok(server) => {
                let categories = with_all_category(server);
                state.categories = Some(categories.clone());
                Ok(categories)
            }
            Err(err) => match &state.categories {
                Some(stale) => {
                    warn!(error = %err, "category refresh failed, serving cached list");
                    Ok(stale.clone())
                }
                None => Err(CacheError::RemoteUnavailable {
                    reason: err.to_string(),
                }),
            },
        }
    }

    // ==================== Feeds ====================

    /// Load page `page` (1-based) of the feed `key`.
    ///
    /// Pages already held for the feed are served from memory. Concurrent
    /// calls for the same page share one provider request.
    ///
    /// A page that completes ahead of a lower page is not exposed early:
    /// the call waits for the lower pages in flight and returns the slice
    /// produced when the page is committed. If no lower page is in flight
    /// the call returns an empty page with `committed == false`; its
    /// articles are released once the gap is loaded.
    pub async fn load_page(&self, key: &FilterKey, page: u32) -> Result<Page, CacheError> {
        if page == 0 {
            return Err(CacheError::InvalidPage(page));
        }

        let (generation, future) = {
            let mut guard = self.inner.lock_state();
            let state = &mut *guard;

            let feed = state.feeds.entry(key.clone()).or_default();
            if let Some(cached) = feed.committed_page(key, page) {
                debug!(%key, page, "serving page from memory");
                return Ok(cached);
            }
            let generation = feed.generation();
            let buffered = feed.is_buffered(page);

            let slot = (key.clone(), page);
            let future = match state.in_flight.get(&slot) {
                _ if buffered => None,
                Some(flight) if flight.generation == generation => {
                    debug!(%key, page, "joining in-flight fetch");
                    Some(flight.future.clone())
                }
                _ => {
                    let id = state.next_fetch_id;
                    state.next_fetch_id += 1;
                    let token = state.session.token().map(str::to_string);

                    let future = Arc::clone(&self.inner)
                        .fetch_page(key.clone(), page, generation, id, token)
                        .boxed()
                        .shared();
                    state.in_flight.insert(
                        slot,
                        InFlight {
                            id,
                            generation,
                            future: future.clone(),
                        },
                    );
                    Some(future)
                }
            };
            (generation, future)
        };

        if let Some(future) = future {
            let fetched = future.await?;
            if fetched.committed {
                return Ok(fetched);
            }
        }
        self.inner.settle(key, page, generation).await
    }

    /// Discard the pages of `key`. Fetches already running for it finish
    /// as [`CacheError::Superseded`].
    pub fn reset_filter(&self, key: &FilterKey) {
        self.inner.lock_state().reset_feed(key);
        debug!(%key, "feed reset");
    }

    /// Make `key` the active feed, resetting the previously active one.
    pub fn select_filter(&self, key: &FilterKey) {
        let mut state = self.inner.lock_state();
        if let Some(previous) = state.active.replace(key.clone())
            && previous != *key
        {
            state.reset_feed(&previous);
            debug!(from = %previous, to = %key, "switched feed");
        }
    }

    /// Currently active feed, if one was selected
    pub fn active_filter(&self) -> Option<FilterKey> {
        self.inner.lock_state().active.clone()
    }

    /// Assembled articles of `key`, in page order
    pub fn articles(&self, key: &FilterKey) -> Vec<Article> {
        self.inner
            .lock_state()
            .feeds
            .get(key)
            .map(FeedState::articles)
            .unwrap_or_default()
    }

    /// Progress of `key`
    pub fn feed_status(&self, key: &FilterKey) -> FeedStatus {
        let state = self.inner.lock_state();
        match state.feeds.get(key) {
            Some(feed) => feed.status(),
            None => FeedState::default().status(),
        }
    }

    // ==================== Bookmarks ====================

    /// Flip the bookmark on `id` and persist the result.
    ///
    /// The new set only replaces the in-memory one after the store confirms
    /// the write; a failed write leaves both unchanged.
    pub fn toggle_bookmark(&self, id: &ArticleId) -> Result<BookmarkSet, CacheError> {
        let mut state = self.inner.lock_state();

        let mut next = state.bookmarks.clone();
        let saved = next.toggle(id);
        let bytes = next.to_json().map_err(CacheError::persistence)?;

        if let Err(err) = self.inner.store.set(BOOKMARKS_KEY, &bytes) {
            warn!(%id, error = %err, "bookmark change not persisted");
            return Err(CacheError::persistence(err));
        }

        state.bookmarks = next;
        debug!(%id, saved, "bookmark toggled");
        Ok(state.bookmarks.clone())
    }

    /// Whether `id` is bookmarked
    pub fn is_bookmarked(&self, id: &ArticleId) -> bool {
        self.inner.lock_state().bookmarks.contains(id)
    }

    /// Current bookmark set
    pub fn bookmarks(&self) -> BookmarkSet {
        self.inner.lock_state().bookmarks.clone()
    }

    /// A single article, from an assembled feed when one holds it
    pub async fn load_article(&self, id: &ArticleId) -> Result<Article, CacheError> {
        let (held, token) = {
            let state = self.inner.lock_state();
            let held = state
                .feeds
                .values()
                .find_map(|feed| feed.find(id));
            (held, state.session.token().map(str::to_string))
        };
        if let Some(article) = held {
            return Ok(article);
        }

        self.inner
            .bounded(self.inner.provider.fetch_article(id, token.as_deref()))
            .await
            .map_err(|err| CacheError::RemoteUnavailable {
                reason: err.to_string(),
            })
    }

    /// Fetch every bookmarked article. Articles that cannot be fetched are
    /// skipped.
    pub async fn load_bookmarked_articles(&self) -> Vec<Article> {
        let (ids, token) = {
            let state = self.inner.lock_state();
            let ids: Vec<ArticleId> = state.bookmarks.iter().cloned().collect();
            (ids, state.session.token().map(str::to_string))
        };

        let fetches = ids.iter().map(|id| {
            self.inner
                .bounded(self.inner.provider.fetch_article(id, token.as_deref()))
        });
        let results = join_all(fetches).await;

        ids.iter()
            .zip(results)
            .filter_map(|(id, result)| match result {
                Ok(article) => Some(article),
                Err(err) => {
                    warn!(%id, error = %err, "bookmarked article unavailable");
                    None
                }
            })
            .collect()
    }

    // ==================== Session ====================

    /// Current session
    pub fn session(&self) -> Session {
        self.inner.lock_state().session.clone()
    }

    /// Store a signed-in session. Clears every cached page.
    pub fn set_session(&self, token: &str, display_name: Option<&str>) -> Result<(), CacheError> {
        if token.trim().is_empty() {
            return Err(CacheError::InvalidInput("token must not be empty".to_string()));
        }
        self.replace_session(Session::authenticated(token, display_name))
    }

    /// Sign out. Bookmarks are kept; every cached page is cleared.
    pub fn clear_session(&self) -> Result<(), CacheError> {
        self.replace_session(Session::anonymous())
    }

    fn replace_session(&self, session: Session) -> Result<(), CacheError> {
        let mut state = self.inner.lock_state();
        self.inner.persist_session(&session)?;

        let signed_in = session.is_authenticated();
        state.session = session;
        state.invalidate_feeds();
        debug!(signed_in, "session changed, page caches cleared");
        Ok(())
    }

    /// Exchange credentials with the provider and store the session
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, CacheError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(CacheError::InvalidInput(
                "username and password are required".to_string(),
            ));
        }

        let credentials = self
            .inner
            .bounded(self.inner.provider.authenticate(username.trim(), password))
            .await
            .map_err(|err| CacheError::RequestFailed {
                reason: match err {
                    ProviderError::Unauthorized(_) => "invalid username or password".to_string(),
                    other => other.to_string(),
                },
            })?;

        self.set_session(&credentials.token, credentials.display_name.as_deref())?;
        Ok(self.session())
    }

    // ==================== Comments ====================

    /// Comments on an article
    pub async fn load_comments(&self, article: &ArticleId) -> Result<Vec<Comment>, CacheError> {
        let token = self.inner.current_token();
        self.inner
            .bounded(self.inner.provider.fetch_comments(article, token.as_deref()))
            .await
            .map_err(|err| CacheError::RemoteUnavailable {
                reason: err.to_string(),
            })
    }

    /// Post a comment. Requires a session.
    pub async fn post_comment(
        &self,
        article: &ArticleId,
        draft: &CommentDraft,
    ) -> Result<Comment, CacheError> {
        let token = self.inner.require_token()?;
        if draft.is_blank() {
            return Err(CacheError::InvalidInput(
                "comment content is required".to_string(),
            ));
        }

        self.inner
            .bounded(self.inner.provider.post_comment(article, draft, &token))
            .await
            .map_err(write_failed)
    }

    // ==================== Posts ====================

    /// Submit a post for review. Requires a session.
    ///
    /// Tags are looked up or created by name; a tag that cannot be resolved
    /// is left off the post. When `media` is given it is uploaded first and
    /// attached as the featured image; a failed upload aborts the post.
    pub async fn create_post(
        &self,
        draft: &PostDraft,
        media: Option<&MediaUpload>,
    ) -> Result<PublishedPost, CacheError> {
        let token = self.inner.require_token()?;
        if !draft.is_complete() {
            return Err(CacheError::InvalidInput(
                "title, content and category are required".to_string(),
            ));
        }

        let mut tags = Vec::with_capacity(draft.tags.len());
        for name in &draft.tags {
            match self
                .inner
                .bounded(self.inner.provider.find_or_create_tag(name, &token))
                .await
            {
                Ok(id) => tags.push(id),
                Err(ProviderError::Unauthorized(_)) => return Err(CacheError::AuthenticationRequired),
                Err(err) => warn!(tag = %name, error = %err, "tag skipped"),
            }
        }

        let featured_media = match media {
            Some(media) => Some(
                self.inner
                    .bounded(self.inner.provider.upload_media(media, &token))
                    .await
                    .map_err(write_failed)?,
            ),
            None => None,
        };

        let submission = PostSubmission {
            title: draft.title.trim().to_string(),
            content: draft.content.clone(),
            status: DRAFT_STATUS.to_string(),
            categories: vec![draft.category],
            tags,
            featured_media,
        };
        let published = self
            .inner
            .bounded(self.inner.provider.create_post(&submission, &token))
            .await
            .map_err(write_failed)?;
        debug!(id = %published.id, status = %published.status, "post submitted");
        Ok(published)
    }

    // ==================== Profile ====================

    /// Profile of the signed-in user
    pub async fn load_profile(&self) -> Result<Profile, CacheError> {
        let token = self.inner.require_token()?;
        self.inner
            .bounded(self.inner.provider.fetch_profile(&token))
            .await
            .map_err(|err| match err {
                ProviderError::Unauthorized(_) => CacheError::AuthenticationRequired,
                other => CacheError::RemoteUnavailable {
                    reason: other.to_string(),
                },
            })
    }

    /// Change the signed-in user's display name.
    ///
    /// The stored session picks up the new name. Page caches are kept since
    /// the token is unchanged.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Profile, CacheError> {
        let token = self.inner.require_token()?;
        if update.name.trim().is_empty() {
            return Err(CacheError::InvalidInput("name is required".to_string()));
        }

        let profile = self
            .inner
            .bounded(self.inner.provider.update_profile(update, &token))
            .await
            .map_err(write_failed)?;

        let mut state = self.inner.lock_state();
        if state.session.token() == Some(token.as_str()) {
            let renamed = Session::authenticated(&token, Some(&profile.name));
            match self.inner.persist_session(&renamed) {
                Ok(()) => state.session = renamed,
                Err(err) => warn!(error = %err, "display name kept from previous login"),
            }
        }
        Ok(profile)
    }
}

/// Status given to posts submitted from the reader
const DRAFT_STATUS: &str = "draft";

/// Map a failed authenticated write
fn write_failed(err: ProviderError) -> CacheError {
    match err {
        ProviderError::Unauthorized(_) => CacheError::AuthenticationRequired,
        other => CacheError::RequestFailed {
            reason: other.to_string(),
        },
    }
}
