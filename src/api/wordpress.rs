//! WordPress REST API client

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use crate::models::{
    Article, ArticleId, Category, Comment, CommentDraft, Credentials, MediaUpload, Profile,
    ProfileUpdate, PublishedPost, html_to_text,
};

use super::{ArticleQuery, ContentProvider, PostSubmission, ProviderError};

/// Largest `per_page` the REST API accepts
pub const MAX_PER_PAGE: u32 = 100;

/// Avatar size preferred from `avatar_urls`
const AVATAR_SIZE: &str = "96";

/// Error code WordPress returns when `page` is past the last page
const INVALID_PAGE_CODE: &str = "rest_post_invalid_page_number";

const MAX_ERROR_BODY: usize = 512;

/// WordPress REST API client
pub struct WordPressClient {
    client: Client,
    site: String,
}

impl WordPressClient {
    /// Create a client for a site (e.g. `https://example.com`)
    pub fn new(site: &str) -> Self {
        Self {
            client: Client::new(),
            site: site.trim_end_matches('/').to_string(),
        }
    }

    /// Create a client whose requests give up after `timeout`
    pub fn with_timeout(site: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            site: site.trim_end_matches('/').to_string(),
        })
    }

    /// Site base URL
    pub fn site(&self) -> &str {
        &self.site
    }

    /// Build API URL
    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/wp-json/wp/v2{}", self.site, endpoint)
    }

    /// Attach the bearer token when there is one
    fn authorized(request: RequestBuilder, auth: Option<&str>) -> RequestBuilder {
        match auth {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

/// Turn non-success responses into errors
async fn check(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ProviderError::Unauthorized(status.as_u16()));
    }

    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    Err(ProviderError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl ContentProvider for WordPressClient {
    async fn fetch_articles(
        &self,
        query: &ArticleQuery,
        auth: Option<&str>,
    ) -> Result<Vec<Article>, ProviderError> {
        let mut params = vec![
            ("_embed", "1".to_string()),
            ("per_page", query.per_page.to_string()),
            ("page", query.page.to_string()),
        ];
        if let Some(category) = query.category {
            params.push(("categories", category.to_string()));
        }
        if let Some(search) = &query.search {
            params.push(("search", search.clone()));
        }

        let request = self.client.get(self.api_url("/posts")).query(&params);
        let response = Self::authorized(request, auth).send().await?;

        if response.status() == StatusCode::BAD_REQUEST {
            let body = response.text().await?;
            if body.contains(INVALID_PAGE_CODE) {
                tracing::debug!(page = query.page, "page past the end of the feed");
                return Ok(Vec::new());
            }
            return Err(ProviderError::Status { status: 400, body });
        }

        let posts: Vec<WpPost> = check(response).await?.json().await?;
        Ok(posts.into_iter().map(WpPost::into_article).collect())
    }

    async fn fetch_categories(&self, auth: Option<&str>) -> Result<Vec<Category>, ProviderError> {
        let request = self
            .client
            .get(self.api_url("/categories"))
            .query(&[("per_page", MAX_PER_PAGE)]);
        let response = Self::authorized(request, auth).send().await?;

        let categories: Vec<WpCategory> = check(response).await?.json().await?;
        Ok(categories.into_iter().map(WpCategory::into_category).collect())
    }

    async fn fetch_article(
        &self,
        id: &ArticleId,
        auth: Option<&str>,
    ) -> Result<Article, ProviderError> {
        let request = self
            .client
            .get(self.api_url(&format!("/posts/{id}")))
            .query(&[("_embed", "1")]);
        let response = Self::authorized(request, auth).send().await?;

        let post: WpPost = check(response).await?.json().await?;
        Ok(post.into_article())
    }

    async fn fetch_comments(
        &self,
        article: &ArticleId,
        auth: Option<&str>,
    ) -> Result<Vec<Comment>, ProviderError> {
        let request = self
            .client
            .get(self.api_url("/comments"))
            .query(&[("post", article.as_str())]);
        let response = Self::authorized(request, auth).send().await?;

        let comments: Vec<WpComment> = check(response).await?.json().await?;
        Ok(comments.into_iter().map(WpComment::into_comment).collect())
    }

    async fn post_comment(
        &self,
        article: &ArticleId,
        draft: &CommentDraft,
        token: &str,
    ) -> Result<Comment, ProviderError> {
        // WordPress wants a numeric post id when the id is numeric
        let post = article
            .as_str()
            .parse::<u64>()
            .map_or_else(|_| serde_json::json!(article.as_str()), |n| serde_json::json!(n));

        let mut body = serde_json::json!({
            "post": post,
            "content": draft.content,
        });
        if let Some(name) = &draft.author_name {
            body["author_name"] = serde_json::json!(name);
        }
        if let Some(email) = &draft.author_email {
            body["author_email"] = serde_json::json!(email);
        }

        let response = self
            .client
            .post(self.api_url("/comments"))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let comment: WpComment = check(response).await?.json().await?;
        Ok(comment.into_comment())
    }

    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Credentials, ProviderError> {
        let url = format!("{}/wp-json/jwt-auth/v1/token", self.site);
        let params = [("username", username), ("password", password)];

        let response = self.client.post(&url).form(&params).send().await?;

        let token: WpToken = check(response).await?.json().await?;
        Ok(Credentials {
            token: token.token,
            display_name: token
                .user_display_name
                .filter(|name| !name.is_empty())
                .or(token.user_nicename),
        })
    }

    async fn upload_media(&self, media: &MediaUpload, token: &str) -> Result<u64, ProviderError> {
        let disposition = format!(
            "attachment; filename=\"{}\"",
            media.file_name.replace('"', "")
        );
        let response = self
            .client
            .post(self.api_url("/media"))
            .bearer_auth(token)
            .header(CONTENT_TYPE, media.content_type.as_str())
            .header(CONTENT_DISPOSITION, disposition)
            .body(media.bytes.clone())
            .send()
            .await?;

        let created: WpCreated = check(response).await?.json().await?;
        Ok(created.id)
    }

    async fn find_or_create_tag(&self, name: &str, token: &str) -> Result<u64, ProviderError> {
        let response = self
            .client
            .get(self.api_url("/tags"))
            .bearer_auth(token)
            .query(&[("search", name)])
            .send()
            .await?;
        let existing: Vec<WpTag> = check(response).await?.json().await?;

        // Search matches substrings; only reuse a tag with the same name
        if let Some(tag) = existing
            .iter()
            .find(|tag| html_escape::decode_html_entities(&tag.name).eq_ignore_ascii_case(name))
        {
            return Ok(tag.id);
        }

        let response = self
            .client
            .post(self.api_url("/tags"))
            .bearer_auth(token)
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await?;
        let created: WpCreated = check(response).await?.json().await?;
        tracing::debug!(tag = name, id = created.id, "created tag");
        Ok(created.id)
    }

    async fn create_post(
        &self,
        post: &PostSubmission,
        token: &str,
    ) -> Result<PublishedPost, ProviderError> {
        let response = self
            .client
            .post(self.api_url("/posts"))
            .bearer_auth(token)
            .json(post)
            .send()
            .await?;

        let created: WpPublished = check(response).await?.json().await?;
        Ok(PublishedPost {
            id: ArticleId::from(created.id),
            status: created.status,
            link: created.link,
        })
    }

    async fn fetch_profile(&self, token: &str) -> Result<Profile, ProviderError> {
        let response = self
            .client
            .get(self.api_url("/users/me"))
            .bearer_auth(token)
            .send()
            .await?;

        let user: WpUser = check(response).await?.json().await?;
        Ok(user.into_profile())
    }

    async fn update_profile(
        &self,
        update: &ProfileUpdate,
        token: &str,
    ) -> Result<Profile, ProviderError> {
        let response = self
            .client
            .post(self.api_url("/users/me"))
            .bearer_auth(token)
            .json(update)
            .send()
            .await?;

        let user: WpUser = check(response).await?.json().await?;
        Ok(user.into_profile())
    }
}

// ==================== API Types ====================

#[derive(Debug, Default, Deserialize)]
struct WpRendered {
    #[serde(default)]
    rendered: String,
}

#[derive(Debug, Deserialize)]
struct WpPost {
    id: u64,
    #[serde(default)]
    date_gmt: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    title: WpRendered,
    #[serde(default)]
    content: WpRendered,
    #[serde(default)]
    categories: Vec<u64>,
    #[serde(default, rename = "_embedded")]
    embedded: Option<WpEmbedded>,
}

#[derive(Debug, Default, Deserialize)]
struct WpEmbedded {
    #[serde(default)]
    author: Vec<WpAuthor>,
    #[serde(default, rename = "wp:featuredmedia")]
    featured_media: Vec<WpMedia>,
}

#[derive(Debug, Deserialize)]
struct WpAuthor {
    #[serde(default)]
    name: String,
    #[serde(default)]
    avatar_urls: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct WpMedia {
    #[serde(default)]
    source_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WpCategory {
    id: u64,
    name: String,
    slug: String,
    #[serde(default)]
    count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct WpComment {
    id: u64,
    post: u64,
    #[serde(default)]
    author_name: String,
    #[serde(default)]
    date_gmt: Option<String>,
    #[serde(default)]
    content: WpRendered,
}

#[derive(Debug, Deserialize)]
struct WpToken {
    token: String,
    #[serde(default)]
    user_display_name: Option<String>,
    #[serde(default)]
    user_nicename: Option<String>,
}

/// Response to a create call (media, tags)
#[derive(Debug, Deserialize)]
struct WpCreated {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct WpTag {
    id: u64,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct WpPublished {
    id: u64,
    #[serde(default)]
    status: String,
    #[serde(default)]
    link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WpUser {
    id: u64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    avatar_urls: BTreeMap<String, String>,
}

impl WpUser {
    fn into_profile(self) -> Profile {
        let avatar_url = preferred_avatar(&self.avatar_urls);
        Profile {
            id: self.id,
            name: html_escape::decode_html_entities(&self.name).to_string(),
            avatar_url,
        }
    }
}

fn preferred_avatar(urls: &BTreeMap<String, String>) -> Option<String> {
    urls.get(AVATAR_SIZE)
        .or_else(|| urls.values().next_back())
        .cloned()
}

/// WordPress `*_gmt` fields carry no offset; they are UTC by definition
fn parse_wp_date(raw: Option<&str>) -> DateTime<Utc> {
    raw.and_then(|s| {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
            .map(|naive| naive.and_utc())
            .or_else(|_| DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc)))
            .ok()
    })
    .unwrap_or_else(Utc::now)
}

impl WpPost {
    fn into_article(self) -> Article {
        let embedded = self.embedded.unwrap_or_default();
        let author = embedded.author.into_iter().next();

        let author_avatar = author.as_ref().and_then(|a| preferred_avatar(&a.avatar_urls));

        Article {
            id: ArticleId::from(self.id),
            title: html_to_text(&self.title.rendered),
            body: self.content.rendered,
            author_name: author.map(|a| a.name).unwrap_or_default(),
            author_avatar,
            published_at: parse_wp_date(self.date_gmt.as_deref()),
            categories: self.categories.into_iter().collect(),
            featured_image: embedded
                .featured_media
                .into_iter()
                .find_map(|media| media.source_url),
            link: self.link,
        }
    }
}

impl WpCategory {
    fn into_category(self) -> Category {
        Category {
            id: self.id,
            name: html_escape::decode_html_entities(&self.name).to_string(),
            slug: self.slug,
            count: self.count,
        }
    }
}

impl WpComment {
    fn into_comment(self) -> Comment {
        Comment {
            id: self.id,
            article_id: ArticleId::from(self.post),
            author_name: self.author_name,
            content: html_to_text(&self.content.rendered),
            created_at: parse_wp_date(self.date_gmt.as_deref()),
        }
    }
}
