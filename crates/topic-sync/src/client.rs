//! Forum HTTP client (reqwest-based).
//!
//! Talks to the forum's topic endpoints: reading a topic's allow-list,
//! inviting a user to a topic and removing an allowed user.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::auth::ForumCredentials;
use crate::error::{ForumClientError, ForumClientResult};
use crate::identity::{ForumUsername, TopicId};
use crate::traits::{ForumApi, ForumTopic};

/// Topic payload (subset) returned by `GET /t/{id}.json`.
///
/// Every field is required: a payload without an allow-list must fail the
/// read rather than look like an empty topic.
#[derive(Debug, Deserialize)]
struct TopicResponse {
    id: u64,
    details: TopicDetails,
}

#[derive(Debug, Deserialize)]
struct TopicDetails {
    allowed_users: Vec<AllowedUser>,
}

#[derive(Debug, Deserialize)]
struct AllowedUser {
    username: String,
}

/// HTTP client for the forum's topic API.
#[derive(Debug, Clone)]
pub struct ForumClient {
    /// Base URL of the forum (e.g. "<https://forum.example.com>").
    base_url: String,
    credentials: ForumCredentials,
    http_client: Client,
}

impl ForumClient {
    /// Create a new client with its own connection pool.
    pub fn new(
        base_url: String,
        credentials: ForumCredentials,
        timeout: Duration,
    ) -> ForumClientResult<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent("topic-sync/1.0")
            .build()
            .map_err(|e| {
                ForumClientError::InvalidConfig(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self::with_http_client(base_url, credentials, http_client))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    #[must_use]
    pub fn with_http_client(
        base_url: String,
        credentials: ForumCredentials,
        http_client: Client,
    ) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            base_url,
            credentials,
            http_client,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch a topic with its allow-list (`GET /t/{id}.json`).
    pub async fn fetch_topic(&self, topic_id: TopicId) -> ForumClientResult<ForumTopic> {
        let url = format!("{}/t/{}.json", self.base_url, topic_id);
        debug!("Forum GET {}", url);
        let builder = self
            .http_client
            .get(&url)
            .query(&[("include_raw", "1")]);
        let response = self.credentials.apply(builder).send().await?;
        let topic: TopicResponse = parse_json(response).await?;
        if topic.id != topic_id.get() {
            return Err(ForumClientError::ParseError(format!(
                "requested topic {topic_id} but received topic {}",
                topic.id
            )));
        }

        Ok(ForumTopic {
            id: topic_id,
            allowed_usernames: topic
                .details
                .allowed_users
                .into_iter()
                .map(|u| ForumUsername::new(u.username))
                .collect(),
        })
    }

    /// Allow a user on a topic (`POST /t/{id}/invite`).
    pub async fn invite(&self, topic_id: TopicId, username: &ForumUsername) -> ForumClientResult<()> {
        let url = format!("{}/t/{}/invite", self.base_url, topic_id);
        debug!("Forum POST {} (user={})", url, username);
        let builder = self
            .http_client
            .post(&url)
            .json(&serde_json::json!({ "user": username.as_str() }));
        let response = self.credentials.apply(builder).send().await?;
        expect_success(response).await
    }

    /// Remove a user from a topic's allow-list (`PUT /t/{id}/remove-allowed-user`).
    pub async fn remove_allowed_user(
        &self,
        topic_id: TopicId,
        username: &ForumUsername,
    ) -> ForumClientResult<()> {
        let url = format!("{}/t/{}/remove-allowed-user", self.base_url, topic_id);
        debug!("Forum PUT {} (username={})", url, username);
        let builder = self
            .http_client
            .put(&url)
            .json(&serde_json::json!({ "username": username.as_str() }));
        let response = self.credentials.apply(builder).send().await?;
        expect_success(response).await
    }
}

#[async_trait]
impl ForumApi for ForumClient {
    async fn get_topic(&self, topic_id: TopicId) -> ForumClientResult<ForumTopic> {
        self.fetch_topic(topic_id).await
    }

    async fn grant(&self, topic_id: TopicId, username: &ForumUsername) -> ForumClientResult<()> {
        self.invite(topic_id, username).await
    }

    async fn revoke(&self, topic_id: TopicId, username: &ForumUsername) -> ForumClientResult<()> {
        self.remove_allowed_user(topic_id, username).await
    }
}

// ── Response Handling ─────────────────────────────────────────────────

/// Decode a successful JSON response or map the error status.
pub(crate) async fn parse_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> ForumClientResult<T> {
    if response.status().is_success() {
        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| ForumClientError::ParseError(format!("Failed to parse response: {e}")))
    } else {
        error_from_response(response).await
    }
}

async fn expect_success(response: reqwest::Response) -> ForumClientResult<()> {
    if response.status().is_success() {
        Ok(())
    } else {
        error_from_response(response).await
    }
}

pub(crate) async fn error_from_response<T>(response: reqwest::Response) -> ForumClientResult<T> {
    let status = response.status();

    let retry_after = response
        .headers()
        .get("Retry-After")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<no body>".to_string());

    match status {
        StatusCode::NOT_FOUND => Err(ForumClientError::NotFound(body)),
        StatusCode::FORBIDDEN => Err(ForumClientError::Forbidden(body)),
        StatusCode::UNAUTHORIZED => Err(ForumClientError::AuthError(format!(
            "Authentication failed (401): {body}"
        ))),
        StatusCode::TOO_MANY_REQUESTS => {
            warn!("Remote API rate limited, retry after {:?}s", retry_after);
            Err(ForumClientError::RateLimited {
                retry_after_secs: retry_after,
            })
        }
        _ => {
            let detail = if body.is_empty() {
                format!("HTTP {status}")
            } else {
                body
            };
            Err(ForumClientError::ApiError {
                status: status.as_u16(),
                detail,
            })
        }
    }
}
