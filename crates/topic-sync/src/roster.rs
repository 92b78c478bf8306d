//! Roster source backed by the reference entity's HTTP API.
//!
//! The endpoint for a reference type comes from an injected
//! [`ReferenceLookup`]; the caller's `Authorization` header is forwarded so the
//! owning service decides whether the caller may read the roster.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::client::parse_json;
use crate::error::{ForumClientError, ForumClientResult, RosterError};
use crate::identity::MemberId;
use crate::traits::{ReferenceLookup, RosterSource};

/// Placeholder substituted with the reference id in endpoint templates.
pub const ID_PLACEHOLDER: &str = "{id}";

#[derive(Debug, Deserialize)]
struct RosterEnvelope {
    result: RosterResult,
}

/// `result` of the envelope. `content` is only decoded once `status` says
/// the request succeeded; a denial carries a message instead of members.
#[derive(Debug, Deserialize)]
struct RosterResult {
    status: u16,
    content: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RosterContent {
    members: Vec<RosterMember>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RosterMember {
    user_id: u64,
}

impl RosterResult {
    fn into_members(self) -> Result<Vec<RosterMember>, RosterError> {
        match self.status {
            200..=299 => {
                let content = self.content.ok_or_else(|| {
                    RosterError::Other("roster response has no content".to_string())
                })?;
                let content: RosterContent = serde_json::from_value(content)
                    .map_err(|e| RosterError::Other(format!("malformed roster content: {e}")))?;
                Ok(content.members)
            }
            401 | 403 => Err(RosterError::Forbidden(self.message())),
            status => Err(RosterError::Other(format!(
                "roster service reported status {status}: {}",
                self.message()
            ))),
        }
    }

    fn message(&self) -> String {
        self.content
            .as_ref()
            .and_then(|c| c.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("no message")
            .to_string()
    }
}

/// Fetches project members over HTTP.
#[derive(Clone)]
pub struct HttpRosterSource {
    lookup: Arc<dyn ReferenceLookup>,
    http_client: Client,
}

impl HttpRosterSource {
    pub fn new(lookup: Arc<dyn ReferenceLookup>, timeout: Duration) -> ForumClientResult<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent("topic-sync/1.0")
            .build()
            .map_err(|e| {
                ForumClientError::InvalidConfig(format!("Failed to build HTTP client: {e}"))
            })?;
        Ok(Self::with_http_client(lookup, http_client))
    }

    #[must_use]
    pub fn with_http_client(lookup: Arc<dyn ReferenceLookup>, http_client: Client) -> Self {
        Self {
            lookup,
            http_client,
        }
    }

    async fn get_roster(
        &self,
        url: &str,
        authorization: Option<&str>,
    ) -> ForumClientResult<RosterResult> {
        debug!("Roster GET {}", url);
        let mut builder = self.http_client.get(url);
        if let Some(auth) = authorization {
            builder = builder.header(reqwest::header::AUTHORIZATION, auth);
        }
        let response = builder.send().await?;
        let envelope: RosterEnvelope = parse_json(response).await?;
        Ok(envelope.result)
    }
}

/// Expand an endpoint template for one reference id.
#[must_use]
pub fn endpoint_url(template: &str, reference_id: i64) -> String {
    template.replace(ID_PLACEHOLDER, &reference_id.to_string())
}

#[async_trait]
impl RosterSource for HttpRosterSource {
    async fn fetch_members(
        &self,
        reference: &str,
        reference_id: i64,
        authorization: Option<&str>,
    ) -> Result<BTreeSet<MemberId>, RosterError> {
        let template = self
            .lookup
            .endpoint_for(reference)
            .await
            .map_err(|e| RosterError::Other(format!("reference lookup failed: {e}")))?
            .ok_or_else(|| RosterError::UnknownReference(reference.to_string()))?;

        let url = endpoint_url(&template, reference_id);
        let members = self
            .get_roster(&url, authorization)
            .await
            .map_err(|e| match e {
                // The owning service rejecting the caller's token is a denial too.
                ForumClientError::AuthError(msg) => RosterError::Forbidden(msg),
                other => RosterError::from(other),
            })?
            .into_members()?;

        let mut roster = BTreeSet::new();
        for m in members {
            match MemberId::new(m.user_id) {
                Some(id) => {
                    roster.insert(id);
                }
                None => warn!(reference, reference_id, "Ignoring roster member with id 0"),
            }
        }
        Ok(roster)
    }
}
