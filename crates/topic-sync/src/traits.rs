//! Collaborator seams consumed by the sync engine.
//!
//! Each external system is reached through one of these traits so the engine
//! can be driven by the HTTP clients in production and by in-memory fakes in
//! tests.

use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::error::{ForumClientResult, RosterError, StoreError};
use crate::identity::{ForumUsername, MemberId, TopicId};

/// A forum topic as seen by the sync engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForumTopic {
    pub id: TopicId,
    /// Raw allowed usernames, system account included.
    pub allowed_usernames: Vec<ForumUsername>,
}

/// Read and write access to per-topic allow-lists.
///
/// `grant` and `revoke` must be idempotent: granting an allowed user or
/// revoking an absent user succeeds.
#[async_trait]
pub trait ForumApi: Send + Sync {
    /// Fetch a topic with its current allow-list.
    async fn get_topic(&self, topic_id: TopicId) -> ForumClientResult<ForumTopic>;

    /// Allow `username` on the topic.
    async fn grant(&self, topic_id: TopicId, username: &ForumUsername) -> ForumClientResult<()>;

    /// Remove `username` from the topic's allow-list.
    async fn revoke(&self, topic_id: TopicId, username: &ForumUsername) -> ForumClientResult<()>;
}

/// Source of the authoritative member roster of a reference entity.
#[async_trait]
pub trait RosterSource: Send + Sync {
    /// Fetch the current members of `reference`/`reference_id`.
    ///
    /// `authorization` is the caller's credential, forwarded so the roster
    /// owner can decide whether the caller may see the entity. A denial must
    /// be reported as [`RosterError::Forbidden`].
    async fn fetch_members(
        &self,
        reference: &str,
        reference_id: i64,
        authorization: Option<&str>,
    ) -> Result<BTreeSet<MemberId>, RosterError>;
}

/// Read-only linkage from a reference entity to its forum topics.
#[async_trait]
pub trait TopicLinkStore: Send + Sync {
    /// Topic ids linked to the entity, in stored order.
    async fn list_topic_ids(
        &self,
        reference: &str,
        reference_id: i64,
    ) -> Result<Vec<TopicId>, StoreError>;
}

/// Maps a reference type (e.g. `project`) to its roster endpoint template.
///
/// Templates contain an `{id}` placeholder for the reference id.
#[async_trait]
pub trait ReferenceLookup: Send + Sync {
    async fn endpoint_for(&self, reference: &str) -> Result<Option<String>, StoreError>;
}
