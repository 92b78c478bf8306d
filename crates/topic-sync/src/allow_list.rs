//! Allow-list fetching.

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

use crate::error::{FetchStage, SyncError, SyncResult};
use crate::identity::{normalize_usernames, ForumUsername, MemberId, TopicId};
use crate::traits::ForumApi;

/// One consistent snapshot of a topic's allow-list, system account excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowList {
    pub topic_id: TopicId,
    /// Allowed accounts that map to roster members.
    pub members: BTreeSet<MemberId>,
    /// Allowed accounts the roster does not manage.
    pub unmanaged: Vec<ForumUsername>,
}

/// Reads a topic's current allow-list through the forum API.
#[derive(Clone)]
pub struct AllowListFetcher {
    forum: Arc<dyn ForumApi>,
}

impl AllowListFetcher {
    pub fn new(forum: Arc<dyn ForumApi>) -> Self {
        Self { forum }
    }

    /// Fetch and normalize the allow-list of `topic_id`.
    ///
    /// A failed read is reported as a dependency error for that topic; an
    /// empty list is never assumed in its place.
    pub async fn fetch(&self, topic_id: TopicId) -> SyncResult<AllowList> {
        let topic = self
            .forum
            .get_topic(topic_id)
            .await
            .map_err(|e| SyncError::dependency(FetchStage::AllowList(topic_id), e))?;

        let normalized = normalize_usernames(topic.allowed_usernames);
        debug!(
            topic_id = %topic_id,
            members = normalized.members.len(),
            unmanaged = normalized.unmanaged.len(),
            "Fetched topic allow-list"
        );

        Ok(AllowList {
            topic_id,
            members: normalized.members,
            unmanaged: normalized.unmanaged,
        })
    }
}
