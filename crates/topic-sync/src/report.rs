//! Outcome records of a sync run.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::identity::{MemberId, TopicId};

/// Kind of access change issued against a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationAction {
    Grant,
    Revoke,
}

/// A single grant or revoke call that failed.
#[derive(Debug, Clone)]
pub struct MutationFailure {
    pub topic_id: TopicId,
    pub member_id: MemberId,
    pub action: MutationAction,
    pub message: String,
    /// Whether the transport considered the failure transient.
    pub retryable: bool,
}

/// What happened to one topic during a run.
#[derive(Debug, Clone)]
pub struct TopicOutcome {
    pub topic_id: TopicId,
    /// Members successfully granted access.
    pub granted: Vec<MemberId>,
    /// Members whose access was successfully revoked.
    pub revoked: Vec<MemberId>,
    pub failures: Vec<MutationFailure>,
}

impl TopicOutcome {
    #[must_use]
    pub fn new(topic_id: TopicId) -> Self {
        Self {
            topic_id,
            granted: Vec::new(),
            revoked: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Number of grant/revoke calls dispatched for this topic.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.granted.len() + self.revoked.len() + self.failures.len()
    }
}

/// Summary of a complete sync run.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub reference: String,
    pub reference_id: i64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Size of the desired roster.
    pub roster_size: usize,
    pub topics: Vec<TopicOutcome>,
}

impl SyncReport {
    #[must_use]
    pub fn granted_count(&self) -> usize {
        self.topics.iter().map(|t| t.granted.len()).sum()
    }

    #[must_use]
    pub fn revoked_count(&self) -> usize {
        self.topics.iter().map(|t| t.revoked.len()).sum()
    }

    #[must_use]
    pub fn attempted_count(&self) -> usize {
        self.topics.iter().map(TopicOutcome::attempted).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &MutationFailure> {
        self.topics.iter().flat_map(|t| t.failures.iter())
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.topics.iter().any(|t| !t.failures.is_empty())
    }
}
