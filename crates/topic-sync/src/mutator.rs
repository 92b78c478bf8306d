//! Applies reconciliation plans against the forum.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::identity::{MemberId, TopicId};
use crate::planner::ReconciliationPlan;
use crate::report::{MutationAction, MutationFailure, TopicOutcome};
use crate::traits::ForumApi;

/// Default number of grant/revoke calls in flight per topic.
pub const DEFAULT_MUTATION_CONCURRENCY: usize = 8;

/// Issues grant and revoke calls for a plan.
///
/// Every call is independent: a failure is recorded in the topic outcome and
/// never prevents the remaining calls from being dispatched. Nothing is rolled
/// back.
#[derive(Clone)]
pub struct AccessMutator {
    forum: Arc<dyn ForumApi>,
    concurrency: usize,
}

impl AccessMutator {
    pub fn new(forum: Arc<dyn ForumApi>) -> Self {
        Self {
            forum,
            concurrency: DEFAULT_MUTATION_CONCURRENCY,
        }
    }

    /// Limit the number of concurrent calls per topic (minimum 1).
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Apply `plan` to `topic_id` and report what succeeded and what failed.
    pub async fn apply(&self, topic_id: TopicId, plan: &ReconciliationPlan) -> TopicOutcome {
        let mut outcome = TopicOutcome::new(topic_id);
        if plan.is_empty() {
            debug!(topic_id = %topic_id, "Topic allow-list already in sync");
            return outcome;
        }

        let calls: Vec<(MemberId, MutationAction)> = plan
            .to_add
            .iter()
            .map(|m| (*m, MutationAction::Grant))
            .chain(plan.to_remove.iter().map(|m| (*m, MutationAction::Revoke)))
            .collect();

        let results: Vec<(MemberId, MutationAction, Result<(), MutationFailure>)> =
            stream::iter(calls)
                .map(|(member, action)| async move {
                    let result = self.dispatch(topic_id, member, action).await;
                    (member, action, result)
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

        for (member, action, result) in results {
            match (result, action) {
                (Ok(()), MutationAction::Grant) => outcome.granted.push(member),
                (Ok(()), MutationAction::Revoke) => outcome.revoked.push(member),
                (Err(failure), _) => outcome.failures.push(failure),
            }
        }

        // Completion order is arbitrary; keep reports stable.
        outcome.granted.sort_unstable();
        outcome.revoked.sort_unstable();
        outcome.failures.sort_by_key(|f| (f.member_id, f.action == MutationAction::Revoke));

        outcome
    }

    async fn dispatch(
        &self,
        topic_id: TopicId,
        member: MemberId,
        action: MutationAction,
    ) -> Result<(), MutationFailure> {
        let username = member.to_forum_username();
        let result = match action {
            MutationAction::Grant => self.forum.grant(topic_id, &username).await,
            MutationAction::Revoke => self.forum.revoke(topic_id, &username).await,
        };

        match result {
            Ok(()) => {
                debug!(topic_id = %topic_id, member = %member, action = ?action, "Access updated");
                Ok(())
            }
            Err(e) => {
                warn!(
                    topic_id = %topic_id,
                    member = %member,
                    action = ?action,
                    error = %e,
                    "Access change failed"
                );
                Err(MutationFailure {
                    topic_id,
                    member_id: member,
                    action,
                    message: e.to_string(),
                    retryable: e.is_retryable() || e.is_server_error(),
                })
            }
        }
    }
}
