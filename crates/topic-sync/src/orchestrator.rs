//! Sync orchestration.
//!
//! A run moves linearly through four stages:
//!
//! 1. **Resolve** the desired roster of the reference entity (once).
//! 2. **Enumerate** the topics linked to the entity.
//! 3. **Fetch** every topic's allow-list concurrently. Any failure aborts the
//!    run before a single access change is made: guessing an allow-list could
//!    grant or revoke access in bulk.
//! 4. **Plan and mutate** every topic concurrently. Failed grant/revoke calls
//!    are collected; the run reports them only after all topics finished.
//!
//! There are no retries at this layer.

use chrono::Utc;
use futures::future::{join_all, try_join_all};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::allow_list::{AllowList, AllowListFetcher};
use crate::error::{FetchStage, SyncError, SyncResult};
use crate::identity::{MemberId, TopicId};
use crate::mutator::AccessMutator;
use crate::planner;
use crate::report::{SyncReport, TopicOutcome};
use crate::traits::{ForumApi, RosterSource, TopicLinkStore};

/// Parameters of one sync run.
#[derive(Debug, Clone)]
pub struct SyncRequest {
    /// Reference type, e.g. `project`.
    pub reference: String,
    /// Id of the reference entity.
    pub reference_id: i64,
    /// Member who just left the entity and must lose access everywhere.
    pub leaving_user_id: Option<MemberId>,
    /// Caller credential forwarded to the roster source.
    pub authorization: Option<String>,
}

impl SyncRequest {
    pub fn new(reference: impl Into<String>, reference_id: i64) -> Self {
        Self {
            reference: reference.into(),
            reference_id,
            leaving_user_id: None,
            authorization: None,
        }
    }

    #[must_use]
    pub fn leaving(mut self, member: MemberId) -> Self {
        self.leaving_user_id = Some(member);
        self
    }

    #[must_use]
    pub fn with_authorization(mut self, authorization: impl Into<String>) -> Self {
        self.authorization = Some(authorization.into());
        self
    }
}

/// Coordinates roster, linkage, allow-list reads and access changes.
#[derive(Clone)]
pub struct SyncOrchestrator {
    roster: Arc<dyn RosterSource>,
    links: Arc<dyn TopicLinkStore>,
    fetcher: AllowListFetcher,
    mutator: AccessMutator,
}

impl SyncOrchestrator {
    pub fn new(
        roster: Arc<dyn RosterSource>,
        links: Arc<dyn TopicLinkStore>,
        forum: Arc<dyn ForumApi>,
    ) -> Self {
        Self {
            roster,
            links,
            fetcher: AllowListFetcher::new(forum.clone()),
            mutator: AccessMutator::new(forum),
        }
    }

    /// Limit concurrent grant/revoke calls per topic.
    #[must_use]
    pub fn with_mutation_concurrency(mut self, concurrency: usize) -> Self {
        self.mutator = self.mutator.with_concurrency(concurrency);
        self
    }

    /// Reconcile every topic linked to the reference entity with its roster.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Authorization`] if the roster source denies the caller.
    /// - [`SyncError::UnknownReference`] if the reference type has no roster.
    /// - [`SyncError::Dependency`] if the roster, the linkage, or any topic's
    ///   allow-list could not be read. No access change has been made.
    /// - [`SyncError::Mutation`] if some grant/revoke calls failed. The
    ///   carried report lists everything that was applied.
    pub async fn sync_reference_topics(&self, request: &SyncRequest) -> SyncResult<SyncReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "topic_sync",
            run_id = %run_id,
            reference = %request.reference,
            reference_id = request.reference_id,
        );
        self.run(run_id, request)
            .instrument(span)
            .await
            .inspect_err(|e| error!(error = %e, "Topic sync failed"))
    }

    async fn run(&self, run_id: Uuid, request: &SyncRequest) -> SyncResult<SyncReport> {
        let started_at = Utc::now();
        info!(leaving = ?request.leaving_user_id, "Starting topic sync");

        // ── 1. Resolve ───────────────────────────────────────────────────
        let roster: BTreeSet<MemberId> = self
            .roster
            .fetch_members(
                &request.reference,
                request.reference_id,
                request.authorization.as_deref(),
            )
            .await?;

        // ── 2. Enumerate ─────────────────────────────────────────────────
        let topic_ids = self
            .links
            .list_topic_ids(&request.reference, request.reference_id)
            .await
            .map_err(|e| SyncError::dependency(FetchStage::Linkage, e))?;
        let topic_ids = dedup_preserving_order(topic_ids);

        info!(
            roster_size = roster.len(),
            topics = topic_ids.len(),
            "Resolved roster and linked topics"
        );

        // ── 3. Fetch all allow-lists (fail-fast) ─────────────────────────
        let snapshots: Vec<AllowList> =
            try_join_all(topic_ids.iter().map(|topic| self.fetcher.fetch(*topic))).await?;

        // ── 4. Plan and mutate (failures collected) ──────────────────────
        let roster = &roster;
        let topics: Vec<TopicOutcome> = join_all(snapshots.iter().map(|snapshot| {
            let plan = planner::plan(roster, &snapshot.members, request.leaving_user_id);
            async move { self.mutator.apply(snapshot.topic_id, &plan).await }
        }))
        .await;

        let report = SyncReport {
            run_id,
            reference: request.reference.clone(),
            reference_id: request.reference_id,
            started_at,
            finished_at: Utc::now(),
            roster_size: roster.len(),
            topics,
        };

        let attempted = report.attempted_count();
        let failed = report.failures().count();

        info!(
            granted = report.granted_count(),
            revoked = report.revoked_count(),
            failed,
            "Topic sync finished"
        );

        if failed > 0 {
            return Err(SyncError::Mutation {
                failed,
                attempted,
                report: Box::new(report),
            });
        }
        Ok(report)
    }
}

fn dedup_preserving_order(topic_ids: Vec<TopicId>) -> Vec<TopicId> {
    let mut seen = HashSet::with_capacity(topic_ids.len());
    topic_ids.into_iter().filter(|t| seen.insert(*t)).collect()
}
