//! In-memory fakes of the collaborator seams for unit tests.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::error::{ForumClientError, ForumClientResult, RosterError, StoreError};
use crate::identity::{ForumUsername, MemberId, TopicId};
use crate::report::MutationAction;
use crate::traits::{ForumApi, ForumTopic, RosterSource, TopicLinkStore};

pub fn member(id: u64) -> MemberId {
    MemberId::new(id).expect("non-zero member id")
}

pub fn member_set(ids: &[u64]) -> BTreeSet<MemberId> {
    ids.iter().map(|id| member(*id)).collect()
}

/// Expected calls per username: `[("111", &[1, 2])]`.
pub fn calls(entries: &[(&str, &[u64])]) -> BTreeMap<String, Vec<u64>> {
    entries
        .iter()
        .map(|(user, topics)| ((*user).to_string(), topics.to_vec()))
        .collect()
}

#[derive(Default)]
struct ForumState {
    topics: HashMap<TopicId, BTreeSet<String>>,
    failing_reads: HashSet<TopicId>,
    failing_writes: HashSet<(TopicId, String)>,
    reads: usize,
    writes: Vec<(MutationAction, TopicId, String)>,
}

/// Forum whose allow-lists live in memory. Grant and revoke are idempotent.
#[derive(Default)]
pub struct FakeForum {
    state: Mutex<ForumState>,
}

impl FakeForum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_allowed(&self, topic: TopicId, usernames: &[&str]) {
        let mut state = self.state.lock().unwrap();
        state
            .topics
            .insert(topic, usernames.iter().map(|s| (*s).to_string()).collect());
    }

    pub fn fail_reads(&self, topic: TopicId) {
        self.state.lock().unwrap().failing_reads.insert(topic);
    }

    pub fn fail_write(&self, topic: TopicId, username: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_writes
            .insert((topic, username.to_string()));
    }

    /// Sorted allow-list of a topic.
    pub fn allowed(&self, topic: TopicId) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .topics
            .get(&topic)
            .map(|users| users.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn read_count(&self) -> usize {
        self.state.lock().unwrap().reads
    }

    pub fn write_count(&self) -> usize {
        self.state.lock().unwrap().writes.len()
    }

    pub fn grants_by_user(&self) -> BTreeMap<String, Vec<u64>> {
        self.calls_by_user(MutationAction::Grant)
    }

    pub fn revokes_by_user(&self) -> BTreeMap<String, Vec<u64>> {
        self.calls_by_user(MutationAction::Revoke)
    }

    fn calls_by_user(&self, action: MutationAction) -> BTreeMap<String, Vec<u64>> {
        let state = self.state.lock().unwrap();
        let mut by_user: BTreeMap<String, Vec<u64>> = BTreeMap::new();
        for (a, topic, user) in &state.writes {
            if *a == action {
                by_user.entry(user.clone()).or_default().push(topic.get());
            }
        }
        for topics in by_user.values_mut() {
            topics.sort_unstable();
        }
        by_user
    }

    fn write(
        &self,
        action: MutationAction,
        topic: TopicId,
        username: &ForumUsername,
    ) -> ForumClientResult<()> {
        let mut state = self.state.lock().unwrap();
        state
            .writes
            .push((action, topic, username.as_str().to_string()));
        if state
            .failing_writes
            .contains(&(topic, username.as_str().to_string()))
        {
            return Err(ForumClientError::ApiError {
                status: 500,
                detail: "write rejected".into(),
            });
        }
        let users = state.topics.entry(topic).or_default();
        match action {
            MutationAction::Grant => users.insert(username.as_str().to_string()),
            MutationAction::Revoke => users.remove(username.as_str()),
        };
        Ok(())
    }
}

#[async_trait]
impl ForumApi for FakeForum {
    async fn get_topic(&self, topic_id: TopicId) -> ForumClientResult<ForumTopic> {
        let mut state = self.state.lock().unwrap();
        state.reads += 1;
        if state.failing_reads.contains(&topic_id) {
            return Err(ForumClientError::ApiError {
                status: 503,
                detail: "unavailable".into(),
            });
        }
        let users = state
            .topics
            .get(&topic_id)
            .ok_or_else(|| ForumClientError::NotFound(format!("topic {topic_id}")))?;
        Ok(ForumTopic {
            id: topic_id,
            allowed_usernames: users.iter().map(ForumUsername::new).collect(),
        })
    }

    async fn grant(&self, topic_id: TopicId, username: &ForumUsername) -> ForumClientResult<()> {
        self.write(MutationAction::Grant, topic_id, username)
    }

    async fn revoke(&self, topic_id: TopicId, username: &ForumUsername) -> ForumClientResult<()> {
        self.write(MutationAction::Revoke, topic_id, username)
    }
}

type RosterErrorFactory = Box<dyn Fn() -> RosterError + Send + Sync>;

/// Roster source answering with a fixed member set or a fixed error.
pub struct FakeRoster {
    members: BTreeSet<MemberId>,
    error: Option<RosterErrorFactory>,
    seen_authorization: Arc<Mutex<Option<String>>>,
}

impl FakeRoster {
    pub fn with_members(ids: &[u64]) -> Self {
        Self {
            members: member_set(ids),
            error: None,
            seen_authorization: Arc::default(),
        }
    }

    pub fn failing(error: impl Fn() -> RosterError + Send + Sync + 'static) -> Self {
        Self {
            members: BTreeSet::new(),
            error: Some(Box::new(error)),
            seen_authorization: Arc::default(),
        }
    }

    /// Handle to the last authorization value the roster was queried with.
    pub fn seen_authorization(&self) -> Arc<Mutex<Option<String>>> {
        self.seen_authorization.clone()
    }
}

#[async_trait]
impl RosterSource for FakeRoster {
    async fn fetch_members(
        &self,
        _reference: &str,
        _reference_id: i64,
        authorization: Option<&str>,
    ) -> Result<BTreeSet<MemberId>, RosterError> {
        *self.seen_authorization.lock().unwrap() = authorization.map(str::to_string);
        match &self.error {
            Some(make_error) => Err(make_error()),
            None => Ok(self.members.clone()),
        }
    }
}

/// Linkage store returning the same topic list for every entity.
pub struct FakeLinks {
    topics: Option<Vec<TopicId>>,
}

impl FakeLinks {
    pub fn with_topics(ids: &[u64]) -> Self {
        Self {
            topics: Some(ids.iter().copied().map(TopicId::new).collect()),
        }
    }

    pub fn failing() -> Self {
        Self { topics: None }
    }
}

#[async_trait]
impl TopicLinkStore for FakeLinks {
    async fn list_topic_ids(
        &self,
        _reference: &str,
        _reference_id: i64,
    ) -> Result<Vec<TopicId>, StoreError> {
        self.topics
            .clone()
            .ok_or_else(|| StoreError::InvalidData("linkage unavailable".into()))
    }
}
