//! Mock forum and roster API using wiremock for integration testing.
//!
//! One server plays both remote systems: topic endpoints under `/t/` and the
//! project roster under `/projects/{id}`.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use wiremock::matchers::{body_json, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use topic_sync::auth::ForumCredentials;
use topic_sync::client::ForumClient;
use topic_sync::roster::HttpRosterSource;
use topic_sync::store::{StaticReferenceLookup, StaticTopicLinks};
use topic_sync::{SyncOrchestrator, TopicId};

pub const TEST_API_KEY: &str = "test-api-key";
pub const PROJECT: &str = "project";

/// A mock forum server that records every grant and revoke it receives.
pub struct MockForumServer {
    server: MockServer,
}

impl MockForumServer {
    /// Start a new mock server.
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// The underlying wiremock server, for ad hoc mocks.
    pub fn server(&self) -> &MockServer {
        &self.server
    }

    /// Base URI of the mock server.
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Roster endpoint template served by this mock.
    pub fn roster_template(&self) -> String {
        format!("{}/projects/{{id}}", self.uri())
    }

    /// A `ForumClient` talking to this server as the system account.
    pub fn client(&self) -> ForumClient {
        ForumClient::with_http_client(
            self.uri(),
            ForumCredentials::system(TEST_API_KEY),
            reqwest::Client::new(),
        )
    }

    /// A roster source resolving `project` to this server.
    pub fn roster_source(&self) -> HttpRosterSource {
        let lookup = StaticReferenceLookup::new(HashMap::from([(
            PROJECT.to_string(),
            self.roster_template(),
        )]));
        HttpRosterSource::with_http_client(Arc::new(lookup), reqwest::Client::new())
    }

    /// Orchestrator wired to this server with `topics` linked to project 1.
    pub fn orchestrator(&self, topics: &[u64]) -> SyncOrchestrator {
        let mut links = StaticTopicLinks::new();
        for topic in topics {
            links.insert(PROJECT, 1, TopicId::new(*topic));
        }
        SyncOrchestrator::new(
            Arc::new(self.roster_source()),
            Arc::new(links),
            Arc::new(self.client()),
        )
    }

    // =========================================================================
    // Roster mocks
    // =========================================================================

    /// Serve a roster for `/projects/{reference_id}`.
    pub async fn mock_roster(&self, reference_id: i64, members: &[u64]) {
        let members: Vec<Value> = members.iter().map(|id| json!({ "userId": id })).collect();
        Mock::given(method("GET"))
            .and(path(format!("/projects/{reference_id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "roster-response",
                "version": "v4",
                "result": {
                    "success": true,
                    "status": 200,
                    "content": { "members": members }
                }
            })))
            .mount(&self.server)
            .await;
    }

    /// Answer the roster endpoint with an error status.
    pub async fn mock_roster_error(&self, reference_id: i64, status: u16) {
        Mock::given(method("GET"))
            .and(path(format!("/projects/{reference_id}")))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "result": { "success": false, "status": status, "content": { "message": "denied" } }
            })))
            .mount(&self.server)
            .await;
    }

    /// Answer the roster endpoint with HTTP 200 and an arbitrary body.
    pub async fn mock_roster_body(&self, reference_id: i64, body: Value) {
        Mock::given(method("GET"))
            .and(path(format!("/projects/{reference_id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    // =========================================================================
    // Topic mocks
    // =========================================================================

    /// Serve a topic with the given allow-list.
    pub async fn mock_topic(&self, topic_id: u64, allowed: &[&str]) {
        let allowed_users: Vec<Value> = allowed.iter().map(|u| json!({ "username": u })).collect();
        Mock::given(method("GET"))
            .and(path(format!("/t/{topic_id}.json")))
            .and(query_param("include_raw", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": topic_id,
                "title": format!("Topic {topic_id}"),
                "details": { "allowed_users": allowed_users }
            })))
            .mount(&self.server)
            .await;
    }

    /// Answer a topic read with HTTP 200 and an arbitrary body.
    pub async fn mock_topic_body(&self, topic_id: u64, body: Value) {
        Mock::given(method("GET"))
            .and(path(format!("/t/{topic_id}.json")))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Answer a topic read with an error status.
    pub async fn mock_topic_error(&self, topic_id: u64, status: u16) {
        Mock::given(method("GET"))
            .and(path(format!("/t/{topic_id}.json")))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Accept every invite and removal.
    pub async fn mock_writes_success(&self) {
        Mock::given(method("POST"))
            .and(path_regex(r"^/t/\d+/invite$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": "OK" })))
            .mount(&self.server)
            .await;

        Mock::given(method("PUT"))
            .and(path_regex(r"^/t/\d+/remove-allowed-user$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": "OK" })))
            .mount(&self.server)
            .await;
    }

    /// Reject the invite of `username` to `topic_id`.
    pub async fn mock_invite_failure(&self, topic_id: u64, username: &str, status: u16) {
        Mock::given(method("POST"))
            .and(path(format!("/t/{topic_id}/invite")))
            .and(body_json(json!({ "user": username })))
            .respond_with(ResponseTemplate::new(status))
            .with_priority(1)
            .mount(&self.server)
            .await;
    }

    // =========================================================================
    // Recorded calls
    // =========================================================================

    /// Invites received, keyed by username, listing topic ids.
    pub async fn grants(&self) -> BTreeMap<String, Vec<u64>> {
        self.calls("POST", "/invite", "user").await
    }

    /// Removals received, keyed by username, listing topic ids.
    pub async fn revokes(&self) -> BTreeMap<String, Vec<u64>> {
        self.calls("PUT", "/remove-allowed-user", "username").await
    }

    /// Number of requests that hit a topic endpoint with a write method.
    pub async fn write_count(&self) -> usize {
        self.requests()
            .await
            .iter()
            .filter(|r| r.url.path().starts_with("/t/") && r.method.as_str() != "GET")
            .count()
    }

    /// Number of topic reads received.
    pub async fn topic_read_count(&self) -> usize {
        self.requests()
            .await
            .iter()
            .filter(|r| r.url.path().starts_with("/t/") && r.method.as_str() == "GET")
            .count()
    }

    async fn requests(&self) -> Vec<wiremock::Request> {
        self.server.received_requests().await.unwrap_or_default()
    }

    async fn calls(&self, verb: &str, suffix: &str, field: &str) -> BTreeMap<String, Vec<u64>> {
        let mut by_user: BTreeMap<String, Vec<u64>> = BTreeMap::new();
        for request in self.requests().await {
            let p = request.url.path();
            if request.method.as_str() != verb || !p.ends_with(suffix) {
                continue;
            }
            let topic: u64 = p
                .trim_start_matches("/t/")
                .trim_end_matches(suffix)
                .parse()
                .expect("numeric topic id in path");
            let body: Value = serde_json::from_slice(&request.body).expect("JSON body");
            let user = body[field].as_str().expect("username in body").to_string();
            by_user.entry(user).or_default().push(topic);
        }
        for topics in by_user.values_mut() {
            topics.sort_unstable();
        }
        by_user
    }
}

/// Expected calls per username: `[("111", &[1, 2])]`.
pub fn calls(entries: &[(&str, &[u64])]) -> BTreeMap<String, Vec<u64>> {
    entries
        .iter()
        .map(|(user, topics)| ((*user).to_string(), topics.to_vec()))
        .collect()
}
