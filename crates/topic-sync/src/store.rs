//! Topic linkage and reference lookup stores.
//!
//! The static implementations are built from configuration. With the
//! `postgres` feature, `PgTopicLinks` and `PgReferenceLookup` read the same
//! data from the `topics` and `reference_lookups` tables.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

use crate::error::StoreError;
use crate::identity::TopicId;
use crate::traits::{ReferenceLookup, TopicLinkStore};

/// One link between a reference entity and a forum topic.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicLink {
    pub reference: String,
    pub reference_id: i64,
    pub topic_id: u64,
}

/// In-memory linkage store.
#[derive(Debug, Clone, Default)]
pub struct StaticTopicLinks {
    links: HashMap<(String, i64), Vec<TopicId>>,
}

impl StaticTopicLinks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Link a topic to an entity. Insertion order is the listing order.
    pub fn insert(&mut self, reference: impl Into<String>, reference_id: i64, topic: TopicId) {
        self.links
            .entry((reference.into(), reference_id))
            .or_default()
            .push(topic);
    }
}

impl FromIterator<TopicLink> for StaticTopicLinks {
    fn from_iter<I: IntoIterator<Item = TopicLink>>(iter: I) -> Self {
        let mut store = Self::new();
        for link in iter {
            store.insert(link.reference, link.reference_id, TopicId::new(link.topic_id));
        }
        store
    }
}

#[async_trait]
impl TopicLinkStore for StaticTopicLinks {
    async fn list_topic_ids(
        &self,
        reference: &str,
        reference_id: i64,
    ) -> Result<Vec<TopicId>, StoreError> {
        Ok(self
            .links
            .get(&(reference.to_string(), reference_id))
            .cloned()
            .unwrap_or_default())
    }
}

/// In-memory reference type → endpoint template table.
#[derive(Debug, Clone, Default)]
pub struct StaticReferenceLookup {
    endpoints: HashMap<String, String>,
}

impl StaticReferenceLookup {
    #[must_use]
    pub fn new(endpoints: HashMap<String, String>) -> Self {
        Self { endpoints }
    }
}

#[async_trait]
impl ReferenceLookup for StaticReferenceLookup {
    async fn endpoint_for(&self, reference: &str) -> Result<Option<String>, StoreError> {
        Ok(self.endpoints.get(reference).cloned())
    }
}

#[cfg(feature = "postgres")]
pub use pg::{PgReferenceLookup, PgTopicLinks};

#[cfg(feature = "postgres")]
mod pg {
    use super::*;
    use sqlx::PgPool;

    /// Linkage store over the `topics` table.
    #[derive(Debug, Clone)]
    pub struct PgTopicLinks {
        pool: PgPool,
    }

    impl PgTopicLinks {
        pub fn new(pool: PgPool) -> Self {
            Self { pool }
        }
    }

    #[async_trait]
    impl TopicLinkStore for PgTopicLinks {
        async fn list_topic_ids(
            &self,
            reference: &str,
            reference_id: i64,
        ) -> Result<Vec<TopicId>, StoreError> {
            let rows: Vec<(i64,)> = sqlx::query_as(
                r"
                SELECT discourse_topic_id
                FROM topics
                WHERE reference = $1 AND reference_id = $2
                ORDER BY id
                ",
            )
            .bind(reference)
            .bind(reference_id)
            .fetch_all(&self.pool)
            .await?;

            rows.into_iter()
                .map(|(id,)| {
                    u64::try_from(id)
                        .map(TopicId::new)
                        .map_err(|_| StoreError::InvalidData(format!("negative topic id {id}")))
                })
                .collect()
        }
    }

    /// Reference lookup over the `reference_lookups` table.
    #[derive(Debug, Clone)]
    pub struct PgReferenceLookup {
        pool: PgPool,
    }

    impl PgReferenceLookup {
        pub fn new(pool: PgPool) -> Self {
            Self { pool }
        }
    }

    #[async_trait]
    impl ReferenceLookup for PgReferenceLookup {
        async fn endpoint_for(&self, reference: &str) -> Result<Option<String>, StoreError> {
            let row: Option<(String,)> =
                sqlx::query_as("SELECT endpoint FROM reference_lookups WHERE reference = $1")
                    .bind(reference)
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(row.map(|(endpoint,)| endpoint))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_links_preserve_order_per_entity() {
        let links: StaticTopicLinks = [
            TopicLink {
                reference: "project".into(),
                reference_id: 1,
                topic_id: 20,
            },
            TopicLink {
                reference: "project".into(),
                reference_id: 2,
                topic_id: 30,
            },
            TopicLink {
                reference: "project".into(),
                reference_id: 1,
                topic_id: 10,
            },
        ]
        .into_iter()
        .collect();

        let ids = links.list_topic_ids("project", 1).await.unwrap();
        assert_eq!(ids, vec![TopicId::new(20), TopicId::new(10)]);
        assert!(links.list_topic_ids("project", 99).await.unwrap().is_empty());
    }

    #[test]
    fn test_topic_link_deserializes_camel_case() {
        let link: TopicLink = serde_json::from_str(
            r#"{"reference":"project","referenceId":7,"topicId":123}"#,
        )
        .unwrap();
        assert_eq!(link.reference_id, 7);
        assert_eq!(link.topic_id, 123);
    }

    #[tokio::test]
    async fn test_static_lookup() {
        let lookup = StaticReferenceLookup::new(HashMap::from([(
            "project".to_string(),
            "https://api/{id}".to_string(),
        )]));
        assert_eq!(
            lookup.endpoint_for("project").await.unwrap().as_deref(),
            Some("https://api/{id}")
        );
        assert!(lookup.endpoint_for("challenge").await.unwrap().is_none());
    }
}
