use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    AggregateId, EventEnvelope, EventStoreError, Result, Version,
    store::{AppendOptions, EventStore, EventStream, validate_events_for_append},
};

/// In-memory event store implementation for testing.
///
/// Holds all events behind a single RwLock and provides the same append and
/// replay semantics as the PostgreSQL implementation, including the
/// expected-version conflict check.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    events: Arc<RwLock<Vec<EventEnvelope>>>,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events stored.
    pub async fn event_count(&self) -> usize {
        self.events.read().await.len()
    }

    /// Clears all events.
    pub async fn clear(&self) {
        self.events.write().await.clear();
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version> {
        validate_events_for_append(&events)?;

        let aggregate_id = events[0].aggregate_id.clone();

        // The write lock spans the version check and the insert so two racing
        // appends serialize, exactly one observing a stale version.
        let mut store = self.events.write().await;

        let current_version = store
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .map(|e| e.version)
            .max()
            .unwrap_or(Version::initial());

        if let Some(expected) = options.expected_version
            && current_version != expected
        {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual: current_version,
            });
        }

        // Simulates the unique (aggregate_id, version) constraint.
        if events[0].version <= current_version && current_version != Version::initial() {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected: options.expected_version.unwrap_or(current_version),
                actual: current_version,
            });
        }

        let last_version = events
            .last()
            .map(|e| e.version)
            .unwrap_or(Version::initial());
        store.extend(events);

        Ok(last_version)
    }

    async fn get_events_for_aggregate(
        &self,
        aggregate_id: &AggregateId,
    ) -> Result<Vec<EventEnvelope>> {
        let store = self.events.read().await;
        let mut events: Vec<_> = store
            .iter()
            .filter(|e| &e.aggregate_id == aggregate_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.version);
        Ok(events)
    }

    async fn get_aggregate_version(&self, aggregate_id: &AggregateId) -> Result<Option<Version>> {
        let store = self.events.read().await;
        let version = store
            .iter()
            .filter(|e| &e.aggregate_id == aggregate_id)
            .map(|e| e.version)
            .max();
        Ok(version)
    }

    async fn stream_all_events(&self) -> Result<EventStream> {
        use futures_util::stream;

        let events = self.events.read().await.clone();
        let stream = stream::iter(events.into_iter().map(Ok));
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EventStoreExt;

    fn create_test_event(
        aggregate_id: &AggregateId,
        version: Version,
        event_type: &str,
    ) -> EventEnvelope {
        EventEnvelope::builder()
            .aggregate_id(aggregate_id.clone())
            .aggregate_type("User")
            .event_type(event_type)
            .version(version)
            .payload_raw(serde_json::json!({"test": true}))
            .build()
    }

    #[tokio::test]
    async fn append_single_event() {
        let store = InMemoryEventStore::new();
        let aggregate_id = AggregateId::new();
        let event = create_test_event(&aggregate_id, Version::first(), "UserRegistered");

        let result = store.append(vec![event], AppendOptions::expect_new()).await;
        assert_eq!(result.unwrap(), Version::first());

        let events = store.get_events_for_aggregate(&aggregate_id).await.unwrap();
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn append_multiple_events() {
        let store = InMemoryEventStore::new();
        let aggregate_id = AggregateId::new();

        let events = vec![
            create_test_event(&aggregate_id, Version::new(1), "UserRegistered"),
            create_test_event(&aggregate_id, Version::new(2), "UserDeactivated"),
        ];

        let result = store.append(events, AppendOptions::expect_new()).await;
        assert_eq!(result.unwrap(), Version::new(2));

        let stored = store.get_events_for_aggregate(&aggregate_id).await.unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn concurrency_conflict_on_stale_version() {
        let store = InMemoryEventStore::new();
        let aggregate_id = AggregateId::new();

        let event1 = create_test_event(&aggregate_id, Version::first(), "UserRegistered");
        store
            .append(vec![event1], AppendOptions::expect_new())
            .await
            .unwrap();

        // A second writer that still believes the aggregate is new must lose.
        let event2 = create_test_event(&aggregate_id, Version::first(), "UserRegistered");
        let result = store.append(vec![event2], AppendOptions::expect_new()).await;

        assert!(matches!(
            result,
            Err(EventStoreError::ConcurrencyConflict { .. })
        ));
    }

    #[tokio::test]
    async fn append_with_matching_expected_version_succeeds() {
        let store = InMemoryEventStore::new();
        let aggregate_id = AggregateId::new();

        let event1 = create_test_event(&aggregate_id, Version::first(), "UserRegistered");
        store
            .append(vec![event1], AppendOptions::expect_new())
            .await
            .unwrap();

        let event2 = create_test_event(&aggregate_id, Version::new(2), "UserDeactivated");
        let result = store
            .append(
                vec![event2],
                AppendOptions::expect_version(Version::first()),
            )
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn exactly_one_concurrent_append_wins() {
        let store = InMemoryEventStore::new();
        let aggregate_id = AggregateId::new();

        let event1 = create_test_event(&aggregate_id, Version::first(), "UserRegistered");
        store
            .append(vec![event1], AppendOptions::expect_new())
            .await
            .unwrap();

        // Both writers loaded at version 1 and race to append version 2.
        let a = store.append(
            vec![create_test_event(
                &aggregate_id,
                Version::new(2),
                "UserDeactivated",
            )],
            AppendOptions::expect_version(Version::first()),
        );
        let b = store.append(
            vec![create_test_event(
                &aggregate_id,
                Version::new(2),
                "UserDeactivated",
            )],
            AppendOptions::expect_version(Version::first()),
        );

        let (ra, rb) = tokio::join!(a, b);
        let winners = [&ra, &rb].iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);

        let loser = if ra.is_err() { ra } else { rb };
        assert!(matches!(
            loser,
            Err(EventStoreError::ConcurrencyConflict { .. })
        ));
    }

    #[tokio::test]
    async fn aggregate_version_tracks_latest_event() {
        let store = InMemoryEventStore::new();
        let aggregate_id = AggregateId::new();

        assert!(
            store
                .get_aggregate_version(&aggregate_id)
                .await
                .unwrap()
                .is_none()
        );

        let events = vec![
            create_test_event(&aggregate_id, Version::new(1), "UserRegistered"),
            create_test_event(&aggregate_id, Version::new(2), "UserDeactivated"),
        ];
        store.append(events, AppendOptions::new()).await.unwrap();

        let version = store.get_aggregate_version(&aggregate_id).await.unwrap();
        assert_eq!(version, Some(Version::new(2)));
        assert!(store.aggregate_exists(&aggregate_id).await.unwrap());
    }

    #[tokio::test]
    async fn stream_all_events_preserves_insertion_order() {
        use futures_util::StreamExt;

        let store = InMemoryEventStore::new();
        let id1 = AggregateId::new();
        let id2 = AggregateId::new();

        store
            .append(
                vec![create_test_event(&id1, Version::first(), "UserRegistered")],
                AppendOptions::new(),
            )
            .await
            .unwrap();
        store
            .append(
                vec![create_test_event(&id2, Version::first(), "UserCreated")],
                AppendOptions::new(),
            )
            .await
            .unwrap();

        let stream = store.stream_all_events().await.unwrap();
        let events: Vec<_> = stream.collect().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].as_ref().unwrap().event_type, "UserRegistered");
        assert_eq!(events[1].as_ref().unwrap().event_type, "UserCreated");
    }

    #[tokio::test]
    async fn unknown_aggregate_yields_empty_stream() {
        let store = InMemoryEventStore::new();
        let events = store
            .get_events_for_aggregate(&AggregateId::new())
            .await
            .unwrap();
        assert!(events.is_empty());
    }
}
