//! Event-sourced aggregate repository.

use std::marker::PhantomData;

use common::AggregateId;
use event_store::{AppendOptions, EventEnvelope, EventStore, Version};

use crate::aggregate::Aggregate;
use crate::error::DomainError;

/// Loads aggregates by replaying their event stream and persists them by
/// appending their uncommitted events.
///
/// The repository is the only component that talks to the event store on the
/// command side. It holds no cache: every load replays from the store, so the
/// store stays the single source of truth under concurrent writers.
pub struct AggregateRepository<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    store: S,
    _phantom: PhantomData<A>,
}

impl<S, A> AggregateRepository<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    /// Creates a new repository backed by the given event store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    /// Returns a reference to the underlying event store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loads an aggregate by replaying its event stream.
    ///
    /// Fails with [`DomainError::AggregateNotFound`] when no events exist for
    /// the identifier. After a successful load the aggregate's version equals
    /// the number of applied events.
    #[tracing::instrument(skip(self), fields(aggregate_type = A::aggregate_type()))]
    pub async fn load(&self, aggregate_id: &AggregateId) -> Result<A, DomainError> {
        let envelopes = self.store.get_events_for_aggregate(aggregate_id).await?;

        if envelopes.is_empty() {
            return Err(DomainError::AggregateNotFound {
                aggregate_type: A::aggregate_type(),
                aggregate_id: aggregate_id.clone(),
            });
        }

        let mut aggregate = A::default();
        for envelope in envelopes {
            let event: A::Event = serde_json::from_value(envelope.payload)?;
            aggregate.apply(event);
            aggregate.set_version(envelope.version);
        }

        metrics::counter!("aggregates_loaded").increment(1);

        Ok(aggregate)
    }

    /// Loads an aggregate, returning None when it doesn't exist.
    pub async fn try_load(&self, aggregate_id: &AggregateId) -> Result<Option<A>, DomainError> {
        match self.load(aggregate_id).await {
            Ok(aggregate) => Ok(Some(aggregate)),
            Err(DomainError::AggregateNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Appends the aggregate's uncommitted events to the store.
    ///
    /// The expected version supplied to the store is the version the
    /// aggregate had when it was loaded (current version minus the pending
    /// count), so a concurrent writer on the same stream surfaces as
    /// `ConcurrencyConflict`. That conflict is propagated to the caller
    /// unchanged, never retried here: only the caller knows whether
    /// re-running the original command is safe.
    ///
    /// On success the uncommitted buffer is drained and the returned version
    /// is the store's new head for this stream. On failure the buffer and
    /// version are left untouched, so the aggregate still reflects what the
    /// caller tried to persist. Saving with no uncommitted events is a no-op.
    #[tracing::instrument(skip_all, fields(aggregate_type = A::aggregate_type()))]
    pub async fn save(&self, aggregate: &mut A) -> Result<Version, DomainError> {
        let events = aggregate.uncommitted_events();
        if events.is_empty() {
            return Ok(aggregate.version());
        }

        let aggregate_id = aggregate
            .id()
            .cloned()
            .ok_or(DomainError::MissingAggregateId {
                aggregate_type: A::aggregate_type(),
            })?;

        let expected = Version::new(aggregate.version().as_i64() - events.len() as i64);
        let envelopes = build_envelopes::<A>(&aggregate_id, expected, events)?;

        let options = if expected == Version::initial() {
            AppendOptions::expect_new()
        } else {
            AppendOptions::expect_version(expected)
        };

        let new_version = match self.store.append(envelopes, options).await {
            Ok(version) => version,
            Err(e) => {
                if matches!(
                    e,
                    event_store::EventStoreError::ConcurrencyConflict { .. }
                ) {
                    metrics::counter!("aggregate_save_conflicts").increment(1);
                    tracing::warn!(%aggregate_id, "concurrent writer won the append race");
                }
                return Err(e.into());
            }
        };

        // Drained only now that the append has been accepted.
        aggregate.take_uncommitted_events();
        aggregate.set_version(new_version);
        Ok(new_version)
    }
}

/// Wraps domain events into envelopes with sequential versions starting
/// right after `current_version`.
fn build_envelopes<A: Aggregate>(
    aggregate_id: &AggregateId,
    current_version: Version,
    events: &[A::Event],
) -> Result<Vec<EventEnvelope>, DomainError> {
    use crate::aggregate::DomainEvent;

    let mut envelopes = Vec::with_capacity(events.len());
    let mut version = current_version;

    for event in events {
        version = version.next();
        let envelope = EventEnvelope::builder()
            .aggregate_id(aggregate_id.clone())
            .aggregate_type(A::aggregate_type())
            .event_type(event.event_type())
            .version(version)
            .payload(event)?
            .build();
        envelopes.push(envelope);
    }

    Ok(envelopes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::DomainEvent;
    use event_store::InMemoryEventStore;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    enum CounterEvent {
        Started { id: String },
        Incremented,
    }

    impl DomainEvent for CounterEvent {
        fn event_type(&self) -> &'static str {
            match self {
                CounterEvent::Started { .. } => "Started",
                CounterEvent::Incremented => "Incremented",
            }
        }
    }

    #[derive(Debug, Default)]
    struct Counter {
        id: Option<AggregateId>,
        count: u32,
        version: Version,
        uncommitted: Vec<CounterEvent>,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("counter error")]
    struct CounterError;

    impl Aggregate for Counter {
        type Event = CounterEvent;
        type Error = CounterError;

        fn aggregate_type() -> &'static str {
            "Counter"
        }

        fn id(&self) -> Option<&AggregateId> {
            self.id.as_ref()
        }

        fn version(&self) -> Version {
            self.version
        }

        fn set_version(&mut self, version: Version) {
            self.version = version;
        }

        fn apply(&mut self, event: Self::Event) {
            match event {
                CounterEvent::Started { id } => self.id = Some(AggregateId::from_string(id)),
                CounterEvent::Incremented => self.count += 1,
            }
        }

        fn record(&mut self, event: Self::Event) {
            self.apply(event.clone());
            self.version = self.version.next();
            self.uncommitted.push(event);
        }

        fn uncommitted_events(&self) -> &[Self::Event] {
            &self.uncommitted
        }

        fn take_uncommitted_events(&mut self) -> Vec<Self::Event> {
            std::mem::take(&mut self.uncommitted)
        }
    }

    fn repository() -> AggregateRepository<InMemoryEventStore, Counter> {
        AggregateRepository::new(InMemoryEventStore::new())
    }

    #[tokio::test]
    async fn load_unknown_aggregate_fails_with_not_found() {
        let repo = repository();
        let result = repo.load(&AggregateId::new()).await;
        assert!(matches!(
            result,
            Err(DomainError::AggregateNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn try_load_unknown_aggregate_returns_none() {
        let repo = repository();
        let result = repo.try_load(&AggregateId::new()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn save_then_load_replays_identical_state() {
        let repo = repository();
        let id = AggregateId::from_string("counter-1");

        let mut counter = Counter::default();
        counter.record(CounterEvent::Started {
            id: id.as_str().to_string(),
        });
        counter.record(CounterEvent::Incremented);
        counter.record(CounterEvent::Incremented);

        let version = repo.save(&mut counter).await.unwrap();
        assert_eq!(version, Version::new(3));
        assert!(counter.uncommitted_events().is_empty());

        let loaded = repo.load(&id).await.unwrap();
        assert_eq!(loaded.count, 2);
        assert_eq!(loaded.version(), Version::new(3));
        assert_eq!(loaded.id(), Some(&id));
    }

    #[tokio::test]
    async fn loading_twice_yields_identical_aggregates() {
        let repo = repository();
        let id = AggregateId::from_string("counter-2");

        let mut counter = Counter::default();
        counter.record(CounterEvent::Started {
            id: id.as_str().to_string(),
        });
        counter.record(CounterEvent::Incremented);
        repo.save(&mut counter).await.unwrap();

        let first = repo.load(&id).await.unwrap();
        let second = repo.load(&id).await.unwrap();
        assert_eq!(first.count, second.count);
        assert_eq!(first.version(), second.version());
        assert_eq!(first.id(), second.id());
    }

    #[tokio::test]
    async fn save_without_pending_events_is_a_noop() {
        let repo = repository();
        let id = AggregateId::from_string("counter-3");

        let mut counter = Counter::default();
        counter.record(CounterEvent::Started {
            id: id.as_str().to_string(),
        });
        repo.save(&mut counter).await.unwrap();

        let store_count = repo.store().event_count().await;
        let version = repo.save(&mut counter).await.unwrap();
        assert_eq!(version, Version::first());
        assert_eq!(repo.store().event_count().await, store_count);
    }

    #[tokio::test]
    async fn stale_save_surfaces_concurrency_conflict() {
        let repo = repository();
        let id = AggregateId::from_string("counter-4");

        let mut counter = Counter::default();
        counter.record(CounterEvent::Started {
            id: id.as_str().to_string(),
        });
        repo.save(&mut counter).await.unwrap();

        // Two writers load the same version and both try to append.
        let mut first = repo.load(&id).await.unwrap();
        let mut second = repo.load(&id).await.unwrap();

        first.record(CounterEvent::Incremented);
        second.record(CounterEvent::Incremented);

        repo.save(&mut first).await.unwrap();
        let result = repo.save(&mut second).await;

        assert!(result.is_err());
        assert!(result.unwrap_err().is_concurrency_conflict());
    }

    #[tokio::test]
    async fn conflicted_save_keeps_pending_events() {
        let repo = repository();
        let id = AggregateId::from_string("counter-5");

        let mut counter = Counter::default();
        counter.record(CounterEvent::Started {
            id: id.as_str().to_string(),
        });
        repo.save(&mut counter).await.unwrap();

        let mut first = repo.load(&id).await.unwrap();
        let mut second = repo.load(&id).await.unwrap();

        first.record(CounterEvent::Incremented);
        second.record(CounterEvent::Incremented);

        repo.save(&mut first).await.unwrap();
        let result = repo.save(&mut second).await;
        assert!(result.unwrap_err().is_concurrency_conflict());

        // The loser keeps its pending event and version.
        assert_eq!(second.uncommitted_events().len(), 1);
        assert_eq!(second.version(), Version::new(2));

        // A retry on the same stale instance conflicts again rather than
        // succeeding as an empty save.
        let store_count = repo.store().event_count().await;
        let retry = repo.save(&mut second).await;
        assert!(retry.unwrap_err().is_concurrency_conflict());
        assert_eq!(repo.store().event_count().await, store_count);

        // Reloading and redeciding is the way out.
        let mut fresh = repo.load(&id).await.unwrap();
        fresh.record(CounterEvent::Incremented);
        repo.save(&mut fresh).await.unwrap();
        assert_eq!(fresh.count, 2);
    }

    #[tokio::test]
    async fn save_without_identity_is_rejected() {
        let repo = repository();
        let mut counter = Counter::default();
        counter.record(CounterEvent::Incremented);

        let result = repo.save(&mut counter).await;
        assert!(matches!(
            result,
            Err(DomainError::MissingAggregateId { .. })
        ));
    }
}
