//! Core aggregate and domain event traits.

use common::AggregateId;
use event_store::Version;
use serde::{Serialize, de::DeserializeOwned};

/// Trait for domain events.
///
/// Domain events are immutable facts, named in past tense. Once appended to
/// the store they are never rewritten; aggregate state is whatever falls out
/// of replaying them in order.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the event type name, used for storage and read-model routing.
    fn event_type(&self) -> &'static str;
}

/// Trait for event-sourced aggregates.
///
/// An aggregate is a consistency boundary. Its state is derived solely by
/// replaying its own event stream, and commands against it produce new events
/// rather than in-place mutations. Events produced by behavior methods are
/// buffered as *uncommitted* until the repository appends them to the store.
pub trait Aggregate: Default + Send + Sync + Sized {
    /// The type of events this aggregate produces and consumes.
    type Event: DomainEvent;

    /// The type of errors this aggregate's behavior can produce.
    type Error: std::error::Error + Send + Sync;

    /// Returns the aggregate type name, used for event store organization.
    fn aggregate_type() -> &'static str;

    /// Returns the aggregate's unique identifier.
    ///
    /// Returns None for a new, uninitialized aggregate.
    fn id(&self) -> Option<&AggregateId>;

    /// Returns the current version of the aggregate.
    ///
    /// Version starts at 0 and equals the count of applied events, committed
    /// and uncommitted alike.
    fn version(&self) -> Version;

    /// Sets the aggregate version. Called by the repository during replay.
    fn set_version(&mut self, version: Version);

    /// Applies an event to the aggregate, updating its state.
    ///
    /// This method must be pure and deterministic: given the same state and
    /// event it always produces the same new state, with no side effects and
    /// no failure (events are facts that have already happened).
    fn apply(&mut self, event: Self::Event);

    /// Applies a newly produced event and buffers it for the next save.
    ///
    /// Unlike replay via [`apply`], this bumps the version by one.
    fn record(&mut self, event: Self::Event);

    /// Returns the events recorded since the last save.
    fn uncommitted_events(&self) -> &[Self::Event];

    /// Drains the uncommitted event buffer. Called by the repository when
    /// persisting.
    fn take_uncommitted_events(&mut self) -> Vec<Self::Event>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    enum TestEvent {
        Opened { id: String },
        Bumped,
    }

    impl DomainEvent for TestEvent {
        fn event_type(&self) -> &'static str {
            match self {
                TestEvent::Opened { .. } => "Opened",
                TestEvent::Bumped => "Bumped",
            }
        }
    }

    #[derive(Debug, Default)]
    struct TestAggregate {
        id: Option<AggregateId>,
        bumps: u32,
        version: Version,
        uncommitted: Vec<TestEvent>,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("test error")]
    struct TestError;

    impl Aggregate for TestAggregate {
        type Event = TestEvent;
        type Error = TestError;

        fn aggregate_type() -> &'static str {
            "TestAggregate"
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
                TestEvent::Opened { id } => self.id = Some(AggregateId::from_string(id)),
                TestEvent::Bumped => self.bumps += 1,
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

    #[test]
    fn record_applies_and_buffers() {
        let mut aggregate = TestAggregate::default();
        aggregate.record(TestEvent::Opened {
            id: "agg-1".to_string(),
        });
        aggregate.record(TestEvent::Bumped);

        assert!(aggregate.id().is_some());
        assert_eq!(aggregate.bumps, 1);
        assert_eq!(aggregate.version(), Version::new(2));
        assert_eq!(aggregate.uncommitted_events().len(), 2);

        let drained = aggregate.take_uncommitted_events();
        assert_eq!(drained.len(), 2);
        assert!(aggregate.uncommitted_events().is_empty());
    }

    #[test]
    fn replay_does_not_buffer() {
        let mut aggregate = TestAggregate::default();
        aggregate.apply(TestEvent::Opened {
            id: "agg-1".to_string(),
        });
        aggregate.set_version(Version::first());

        assert_eq!(aggregate.version(), Version::first());
        assert!(aggregate.uncommitted_events().is_empty());
    }
}
