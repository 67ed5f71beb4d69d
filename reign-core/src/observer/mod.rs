//! Observer pattern for resolved event instances.
//!
//! Observers are told about every instance that leaves the pipeline, either
//! executed or abandoned, together with an immutable snapshot of the kingdom
//! taken right after the commit. They cannot affect resolution.
//!
//! ```text
//! ResolutionObserver trait
//!        │
//!        └── EventLogObserver (JSONL archive of finished instances)
//! ```
//!
//! # Example
//!
//! ```ignore
//! let mut pipeline = OutcomePipeline::with_defaults(catalog, store, config)?;
//! pipeline.register_observer(Box::new(EventLogObserver::stdout()));
//! ```

pub mod event_log;

use crate::pipeline::{ExecutionReport, InstanceId};
use crate::store::Snapshot;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during observation.
#[derive(Error, Debug)]
pub enum ObserverError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// What happened to an instance when it left the pipeline.
///
/// Tagged for JSONL output:
/// ```json
/// {"type":"resolved","instance":3,"event_id":"bandit-activity",...}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResolutionEvent {
    Resolved(ExecutionReport),
    Abandoned {
        instance: InstanceId,
        event_id: String,
        turn: u32,
    },
}

impl ResolutionEvent {
    pub fn instance(&self) -> InstanceId {
        match self {
            ResolutionEvent::Resolved(report) => report.instance,
            ResolutionEvent::Abandoned { instance, .. } => *instance,
        }
    }

    pub fn event_id(&self) -> &str {
        match self {
            ResolutionEvent::Resolved(report) => &report.event_id,
            ResolutionEvent::Abandoned { event_id, .. } => event_id,
        }
    }
}

/// Trait for resolution observers.
///
/// Implementations must be `Send + Sync`: instances resolve concurrently and
/// notify from whichever thread executed them.
///
/// Errors returned from `on_resolution` are logged but never fail the
/// resolution that triggered them.
pub trait ResolutionObserver: Send + Sync {
    fn on_resolution(
        &self,
        event: &ResolutionEvent,
        snapshot: &Snapshot,
    ) -> Result<(), ObserverError>;

    /// Human-readable name for logging/debugging.
    fn name(&self) -> &str;

    /// Called when the registry is dropped. Default is a no-op.
    fn on_shutdown(&self) {}
}

/// Lets a caller keep a handle on an observer after registering it.
impl<T: ResolutionObserver + ?Sized> ResolutionObserver for Arc<T> {
    fn on_resolution(
        &self,
        event: &ResolutionEvent,
        snapshot: &Snapshot,
    ) -> Result<(), ObserverError> {
        (**self).on_resolution(event, snapshot)
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn on_shutdown(&self) {
        (**self).on_shutdown()
    }
}

/// Registry for managing multiple observers.
pub struct ObserverRegistry {
    observers: Vec<Box<dyn ResolutionObserver>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self { observers: vec![] }
    }

    pub fn register(&mut self, observer: Box<dyn ResolutionObserver>) {
        log::info!("Registered observer: {}", observer.name());
        self.observers.push(observer);
    }

    /// Notify every observer. Errors are logged, not propagated.
    pub fn notify(&self, event: &ResolutionEvent, snapshot: &Snapshot) {
        for observer in &self.observers {
            if let Err(e) = observer.on_resolution(event, snapshot) {
                log::warn!("Observer '{}' error: {}", observer.name(), e);
            }
        }
    }

    pub fn shutdown(&self) {
        for observer in &self.observers {
            observer.on_shutdown();
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl Default for ObserverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ObserverRegistry {
    fn drop(&mut self) {
        // Flush archives.
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::KingdomState;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[derive(Clone)]
    struct SharedCounter(Arc<AtomicU64>);

    impl SharedCounter {
        fn new() -> Self {
            Self(Arc::new(AtomicU64::new(0)))
        }

        fn get(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    struct CountingObserver {
        counter: SharedCounter,
        fail: bool,
    }

    impl ResolutionObserver for CountingObserver {
        fn on_resolution(
            &self,
            _event: &ResolutionEvent,
            _snapshot: &Snapshot,
        ) -> Result<(), ObserverError> {
            self.counter.0.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ObserverError::Io(std::io::Error::other("disk full")));
            }
            Ok(())
        }

        fn name(&self) -> &str {
            "CountingObserver"
        }
    }

    fn abandoned() -> ResolutionEvent {
        ResolutionEvent::Abandoned {
            instance: InstanceId(4),
            event_id: "drought".to_string(),
            turn: 2,
        }
    }

    #[test]
    fn test_observer_notification() {
        let counter = SharedCounter::new();
        let mut registry = ObserverRegistry::new();
        assert!(registry.is_empty());
        registry.register(Box::new(CountingObserver {
            counter: counter.clone(),
            fail: true,
        }));
        registry.register(Box::new(CountingObserver {
            counter: counter.clone(),
            fail: false,
        }));
        assert_eq!(registry.len(), 2);

        let snapshot = Snapshot::new(KingdomState::default(), 0);
        registry.notify(&abandoned(), &snapshot);
        registry.notify(&abandoned(), &snapshot);

        // A failing observer does not stop the next one.
        assert_eq!(counter.get(), 4);
    }

    #[test]
    fn test_event_accessors_and_tag() {
        let event = abandoned();
        assert_eq!(event.instance(), InstanceId(4));
        assert_eq!(event.event_id(), "drought");
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.starts_with(r#"{"type":"abandoned""#));
    }
}
