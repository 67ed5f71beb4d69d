//! Shared kingdom state with serialized mutations.
//!
//! Readers take [`Snapshot`]s, which are `Arc`s of an immutable
//! [`KingdomState`] and never block on writers. Writers go through
//! [`StateStore::apply`] / [`StateStore::try_apply`]: one mutation runs at a
//! time, against a private copy, and is published only once it has fully
//! finished. `try_apply` discards the copy when the mutation fails.

use crate::state::KingdomState;
use std::convert::Infallible;
use std::ops::Deref;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Immutable view of the kingdom at one revision.
#[derive(Clone, Debug)]
pub struct Snapshot {
    /// O(1) to clone thanks to `im`'s structural sharing
    pub state: Arc<KingdomState>,
    /// Number of mutations published before this snapshot
    pub revision: u64,
}

impl Snapshot {
    pub fn new(state: KingdomState, revision: u64) -> Self {
        Self {
            state: Arc::new(state),
            revision,
        }
    }
}

impl Deref for Snapshot {
    type Target = KingdomState;

    fn deref(&self) -> &KingdomState {
        &self.state
    }
}

pub struct StateStore {
    current: RwLock<Snapshot>,
    writer: Mutex<()>,
}

impl StateStore {
    pub fn new(state: KingdomState) -> Self {
        Self {
            current: RwLock::new(Snapshot::new(state, 0)),
            writer: Mutex::new(()),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn revision(&self) -> u64 {
        self.snapshot().revision
    }

    /// Run one mutation to completion and publish it.
    pub fn apply<R>(&self, mutation: impl FnOnce(&mut KingdomState) -> R) -> R {
        match self.try_apply(|state| Ok::<R, Infallible>(mutation(state))) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Run one mutation; publish it only if it returns `Ok`.
    pub fn try_apply<T, E>(
        &self,
        mutation: impl FnOnce(&mut KingdomState) -> Result<T, E>,
    ) -> Result<T, E> {
        let _serial = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let base = self.snapshot();
        let mut next = KingdomState::clone(&base.state);
        let value = mutation(&mut next)?;

        let mut slot = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Snapshot::new(next, base.revision + 1);
        Ok(value)
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new(KingdomState::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Resource;
    use crate::testing::KingdomStateBuilder;
    use std::thread;

    #[test]
    fn test_snapshot_is_isolated_from_later_writes() {
        let store = StateStore::new(
            KingdomStateBuilder::new()
                .with_resource(Resource::Gold, 5)
                .build(),
        );
        let before = store.snapshot();

        store.apply(|s| {
            s.adjust_resource(Resource::Gold, 3);
        });

        assert_eq!(before.resource(Resource::Gold), 5);
        assert_eq!(store.snapshot().resource(Resource::Gold), 8);
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn test_failed_mutation_is_discarded() {
        let store = StateStore::new(
            KingdomStateBuilder::new()
                .with_resource(Resource::Gold, 5)
                .build(),
        );

        let result: Result<(), &str> = store.try_apply(|s| {
            s.adjust_resource(Resource::Gold, -5);
            Err("nope")
        });

        assert_eq!(result, Err("nope"));
        assert_eq!(store.snapshot().resource(Resource::Gold), 5);
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn test_concurrent_mutations_are_serialized() {
        let store = Arc::new(StateStore::default());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..50 {
                        store.apply(|s| {
                            s.adjust_resource(Resource::Food, 1);
                        });
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = store.snapshot();
        assert_eq!(snapshot.resource(Resource::Food), 400);
        assert_eq!(snapshot.revision, 400);
    }
}
