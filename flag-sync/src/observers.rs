use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use metrics::counter;
use tracing::{error, warn};

use crate::{
    flags::flag_models::{FlagState, FlagsState},
    metrics::consts::{OBSERVER_FAILURES_COUNTER, OBSERVER_NOTIFICATIONS_COUNTER},
};

/// Published after a refresh: the project's flags with its active overrides layered on.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncEvent {
    pub project_key: String,
    pub all_flags_state: FlagsState,
}

/// Published when a single flag's override changes.
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideEvent {
    pub project_key: String,
    pub flag_key: String,
    pub flag_state: FlagState,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectEvent {
    Sync(SyncEvent),
    Override(OverrideEvent),
}

impl ProjectEvent {
    pub fn project_key(&self) -> &str {
        match self {
            ProjectEvent::Sync(event) => &event.project_key,
            ProjectEvent::Override(event) => &event.project_key,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ProjectEvent::Sync(_) => "sync",
            ProjectEvent::Override(_) => "override",
        }
    }
}

/// Receives project events. Runs on the notifying request's task, so anything slow belongs
/// behind the observer's own channel.
pub trait Observer: Send + Sync {
    fn handle(&self, event: &ProjectEvent) -> anyhow::Result<()>;
}

impl<F> Observer for F
where
    F: Fn(&ProjectEvent) -> anyhow::Result<()> + Send + Sync,
{
    fn handle(&self, event: &ProjectEvent) -> anyhow::Result<()> {
        self(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Ordered list of observers. Shared through an `Arc` by every request of a long-lived
/// process, or created per test.
#[derive(Default)]
pub struct Observers {
    next_id: AtomicU64,
    observers: RwLock<Vec<(ObserverId, Arc<dyn Observer>)>>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<(ObserverId, Arc<dyn Observer>)>> {
        match self.observers.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<(ObserverId, Arc<dyn Observer>)>> {
        match self.observers.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn register_observer(&self, observer: Arc<dyn Observer>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.write().push((id, observer));
        id
    }

    /// Returns false if the id was not registered.
    pub fn unregister_observer(&self, id: ObserverId) -> bool {
        let mut observers = self.write();
        let before = observers.len();
        observers.retain(|(registered, _)| *registered != id);
        observers.len() != before
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Hands `event` to every observer in registration order. An observer that errors or
    /// panics is logged and skipped.
    pub fn notify(&self, event: ProjectEvent) {
        // Snapshot so observers may register others without deadlocking.
        let observers: Vec<Arc<dyn Observer>> =
            self.read().iter().map(|(_, o)| o.clone()).collect();

        for observer in observers {
            let outcome = catch_unwind(AssertUnwindSafe(|| observer.handle(&event)));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(
                        project_key = event.project_key(),
                        event = event.label(),
                        error = %e,
                        "observer failed to handle event"
                    );
                    counter!(OBSERVER_FAILURES_COUNTER, "reason" => "error").increment(1);
                }
                Err(_) => {
                    error!(
                        project_key = event.project_key(),
                        event = event.label(),
                        "observer panicked while handling event"
                    );
                    counter!(OBSERVER_FAILURES_COUNTER, "reason" => "panic").increment(1);
                }
            }
        }
        counter!(OBSERVER_NOTIFICATIONS_COUNTER, "event" => event.label()).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    fn sync_event(project_key: &str) -> ProjectEvent {
        ProjectEvent::Sync(SyncEvent {
            project_key: project_key.to_string(),
            all_flags_state: FlagsState::from([(
                "flg".to_string(),
                FlagState {
                    value: json!(true),
                    version: 2,
                },
            )]),
        })
    }

    fn recorder(
        name: &'static str,
        seen: Arc<Mutex<Vec<(&'static str, ProjectEvent)>>>,
    ) -> Arc<dyn Observer> {
        Arc::new(move |event: &ProjectEvent| -> anyhow::Result<()> {
            seen.lock().unwrap().push((name, event.clone()));
            Ok(())
        })
    }

    #[test]
    fn test_notify_delivers_in_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let observers = Observers::new();
        observers.register_observer(recorder("first", seen.clone()));
        observers.register_observer(recorder("second", seen.clone()));

        observers.notify(sync_event("proj"));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, "first");
        assert_eq!(seen[1].0, "second");
        assert_eq!(seen[0].1, sync_event("proj"));
        assert_eq!(seen[1].1, seen[0].1);
    }

    #[test]
    fn test_failing_and_panicking_observers_do_not_block_delivery() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let observers = Observers::new();
        observers.register_observer(Arc::new(|_: &ProjectEvent| -> anyhow::Result<()> {
            anyhow::bail!("nope")
        }));
        observers.register_observer(Arc::new(|_: &ProjectEvent| -> anyhow::Result<()> {
            panic!("observer blew up")
        }));
        observers.register_observer(recorder("last", seen.clone()));

        observers.notify(sync_event("proj"));

        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_unregister_observer() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let observers = Observers::new();
        let id = observers.register_observer(recorder("gone", seen.clone()));
        observers.register_observer(recorder("kept", seen.clone()));

        assert!(observers.unregister_observer(id));
        assert!(!observers.unregister_observer(id));
        observers.notify(sync_event("proj"));

        let seen = seen.lock().unwrap();
        assert_eq!(observers.len(), 1);
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "kept");
    }
}
