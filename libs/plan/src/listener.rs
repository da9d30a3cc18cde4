//! Push-based notification of plan changes.
//!
//! Managers keep an explicit [`ListenerSet`] and call every registered
//! [`PlanListener`] synchronously when something observable changes. The
//! coordinator registers one listener per manager and relays events to its
//! own subscribers.

use std::sync::{Arc, Mutex};

use offerloop_id::StepId;
use serde::Serialize;

use crate::Status;

/// What changed in a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanEventKind {
    Interrupted,
    Proceeded,
    StepStatusChanged {
        step: StepId,
        step_name: String,
        from: Status,
        to: Status,
    },
}

/// A change notification for one plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanEvent {
    pub plan: String,
    #[serde(flatten)]
    pub kind: PlanEventKind,
}

/// Receives plan change notifications.
pub trait PlanListener: Send + Sync {
    fn plan_updated(&self, event: &PlanEvent);
}

/// An ordered list of listener handles.
#[derive(Default)]
pub struct ListenerSet {
    listeners: Mutex<Vec<Arc<dyn PlanListener>>>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: Arc<dyn PlanListener>) {
        self.lock().push(listener);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Delivers `event` to every listener in registration order.
    pub fn notify(&self, event: &PlanEvent) {
        // Snapshot so a listener may subscribe others without deadlocking.
        let listeners = self.lock().clone();
        for listener in listeners {
            listener.plan_updated(event);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Arc<dyn PlanListener>>> {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet")
            .field("listeners", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<PlanEvent>>);

    impl PlanListener for Recorder {
        fn plan_updated(&self, event: &PlanEvent) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    #[test]
    fn test_notify_reaches_every_listener() {
        let set = ListenerSet::new();
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());
        set.subscribe(first.clone());
        set.subscribe(second.clone());

        let event = PlanEvent {
            plan: "deploy".to_string(),
            kind: PlanEventKind::Interrupted,
        };
        set.notify(&event);

        assert_eq!(first.0.lock().unwrap().as_slice(), &[event.clone()]);
        assert_eq!(second.0.lock().unwrap().as_slice(), &[event]);
    }

    #[test]
    fn test_event_json_shape() {
        let event = PlanEvent {
            plan: "deploy".to_string(),
            kind: PlanEventKind::Proceeded,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json, serde_json::json!({"plan": "deploy", "kind": "proceeded"}));
    }
}
