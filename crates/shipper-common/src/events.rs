//! Kubernetes Event recording for Shipper controllers.
//!
//! Wraps `kube::runtime::events::Recorder` behind a trait so that the
//! release controller can surface rollout progress through
//! `kubectl describe rel` and `kubectl get events`.
//!
//! Events are fire-and-forget: failures are logged as warnings and never
//! propagate errors. A failed event must never break reconciliation.

use std::sync::Mutex;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{EventType, Recorder, Reporter};
use kube::Client;
use tracing::warn;

/// Trait for publishing Kubernetes Events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an Event on the given resource.
    ///
    /// * `resource_ref` - The Kubernetes object this event is about
    /// * `type_` - Normal or Warning
    /// * `reason` - Machine-readable reason string (e.g. "StrategyApplied")
    /// * `action` - What action was taken (e.g. "ExecuteStrategy")
    /// * `note` - Optional human-readable message
    async fn publish(
        &self,
        resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    );
}

/// Production implementation wrapping `kube::runtime::events::Recorder`.
pub struct KubeEventPublisher {
    recorder: Recorder,
}

impl KubeEventPublisher {
    /// Create a new publisher reporting as `controller_name`.
    pub fn new(client: Client, controller_name: &str) -> Self {
        let reporter = Reporter {
            controller: controller_name.to_string(),
            instance: None,
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl EventPublisher for KubeEventPublisher {
    async fn publish(
        &self,
        resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    ) {
        let event = kube::runtime::events::Event {
            type_,
            reason: reason.to_string(),
            note,
            action: action.to_string(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&event, resource_ref).await {
            warn!(
                reason,
                action,
                error = %e,
                "Failed to publish Kubernetes event"
            );
        }
    }
}

/// No-op implementation for callers that don't surface events.
pub struct NoopEventPublisher;

#[async_trait]
impl EventPublisher for NoopEventPublisher {
    async fn publish(
        &self,
        _resource_ref: &ObjectReference,
        _type_: EventType,
        _reason: &str,
        _action: &str,
        _note: Option<String>,
    ) {
    }
}

/// An event captured by [`RecordingEventPublisher`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedEvent {
    /// Name of the object the event was attached to
    pub object: String,
    /// Event reason
    pub reason: String,
    /// Whether the event was published as a Warning
    pub warning: bool,
    /// Event note
    pub note: Option<String>,
}

/// In-memory publisher that keeps every event, in order.
#[derive(Default)]
pub struct RecordingEventPublisher {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingEventPublisher {
    /// Snapshot of the events published so far
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish(
        &self,
        resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        _action: &str,
        note: Option<String>,
    ) {
        if let Ok(mut events) = self.events.lock() {
            events.push(RecordedEvent {
                object: resource_ref.name.clone().unwrap_or_default(),
                reason: reason.to_string(),
                warning: matches!(type_, EventType::Warning),
                note,
            });
        }
    }
}

/// Well-known event reason strings.
pub mod reasons {
    /// A strategy step was reached
    pub const STRATEGY_APPLIED: &str = "StrategyApplied";
    /// A release-level condition changed
    pub const RELEASE_CONDITION_CHANGED: &str = "ReleaseConditionChanged";
    /// An aggregate waiting flag changed
    pub const RELEASE_STATE_TRANSITION: &str = "ReleaseStateTransitioned";
    /// The strategy could not be executed as declared
    pub const STRATEGY_INVALID: &str = "StrategyInvalid";
}

/// Well-known event action strings.
pub mod actions {
    /// Running the strategy executor for a release chain
    pub const EXECUTE_STRATEGY: &str = "ExecuteStrategy";
}
