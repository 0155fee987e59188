//! Values produced by a strategy execution pass
//!
//! Nothing here is applied by the engine; the caller hands an
//! [`ExecutionOutcome`] to [`crate::apply::apply_outcome`] or inspects it in
//! tests.

use std::fmt;

use serde_json::json;
use shipper_common::crd::{CapacityTargetSpec, ReleaseStatus, StrategyState, TrafficTargetSpec};

/// One patch the caller must apply
#[derive(Clone, Debug, PartialEq)]
pub enum ExecutorResult {
    /// Replace the spec of a capacity target
    CapacityTargetOutdated {
        /// Capacity target name
        name: String,
        /// Full replacement spec
        new_spec: CapacityTargetSpec,
    },
    /// Replace the spec of a traffic target
    TrafficTargetOutdated {
        /// Traffic target name
        name: String,
        /// Full replacement spec
        new_spec: TrafficTargetSpec,
    },
    /// Replace the status of a release
    ReleaseUpdate {
        /// Release name
        name: String,
        /// Full replacement status
        new_status: ReleaseStatus,
    },
}

impl ExecutorResult {
    /// Kind of the object the patch targets
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CapacityTargetOutdated { .. } => "CapacityTarget",
            Self::TrafficTargetOutdated { .. } => "TrafficTarget",
            Self::ReleaseUpdate { .. } => "Release",
        }
    }

    /// Name of the object the patch targets
    pub fn name(&self) -> &str {
        match self {
            Self::CapacityTargetOutdated { name, .. }
            | Self::TrafficTargetOutdated { name, .. }
            | Self::ReleaseUpdate { name, .. } => name,
        }
    }

    /// Merge patch body
    pub fn patch(&self) -> serde_json::Value {
        match self {
            Self::CapacityTargetOutdated { new_spec, .. } => json!({ "spec": new_spec }),
            Self::TrafficTargetOutdated { new_spec, .. } => json!({ "spec": new_spec }),
            Self::ReleaseUpdate { new_status, .. } => json!({ "status": new_status }),
        }
    }
}

/// The four aggregate waiting flags
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrategyStateKind {
    /// `waitingForInstallation`
    WaitingForInstallation,
    /// `waitingForCapacity`
    WaitingForCapacity,
    /// `waitingForTraffic`
    WaitingForTraffic,
    /// `waitingForCommand`
    WaitingForCommand,
}

impl fmt::Display for StrategyStateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WaitingForInstallation => write!(f, "WaitingForInstallation"),
            Self::WaitingForCapacity => write!(f, "WaitingForCapacity"),
            Self::WaitingForTraffic => write!(f, "WaitingForTraffic"),
            Self::WaitingForCommand => write!(f, "WaitingForCommand"),
        }
    }
}

/// A change in one aggregate waiting flag. Log entry only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReleaseStrategyStateTransition {
    /// Which flag changed
    pub state: StrategyStateKind,
    /// Value before this pass
    pub previous: StrategyState,
    /// Value after this pass
    pub new: StrategyState,
}

impl fmt::Display for ReleaseStrategyStateTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} -> {}", self.state, self.previous, self.new)
    }
}

/// Kubernetes event to raise on a release once the outcome is applied
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StrategyEvent {
    /// Release name
    pub release: String,
    /// Event reason
    pub reason: &'static str,
    /// Event note
    pub message: String,
}

/// Everything a pass produced, in pipeline order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExecutionOutcome {
    /// Patches to apply
    pub results: Vec<ExecutorResult>,
    /// Aggregate state transitions for the audit log
    pub transitions: Vec<ReleaseStrategyStateTransition>,
    /// Events to publish
    pub events: Vec<StrategyEvent>,
}

impl ExecutionOutcome {
    /// Outcome carrying only patches
    pub fn with_results(results: Vec<ExecutorResult>) -> Self {
        Self {
            results,
            ..Default::default()
        }
    }

    /// True when the pass produced no patches
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Append another step's output
    pub fn extend(&mut self, other: ExecutionOutcome) {
        self.results.extend(other.results);
        self.transitions.extend(other.transitions);
        self.events.extend(other.events);
    }
}

#[cfg(test)]
mod tests {
    use shipper_common::crd::ClusterTrafficTarget;

    use super::*;

    #[test]
    fn traffic_patch_replaces_spec() {
        let result = ExecutorResult::TrafficTargetOutdated {
            name: "0.0.2".to_string(),
            new_spec: TrafficTargetSpec {
                clusters: vec![ClusterTrafficTarget {
                    name: "minikube".to_string(),
                    weight: 50,
                }],
            },
        };

        assert_eq!(result.kind(), "TrafficTarget");
        assert_eq!(result.name(), "0.0.2");
        assert_eq!(
            result.patch(),
            json!({"spec": {"clusters": [{"name": "minikube", "weight": 50}]}})
        );
    }

    #[test]
    fn release_patch_wraps_status() {
        let result = ExecutorResult::ReleaseUpdate {
            name: "0.0.2".to_string(),
            new_status: ReleaseStatus::default(),
        };
        assert_eq!(result.kind(), "Release");
        assert_eq!(result.patch(), json!({"status": {"conditions": []}}));
    }

    #[test]
    fn transition_display_names_flag_and_values() {
        let t = ReleaseStrategyStateTransition {
            state: StrategyStateKind::WaitingForCommand,
            previous: StrategyState::Unknown,
            new: StrategyState::True,
        };
        assert_eq!(t.to_string(), "WaitingForCommand: Unknown -> True");
    }

    #[test]
    fn outcome_without_patches_is_empty() {
        let mut outcome = ExecutionOutcome::default();
        outcome.events.push(StrategyEvent {
            release: "0.0.2".to_string(),
            reason: "StrategyApplied",
            message: "step 0 finished".to_string(),
        });
        assert!(outcome.is_empty());

        outcome.extend(ExecutionOutcome::with_results(vec![
            ExecutorResult::ReleaseUpdate {
                name: "0.0.2".to_string(),
                new_status: ReleaseStatus::default(),
            },
        ]));
        assert!(!outcome.is_empty());
        assert_eq!(outcome.events.len(), 1);
    }
}
