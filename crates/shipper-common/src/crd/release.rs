//! Release CRD types
//!
//! A `Release` is one deployment generation of an application. Its spec
//! carries the rollout strategy and the step the rollout should be at; its
//! status records the step actually reached and the per-concern strategy
//! conditions computed by the release controller.

use chrono::{DateTime, Utc};
use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::ConditionStatus;

// =============================================================================
// Strategy
// =============================================================================

/// Contender/incumbent split for one dimension (capacity or traffic) of a step
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct RolloutStrategyStepValue {
    /// Weight for the old release, in [0, 100]
    pub incumbent: i32,
    /// Weight for the new release, in [0, 100]
    pub contender: i32,
}

/// One stage of a multi-step rollout plan
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct RolloutStrategyStep {
    /// Human-readable step name (e.g. "staging", "50/50", "full on")
    pub name: String,
    /// Capacity split between contender and incumbent
    pub capacity: RolloutStrategyStepValue,
    /// Traffic split between contender and incumbent
    pub traffic: RolloutStrategyStepValue,
}

/// Ordered list of rollout steps
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct RolloutStrategy {
    /// Steps in rollout order
    #[serde(default)]
    pub steps: Vec<RolloutStrategyStep>,
}

/// Environment the release is rolled out with
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseEnvironment {
    /// Rollout strategy; required for the release to make progress
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<RolloutStrategy>,
}

// =============================================================================
// CRD
// =============================================================================

/// Desired state of a release rollout
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "shipper.booking.com",
    version = "v1alpha1",
    kind = "Release",
    plural = "releases",
    shortname = "rel",
    namespaced,
    status = "ReleaseStatus",
    printcolumn = r#"{"name":"Target Step","type":"integer","jsonPath":".spec.targetStep"}"#,
    printcolumn = r#"{"name":"Achieved Step","type":"integer","jsonPath":".status.achievedStep.step"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseSpec {
    /// Index into `environment.strategy.steps` the rollout should reach
    #[serde(default)]
    pub target_step: i32,

    /// Rollout environment (strategy)
    #[serde(default)]
    pub environment: ReleaseEnvironment,
}

impl Release {
    /// Namespaced key ("namespace/name") used in logs and error messages
    pub fn key(&self) -> String {
        match self.namespace() {
            Some(ns) => format!("{}/{}", ns, self.name_any()),
            None => self.name_any(),
        }
    }

    /// The declared rollout strategy, if any
    pub fn strategy(&self) -> Option<&RolloutStrategy> {
        self.spec.environment.strategy.as_ref()
    }
}

// =============================================================================
// Status
// =============================================================================

/// Step a release has actually reached
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct AchievedStep {
    /// Step index
    pub step: i32,
    /// Step name copied from the strategy
    pub name: String,
}

/// Release-level condition types
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReleaseConditionType {
    /// Rollout is blocked by a rollout block
    Blocked,
    /// The final strategy step is reached and every condition holds
    Complete,
    /// Target clusters were chosen and target objects created
    Scheduled,
    /// The strategy executor ran for the current target step
    StrategyExecuted,
}

impl std::fmt::Display for ReleaseConditionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blocked => write!(f, "Blocked"),
            Self::Complete => write!(f, "Complete"),
            Self::Scheduled => write!(f, "Scheduled"),
            Self::StrategyExecuted => write!(f, "StrategyExecuted"),
        }
    }
}

/// Release-level condition
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseCondition {
    /// Condition type
    #[serde(rename = "type")]
    pub type_: ReleaseConditionType,

    /// Status of the condition
    pub status: ConditionStatus,

    /// Last time the status changed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,

    /// Machine-readable reason
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,

    /// Human-readable message
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl ReleaseCondition {
    /// Create a condition stamped with `now`
    pub fn new(
        type_: ReleaseConditionType,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            type_,
            status,
            last_transition_time: Some(now),
            reason: reason.into(),
            message: message.into(),
        }
    }
}

/// Strategy condition types, one per concern and role.
///
/// Declared in lexicographic order so the derived `Ord` matches sorting by
/// the serialized name.
#[derive(
    Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub enum StrategyConditionType {
    /// Contender capacity matches the target step on every cluster
    ContenderAchievedCapacity,
    /// Contender installation is ready on every cluster
    ContenderAchievedInstallation,
    /// Contender traffic matches the target step on every cluster
    ContenderAchievedTraffic,
    /// Incumbent capacity matches the target step on every cluster
    IncumbentAchievedCapacity,
    /// Incumbent traffic matches the target step on every cluster
    IncumbentAchievedTraffic,
}

impl std::fmt::Display for StrategyConditionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ContenderAchievedCapacity => "ContenderAchievedCapacity",
            Self::ContenderAchievedInstallation => "ContenderAchievedInstallation",
            Self::ContenderAchievedTraffic => "ContenderAchievedTraffic",
            Self::IncumbentAchievedCapacity => "IncumbentAchievedCapacity",
            Self::IncumbentAchievedTraffic => "IncumbentAchievedTraffic",
        };
        f.write_str(s)
    }
}

/// Persisted strategy condition
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseStrategyCondition {
    /// Condition type
    #[serde(rename = "type")]
    pub type_: StrategyConditionType,

    /// Status of the condition
    pub status: ConditionStatus,

    /// Last time the status changed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,

    /// Machine-readable reason
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,

    /// Human-readable message
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    /// Strategy step the condition was computed for
    #[serde(default)]
    pub step: i32,
}

/// Tri-state value of an aggregate waiting flag
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq, Hash)]
pub enum StrategyState {
    /// The release is waiting on this concern
    True,
    /// The release is not waiting on this concern
    False,
    /// Not enough information to tell
    #[default]
    Unknown,
}

impl From<bool> for StrategyState {
    fn from(b: bool) -> Self {
        if b {
            Self::True
        } else {
            Self::False
        }
    }
}

impl std::fmt::Display for StrategyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::True => write!(f, "True"),
            Self::False => write!(f, "False"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Aggregate waiting flags exposed to operators
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseStrategyState {
    /// Waiting for the contender to be installed
    #[serde(default)]
    pub waiting_for_installation: StrategyState,
    /// Waiting for capacity to match the target step
    #[serde(default)]
    pub waiting_for_capacity: StrategyState,
    /// Waiting for traffic to match the target step
    #[serde(default)]
    pub waiting_for_traffic: StrategyState,
    /// Step is complete; waiting for someone to advance `targetStep`
    #[serde(default)]
    pub waiting_for_command: StrategyState,
}

/// Strategy section of the release status
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct ReleaseStrategyStatus {
    /// Per-concern conditions, sorted by type
    #[serde(default)]
    pub conditions: Vec<ReleaseStrategyCondition>,
    /// Aggregate waiting flags
    #[serde(default)]
    pub state: ReleaseStrategyState,
}

/// Observed state of a release
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseStatus {
    /// Last step actually reached
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub achieved_step: Option<AchievedStep>,

    /// Release-level conditions
    #[serde(default)]
    pub conditions: Vec<ReleaseCondition>,

    /// Strategy conditions and aggregate state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<ReleaseStrategyStatus>,
}
