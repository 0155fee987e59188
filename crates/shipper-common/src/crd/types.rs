//! Shared status types used by every Shipper resource

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Condition status following Kubernetes conventions
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq, Hash)]
pub enum ConditionStatus {
    /// Condition is true
    True,
    /// Condition is false
    False,
    /// Condition status is unknown
    #[default]
    Unknown,
}

impl std::fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::True => write!(f, "True"),
            Self::False => write!(f, "False"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Condition types reported by installation, capacity and traffic targets
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord)]
pub enum TargetConditionType {
    /// The target controller is able to act on the object
    Operational,
    /// The object's spec is realised on every cluster
    Ready,
}

impl std::fmt::Display for TargetConditionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Operational => write!(f, "Operational"),
            Self::Ready => write!(f, "Ready"),
        }
    }
}

/// Kubernetes-style condition on a target object's status
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TargetCondition {
    /// Type of condition
    #[serde(rename = "type")]
    pub type_: TargetConditionType,

    /// Status of the condition (True, False, Unknown)
    pub status: ConditionStatus,

    /// Machine-readable reason for the condition
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,

    /// Human-readable message
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    /// Last time the condition transitioned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,
}

impl TargetCondition {
    /// Create a condition without reason or message
    pub fn new(type_: TargetConditionType, status: ConditionStatus) -> Self {
        Self {
            type_,
            status,
            reason: String::new(),
            message: String::new(),
            last_transition_time: None,
        }
    }

    /// Attach a reason and message
    pub fn with_reason(mut self, reason: impl Into<String>, message: impl Into<String>) -> Self {
        self.reason = reason.into();
        self.message = message.into();
        self
    }
}

/// Aggregate readiness of a target object from its status conditions.
///
/// Ready when a `Ready` condition exists and no condition is anything other
/// than `True`. Otherwise returns a description of the first unready
/// condition, suitable for embedding in a strategy condition message.
pub fn target_ready(conditions: &[TargetCondition]) -> (bool, String) {
    for c in conditions {
        if c.status != ConditionStatus::True {
            let mut desc = format!("{} is {}", c.type_, c.status);
            if !c.reason.is_empty() {
                desc.push_str(&format!(" ({})", c.reason));
            }
            if !c.message.is_empty() {
                desc.push_str(&format!(": {}", c.message));
            }
            return (false, desc);
        }
    }

    if !conditions
        .iter()
        .any(|c| c.type_ == TargetConditionType::Ready)
    {
        return (false, "Ready condition not reported yet".to_string());
    }

    (true, String::new())
}
