//! CapacityTarget CRD types
//!
//! Declares, per cluster, what percentage of the application's total
//! replica count the release should run.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::TargetCondition;

/// Desired capacity on one cluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCapacityTarget {
    /// Cluster name
    pub name: String,
    /// Percentage of `total_replica_count` to run, in [0, 100]
    pub percent: i32,
    /// Replica count the percentage applies to
    pub total_replica_count: i32,
}

/// Desired capacity across clusters
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "shipper.booking.com",
    version = "v1alpha1",
    kind = "CapacityTarget",
    plural = "capacitytargets",
    shortname = "ct",
    namespaced,
    status = "CapacityTargetStatus",
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct CapacityTargetSpec {
    /// Per-cluster capacity
    #[serde(default)]
    pub clusters: Vec<ClusterCapacityTarget>,
}

/// Observed capacity state
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CapacityTargetStatus {
    /// Generation of the spec the controller last acted on
    #[serde(default)]
    pub observed_generation: i64,
    /// Aggregated conditions
    #[serde(default)]
    pub conditions: Vec<TargetCondition>,
}
