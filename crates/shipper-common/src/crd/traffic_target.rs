//! TrafficTarget CRD types
//!
//! Declares, per cluster, the traffic weight the release should receive.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::TargetCondition;

/// Desired traffic weight on one cluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct ClusterTrafficTarget {
    /// Cluster name
    pub name: String,
    /// Traffic weight, in [0, 100]
    pub weight: i32,
}

/// Desired traffic across clusters
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "shipper.booking.com",
    version = "v1alpha1",
    kind = "TrafficTarget",
    plural = "traffictargets",
    shortname = "tt",
    namespaced,
    status = "TrafficTargetStatus",
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct TrafficTargetSpec {
    /// Per-cluster traffic weights
    #[serde(default)]
    pub clusters: Vec<ClusterTrafficTarget>,
}

/// Observed traffic state
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrafficTargetStatus {
    /// Generation of the spec the controller last acted on
    #[serde(default)]
    pub observed_generation: i64,
    /// Aggregated conditions
    #[serde(default)]
    pub conditions: Vec<TargetCondition>,
}
