//! InstallationTarget CRD types
//!
//! Lists the clusters a release's chart must be installed on. The
//! installation controller reports per-cluster status and aggregates it
//! into the object's `Ready` condition.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::TargetCondition;

/// Clusters the release must be installed on
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "shipper.booking.com",
    version = "v1alpha1",
    kind = "InstallationTarget",
    plural = "installationtargets",
    shortname = "it",
    namespaced,
    status = "InstallationTargetStatus",
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct InstallationTargetSpec {
    /// Names of the target clusters
    #[serde(default)]
    pub clusters: Vec<String>,
}

/// Installation status on one cluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct ClusterInstallationStatus {
    /// Cluster name
    pub name: String,
    /// Per-cluster conditions
    #[serde(default)]
    pub conditions: Vec<TargetCondition>,
}

/// Observed installation state
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstallationTargetStatus {
    /// Clusters the installation controller has registered
    #[serde(default)]
    pub clusters: Vec<ClusterInstallationStatus>,
    /// Aggregated conditions
    #[serde(default)]
    pub conditions: Vec<TargetCondition>,
}
