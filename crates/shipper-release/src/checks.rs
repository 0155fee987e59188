//! Readiness checks for target objects
//!
//! Pure functions comparing a target object's declared spec and observed
//! status against the value the active strategy step asks for. Capacity and
//! traffic share one algorithm: stage a corrected spec for every cluster
//! whose value differs, otherwise trust the status once it has caught up
//! with the latest spec generation.

use shipper_common::crd::{
    target_ready, CapacityTarget, CapacityTargetSpec, ClusterCapacityTarget, ClusterTrafficTarget,
    InstallationTarget, TargetCondition, TrafficTarget, TrafficTargetSpec,
};

/// Outcome of a capacity or traffic check
#[derive(Clone, Debug, PartialEq)]
pub struct CheckOutcome<S> {
    /// Whether the target reached the desired value on every cluster
    pub achieved: bool,
    /// Corrected spec to write, `None` when no cluster needed correction
    pub new_spec: Option<S>,
    /// Sorted list of unready clusters, or the target's own unready reason
    pub reason: String,
}

/// Check whether the installation target reports every cluster installed
pub fn check_installation(it: &InstallationTarget) -> (bool, String) {
    let conditions = it
        .status
        .as_ref()
        .map(|s| s.conditions.as_slice())
        .unwrap_or_default();
    target_ready(conditions)
}

/// Check a capacity target against the desired percentage
pub fn check_capacity(
    ct: &CapacityTarget,
    desired_percent: i32,
) -> CheckOutcome<CapacityTargetSpec> {
    let (observed, conditions) = ct
        .status
        .as_ref()
        .map(|s| (s.observed_generation, s.conditions.as_slice()))
        .unwrap_or_default();

    let (achieved, corrected, reason) = check_weighted(
        &ct.spec.clusters,
        desired_percent,
        ct.metadata.generation.unwrap_or(0),
        observed,
        conditions,
    );

    CheckOutcome {
        achieved,
        new_spec: corrected.map(|clusters| CapacityTargetSpec { clusters }),
        reason,
    }
}

/// Check a traffic target against the desired weight
pub fn check_traffic(tt: &TrafficTarget, desired_weight: i32) -> CheckOutcome<TrafficTargetSpec> {
    let (observed, conditions) = tt
        .status
        .as_ref()
        .map(|s| (s.observed_generation, s.conditions.as_slice()))
        .unwrap_or_default();

    let (achieved, corrected, reason) = check_weighted(
        &tt.spec.clusters,
        desired_weight,
        tt.metadata.generation.unwrap_or(0),
        observed,
        conditions,
    );

    CheckOutcome {
        achieved,
        new_spec: corrected.map(|clusters| TrafficTargetSpec { clusters }),
        reason,
    }
}

/// A per-cluster spec entry carrying one weight-like value
trait WeightedCluster: Clone {
    fn name(&self) -> &str;
    fn weight(&self) -> i32;
    fn set_weight(&mut self, weight: i32);
}

impl WeightedCluster for ClusterCapacityTarget {
    fn name(&self) -> &str {
        &self.name
    }

    fn weight(&self) -> i32 {
        self.percent
    }

    fn set_weight(&mut self, weight: i32) {
        self.percent = weight;
    }
}

impl WeightedCluster for ClusterTrafficTarget {
    fn name(&self) -> &str {
        &self.name
    }

    fn weight(&self) -> i32 {
        self.weight
    }

    fn set_weight(&mut self, weight: i32) {
        self.weight = weight;
    }
}

/// Shared capacity/traffic check.
///
/// The corrected spec keeps every cluster in its original order; only the
/// mismatched entries change.
fn check_weighted<C: WeightedCluster>(
    clusters: &[C],
    desired: i32,
    generation: i64,
    observed_generation: i64,
    conditions: &[TargetCondition],
) -> (bool, Option<Vec<C>>, String) {
    let mut corrected = clusters.to_vec();
    let mut not_ready = Vec::new();

    for cluster in corrected.iter_mut() {
        if cluster.weight() != desired {
            cluster.set_weight(desired);
            not_ready.push(cluster.name().to_string());
        }
    }

    if !not_ready.is_empty() {
        return (false, Some(corrected), format_clusters(not_ready));
    }

    if observed_generation >= generation {
        let (ready, reason) = target_ready(conditions);
        return (ready, None, reason);
    }

    // status hasn't caught up with the last spec write yet
    let all = clusters.iter().map(|c| c.name().to_string()).collect();
    (false, None, format_clusters(all))
}

/// Render cluster names as `[a b]`, sorted and deduplicated so repeated
/// passes produce byte-identical condition messages.
fn format_clusters(mut names: Vec<String>) -> String {
    names.sort();
    names.dedup();
    format!("[{}]", names.join(" "))
}
