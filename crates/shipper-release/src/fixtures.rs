//! Builders for releases and target objects used across the unit tests

use std::collections::BTreeMap;

use kube::api::ObjectMeta;
use shipper_common::crd::{
    AchievedStep, CapacityTarget, CapacityTargetSpec, CapacityTargetStatus,
    ClusterCapacityTarget, ClusterInstallationStatus, ClusterTrafficTarget, ConditionStatus,
    InstallationTarget, InstallationTargetSpec, InstallationTargetStatus, Release,
    ReleaseCondition, ReleaseConditionType, ReleaseEnvironment, ReleaseSpec, ReleaseStatus,
    RolloutStrategy, RolloutStrategyStep, RolloutStrategyStepValue, TargetCondition,
    TargetConditionType, TrafficTarget, TrafficTargetSpec, TrafficTargetStatus,
};
use shipper_common::RELEASE_GENERATION_ANNOTATION;

use crate::chain::ReleaseInfo;

pub const NAMESPACE: &str = "test-namespace";
pub const CLUSTER: &str = "minikube";
pub const INCUMBENT: &str = "0.0.1";
pub const CONTENDER: &str = "0.0.2";
pub const REPLICAS: i32 = 10;

fn meta(name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(NAMESPACE.to_string()),
        ..Default::default()
    }
}

fn ready(status: ConditionStatus) -> Vec<TargetCondition> {
    vec![TargetCondition::new(TargetConditionType::Ready, status)]
}

fn value(incumbent: i32, contender: i32) -> RolloutStrategyStepValue {
    RolloutStrategyStepValue {
        incumbent,
        contender,
    }
}

/// Three-step strategy: staging, 50/50, full on
pub fn vanguard() -> RolloutStrategy {
    RolloutStrategy {
        steps: vec![
            RolloutStrategyStep {
                name: "staging".to_string(),
                capacity: value(100, 1),
                traffic: value(100, 0),
            },
            RolloutStrategyStep {
                name: "50/50".to_string(),
                capacity: value(50, 50),
                traffic: value(50, 50),
            },
            RolloutStrategyStep {
                name: "full on".to_string(),
                capacity: value(0, 100),
                traffic: value(0, 100),
            },
        ],
    }
}

pub fn release(name: &str, generation: i64, target_step: i32) -> Release {
    let mut rel = Release::new(
        name,
        ReleaseSpec {
            target_step,
            environment: ReleaseEnvironment {
                strategy: Some(vanguard()),
            },
        },
    );
    rel.metadata.namespace = Some(NAMESPACE.to_string());
    rel.metadata.annotations = Some(BTreeMap::from([(
        RELEASE_GENERATION_ANNOTATION.to_string(),
        generation.to_string(),
    )]));
    rel
}

pub fn installation_target(name: &str, clusters: &[&str], is_ready: bool) -> InstallationTarget {
    let clusters: Vec<String> = clusters.iter().map(|c| c.to_string()).collect();
    let status = if is_ready {
        ConditionStatus::True
    } else {
        ConditionStatus::False
    };
    InstallationTarget {
        metadata: meta(name),
        spec: InstallationTargetSpec {
            clusters: clusters.clone(),
        },
        status: Some(InstallationTargetStatus {
            clusters: clusters
                .into_iter()
                .map(|name| ClusterInstallationStatus {
                    name,
                    conditions: ready(status),
                })
                .collect(),
            conditions: ready(status),
        }),
    }
}

pub fn capacity_target(name: &str, clusters: &[(&str, i32)], total_replicas: i32) -> CapacityTarget {
    CapacityTarget {
        metadata: meta(name),
        spec: CapacityTargetSpec {
            clusters: clusters
                .iter()
                .map(|(cluster, percent)| ClusterCapacityTarget {
                    name: cluster.to_string(),
                    percent: *percent,
                    total_replica_count: total_replicas,
                })
                .collect(),
        },
        status: Some(CapacityTargetStatus {
            observed_generation: 0,
            conditions: ready(ConditionStatus::True),
        }),
    }
}

pub fn traffic_target(name: &str, clusters: &[(&str, i32)]) -> TrafficTarget {
    TrafficTarget {
        metadata: meta(name),
        spec: TrafficTargetSpec {
            clusters: clusters
                .iter()
                .map(|(cluster, weight)| ClusterTrafficTarget {
                    name: cluster.to_string(),
                    weight: *weight,
                })
                .collect(),
        },
        status: Some(TrafficTargetStatus {
            observed_generation: 0,
            conditions: ready(ConditionStatus::True),
        }),
    }
}

/// A release with ready target objects at the given capacity and traffic
pub fn release_info(
    name: &str,
    generation: i64,
    target_step: i32,
    percent: i32,
    weight: i32,
) -> ReleaseInfo {
    ReleaseInfo::new(
        release(name, generation, target_step),
        installation_target(name, &[CLUSTER], true),
        capacity_target(name, &[(CLUSTER, percent)], REPLICAS),
        traffic_target(name, &[(CLUSTER, weight)]),
    )
}

/// Fully rolled out release on the last vanguard step
pub fn incumbent() -> ReleaseInfo {
    let mut info = release_info(INCUMBENT, 0, 2, 100, 100);
    info.release.status = Some(ReleaseStatus {
        achieved_step: Some(AchievedStep {
            step: 2,
            name: "full on".to_string(),
        }),
        conditions: vec![ReleaseCondition {
            type_: ReleaseConditionType::Complete,
            status: ConditionStatus::True,
            last_transition_time: None,
            reason: String::new(),
            message: String::new(),
        }],
        strategy: None,
    });
    info
}

/// Freshly scheduled release with no capacity or traffic yet
pub fn contender(target_step: i32) -> ReleaseInfo {
    release_info(CONTENDER, 1, target_step, 0, 0)
}
