//! Custom Resource Definitions for Shipper
//!
//! This module contains the CRDs the release controller reads and writes.

mod capacity_target;
mod installation_target;
mod release;
mod traffic_target;
mod types;

pub use capacity_target::{
    CapacityTarget, CapacityTargetSpec, CapacityTargetStatus, ClusterCapacityTarget,
};
pub use installation_target::{
    ClusterInstallationStatus, InstallationTarget, InstallationTargetSpec,
    InstallationTargetStatus,
};
pub use release::{
    AchievedStep, Release, ReleaseCondition, ReleaseConditionType, ReleaseEnvironment,
    ReleaseSpec, ReleaseStatus, ReleaseStrategyCondition, ReleaseStrategyState,
    ReleaseStrategyStatus, RolloutStrategy, RolloutStrategyStep, RolloutStrategyStepValue,
    StrategyConditionType, StrategyState,
};
pub use traffic_target::{
    ClusterTrafficTarget, TrafficTarget, TrafficTargetSpec, TrafficTargetStatus,
};
pub use types::{target_ready, ConditionStatus, TargetCondition, TargetConditionType};

#[cfg(test)]
mod tests {
    use kube::CustomResourceExt;

    use super::*;

    #[test]
    fn crds_share_the_shipper_group() {
        for crd in [
            Release::crd(),
            InstallationTarget::crd(),
            CapacityTarget::crd(),
            TrafficTarget::crd(),
        ] {
            assert_eq!(crd.spec.group, crate::SHIPPER_API_GROUP);
            assert_eq!(crd.spec.scope, "Namespaced");
        }
    }

    #[test]
    fn target_short_names() {
        assert_eq!(
            CapacityTarget::crd().spec.names.short_names,
            Some(vec!["ct".to_string()])
        );
        assert_eq!(
            TrafficTarget::crd().spec.names.short_names,
            Some(vec!["tt".to_string()])
        );
        assert_eq!(
            InstallationTarget::crd().spec.names.short_names,
            Some(vec!["it".to_string()])
        );
    }
}
