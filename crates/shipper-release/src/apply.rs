//! Applying an execution outcome
//!
//! The only part of the crate that talks to the API server. Patches are
//! applied in the order the pipeline produced them; the first failure stops
//! the run. A 409 surfaces as a retryable [`Error::Conflict`] and the caller
//! must re-fetch and recompute rather than replay the remaining patches.

use async_trait::async_trait;
use kube::api::{Api, Patch, PatchParams};
use kube::runtime::events::EventType;
use kube::{Client, Resource, ResourceExt};
use shipper_common::crd::{
    CapacityTarget, CapacityTargetSpec, Release, ReleaseStatus, TrafficTarget, TrafficTargetSpec,
};
use shipper_common::events::{actions, reasons, EventPublisher};
use shipper_common::Error;
use tracing::{debug, info, warn};

#[cfg(test)]
use mockall::automock;

use crate::config::ControllerConfig;
use crate::result::{ExecutionOutcome, ExecutorResult};

/// Writes target specs and release status
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TargetPatcher: Send + Sync {
    /// Replace a capacity target's spec
    async fn patch_capacity_spec(
        &self,
        namespace: &str,
        name: &str,
        spec: &CapacityTargetSpec,
    ) -> Result<(), Error>;

    /// Replace a traffic target's spec
    async fn patch_traffic_spec(
        &self,
        namespace: &str,
        name: &str,
        spec: &TrafficTargetSpec,
    ) -> Result<(), Error>;

    /// Replace a release's status
    async fn patch_release_status(
        &self,
        namespace: &str,
        name: &str,
        status: &ReleaseStatus,
    ) -> Result<(), Error>;
}

/// Merge patches through the Kubernetes API
pub struct KubeTargetPatcher {
    client: Client,
    field_manager: String,
}

impl KubeTargetPatcher {
    /// Patcher writing as the configured field manager
    pub fn new(client: Client, config: &ControllerConfig) -> Self {
        Self {
            client,
            field_manager: config.field_manager.clone(),
        }
    }

    fn params(&self) -> PatchParams {
        PatchParams::apply(&self.field_manager)
    }
}

#[async_trait]
impl TargetPatcher for KubeTargetPatcher {
    async fn patch_capacity_spec(
        &self,
        namespace: &str,
        name: &str,
        spec: &CapacityTargetSpec,
    ) -> Result<(), Error> {
        let api: Api<CapacityTarget> = Api::namespaced(self.client.clone(), namespace);
        let patch = serde_json::json!({ "spec": spec });
        api.patch(name, &self.params(), &Patch::Merge(&patch))
            .await
            .map_err(|e| Error::from_write("CapacityTarget", name, e))?;
        Ok(())
    }

    async fn patch_traffic_spec(
        &self,
        namespace: &str,
        name: &str,
        spec: &TrafficTargetSpec,
    ) -> Result<(), Error> {
        let api: Api<TrafficTarget> = Api::namespaced(self.client.clone(), namespace);
        let patch = serde_json::json!({ "spec": spec });
        api.patch(name, &self.params(), &Patch::Merge(&patch))
            .await
            .map_err(|e| Error::from_write("TrafficTarget", name, e))?;
        Ok(())
    }

    async fn patch_release_status(
        &self,
        namespace: &str,
        name: &str,
        status: &ReleaseStatus,
    ) -> Result<(), Error> {
        let api: Api<Release> = Api::namespaced(self.client.clone(), namespace);
        let patch = serde_json::json!({ "status": status });
        api.patch_status(name, &self.params(), &Patch::Merge(&patch))
            .await
            .map_err(|e| Error::from_write("Release", name, e))?;
        Ok(())
    }
}

/// Apply every patch of `outcome`, then publish its events on `release`.
///
/// Returns the number of patches applied. Events are only published once
/// every patch succeeded.
pub async fn apply_outcome(
    patcher: &dyn TargetPatcher,
    publisher: &dyn EventPublisher,
    release: &Release,
    outcome: &ExecutionOutcome,
) -> Result<usize, Error> {
    let namespace = release.namespace().unwrap_or_default();

    for transition in &outcome.transitions {
        info!(release = %release.key(), %transition, "release strategy state transition");
    }

    for result in &outcome.results {
        debug!(
            release = %release.key(),
            kind = result.kind(),
            name = result.name(),
            "applying patch"
        );
        match result {
            ExecutorResult::CapacityTargetOutdated { name, new_spec } => {
                patcher
                    .patch_capacity_spec(&namespace, name, new_spec)
                    .await?
            }
            ExecutorResult::TrafficTargetOutdated { name, new_spec } => {
                patcher
                    .patch_traffic_spec(&namespace, name, new_spec)
                    .await?
            }
            ExecutorResult::ReleaseUpdate { name, new_status } => {
                patcher
                    .patch_release_status(&namespace, name, new_status)
                    .await?
            }
        }
    }

    let object_ref = release.object_ref(&());
    for transition in &outcome.transitions {
        publisher
            .publish(
                &object_ref,
                EventType::Normal,
                reasons::RELEASE_STATE_TRANSITION,
                actions::EXECUTE_STRATEGY,
                Some(format!(
                    "Release {:?} had its state {:?} transitioned to {:?}",
                    release.key(),
                    transition.state.to_string(),
                    transition.new.to_string()
                )),
            )
            .await;
    }
    for event in &outcome.events {
        publisher
            .publish(
                &object_ref,
                EventType::Normal,
                event.reason,
                actions::EXECUTE_STRATEGY,
                Some(event.message.clone()),
            )
            .await;
    }

    Ok(outcome.results.len())
}

/// Surface a failed execution pass on `release`.
///
/// Only [`Error::UnrecoverableStrategy`] becomes a Warning event; anything
/// else is retried by the caller and stays out of `kubectl describe`.
/// Returns whether an event was published.
pub async fn report_strategy_error(
    publisher: &dyn EventPublisher,
    release: &Release,
    err: &Error,
) -> bool {
    let Error::UnrecoverableStrategy { message, .. } = err else {
        return false;
    };
    warn!(release = %release.key(), error = %err, "release strategy cannot be executed");
    publisher
        .publish(
            &release.object_ref(&()),
            EventType::Warning,
            reasons::STRATEGY_INVALID,
            actions::EXECUTE_STRATEGY,
            Some(message.clone()),
        )
        .await;
    true
}
