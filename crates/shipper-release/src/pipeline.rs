//! Ordered enforcement steps
//!
//! A pass runs its steps in order against one [`StrategyConditionsMap`].
//! The first step that finds its concern unmet records why, stages the
//! corrective patches and breaks; later steps never run in that pass.

use chrono::{DateTime, Utc};
use kube::ResourceExt;
use shipper_common::crd::{
    ReleaseStatus, ReleaseStrategyStatus, RolloutStrategyStep, StrategyConditionType,
};
use tracing::{debug, info};

use crate::chain::ReleaseInfo;
use crate::checks::{check_capacity, check_installation, check_traffic};
use crate::conditions::{StrategyConditionsMap, StrategyConditionsUpdate};
use crate::result::{ExecutionOutcome, ExecutorResult};
use crate::CLUSTERS_NOT_READY;

/// Whether the pipeline should run the next step
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineContinuation {
    /// Proceed to the next step
    Continue,
    /// Stop the pass here
    Break,
}

/// Strategy step that drives a pass, already validated against the strategy
#[derive(Clone, Copy, Debug)]
pub struct DesiredStep<'a> {
    /// Index into the strategy steps
    pub index: i32,
    /// The step itself
    pub step: &'a RolloutStrategyStep,
    /// Whether this is the final step of the strategy
    pub is_last: bool,
}

/// What every step of one pass shares
#[derive(Clone, Copy, Debug)]
pub struct StepContext<'a> {
    /// Release whose strategy conditions the pass computes
    pub curr: &'a ReleaseInfo,
    /// Step of the chain head; tails follow it too
    pub desired: DesiredStep<'a>,
    /// Whether incumbent conditions gate progress
    pub has_incumbent: bool,
    /// Clock reading for the whole pass
    pub now: DateTime<Utc>,
}

impl StepContext<'_> {
    fn update(&self) -> StrategyConditionsUpdate {
        StrategyConditionsUpdate::new(self.desired.index, self.now)
    }
}

/// One enforcement step
pub trait PipelineStep {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Judge one concern, mutating `cond`
    fn evaluate(
        &self,
        ctx: &StepContext<'_>,
        cond: &mut StrategyConditionsMap,
    ) -> (PipelineContinuation, ExecutionOutcome);
}

/// Ordered list of steps for one pass
#[derive(Default)]
pub struct Pipeline<'a> {
    steps: Vec<Box<dyn PipelineStep + 'a>>,
}

impl<'a> Pipeline<'a> {
    /// Empty pipeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step
    pub fn enqueue(&mut self, step: impl PipelineStep + 'a) {
        self.steps.push(Box::new(step));
    }

    /// Names of the enqueued steps, in order
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run steps until one breaks, collecting everything they produce
    pub fn process(
        &self,
        ctx: &StepContext<'_>,
        cond: &mut StrategyConditionsMap,
    ) -> ExecutionOutcome {
        let mut outcome = ExecutionOutcome::default();
        for step in &self.steps {
            let (continuation, produced) = step.evaluate(ctx, cond);
            debug!(
                release = %ctx.curr.release.key(),
                step = step.name(),
                patches = produced.results.len(),
                continuation = ?continuation,
                "pipeline step evaluated"
            );
            outcome.extend(produced);
            if continuation == PipelineContinuation::Break {
                break;
            }
        }
        outcome
    }
}

/// Which side of the rollout an enforcer acts on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Chain head, driven by its own target step
    Contender,
    /// Predecessor, driven by its successor's target step
    Incumbent,
}

/// Status patch persisting the conditions computed so far, when they differ
/// from what the release already stores
pub(crate) fn strategy_conditions_patch(
    ctx: &StepContext<'_>,
    cond: &StrategyConditionsMap,
) -> Option<ExecutorResult> {
    let stored = ctx.curr.release.status.clone().unwrap_or_default();
    let new_status = ReleaseStatus {
        strategy: Some(ReleaseStrategyStatus {
            conditions: cond.as_release_strategy_conditions(),
            state: cond.as_release_strategy_state(
                ctx.desired.index,
                ctx.has_incumbent,
                ctx.desired.is_last,
            ),
        }),
        ..stored.clone()
    };

    (new_status != stored).then(|| ExecutorResult::ReleaseUpdate {
        name: ctx.curr.release.name_any(),
        new_status,
    })
}

fn halt(
    ctx: &StepContext<'_>,
    cond: &StrategyConditionsMap,
    mut results: Vec<ExecutorResult>,
) -> (PipelineContinuation, ExecutionOutcome) {
    results.extend(strategy_conditions_patch(ctx, cond));
    (
        PipelineContinuation::Break,
        ExecutionOutcome::with_results(results),
    )
}

// =============================================================================
// Installation
// =============================================================================

/// Checks that the contender is installed on every cluster
pub struct InstallationEnforcer<'a> {
    target: &'a ReleaseInfo,
}

impl<'a> InstallationEnforcer<'a> {
    /// Enforcer for the chain head
    pub fn new(target: &'a ReleaseInfo) -> Self {
        Self { target }
    }
}

impl PipelineStep for InstallationEnforcer<'_> {
    fn name(&self) -> &'static str {
        "installation"
    }

    fn evaluate(
        &self,
        ctx: &StepContext<'_>,
        cond: &mut StrategyConditionsMap,
    ) -> (PipelineContinuation, ExecutionOutcome) {
        let it = &self.target.installation_target;
        let (ready, desc) = check_installation(it);
        if ready {
            cond.set_true(
                StrategyConditionType::ContenderAchievedInstallation,
                ctx.update(),
            );
            return (PipelineContinuation::Continue, ExecutionOutcome::default());
        }

        info!(release = %self.target.release.key(), "release hasn't achieved installation yet");

        let registered = it.status.as_ref().map(|s| s.clusters.len()).unwrap_or(0);
        if it.spec.clusters.len() != registered {
            // target not registered on every cluster yet
            cond.set_unknown(
                StrategyConditionType::ContenderAchievedInstallation,
                ctx.update(),
            );
        } else {
            cond.set_false(
                StrategyConditionType::ContenderAchievedInstallation,
                ctx.update().with_reason(
                    CLUSTERS_NOT_READY,
                    format!(
                        "clusters pending installation: {}. for more details try `kubectl describe it {}`",
                        desc,
                        it.name_any()
                    ),
                ),
            );
        }

        halt(ctx, cond, Vec::new())
    }
}

// =============================================================================
// Capacity
// =============================================================================

/// Drives a release's capacity target to the desired step's percentage
pub struct CapacityEnforcer<'a> {
    target: &'a ReleaseInfo,
    role: Role,
}

impl<'a> CapacityEnforcer<'a> {
    /// Enforcer for `target` acting as `role`
    pub fn new(target: &'a ReleaseInfo, role: Role) -> Self {
        Self { target, role }
    }
}

impl PipelineStep for CapacityEnforcer<'_> {
    fn name(&self) -> &'static str {
        match self.role {
            Role::Contender => "contender-capacity",
            Role::Incumbent => "incumbent-capacity",
        }
    }

    fn evaluate(
        &self,
        ctx: &StepContext<'_>,
        cond: &mut StrategyConditionsMap,
    ) -> (PipelineContinuation, ExecutionOutcome) {
        let (type_, desired) = match self.role {
            Role::Contender => (
                StrategyConditionType::ContenderAchievedCapacity,
                ctx.desired.step.capacity.contender,
            ),
            Role::Incumbent => (
                StrategyConditionType::IncumbentAchievedCapacity,
                ctx.desired.step.capacity.incumbent,
            ),
        };

        let ct = &self.target.capacity_target;
        let check = check_capacity(ct, desired);
        if check.achieved {
            info!(release = %self.target.release.key(), percent = desired, "release has achieved capacity");
            cond.set_true(type_, ctx.update());
            return (PipelineContinuation::Continue, ExecutionOutcome::default());
        }

        info!(
            release = %self.target.release.key(),
            percent = desired,
            clusters = %check.reason,
            "release hasn't achieved capacity yet"
        );

        cond.set_false(
            type_,
            ctx.update().with_reason(
                CLUSTERS_NOT_READY,
                format!(
                    "release \"{}\" hasn't achieved capacity in clusters: {}. for more details try `kubectl describe ct {}`",
                    self.target.release.name_any(),
                    check.reason,
                    ct.name_any()
                ),
            ),
        );

        let results = check
            .new_spec
            .map(|new_spec| ExecutorResult::CapacityTargetOutdated {
                name: ct.name_any(),
                new_spec,
            })
            .into_iter()
            .collect();
        halt(ctx, cond, results)
    }
}

// =============================================================================
// Traffic
// =============================================================================

/// Drives a release's traffic target to the desired step's weight
pub struct TrafficEnforcer<'a> {
    target: &'a ReleaseInfo,
    role: Role,
}

impl<'a> TrafficEnforcer<'a> {
    /// Enforcer for `target` acting as `role`
    pub fn new(target: &'a ReleaseInfo, role: Role) -> Self {
        Self { target, role }
    }
}

impl PipelineStep for TrafficEnforcer<'_> {
    fn name(&self) -> &'static str {
        match self.role {
            Role::Contender => "contender-traffic",
            Role::Incumbent => "incumbent-traffic",
        }
    }

    fn evaluate(
        &self,
        ctx: &StepContext<'_>,
        cond: &mut StrategyConditionsMap,
    ) -> (PipelineContinuation, ExecutionOutcome) {
        let (type_, desired) = match self.role {
            Role::Contender => (
                StrategyConditionType::ContenderAchievedTraffic,
                ctx.desired.step.traffic.contender,
            ),
            Role::Incumbent => (
                StrategyConditionType::IncumbentAchievedTraffic,
                ctx.desired.step.traffic.incumbent,
            ),
        };

        let tt = &self.target.traffic_target;
        let check = check_traffic(tt, desired);
        if check.achieved {
            info!(release = %self.target.release.key(), weight = desired, "release has achieved traffic");
            cond.set_true(type_, ctx.update());
            return (PipelineContinuation::Continue, ExecutionOutcome::default());
        }

        info!(
            release = %self.target.release.key(),
            weight = desired,
            clusters = %check.reason,
            "release hasn't achieved traffic yet"
        );

        cond.set_false(
            type_,
            ctx.update().with_reason(
                CLUSTERS_NOT_READY,
                format!(
                    "release \"{}\" hasn't achieved traffic in clusters: {}. for more details try `kubectl describe tt {}`",
                    self.target.release.name_any(),
                    check.reason,
                    tt.name_any()
                ),
            ),
        );

        let results = check
            .new_spec
            .map(|new_spec| ExecutorResult::TrafficTargetOutdated {
                name: tt.name_any(),
                new_spec,
            })
            .into_iter()
            .collect();
        halt(ctx, cond, results)
    }
}
