//! Release strategy state enforcer
//!
//! Terminal step of the head pipeline. It folds the freshly computed
//! conditions back into the release status, records which waiting flags
//! changed, advances `achievedStep` and marks the release complete on the
//! last step.

use kube::ResourceExt;
use shipper_common::crd::{
    AchievedStep, ConditionStatus, ReleaseCondition, ReleaseConditionType, ReleaseStrategyState,
    ReleaseStrategyStatus,
};
use shipper_common::events::reasons;
use shipper_common::release::set_release_condition;
use tracing::{debug, info};

use crate::chain::ReleaseInfo;
use crate::conditions::StrategyConditionsMap;
use crate::pipeline::{PipelineContinuation, PipelineStep, StepContext};
use crate::result::{
    ExecutionOutcome, ExecutorResult, ReleaseStrategyStateTransition, StrategyEvent,
    StrategyStateKind,
};

/// Waiting flags that differ between `old` and `new`, each with its own
/// previous value
pub fn release_strategy_state_transitions(
    old: &ReleaseStrategyState,
    new: &ReleaseStrategyState,
) -> Vec<ReleaseStrategyStateTransition> {
    [
        (
            StrategyStateKind::WaitingForInstallation,
            old.waiting_for_installation,
            new.waiting_for_installation,
        ),
        (
            StrategyStateKind::WaitingForCapacity,
            old.waiting_for_capacity,
            new.waiting_for_capacity,
        ),
        (
            StrategyStateKind::WaitingForTraffic,
            old.waiting_for_traffic,
            new.waiting_for_traffic,
        ),
        (
            StrategyStateKind::WaitingForCommand,
            old.waiting_for_command,
            new.waiting_for_command,
        ),
    ]
    .into_iter()
    .filter(|(_, previous, new)| previous != new)
    .map(|(state, previous, new)| ReleaseStrategyStateTransition {
        state,
        previous,
        new,
    })
    .collect()
}

/// Reconciles the head release's status with the computed conditions
pub struct ReleaseStrategyStateEnforcer<'a> {
    target: &'a ReleaseInfo,
}

impl<'a> ReleaseStrategyStateEnforcer<'a> {
    /// Enforcer for the chain head
    pub fn new(target: &'a ReleaseInfo) -> Self {
        Self { target }
    }
}

impl PipelineStep for ReleaseStrategyStateEnforcer<'_> {
    fn name(&self) -> &'static str {
        "release-strategy-state"
    }

    fn evaluate(
        &self,
        ctx: &StepContext<'_>,
        cond: &mut StrategyConditionsMap,
    ) -> (PipelineContinuation, ExecutionOutcome) {
        let release = &self.target.release;
        let name = release.name_any();
        let step = ctx.desired.index;
        let mut outcome = ExecutionOutcome::default();

        let stored = release.status.clone().unwrap_or_default();
        let mut status = stored.clone();

        let new_state =
            cond.as_release_strategy_state(step, ctx.has_incumbent, ctx.desired.is_last);
        let old_state = stored
            .strategy
            .as_ref()
            .map(|s| s.state.clone())
            .unwrap_or_default();
        outcome.transitions = release_strategy_state_transitions(&old_state, &new_state);

        status.strategy = Some(ReleaseStrategyStatus {
            conditions: cond.as_release_strategy_conditions(),
            state: new_state,
        });

        if stored.achieved_step.as_ref().map(|a| a.step) != Some(step) {
            info!(release = %release.key(), step, name = %ctx.desired.step.name, "strategy step finished");
            status.achieved_step = Some(AchievedStep {
                step,
                name: ctx.desired.step.name.clone(),
            });
            outcome.events.push(StrategyEvent {
                release: name.clone(),
                reason: reasons::STRATEGY_APPLIED,
                message: format!("step {} finished", step),
            });
        }

        if ctx.desired.is_last && cond.all_true(step, ctx.has_incumbent) {
            let complete = ReleaseCondition::new(
                ReleaseConditionType::Complete,
                ConditionStatus::True,
                "",
                "",
                ctx.now,
            );
            let diff = set_release_condition(&mut status, complete);
            if !diff.is_empty() {
                info!(release = %release.key(), %diff, "release condition changed");
                outcome.events.push(StrategyEvent {
                    release: name.clone(),
                    reason: reasons::RELEASE_CONDITION_CHANGED,
                    message: diff.to_string(),
                });
            }
        }

        status.conditions.sort_by_key(|c| c.type_);

        if status != stored {
            outcome.results.push(ExecutorResult::ReleaseUpdate {
                name,
                new_status: status,
            });
        } else {
            debug!(release = %release.key(), "release status up to date");
        }

        (PipelineContinuation::Break, outcome)
    }
}
