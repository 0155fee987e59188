//! Strategy executor
//!
//! Builds the pipeline for one position in the release chain and runs it.
//! The head (contender) pass checks installation, its own capacity and
//! traffic, then the incumbent's traffic and capacity, and finishes with the
//! release strategy state enforcer. A tail pass only drives the tail's own
//! capacity and traffic towards what its successor's step leaves for it.

use chrono::{DateTime, SubsecRound, Utc};
use shipper_common::crd::Release;
use shipper_common::{Error, Result};
use tracing::{debug, instrument};

use crate::chain::ReleaseInfo;
use crate::conditions::StrategyConditionsMap;
use crate::pipeline::{
    CapacityEnforcer, DesiredStep, InstallationEnforcer, Pipeline, Role, StepContext,
    TrafficEnforcer,
};
use crate::result::ExecutionOutcome;
use crate::state::ReleaseStrategyStateEnforcer;

/// Resolve the strategy step a release asks for.
///
/// A missing strategy or an out-of-range `targetStep` is an unrecoverable
/// configuration error: retrying cannot help until the spec is fixed.
pub fn desired_step(release: &Release) -> Result<DesiredStep<'_>> {
    let strategy = release.strategy().ok_or_else(|| {
        Error::unrecoverable_strategy(release.key(), "release has no rollout strategy")
    })?;

    let index = release.spec.target_step;
    let position = usize::try_from(index)
        .ok()
        .filter(|i| *i < strategy.steps.len())
        .ok_or_else(|| {
            Error::unrecoverable_strategy(
                release.key(),
                format!(
                    "no step {} in strategy for Release {:?} ({} steps)",
                    index,
                    release.key(),
                    strategy.steps.len()
                ),
            )
        })?;

    Ok(DesiredStep {
        index,
        step: &strategy.steps[position],
        is_last: position + 1 == strategy.steps.len(),
    })
}

/// Runs one reconciliation pass for one release of a chain
#[derive(Clone, Debug)]
pub struct StrategyExecutor<'a> {
    curr: &'a ReleaseInfo,
    prev: Option<&'a ReleaseInfo>,
    succ: Option<&'a ReleaseInfo>,
    has_incumbent: bool,
    now: DateTime<Utc>,
}

impl<'a> StrategyExecutor<'a> {
    /// Executor for `curr`, with its older (`prev`) and newer (`succ`)
    /// neighbours in the chain.
    ///
    /// The clock is read once and truncated to whole seconds so conditions
    /// compare equal after a round trip through the API server.
    pub fn new(
        curr: &'a ReleaseInfo,
        prev: Option<&'a ReleaseInfo>,
        succ: Option<&'a ReleaseInfo>,
        has_incumbent: bool,
    ) -> Self {
        Self {
            curr,
            prev,
            succ,
            has_incumbent,
            now: Utc::now().trunc_subsecs(0),
        }
    }

    /// Override the pass clock, truncated to whole seconds like [`Self::new`]
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now.trunc_subsecs(0);
        self
    }

    /// Whether `curr` is the chain head
    pub fn is_head(&self) -> bool {
        self.succ.is_none()
    }

    fn pipeline(&self) -> Pipeline<'a> {
        let mut pipeline = Pipeline::new();

        if self.is_head() {
            pipeline.enqueue(InstallationEnforcer::new(self.curr));
            pipeline.enqueue(CapacityEnforcer::new(self.curr, Role::Contender));
            pipeline.enqueue(TrafficEnforcer::new(self.curr, Role::Contender));
            if let Some(prev) = self.prev {
                // traffic leaves the incumbent before its capacity does
                pipeline.enqueue(TrafficEnforcer::new(prev, Role::Incumbent));
                pipeline.enqueue(CapacityEnforcer::new(prev, Role::Incumbent));
            }
            pipeline.enqueue(ReleaseStrategyStateEnforcer::new(self.curr));
        } else {
            pipeline.enqueue(CapacityEnforcer::new(self.curr, Role::Incumbent));
            pipeline.enqueue(TrafficEnforcer::new(self.curr, Role::Incumbent));
        }

        pipeline
    }

    /// Run the pass.
    ///
    /// Fails before evaluating anything when `curr`, or the successor whose
    /// step drives a tail, has an invalid strategy step.
    #[instrument(skip(self), fields(release = %self.curr.release.key()))]
    pub fn execute(&self) -> Result<ExecutionOutcome> {
        let own = desired_step(&self.curr.release)?;
        let desired = match self.succ {
            Some(succ) => desired_step(&succ.release)?,
            None => own,
        };

        let existing = self
            .curr
            .release
            .status
            .as_ref()
            .and_then(|s| s.strategy.as_ref())
            .map(|s| s.conditions.as_slice())
            .unwrap_or_default();
        let mut cond = StrategyConditionsMap::new(existing);

        let ctx = StepContext {
            curr: self.curr,
            desired,
            has_incumbent: self.has_incumbent,
            now: self.now,
        };

        let pipeline = self.pipeline();
        debug!(steps = ?pipeline.step_names(), step = desired.index, "executing strategy");

        Ok(pipeline.process(&ctx, &mut cond))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use shipper_common::crd::{ConditionStatus, StrategyConditionType};

    use super::*;
    use crate::fixtures::{contender, incumbent, installation_target, CLUSTER, CONTENDER};
    use crate::result::ExecutorResult;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn kinds(outcome: &ExecutionOutcome) -> Vec<(&'static str, String)> {
        outcome
            .results
            .iter()
            .map(|r| (r.kind(), r.name().to_string()))
            .collect()
    }

    #[test]
    fn head_pipeline_visits_every_concern_in_order() {
        let head = contender(0);
        let tail = incumbent();

        let names = StrategyExecutor::new(&head, Some(&tail), None, true)
            .pipeline()
            .step_names();
        assert_eq!(
            names,
            vec![
                "installation",
                "contender-capacity",
                "contender-traffic",
                "incumbent-traffic",
                "incumbent-capacity",
                "release-strategy-state",
            ]
        );

        let names = StrategyExecutor::new(&head, None, None, false)
            .pipeline()
            .step_names();
        assert_eq!(
            names,
            vec![
                "installation",
                "contender-capacity",
                "contender-traffic",
                "release-strategy-state",
            ]
        );
    }

    #[test]
    fn tail_pipeline_has_no_installation_or_state_step() {
        let head = contender(0);
        let tail = incumbent();
        let names = StrategyExecutor::new(&tail, None, Some(&head), true)
            .pipeline()
            .step_names();
        assert_eq!(names, vec!["incumbent-capacity", "incumbent-traffic"]);
    }

    #[test]
    fn clock_is_truncated_to_seconds() {
        let head = contender(0);
        let executor = StrategyExecutor::new(&head, None, None, false);
        assert_eq!(executor.now.timestamp_subsec_nanos(), 0);

        let sub_second = now() + chrono::Duration::milliseconds(750);
        let executor = executor.with_now(sub_second);
        assert_eq!(executor.now, now());
    }

    #[test]
    fn out_of_range_target_step_is_unrecoverable() {
        let head = contender(5);
        let tail = incumbent();

        let err = StrategyExecutor::new(&head, Some(&tail), None, true)
            .with_now(now())
            .execute()
            .unwrap_err();

        assert!(matches!(err, Error::UnrecoverableStrategy { .. }));
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("no step 5"));
    }

    #[test]
    fn negative_target_step_is_unrecoverable() {
        let head = contender(-1);
        let err = StrategyExecutor::new(&head, None, None, false)
            .execute()
            .unwrap_err();
        assert!(matches!(err, Error::UnrecoverableStrategy { .. }));
    }

    #[test]
    fn missing_strategy_is_unrecoverable() {
        let mut head = contender(0);
        head.release.spec.environment.strategy = None;
        let err = StrategyExecutor::new(&head, None, None, false)
            .execute()
            .unwrap_err();
        assert!(matches!(err, Error::UnrecoverableStrategy { .. }));
        assert_eq!(err.release(), Some("test-namespace/0.0.2"));
    }

    #[test]
    fn tail_with_invalid_successor_step_is_unrecoverable() {
        let head = contender(3);
        let tail = incumbent();
        let err = StrategyExecutor::new(&tail, None, Some(&head), true)
            .execute()
            .unwrap_err();
        assert!(matches!(err, Error::UnrecoverableStrategy { .. }));
    }

    #[test]
    fn failed_installation_blocks_capacity_and_traffic() {
        let mut head = contender(1);
        head.installation_target = installation_target(CONTENDER, &[CLUSTER], false);
        let tail = incumbent();

        let outcome = StrategyExecutor::new(&head, Some(&tail), None, true)
            .with_now(now())
            .execute()
            .unwrap();

        assert_eq!(kinds(&outcome), vec![("Release", CONTENDER.to_string())]);
        assert!(outcome.events.is_empty());
    }

    #[test]
    fn first_pass_scales_up_contender_capacity() {
        let head = contender(0);
        let tail = incumbent();

        let outcome = StrategyExecutor::new(&head, Some(&tail), None, true)
            .with_now(now())
            .execute()
            .unwrap();

        assert_eq!(
            kinds(&outcome),
            vec![
                ("CapacityTarget", CONTENDER.to_string()),
                ("Release", CONTENDER.to_string()),
            ]
        );
        let ExecutorResult::ReleaseUpdate { new_status, .. } = &outcome.results[1] else {
            panic!("expected a release update");
        };
        let conditions = &new_status.strategy.as_ref().unwrap().conditions;
        let types: Vec<_> = conditions.iter().map(|c| (c.type_, c.status)).collect();
        assert_eq!(
            types,
            vec![
                (StrategyConditionType::ContenderAchievedCapacity, ConditionStatus::False),
                (StrategyConditionType::ContenderAchievedInstallation, ConditionStatus::True),
            ]
        );
    }

    #[test]
    fn tail_desired_values_follow_head_step() {
        // incumbent still targets "full on" but the head is at 50/50
        let head = contender(1);
        let tail = incumbent();

        let outcome = StrategyExecutor::new(&tail, None, Some(&head), true)
            .with_now(now())
            .execute()
            .unwrap();

        let ExecutorResult::CapacityTargetOutdated { name, new_spec } = &outcome.results[0] else {
            panic!("expected a capacity patch");
        };
        assert_eq!(name, "0.0.1");
        assert_eq!(new_spec.clusters[0].percent, 50);

        let ExecutorResult::ReleaseUpdate { name, new_status } = &outcome.results[1] else {
            panic!("expected a release update");
        };
        assert_eq!(name, "0.0.1");
        let condition = &new_status.strategy.as_ref().unwrap().conditions[0];
        assert_eq!(condition.type_, StrategyConditionType::IncumbentAchievedCapacity);
        assert_eq!(condition.step, 1);
    }

    #[test]
    fn settled_tail_produces_nothing() {
        let head = contender(0);
        let tail = incumbent();
        let outcome = StrategyExecutor::new(&tail, None, Some(&head), true)
            .with_now(now())
            .execute()
            .unwrap();
        assert!(outcome.is_empty());
        assert!(outcome.transitions.is_empty());
    }
}
