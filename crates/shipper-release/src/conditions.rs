//! Strategy conditions map
//!
//! Rebuilt from the release's persisted strategy conditions at the start of
//! every pass, mutated by the pipeline steps, then serialized back into the
//! release status. It is never retained across passes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use shipper_common::crd::{
    ConditionStatus, ReleaseStrategyCondition, ReleaseStrategyState, StrategyConditionType,
    StrategyState,
};

/// Conditions that gate every step, regardless of chain shape
const CONTENDER_CONDITIONS: [StrategyConditionType; 3] = [
    StrategyConditionType::ContenderAchievedInstallation,
    StrategyConditionType::ContenderAchievedCapacity,
    StrategyConditionType::ContenderAchievedTraffic,
];

/// Conditions that only gate a step when an incumbent is present
const INCUMBENT_CONDITIONS: [StrategyConditionType; 2] = [
    StrategyConditionType::IncumbentAchievedCapacity,
    StrategyConditionType::IncumbentAchievedTraffic,
];

/// New reason, message, step and timestamp for a condition
#[derive(Clone, Debug, PartialEq)]
pub struct StrategyConditionsUpdate {
    /// Machine-readable reason
    pub reason: String,
    /// Human-readable message
    pub message: String,
    /// Strategy step the judgement applies to
    pub step: i32,
    /// Used as the transition time when the status changes
    pub last_transition_time: DateTime<Utc>,
}

impl StrategyConditionsUpdate {
    /// Update without reason or message
    pub fn new(step: i32, now: DateTime<Utc>) -> Self {
        Self {
            reason: String::new(),
            message: String::new(),
            step,
            last_transition_time: now,
        }
    }

    /// Attach a reason and message
    pub fn with_reason(mut self, reason: impl Into<String>, message: impl Into<String>) -> Self {
        self.reason = reason.into();
        self.message = message.into();
        self
    }
}

/// How a single condition stands with respect to a step
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Judgement {
    Met,
    Unmet,
    Undetermined,
}

/// Strategy conditions keyed by type
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StrategyConditionsMap {
    conditions: BTreeMap<StrategyConditionType, ReleaseStrategyCondition>,
}

impl StrategyConditionsMap {
    /// Build the map from persisted conditions
    pub fn new(existing: &[ReleaseStrategyCondition]) -> Self {
        let conditions = existing
            .iter()
            .map(|c| (c.type_, c.clone()))
            .collect();
        Self { conditions }
    }

    /// Mark a condition True
    pub fn set_true(&mut self, type_: StrategyConditionType, update: StrategyConditionsUpdate) {
        self.set(type_, ConditionStatus::True, update);
    }

    /// Mark a condition False
    pub fn set_false(&mut self, type_: StrategyConditionType, update: StrategyConditionsUpdate) {
        self.set(type_, ConditionStatus::False, update);
    }

    /// Mark a condition Unknown
    pub fn set_unknown(&mut self, type_: StrategyConditionType, update: StrategyConditionsUpdate) {
        self.set(type_, ConditionStatus::Unknown, update);
    }

    fn set(
        &mut self,
        type_: StrategyConditionType,
        status: ConditionStatus,
        update: StrategyConditionsUpdate,
    ) {
        // transition time only moves when the status does
        let last_transition_time = match self.conditions.get(&type_) {
            Some(existing) if existing.status == status => existing.last_transition_time,
            _ => Some(update.last_transition_time),
        };

        self.conditions.insert(
            type_,
            ReleaseStrategyCondition {
                type_,
                status,
                last_transition_time,
                reason: update.reason,
                message: update.message,
                step: update.step,
            },
        );
    }

    /// Status of a condition, `None` when it was never set
    pub fn get_status(&self, type_: StrategyConditionType) -> Option<ConditionStatus> {
        self.conditions.get(&type_).map(|c| c.status)
    }

    /// Full condition record
    pub fn get(&self, type_: StrategyConditionType) -> Option<&ReleaseStrategyCondition> {
        self.conditions.get(&type_)
    }

    fn judge(&self, type_: StrategyConditionType, step: i32) -> Judgement {
        match self.conditions.get(&type_) {
            Some(c) if c.status == ConditionStatus::True && c.step == step => Judgement::Met,
            Some(c) if c.status == ConditionStatus::False => Judgement::Unmet,
            _ => Judgement::Undetermined,
        }
    }

    fn relevant(has_incumbent: bool) -> impl Iterator<Item = StrategyConditionType> {
        let incumbent: &'static [StrategyConditionType] = if has_incumbent {
            &INCUMBENT_CONDITIONS
        } else {
            &[]
        };
        CONTENDER_CONDITIONS.into_iter().chain(incumbent.iter().copied())
    }

    /// Whether every relevant condition is True at `step`
    pub fn all_true(&self, step: i32, has_incumbent: bool) -> bool {
        Self::relevant(has_incumbent).all(|t| self.judge(t, step) == Judgement::Met)
    }

    /// Serialize, sorted by condition type
    pub fn as_release_strategy_conditions(&self) -> Vec<ReleaseStrategyCondition> {
        self.conditions.values().cloned().collect()
    }

    /// Derive the aggregate waiting flags.
    ///
    /// A `WaitingFor*` flag is True when any relevant condition for the
    /// concern is False, False when all of them are True at `step`, and
    /// Unknown otherwise. `WaitingForCommand` is True only when the step is
    /// fully achieved and further steps remain.
    pub fn as_release_strategy_state(
        &self,
        step: i32,
        has_incumbent: bool,
        is_last_step: bool,
    ) -> ReleaseStrategyState {
        let mut capacity = vec![StrategyConditionType::ContenderAchievedCapacity];
        let mut traffic = vec![StrategyConditionType::ContenderAchievedTraffic];
        if has_incumbent {
            capacity.push(StrategyConditionType::IncumbentAchievedCapacity);
            traffic.push(StrategyConditionType::IncumbentAchievedTraffic);
        }

        ReleaseStrategyState {
            waiting_for_installation: self
                .waiting_for(&[StrategyConditionType::ContenderAchievedInstallation], step),
            waiting_for_capacity: self.waiting_for(&capacity, step),
            waiting_for_traffic: self.waiting_for(&traffic, step),
            waiting_for_command: StrategyState::from(
                !is_last_step && self.all_true(step, has_incumbent),
            ),
        }
    }

    fn waiting_for(&self, types: &[StrategyConditionType], step: i32) -> StrategyState {
        let judgements: Vec<Judgement> = types.iter().map(|t| self.judge(*t, step)).collect();
        if judgements.contains(&Judgement::Unmet) {
            StrategyState::True
        } else if judgements.iter().all(|j| *j == Judgement::Met) {
            StrategyState::False
        } else {
            StrategyState::Unknown
        }
    }
}
