//! Helpers over `Release` objects shared by the release controllers

use std::fmt;

use kube::ResourceExt;

use crate::crd::{ConditionStatus, Release, ReleaseCondition, ReleaseConditionType, ReleaseStatus};
use crate::{Error, Result, RELEASE_GENERATION_ANNOTATION};

/// Parse the release ordinal from the generation annotation
pub fn release_generation(release: &Release) -> Result<i64> {
    let raw = release
        .annotations()
        .get(RELEASE_GENERATION_ANNOTATION)
        .ok_or_else(|| {
            Error::validation_for_field(
                release.key(),
                "metadata.annotations",
                format!("missing annotation {}", RELEASE_GENERATION_ANNOTATION),
            )
        })?;

    raw.trim().parse::<i64>().map_err(|e| {
        Error::validation_for_field(
            release.key(),
            "metadata.annotations",
            format!("invalid generation {:?}: {}", raw, e),
        )
    })
}

/// Find a release-level condition by type
pub fn release_condition(
    status: &ReleaseStatus,
    type_: ReleaseConditionType,
) -> Option<&ReleaseCondition> {
    status.conditions.iter().find(|c| c.type_ == type_)
}

/// Whether the release has reached its final step with every condition met
pub fn release_complete(release: &Release) -> bool {
    release
        .status
        .as_ref()
        .and_then(|s| release_condition(s, ReleaseConditionType::Complete))
        .map(|c| c.status == ConditionStatus::True)
        .unwrap_or(false)
}

/// Describes how a release condition changed
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConditionDiff {
    type_: Option<ReleaseConditionType>,
    previous: Option<ConditionStatus>,
    current: Option<ConditionStatus>,
    reason: String,
}

impl ConditionDiff {
    /// True when the setter left the status untouched
    pub fn is_empty(&self) -> bool {
        self.type_.is_none()
    }
}

impl fmt::Display for ConditionDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(type_) = self.type_ else {
            return Ok(());
        };
        let prev = self
            .previous
            .map(|s| s.to_string())
            .unwrap_or_else(|| "<none>".to_string());
        let curr = self
            .current
            .map(|s| s.to_string())
            .unwrap_or_else(|| "<none>".to_string());
        write!(f, "[{} {}] -> [{}]", type_, prev, curr)?;
        if !self.reason.is_empty() {
            write!(f, ", {}", self.reason)?;
        }
        Ok(())
    }
}

/// Insert or replace a release condition.
///
/// The previous transition time is kept when the status is unchanged, so a
/// repeated call with the same condition leaves the status byte-identical.
/// Returns an empty diff when nothing changed.
pub fn set_release_condition(
    status: &mut ReleaseStatus,
    condition: ReleaseCondition,
) -> ConditionDiff {
    let existing = status
        .conditions
        .iter_mut()
        .find(|c| c.type_ == condition.type_);

    match existing {
        Some(c)
            if c.status == condition.status
                && c.reason == condition.reason
                && c.message == condition.message =>
        {
            ConditionDiff::default()
        }
        Some(c) => {
            let diff = ConditionDiff {
                type_: Some(condition.type_),
                previous: Some(c.status),
                current: Some(condition.status),
                reason: condition.reason.clone(),
            };
            let keep_time = c.status == condition.status;
            let time = c.last_transition_time;
            *c = condition;
            if keep_time {
                c.last_transition_time = time;
            }
            diff
        }
        None => {
            let diff = ConditionDiff {
                type_: Some(condition.type_),
                previous: None,
                current: Some(condition.status),
                reason: condition.reason.clone(),
            };
            status.conditions.push(condition);
            diff
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::crd::ReleaseSpec;

    fn release_with_generation(value: Option<&str>) -> Release {
        let mut rel = Release::new("app-1", ReleaseSpec::default());
        rel.metadata.namespace = Some("test-namespace".to_string());
        if let Some(v) = value {
            rel.annotations_mut()
                .insert(RELEASE_GENERATION_ANNOTATION.to_string(), v.to_string());
        }
        rel
    }

    fn complete(status: ConditionStatus) -> ReleaseCondition {
        ReleaseCondition::new(
            ReleaseConditionType::Complete,
            status,
            "",
            "",
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn generation_is_parsed_from_annotation() {
        assert_eq!(release_generation(&release_with_generation(Some("7"))).unwrap(), 7);
    }

    #[test]
    fn missing_or_bad_generation_is_a_validation_error() {
        let err = release_generation(&release_with_generation(None)).unwrap_err();
        assert_eq!(err.release(), Some("test-namespace/app-1"));
        assert!(!err.is_retryable());

        let err = release_generation(&release_with_generation(Some("seven"))).unwrap_err();
        assert!(err.to_string().contains("invalid generation"));
    }

    #[test]
    fn complete_condition_drives_release_complete() {
        let mut rel = release_with_generation(Some("1"));
        assert!(!release_complete(&rel));

        rel.status = Some(ReleaseStatus {
            conditions: vec![complete(ConditionStatus::True)],
            ..Default::default()
        });
        assert!(release_complete(&rel));

        rel.status = Some(ReleaseStatus {
            conditions: vec![complete(ConditionStatus::False)],
            ..Default::default()
        });
        assert!(!release_complete(&rel));
    }

    #[test]
    fn setting_a_new_condition_reports_a_diff() {
        let mut status = ReleaseStatus::default();
        let diff = set_release_condition(&mut status, complete(ConditionStatus::True));
        assert!(!diff.is_empty());
        assert_eq!(diff.to_string(), "[Complete <none>] -> [True]");
        assert_eq!(status.conditions.len(), 1);
    }

    #[test]
    fn setting_the_same_condition_twice_is_a_no_op() {
        let mut status = ReleaseStatus::default();
        set_release_condition(&mut status, complete(ConditionStatus::True));
        let before = status.clone();

        let mut again = complete(ConditionStatus::True);
        again.last_transition_time = Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        let diff = set_release_condition(&mut status, again);

        assert!(diff.is_empty());
        assert_eq!(status, before);
    }

    #[test]
    fn status_change_replaces_condition_and_time() {
        let mut status = ReleaseStatus::default();
        set_release_condition(&mut status, complete(ConditionStatus::False));

        let later = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut done = complete(ConditionStatus::True);
        done.last_transition_time = Some(later);
        let diff = set_release_condition(&mut status, done);

        assert_eq!(diff.to_string(), "[Complete False] -> [True]");
        assert_eq!(status.conditions[0].last_transition_time, Some(later));
    }
}
