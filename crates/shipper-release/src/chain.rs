//! Release chain assembly
//!
//! Orders an application's releases newest first and hands out executors
//! for each position, wired with the right neighbours.

use kube::ResourceExt;
use shipper_common::crd::{CapacityTarget, InstallationTarget, Release, TrafficTarget};
use shipper_common::release::{release_complete, release_generation};
use shipper_common::{Error, Result};

use crate::executor::StrategyExecutor;

/// A release bundled with its three target objects
#[derive(Clone, Debug)]
pub struct ReleaseInfo {
    /// The release
    pub release: Release,
    /// Where the release is installed
    pub installation_target: InstallationTarget,
    /// How much capacity the release runs with
    pub capacity_target: CapacityTarget,
    /// How much traffic the release receives
    pub traffic_target: TrafficTarget,
}

impl ReleaseInfo {
    /// Bundle a release with its targets
    pub fn new(
        release: Release,
        installation_target: InstallationTarget,
        capacity_target: CapacityTarget,
        traffic_target: TrafficTarget,
    ) -> Self {
        Self {
            release,
            installation_target,
            capacity_target,
            traffic_target,
        }
    }
}

fn newest_first<T>(items: Vec<T>, release: impl Fn(&T) -> &Release) -> Result<Vec<T>> {
    let mut keyed = items
        .into_iter()
        .filter(|item| release(item).metadata.deletion_timestamp.is_none())
        .map(|item| -> Result<(i64, T)> { Ok((release_generation(release(&item))?, item)) })
        .collect::<Result<Vec<_>>>()?;
    keyed.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(keyed.into_iter().map(|(_, item)| item).collect())
}

/// Drop releases being deleted and order the rest by generation, newest first
pub fn sort_releases(releases: Vec<Release>) -> Result<Vec<Release>> {
    newest_first(releases, |r| r)
}

/// The newest release of a sorted list
pub fn contender<'a>(app: &str, releases: &'a [Release]) -> Result<&'a Release> {
    releases
        .first()
        .ok_or_else(|| Error::not_found("contender", app))
}

/// The newest completed release of a sorted list
pub fn incumbent<'a>(app: &str, releases: &'a [Release]) -> Result<&'a Release> {
    releases
        .iter()
        .find(|r| release_complete(r))
        .ok_or_else(|| Error::not_found("incumbent", app))
}

/// Releases of one application, newest first
#[derive(Clone, Debug)]
pub struct ReleaseChain {
    infos: Vec<ReleaseInfo>,
}

impl ReleaseChain {
    /// Order `infos` into a chain; fails when none is left to roll out
    pub fn new(app: &str, infos: Vec<ReleaseInfo>) -> Result<Self> {
        let infos = newest_first(infos, |i| &i.release)?;
        if infos.is_empty() {
            return Err(Error::not_found("contender", app));
        }
        Ok(Self { infos })
    }

    /// Number of releases in the chain
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    /// Always false; a chain holds at least its head
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    /// The contender
    pub fn head(&self) -> &ReleaseInfo {
        &self.infos[0]
    }

    /// Newest completed release behind the head
    pub fn incumbent(&self) -> Option<&ReleaseInfo> {
        self.infos
            .iter()
            .skip(1)
            .find(|i| release_complete(&i.release))
    }

    /// Older (`prev`) and newer (`succ`) neighbours of position `i`
    pub fn neighbours(&self, i: usize) -> (Option<&ReleaseInfo>, Option<&ReleaseInfo>) {
        let prev = self.infos.get(i + 1);
        let succ = i.checked_sub(1).and_then(|j| self.infos.get(j));
        (prev, succ)
    }

    /// Executor for position `i`, `None` past the end of the chain.
    ///
    /// A release has an incumbent whenever it shares the chain with another
    /// one; a tail pass only ever writes the incumbent conditions.
    pub fn executor_for(&self, i: usize) -> Option<StrategyExecutor<'_>> {
        let curr = self.infos.get(i)?;
        let (prev, succ) = self.neighbours(i);
        let has_incumbent = prev.is_some() || succ.is_some();
        Some(StrategyExecutor::new(curr, prev, succ, has_incumbent))
    }

    /// Names of the releases, newest first
    pub fn names(&self) -> Vec<String> {
        self.infos.iter().map(|i| i.release.name_any()).collect()
    }
}
