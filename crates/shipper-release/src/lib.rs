//! Release strategy execution for Shipper
//!
//! Drives a chain of releases (newest contender first, completed incumbent
//! last) through the steps of a rollout strategy. Each reconciliation pass
//! is pure computation over already-fetched snapshots:
//!
//! - [`checks`] compare a target object's spec and status with the value the
//!   current strategy step asks for
//! - [`conditions`] track per-concern strategy conditions and derive the
//!   aggregate waiting flags
//! - [`pipeline`] runs enforcement steps in order, stopping at the first
//!   unmet concern
//! - [`executor`] assembles the pipeline for a chain position
//! - [`apply`] pushes the resulting patches through the Kubernetes API
//!
//! The engine never talks to the API server; only [`apply`] does.

pub mod apply;
pub mod chain;
pub mod checks;
pub mod conditions;
pub mod config;
pub mod executor;
pub mod pipeline;
pub mod result;
pub mod state;

#[cfg(test)]
pub(crate) mod fixtures;

pub use chain::{ReleaseChain, ReleaseInfo};
pub use executor::StrategyExecutor;
pub use result::{ExecutionOutcome, ExecutorResult, ReleaseStrategyStateTransition};

/// Condition reason used when clusters have not reached the desired state
pub const CLUSTERS_NOT_READY: &str = "ClustersNotReady";
