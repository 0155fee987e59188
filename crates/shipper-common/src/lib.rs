//! Common types for Shipper: CRDs, errors, events and utilities

#![deny(missing_docs)]

pub mod crd;
pub mod error;
pub mod events;
pub mod release;
pub mod telemetry;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// API group for all Shipper custom resources
pub const SHIPPER_API_GROUP: &str = "shipper.booking.com";

/// Annotation carrying the monotonically increasing release ordinal
pub const RELEASE_GENERATION_ANNOTATION: &str = "shipper.booking.com/release.generation";
