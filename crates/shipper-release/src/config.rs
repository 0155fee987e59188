//! Controller configuration
//!
//! Reads settings through a trait so tests can inject values without
//! touching the process environment.

/// Default controller name, also used as the server-side field manager
pub const DEFAULT_CONTROLLER_NAME: &str = "shipper-release-controller";

/// Environment variable overriding the event reporter name
pub const CONTROLLER_NAME_ENV: &str = "SHIPPER_CONTROLLER_NAME";

/// Environment variable overriding the field manager used for patches
pub const FIELD_MANAGER_ENV: &str = "SHIPPER_FIELD_MANAGER";

/// Source of configuration values
#[cfg_attr(test, mockall::automock)]
pub trait EnvSource: Send + Sync {
    /// Value of a variable, `None` when unset
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads from the process environment
#[derive(Clone, Default)]
pub struct OsEnv;

impl EnvSource for OsEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Settings for the release strategy controller
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Reporter name on published events
    pub controller_name: String,
    /// Field manager for spec and status patches
    pub field_manager: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            controller_name: DEFAULT_CONTROLLER_NAME.to_string(),
            field_manager: DEFAULT_CONTROLLER_NAME.to_string(),
        }
    }
}

impl ControllerConfig {
    /// Resolve from `env`, falling back to defaults for unset or blank values
    pub fn from_env(env: &dyn EnvSource) -> Self {
        let read = |key: &str| {
            env.var(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();
        Self {
            controller_name: read(CONTROLLER_NAME_ENV).unwrap_or(defaults.controller_name),
            field_manager: read(FIELD_MANAGER_ENV).unwrap_or(defaults.field_manager),
        }
    }
}
