//! Container options.
//!
//! Options can be set in code, read from environment variables, or (with the
//! `config` feature) deserialized from JSON.

use std::env;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::{DiError, DiResult};

/// Default recursion limit for nested resolutions.
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// Default number of instance cache shards.
pub const DEFAULT_CACHE_SHARDS: usize = 16;

/// What to do when a second binding is declared for the same service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "lowercase"))]
pub enum DuplicatePolicy {
    /// Fail with a duplicate binding error
    #[default]
    Reject,
    /// The later binding replaces the earlier one
    Replace,
}

impl FromStr for DuplicatePolicy {
    type Err = DiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(DuplicatePolicy::Reject),
            "replace" => Ok(DuplicatePolicy::Replace),
            other => Err(DiError::configuration(
                "DuplicatePolicy",
                format!("unknown policy '{}', expected 'reject' or 'replace'", other),
            )),
        }
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicatePolicy::Reject => f.write_str("reject"),
            DuplicatePolicy::Replace => f.write_str("replace"),
        }
    }
}

/// Options controlling how a container is built and how it resolves.
///
/// # Examples
///
/// ```rust
/// use tenant_di::{ContainerOptions, DuplicatePolicy};
///
/// let options = ContainerOptions::new()
///     .with_duplicate_policy(DuplicatePolicy::Replace)
///     .with_max_depth(64);
///
/// assert_eq!(options.max_depth, 64);
/// assert_eq!(options.cache_shards, 16);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ContainerOptions {
    /// Handling of duplicate bindings
    pub duplicate_policy: DuplicatePolicy,
    /// Maximum nesting of resolutions on one thread
    pub max_depth: usize,
    /// Number of lock shards in the instance cache
    pub cache_shards: usize,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            duplicate_policy: DuplicatePolicy::Reject,
            max_depth: DEFAULT_MAX_DEPTH,
            cache_shards: DEFAULT_CACHE_SHARDS,
        }
    }
}

impl ContainerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_cache_shards(mut self, shards: usize) -> Self {
        self.cache_shards = shards;
        self
    }

    /// Reads options from `<PREFIX>_MAX_DEPTH`, `<PREFIX>_DUPLICATE_POLICY`
    /// and `<PREFIX>_CACHE_SHARDS`, keeping defaults for unset variables.
    ///
    /// Malformed values are configuration errors rather than silently ignored.
    pub fn from_env(prefix: &str) -> DiResult<Self> {
        let prefix = prefix.to_uppercase();
        let mut options = Self::default();

        if let Some(value) = env_var(&prefix, "MAX_DEPTH") {
            options.max_depth = parse_usize("max_depth", &value)?;
        }
        if let Some(value) = env_var(&prefix, "DUPLICATE_POLICY") {
            options.duplicate_policy = value.parse()?;
        }
        if let Some(value) = env_var(&prefix, "CACHE_SHARDS") {
            options.cache_shards = parse_usize("cache_shards", &value)?;
        }

        options.validate()?;
        tracing::debug!(
            prefix = %prefix,
            max_depth = options.max_depth,
            duplicate_policy = %options.duplicate_policy,
            cache_shards = options.cache_shards,
            "container options loaded from environment"
        );
        Ok(options)
    }

    /// Parses options from a JSON document. Missing fields take defaults.
    #[cfg(feature = "config")]
    pub fn from_json(json: &str) -> DiResult<Self> {
        let options: Self = serde_json::from_str(json)
            .map_err(|e| DiError::configuration("ContainerOptions", e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Rejects option values the container cannot work with.
    pub fn validate(&self) -> DiResult<()> {
        if self.max_depth == 0 {
            return Err(DiError::configuration(
                "ContainerOptions",
                "max_depth must be at least 1",
            ));
        }
        if self.cache_shards == 0 {
            return Err(DiError::configuration(
                "ContainerOptions",
                "cache_shards must be at least 1",
            ));
        }
        Ok(())
    }
}

fn env_var(prefix: &str, key: &str) -> Option<String> {
    let name = if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}_{}", prefix, key)
    };
    env::var(name).ok()
}

fn parse_usize(field: &str, value: &str) -> DiResult<usize> {
    value.trim().parse::<usize>().map_err(|e| {
        DiError::configuration(
            "ContainerOptions",
            format!("invalid {} '{}': {}", field, value, e),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_parses_case_insensitively() {
        assert_eq!("Replace".parse::<DuplicatePolicy>().unwrap(), DuplicatePolicy::Replace);
        assert_eq!(" reject ".parse::<DuplicatePolicy>().unwrap(), DuplicatePolicy::Reject);
        assert!("ignore".parse::<DuplicatePolicy>().is_err());
    }

    #[test]
    fn zero_shards_are_rejected() {
        let options = ContainerOptions::new().with_cache_shards(0);
        assert!(matches!(options.validate(), Err(DiError::Configuration { .. })));
    }

    #[cfg(feature = "config")]
    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let options = ContainerOptions::from_json(r#"{ "duplicate_policy": "replace" }"#).unwrap();
        assert_eq!(options.duplicate_policy, DuplicatePolicy::Replace);
        assert_eq!(options.max_depth, DEFAULT_MAX_DEPTH);
    }
}
