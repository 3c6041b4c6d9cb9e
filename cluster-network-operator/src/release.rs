use std::{env::var, path::PathBuf};

use cluster_network_core::{migration::ConflictPolicy, render::RenderConfig};
use thiserror::Error;

pub const MANIFEST_DIR_ENV: &str = "MANIFEST_DIR";
pub const MIGRATION_SKIP_EXISTING_ENV: &str = "MIGRATION_SKIP_EXISTING";
pub const DEFAULT_MANIFEST_DIR: &str = "/bindata";

#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("{} must be either 'true' or 'false', got '{}'!", MIGRATION_SKIP_EXISTING_ENV, .0)]
    InvalidSkipExisting(String),
}

/// Deployment-provided settings of a running operator
#[derive(Debug, Clone)]
pub struct OperatorRelease {
    pub manifest_dir: PathBuf,
    pub render_config: RenderConfig,
    pub conflict_policy: ConflictPolicy,
}

impl OperatorRelease {
    pub fn from_env() -> Result<Self, ReleaseError> {
        Ok(Self {
            manifest_dir: var(MANIFEST_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_MANIFEST_DIR)),
            render_config: RenderConfig::from_env(),
            conflict_policy: parse_conflict_policy(var(MIGRATION_SKIP_EXISTING_ENV).ok().as_deref())?,
        })
    }
}

fn parse_conflict_policy(value: Option<&str>) -> Result<ConflictPolicy, ReleaseError> {
    match value.map(str::trim) {
        None | Some("") => Ok(ConflictPolicy::Fail),
        Some(value) => match value.parse::<bool>() {
            Ok(true) => Ok(ConflictPolicy::SkipExisting),
            Ok(false) => Ok(ConflictPolicy::Fail),
            Err(_) => Err(ReleaseError::InvalidSkipExisting(value.to_owned())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_policy_defaults_to_fail() {
        assert_eq!(parse_conflict_policy(None).unwrap(), ConflictPolicy::Fail);
        assert_eq!(parse_conflict_policy(Some("")).unwrap(), ConflictPolicy::Fail);
        assert_eq!(parse_conflict_policy(Some("false")).unwrap(), ConflictPolicy::Fail);
    }

    #[test]
    fn conflict_policy_can_skip_existing() {
        assert_eq!(
            parse_conflict_policy(Some("true")).unwrap(),
            ConflictPolicy::SkipExisting
        );
    }

    #[test]
    fn conflict_policy_rejects_garbage() {
        assert!(matches!(
            parse_conflict_policy(Some("yes please")),
            Err(ReleaseError::InvalidSkipExisting(value)) if value == "yes please"
        ));
    }
}
