use serde::{Deserialize, Serialize};

/// What execute does after one prepared command fails to commit.
///
/// Neither policy rolls back commits that already succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommitFailurePolicy {
    /// Keep committing the remaining commands and report every failure.
    #[default]
    BestEffort,
    /// Skip the remaining commands (static deltas still apply) and report.
    StopOnFirstError,
}

/// Resolution configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionConfig {
    /// When an ongoing event comes back next turn, let the player pick a new
    /// approach (`true`) or keep the previous one (`false`).
    pub reselect_approach_on_retrigger: bool,

    /// Highest severity an army condition can reach.
    pub max_condition_severity: i32,

    pub commit_failure_policy: CommitFailurePolicy,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            reselect_approach_on_retrigger: false,
            max_condition_severity: 4,
            commit_failure_policy: CommitFailurePolicy::BestEffort,
        }
    }
}

impl ResolutionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.max_condition_severity < 1 {
            return Err(format!(
                "max_condition_severity ({}) must be at least 1",
                self.max_condition_severity
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ResolutionConfig::default();
        assert!(!config.reselect_approach_on_retrigger);
        assert_eq!(config.max_condition_severity, 4);
        assert_eq!(config.commit_failure_policy, CommitFailurePolicy::BestEffort);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ResolutionConfig =
            serde_json::from_str(r#"{"commit_failure_policy": "stop-on-first-error"}"#).unwrap();
        assert_eq!(
            config.commit_failure_policy,
            CommitFailurePolicy::StopOnFirstError
        );
        assert_eq!(config.max_condition_severity, 4);
    }

    #[test]
    fn test_validate_rejects_zero_severity() {
        let config = ResolutionConfig {
            max_condition_severity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
