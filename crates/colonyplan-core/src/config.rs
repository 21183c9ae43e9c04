//! Planner configuration loading.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// How the infeasible memo behaves across classification passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoPolicy {
    /// Infeasible verdicts stick for the rest of the session.
    #[default]
    Session,
    /// Memo is cleared before every pass.
    Recompute,
}

/// Which occurrences `remove` takes out when an item is queued more than once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoveMode {
    #[default]
    First,
    All,
}

/// Planner configuration, loaded from YAML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Infeasible memo policy
    pub memo: MemoPolicy,

    /// Accept locked items into the queue
    #[serde(default = "default_true")]
    pub admit_locked: bool,

    /// Default removal mode for callers that do not pick one
    pub remove_mode: RemoveMode,
}

fn default_true() -> bool {
    true
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            memo: MemoPolicy::default(),
            admit_locked: default_true(),
            remove_mode: RemoveMode::default(),
        }
    }
}

impl PlannerConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        Ok(config)
    }

    /// Load from `path` when given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: PlannerConfig = serde_yaml::from_str("memo: recompute").unwrap();
        assert_eq!(config.memo, MemoPolicy::Recompute);
        assert!(config.admit_locked);
        assert_eq!(config.remove_mode, RemoveMode::First);
    }

    #[test]
    fn load_reads_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "admit_locked: false\nremove_mode: all").unwrap();

        let config = PlannerConfig::load(file.path()).unwrap();
        assert!(!config.admit_locked);
        assert_eq!(config.remove_mode, RemoveMode::All);
        assert_eq!(config.memo, MemoPolicy::Session);
    }

    #[test]
    fn load_reports_the_path_on_failure() {
        let err = PlannerConfig::load(Path::new("/nonexistent/planner.yaml")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/planner.yaml"));
    }

    #[test]
    fn no_path_means_defaults() {
        assert_eq!(
            PlannerConfig::load_or_default(None).unwrap(),
            PlannerConfig::default()
        );
    }
}
