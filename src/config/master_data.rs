//! Reference-data loading from `master_data.toml`.
//!
//! The file lists every lookup table the engines depend on. The same data set
//! is compiled into the binary so a fresh database can be seeded without the
//! file on disk.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

const BUILTIN_MASTER_DATA: &str = include_str!("../../master_data.toml");

/// Accepted stage weights; the expected margin runs from 16.5% to 30% across it.
pub const MARGIN_PRIORITY_RANGE: std::ops::RangeInclusive<i32> = 1..=10;

const fn default_true() -> bool {
    true
}

/// Entire reference data set
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MasterData {
    /// Construction stages in any order; `sequence_order` defines the real order
    #[serde(default)]
    pub construction_stages: Vec<StageConfig>,
    /// Sales pipeline statuses
    #[serde(default)]
    pub lead_statuses: Vec<LeadStatusConfig>,
    /// Worker trades
    #[serde(default)]
    pub worker_roles: Vec<RoleConfig>,
    /// Requirement lifecycle statuses
    #[serde(default)]
    pub requirement_statuses: Vec<CodeNameConfig>,
    /// Requirement urgency levels
    #[serde(default)]
    pub urgency_levels: Vec<UrgencyConfig>,
    /// Worker ledger entry types
    #[serde(default)]
    pub credit_transaction_types: Vec<CodeNameConfig>,
}

/// One construction stage
#[derive(Debug, Clone, Deserialize)]
pub struct StageConfig {
    /// Stable code
    pub code: String,
    /// Display name
    pub name: String,
    /// Position in the construction order
    pub sequence_order: i32,
    /// Description of the work
    #[serde(default)]
    pub description: String,
    /// Weight used when splitting project estimates, within [`MARGIN_PRIORITY_RANGE`]
    pub default_margin_priority: i32,
    /// Inactive stages are not seeded into new projects
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// One lead status
#[derive(Debug, Clone, Deserialize)]
pub struct LeadStatusConfig {
    /// Stable code
    pub code: String,
    /// Display name
    pub name: String,
    /// Position in the pipeline
    pub sequence_order: i32,
    /// Terminal status
    #[serde(default)]
    pub is_final: bool,
    /// Terminal and won
    #[serde(default)]
    pub is_won: bool,
    /// Terminal and lost
    #[serde(default)]
    pub is_lost: bool,
}

/// One worker role
#[derive(Debug, Clone, Deserialize)]
pub struct RoleConfig {
    /// Stable code
    pub code: String,
    /// Display name
    pub name: String,
    /// Whether the role is offered
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// One urgency level
#[derive(Debug, Clone, Deserialize)]
pub struct UrgencyConfig {
    /// Stable code
    pub code: String,
    /// Display name
    pub name: String,
    /// Higher is more urgent
    pub priority_score: i32,
}

/// A plain code/name lookup row
#[derive(Debug, Clone, Deserialize)]
pub struct CodeNameConfig {
    /// Stable code
    pub code: String,
    /// Display name
    pub name: String,
}

impl MasterData {
    /// Parses and validates a reference data set from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let data: Self = toml::from_str(contents).map_err(|e| Error::Config {
            message: format!("Failed to parse master data: {e}"),
        })?;
        data.validate()?;
        Ok(data)
    }

    /// The data set shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_MASTER_DATA)
    }

    /// Checks the invariants the loader relies on: positive, unique stage
    /// sequence positions and consistent won/lost/final flags.
    pub fn validate(&self) -> Result<()> {
        let mut sequences: Vec<i32> = self
            .construction_stages
            .iter()
            .map(|stage| stage.sequence_order)
            .collect();
        if sequences.iter().any(|seq| *seq <= 0) {
            return Err(Error::Validation {
                field: "sequence_order",
                message: "stage sequence positions must be positive".to_string(),
            });
        }
        sequences.sort_unstable();
        if sequences.windows(2).any(|pair| pair[0] == pair[1]) {
            return Err(Error::Validation {
                field: "sequence_order",
                message: "stage sequence positions must be unique".to_string(),
            });
        }
        if let Some(stage) = self
            .construction_stages
            .iter()
            .find(|stage| !MARGIN_PRIORITY_RANGE.contains(&stage.default_margin_priority))
        {
            return Err(Error::Validation {
                field: "default_margin_priority",
                message: format!(
                    "stage {} has priority weight {}, expected {}..={}",
                    stage.code,
                    stage.default_margin_priority,
                    MARGIN_PRIORITY_RANGE.start(),
                    MARGIN_PRIORITY_RANGE.end()
                ),
            });
        }

        for status in &self.lead_statuses {
            let consistent = if status.is_final {
                !(status.is_won && status.is_lost)
            } else {
                !status.is_won && !status.is_lost
            };
            if !consistent {
                return Err(Error::Validation {
                    field: "lead_statuses",
                    message: format!(
                        "status {} must be final to be won or lost, and cannot be both",
                        status.code
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Loads the reference data set from a TOML file
///
/// # Errors
/// Returns an error if the file cannot be read, the TOML is invalid, or the
/// data breaks an ordering or flag invariant.
pub fn load_master_data_file<P: AsRef<Path>>(path: P) -> Result<MasterData> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!(
            "Failed to read master data file {}: {e}",
            path.as_ref().display()
        ),
    })?;
    MasterData::from_toml_str(&contents)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_builtin_data_set() {
        let data = MasterData::builtin().unwrap();
        assert_eq!(data.construction_stages.len(), 15);
        assert_eq!(data.lead_statuses.len(), 10);
        assert_eq!(data.worker_roles.len(), 15);
        assert_eq!(data.requirement_statuses.len(), 5);
        assert_eq!(data.urgency_levels.len(), 5);
        assert_eq!(data.credit_transaction_types.len(), 7);
        assert!(data.construction_stages.iter().all(|s| s.is_active));
        assert!(data.worker_roles.iter().all(|r| r.is_active));
    }

    #[test]
    fn test_duplicate_sequence_rejected() {
        let toml_str = r#"
            [[construction_stages]]
            code = "A"
            name = "A"
            sequence_order = 1
            default_margin_priority = 3

            [[construction_stages]]
            code = "B"
            name = "B"
            sequence_order = 1
            default_margin_priority = 5
        "#;

        let result = MasterData::from_toml_str(toml_str);
        assert!(matches!(
            result.unwrap_err(),
            Error::Validation {
                field: "sequence_order",
                ..
            }
        ));
    }

    #[test]
    fn test_stage_weight_outside_range_rejected() {
        for weight in [0, 11, 20] {
            let toml_str = format!(
                r#"
                [[construction_stages]]
                code = "A"
                name = "A"
                sequence_order = 1
                default_margin_priority = {weight}
                "#
            );
            assert!(matches!(
                MasterData::from_toml_str(&toml_str).unwrap_err(),
                Error::Validation {
                    field: "default_margin_priority",
                    ..
                }
            ));
        }

        let toml_str = r#"
            [[construction_stages]]
            code = "A"
            name = "A"
            sequence_order = 1
            default_margin_priority = 10
        "#;
        assert!(MasterData::from_toml_str(toml_str).is_ok());
    }

    #[test]
    fn test_won_and_lost_rejected() {
        let toml_str = r#"
            [[lead_statuses]]
            code = "ODD"
            name = "Odd"
            sequence_order = 1
            is_final = true
            is_won = true
            is_lost = true
        "#;

        assert!(MasterData::from_toml_str(toml_str).is_err());
    }

    #[test]
    fn test_won_without_final_rejected() {
        let toml_str = r#"
            [[lead_statuses]]
            code = "EARLY_WIN"
            name = "Early win"
            sequence_order = 1
            is_won = true
        "#;

        assert!(MasterData::from_toml_str(toml_str).is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = load_master_data_file("does/not/exist.toml");
        assert!(matches!(result.unwrap_err(), Error::Config { .. }));
    }
}
