//! Recognized configuration options for the model builder (spec §6).
//!
//! This crate never reads a config file; [`BuildConfig`] is a plain
//! `serde`-deserializable struct a caller populates from whatever source it
//! likes (YAML, JSON, environment, ...) before handing it to
//! [`crate::model::build_model`].

use serde::{Deserialize, Serialize};

/// Keys recognized for [`ObjectiveConfig::priority`].
pub const PRIORITY_KEYS: &[&str] = &[
    "unmet_window",
    "unmet_demand",
    "unmet_skill",
    "overstaff",
    "overtime",
    "fairness",
    "preferences",
    "external_use",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MidnightPolicy {
    Split,
    Extend,
}

impl Default for MidnightPolicy {
    fn default() -> Self {
        MidnightPolicy::Split
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemandMode {
    Headcount,
    PersonMinutes,
}

impl Default for DemandMode {
    fn default() -> Self {
        DemandMode::Headcount
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageSource {
    Windows,
    Shifts,
}

impl Default for CoverageSource {
    fn default() -> Self {
        CoverageSource::Windows
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillMode {
    BySegment,
    ByShift,
}

impl Default for SkillMode {
    fn default() -> Self {
        SkillMode::ByShift
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveMode {
    Weighted,
    Lex,
}

impl Default for ObjectiveMode {
    fn default() -> Self {
        ObjectiveMode::Weighted
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HoursConfig {
    pub min_weekly: f64,
    pub max_weekly: f64,
    pub max_daily: f64,
    /// Optional global cap on summed overtime minutes (spec §4.5 hard
    /// constraint 10); absent disables the constraint. Not present in the
    /// original loader's config surface, added here to express the
    /// documented-but-unwired constraint.
    pub overtime_cap_weekly: Option<f64>,
}

impl Default for HoursConfig {
    fn default() -> Self {
        Self {
            min_weekly: 0.0,
            max_weekly: 40.0,
            max_daily: 8.0,
            overtime_cap_weekly: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RestConfig {
    pub min_between_shifts: f64,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            min_between_shifts: 8.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SkillsConfig {
    pub enable_slack: bool,
    pub skill_mode: SkillMode,
}

impl Default for SkillsConfig {
    fn default() -> Self {
        Self {
            enable_slack: true,
            skill_mode: SkillMode::ByShift,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WindowsConfig {
    pub midnight_policy: MidnightPolicy,
    pub warn_slots_threshold: usize,
    pub hard_slots_threshold: usize,
    /// Opt-in signature-based adjacent-segment merge (spec §4.3); off by
    /// default since it changes variable count, not semantics.
    pub merge_signatures: bool,
}

impl Default for WindowsConfig {
    fn default() -> Self {
        Self {
            midnight_policy: MidnightPolicy::Split,
            warn_slots_threshold: 0,
            hard_slots_threshold: 0,
            merge_signatures: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShiftsConfig {
    pub demand_mode: DemandMode,
    pub coverage_source: CoverageSource,
}

impl Default for ShiftsConfig {
    fn default() -> Self {
        Self {
            demand_mode: DemandMode::Headcount,
            coverage_source: CoverageSource::Windows,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PenaltiesConfig {
    pub unmet_window: f64,
    pub unmet_demand: f64,
    pub unmet_skill: f64,
    pub overstaff: f64,
    pub overtime: f64,
    pub fairness: f64,
    pub preferences: f64,
    pub external_use: f64,
}

impl Default for PenaltiesConfig {
    fn default() -> Self {
        Self {
            unmet_window: 2.0,
            unmet_demand: 1.0,
            unmet_skill: 0.8,
            overstaff: 0.15,
            overtime: 0.30,
            fairness: 0.05,
            preferences: 0.33,
            external_use: 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectiveConfig {
    pub mode: ObjectiveMode,
    pub priority: Vec<String>,
}

impl Default for ObjectiveConfig {
    fn default() -> Self {
        Self {
            mode: ObjectiveMode::Weighted,
            priority: PRIORITY_KEYS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ObjectiveConfig {
    /// Validates that `priority` only names recognized keys with no
    /// duplicates, matching `ObjectiveConfig.validate_priority` in the
    /// original loader.
    pub fn validate(&self) -> Result<(), crate::error::BuildError> {
        let mut seen = std::collections::HashSet::new();
        for key in &self.priority {
            if !PRIORITY_KEYS.contains(&key.as_str()) {
                return Err(crate::error::BuildError::UnknownConfigValue {
                    path: "objective.priority".to_string(),
                    value: key.clone(),
                });
            }
            if !seen.insert(key.as_str()) {
                return Err(crate::error::BuildError::UnknownConfigValue {
                    path: "objective.priority".to_string(),
                    value: format!("duplicate key '{key}'"),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SolverOptionsConfig {
    pub time_limit_sec: Option<f64>,
    pub mip_gap: Option<f64>,
}

impl Default for SolverOptionsConfig {
    fn default() -> Self {
        Self {
            time_limit_sec: None,
            mip_gap: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RandomConfig {
    pub seed: Option<u64>,
}

impl Default for RandomConfig {
    fn default() -> Self {
        Self { seed: Some(123) }
    }
}

/// Ambient logging configuration, not touched by the builder itself — a
/// caller's own `tracing` subscriber setup reads this to pick a filter
/// level, the way the original loader's `logging.level` feeds its own
/// `logging.basicConfig` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
        }
    }
}

/// Ambient report-rendering configuration. Report rendering itself is an
/// external collaborator (spec §1); this struct only carries the knobs a
/// caller's report writer would read (enabled, output directory), mirroring
/// the original loader's `reports` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    pub enabled: bool,
    pub output_dir: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            output_dir: "reports".to_string(),
        }
    }
}

/// Every configuration path recognized by the builder (spec §6 table), plus
/// the ambient `logging`/`reports` sections the original loader also
/// carries alongside it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    #[serde(default)]
    pub hours: HoursConfig,
    #[serde(default)]
    pub rest: RestConfig,
    #[serde(default)]
    pub skills: SkillsConfig,
    #[serde(default)]
    pub windows: WindowsConfig,
    #[serde(default)]
    pub shifts: ShiftsConfig,
    #[serde(default)]
    pub penalties: PenaltiesConfig,
    #[serde(default)]
    pub objective: ObjectiveConfig,
    #[serde(default)]
    pub solver: SolverOptionsConfig,
    #[serde(default)]
    pub random: RandomConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub reports: ReportConfig,
}

impl BuildConfig {
    pub fn validate(&self) -> Result<(), crate::error::BuildError> {
        self.objective.validate()
    }
}
