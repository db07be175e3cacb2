//! Input data model (spec §3): employees, shifts, windows, and the other
//! immutable rows the builder consumes. Owned by the caller; the builder
//! reads these by reference and never mutates them.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::BuildError;

/// An employee who can be assigned to shifts.
///
/// `contracted_hours` present makes this a *contracted* employee
/// (`min_week_hours == max_week_hours == contracted_hours` is enforced by
/// [`Employee::validate`]); absent, it is an *external* employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: String,
    pub name: String,
    pub roles: HashSet<String>,
    pub skills: HashSet<String>,
    pub max_week_hours: f64,
    pub min_week_hours: f64,
    pub max_daily_hours: f64,
    pub min_rest_hours: Option<f64>,
    pub max_overtime_hours: f64,
    pub contracted_hours: Option<f64>,
}

impl Employee {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            roles: HashSet::new(),
            skills: HashSet::new(),
            max_week_hours: 40.0,
            min_week_hours: 0.0,
            max_daily_hours: 8.0,
            min_rest_hours: None,
            max_overtime_hours: 0.0,
            contracted_hours: None,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        for role in roles {
            self.roles.insert(role.into());
        }
        self
    }

    pub fn with_skill(mut self, skill: impl Into<String>) -> Self {
        self.skills.insert(skill.into());
        self
    }

    pub fn with_contracted_hours(mut self, hours: f64) -> Self {
        self.contracted_hours = Some(hours);
        self
    }

    pub fn is_contracted(&self) -> bool {
        self.contracted_hours.is_some()
    }

    /// `contracted ⇒ min = max = contracted`; max >= min; max_overtime >= 0.
    /// Folds a `contracted_hours`/`min_week_hours`/`max_week_hours`
    /// mismatch into the contracted value, returning a warning rather than
    /// an error (spec §7: "semantic inconsistency ... processing continues").
    pub fn validate(&mut self) -> Result<Option<crate::error::BuildWarning>, BuildError> {
        if self.max_overtime_hours < 0.0 {
            return Err(BuildError::NegativeMaxOvertime {
                employee_id: self.id.clone(),
            });
        }
        let mut warning = None;
        if let Some(contracted) = self.contracted_hours {
            if (self.min_week_hours - contracted).abs() > f64::EPSILON
                || (self.max_week_hours - contracted).abs() > f64::EPSILON
            {
                warning = Some(crate::error::BuildWarning::ContractedHoursMismatch {
                    employee_id: self.id.clone(),
                });
                self.min_week_hours = contracted;
                self.max_week_hours = contracted;
            }
        }
        if self.max_week_hours < self.min_week_hours {
            return Err(BuildError::HoursOutOfOrder {
                employee_id: self.id.clone(),
            });
        }
        Ok(warning)
    }
}

/// A shift that needs to be staffed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shift {
    pub id: String,
    pub day: NaiveDate,
    pub start_min: u16,
    pub end_min: u16,
    pub role: String,
    pub required_staff: u32,
    #[serde(default)]
    pub skill_requirements: BTreeMap<String, u32>,
}

impl Shift {
    pub fn new(
        id: impl Into<String>,
        day: NaiveDate,
        start_min: u16,
        end_min: u16,
        role: impl Into<String>,
        required_staff: u32,
    ) -> Self {
        Self {
            id: id.into(),
            day,
            start_min,
            end_min,
            role: role.into(),
            required_staff,
            skill_requirements: BTreeMap::new(),
        }
    }

    pub fn with_skill_requirement(mut self, skill: impl Into<String>, qty: u32) -> Self {
        self.skill_requirements.insert(skill.into(), qty);
        self
    }

    /// `end <= start` (with the midnight exception in [`crate::normalize`]) means
    /// the shift crosses midnight.
    pub fn crosses_midnight(&self) -> bool {
        self.end_min <= self.start_min
    }

    /// Night iff crosses midnight, or starts at hour >= 22, or starts at hour < 6.
    pub fn is_night(&self) -> bool {
        let start_hour = self.start_min / 60;
        self.crosses_midnight() || start_hour >= 22 || start_hour < 6
    }
}

/// A declared demand interval, independent of any particular shift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub id: String,
    pub day: NaiveDate,
    pub start_min: u16,
    pub end_min: u16,
    pub role: String,
    pub demand: u32,
    #[serde(default)]
    pub skill_requirements: BTreeMap<String, u32>,
}

impl Window {
    pub fn new(
        id: impl Into<String>,
        day: NaiveDate,
        start_min: u16,
        end_min: u16,
        role: impl Into<String>,
        demand: u32,
    ) -> Self {
        Self {
            id: id.into(),
            day,
            start_min,
            end_min,
            role: role.into(),
            demand,
            skill_requirements: BTreeMap::new(),
        }
    }

    pub fn validate(&self) -> Result<(), BuildError> {
        if self.end_min <= self.start_min {
            return Err(BuildError::InvalidWindowInterval {
                window_id: self.id.clone(),
                start_min: self.start_min,
                end_min: self.end_min,
            });
        }
        Ok(())
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end_min - self.start_min) as i64
    }
}

/// An availability override for a specific `(employee, shift)` pair.
/// Absent pairs default to available (spec §6's `availability` CSV contract).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRow {
    pub employee_id: String,
    pub shift_id: String,
    pub is_available: bool,
}

/// A declared time-off interval. Absent `start_min`/`end_min` means the
/// whole day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeOffEntry {
    pub employee_id: String,
    pub day: NaiveDate,
    pub start_min: Option<u16>,
    pub end_min: Option<u16>,
    pub reason: Option<String>,
}

impl TimeOffEntry {
    /// Effective `[start_min, end_min)` within `day`, defaulting to the
    /// whole day when absent.
    pub fn effective_interval(&self) -> (u16, u16) {
        (self.start_min.unwrap_or(0), self.end_min.unwrap_or(1440))
    }
}

/// A soft preference for an `(employee, shift)` pair, score in `[-2, 2]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preference {
    pub employee_id: String,
    pub shift_id: String,
    pub score: f64,
}

/// Per-role overtime cost multiplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OvertimeCost {
    pub role: String,
    pub overtime_cost_per_hour: f64,
}
