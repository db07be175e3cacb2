//! Error and warning types for the build/solve pipeline.

use thiserror::Error;

/// Fatal errors raised while building the model. Any `BuildError` means the
/// model was not built and no partial state is exposed.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("shift {shift_id}: end cannot equal start unless it is midnight")]
    DegenerateShiftInterval { shift_id: String },

    #[error("shift {shift_id}: duration {duration_minutes} out of range [1, 1440]")]
    ShiftDurationOutOfRange {
        shift_id: String,
        duration_minutes: i64,
    },

    #[error("duplicate shift id: {shift_id}")]
    DuplicateShiftId { shift_id: String },

    #[error("window {window_id}: end ({end_min}) must be greater than start ({start_min})")]
    InvalidWindowInterval {
        window_id: String,
        start_min: u16,
        end_min: u16,
    },

    #[error(
        "window {window_id} cannot be expressed as a union of segments on (day {day}, role {role}); gap of {gap_minutes} minutes"
    )]
    WindowNotAligned {
        window_id: String,
        day: chrono::NaiveDate,
        role: String,
        gap_minutes: i64,
    },

    #[error(
        "(day {day}, role {role}) has {count} segments, exceeding the hard threshold of {threshold}"
    )]
    SegmentThresholdExceeded {
        day: chrono::NaiveDate,
        role: String,
        count: usize,
        threshold: usize,
    },

    #[error("invalid time expression '{value}': expected HH:MM")]
    InvalidTimeExpression { value: String },

    #[error("minutes {minutes} out of range [0, 1440]")]
    MinutesOutOfRange { minutes: i64 },

    #[error("unknown configuration value '{value}' for {path}")]
    UnknownConfigValue { path: String, value: String },

    #[error("employee {employee_id}: max_overtime_hours must be >= 0")]
    NegativeMaxOvertime { employee_id: String },

    #[error("employee {employee_id}: max_week_hours must be >= min_week_hours")]
    HoursOutOfOrder { employee_id: String },
}

/// Non-fatal conditions encountered during build; processing continues.
///
/// Two semantic-inconsistency warnings spec §7 names — a shift's
/// skill-requirement sum exceeding its `required_staff`, and window-level
/// skill demand coexisting with shift-level skill requirements — are
/// discovered inside [`crate::model::build_model`]/[`crate::demand`] after
/// this collected-warnings phase has already run for everything else, and
/// are logged directly via `tracing::warn!` instead of a variant here (see
/// `DESIGN.md`'s open-decisions list).
#[derive(Debug, Clone, PartialEq)]
pub enum BuildWarning {
    /// `contracted_hours` set but `min_week_hours != max_week_hours`; the
    /// builder folds both to `contracted_hours`.
    ContractedHoursMismatch { employee_id: String },
    /// A time-off interval zeroed one or more eligibility entries.
    TimeOffOverlap {
        employee_id: String,
        shift_id: String,
    },
    /// Per-`(day, role)` segment count passed the soft threshold.
    SegmentThresholdWarning {
        day: chrono::NaiveDate,
        role: String,
        count: usize,
        threshold: usize,
    },
    /// An availability row references a pair that is not qualified; kept for
    /// diagnostics with `can_assign = false`.
    UnqualifiedAvailabilityRow {
        employee_id: String,
        shift_id: String,
    },
}

/// Errors from the solver adapter itself (not the model build).
#[derive(Debug, Error)]
pub enum SolveError {
    #[error("solver backend rejected variable bounds [{lb}, {ub}]")]
    InvalidBounds { lb: i64, ub: i64 },
    #[error("solver backend error: {0}")]
    Backend(String),
}
