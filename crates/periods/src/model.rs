use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Lifecycle status of an academic year or semester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodStatus {
    Upcoming,
    Active,
    Closed,
}

impl PeriodStatus {
    /// Serialized form, for building store queries.
    pub fn as_str(self) -> &'static str {
        match self {
            PeriodStatus::Upcoming => "upcoming",
            PeriodStatus::Active => "active",
            PeriodStatus::Closed => "closed",
        }
    }
}

/// An academic year, stored in `academic-years`.
///
/// Exactly one year SHOULD be active at a time; the resolver tolerates
/// violations deterministically rather than failing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcademicYear {
    /// Display label, e.g. "2024/2025".
    pub year: String,
    pub start_date: NaiveDate,
    pub status: PeriodStatus,
}

/// A semester within an academic year, stored in `semesters`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Semester {
    /// The owning year's label (matches `AcademicYear::year`).
    pub year: String,
    /// Display name, e.g. "First Semester".
    pub name: String,
    pub number: u8,
    pub status: PeriodStatus,
}
