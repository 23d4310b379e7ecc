//! Enrollment and attendance models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A student's membership in a course. Created once, never updated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Enrollment {
    pub id: i64,
    pub student_id: i64,
    pub course_id: i64,
    /// Time of the first enrollment
    pub enrolled_at: DateTime<Utc>,
}

/// One day of presence for a student in a course.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttendanceRecord {
    pub id: i64,
    pub student_id: i64,
    pub course_id: i64,
    /// Calendar day the attendance counts for
    pub attendance_date: NaiveDate,
    /// Action that produced the record (first write of the day)
    pub source: AttendanceSource,
    pub marked_at: DateTime<Utc>,
}

/// The student action that marked attendance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceSource {
    Enroll,
    #[default]
    Enter,
}

impl AttendanceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceSource::Enroll => "enroll",
            AttendanceSource::Enter => "enter",
        }
    }
}

impl fmt::Display for AttendanceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enroll" => Ok(AttendanceSource::Enroll),
            "enter" => Ok(AttendanceSource::Enter),
            _ => Err(anyhow::anyhow!("Invalid attendance source: {}", s)),
        }
    }
}

/// Per-course attendance totals for one student
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AttendanceSummaryRow {
    pub course_id: i64,
    pub category: String,
    pub course: String,
    pub present_days: i64,
    pub last_attended: Option<NaiveDate>,
}

/// Search text as a `LIKE` pattern; blank text matches everything
pub fn like_pattern(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", s))
}

/// Filters for the enrollment and attendance listings; `None` matches any.
/// `source` and `date` only apply to attendance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerFilter {
    pub category_id: Option<i64>,
    /// Matched against the student's username and the course title
    pub search: Option<String>,
    pub source: Option<AttendanceSource>,
    pub date: Option<NaiveDate>,
}

impl LedgerFilter {
    pub fn search_pattern(&self) -> Option<String> {
        like_pattern(self.search.as_deref())
    }
}

/// An enrollment with the names an administrator reads
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EnrollmentListing {
    pub id: i64,
    pub student_username: String,
    pub course_title: String,
    pub category_name: String,
    pub enrolled_at: DateTime<Utc>,
}

/// An attendance mark with the names an administrator reads
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AttendanceListing {
    pub id: i64,
    pub student_username: String,
    pub course_title: String,
    pub category_name: String,
    pub attendance_date: NaiveDate,
    pub source: AttendanceSource,
    pub marked_at: DateTime<Utc>,
}
