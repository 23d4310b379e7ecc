//! Course model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::Lesson;

/// A course belongs to exactly one category; titles are unique per category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Course {
    /// Unique identifier
    pub id: i64,
    /// Owning category
    pub category_id: i64,
    /// Course title
    pub title: String,
    /// Free-text description
    pub description: String,
    /// Difficulty level
    pub level: CourseLevel,
    /// Duration in hours
    pub duration_hours: u32,
    /// Inactive courses are hidden from listings and cannot be joined
    pub is_active: bool,
    /// Account that created the course (cleared if that account is removed)
    pub created_by: Option<i64>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Course difficulty level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl CourseLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseLevel::Beginner => "beginner",
            CourseLevel::Intermediate => "intermediate",
            CourseLevel::Advanced => "advanced",
        }
    }

    /// Parse a submitted level; anything unrecognised is beginner
    pub fn parse_or_default(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl fmt::Display for CourseLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CourseLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beginner" => Ok(CourseLevel::Beginner),
            "intermediate" => Ok(CourseLevel::Intermediate),
            "advanced" => Ok(CourseLevel::Advanced),
            _ => Err(anyhow::anyhow!("Invalid course level: {}", s)),
        }
    }
}

/// Parse a submitted duration: only plain ASCII digits count, else 0
pub fn parse_duration_hours(raw: &str) -> u32 {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return 0;
    }
    raw.parse().unwrap_or(0)
}

/// Fields needed to insert a course
#[derive(Debug, Clone)]
pub struct NewCourse {
    pub category_id: i64,
    pub title: String,
    pub description: String,
    pub level: CourseLevel,
    pub duration_hours: u32,
    pub created_by: Option<i64>,
}

/// A course with its category name, for flat listings
#[derive(Debug, Clone, Serialize)]
pub struct CourseWithCategory {
    #[serde(flatten)]
    pub course: Course,
    pub category_name: String,
}

/// A course annotated with its activity counters
#[derive(Debug, Clone, Serialize)]
pub struct CourseStats {
    #[serde(flatten)]
    pub course: Course,
    pub enrollment_count: i64,
    pub attendance_count: i64,
    pub lesson_count: i64,
}

/// A catalog entry as a student sees it: counters plus public lessons
#[derive(Debug, Clone, Serialize)]
pub struct CatalogCourse {
    #[serde(flatten)]
    pub stats: CourseStats,
    pub lessons: Vec<Lesson>,
}

/// Totals shown on the faculty dashboard
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct CatalogCounts {
    pub category_count: i64,
    pub course_count: i64,
    pub lesson_count: i64,
    pub enrollment_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_level_parse_or_default() {
        assert_eq!(CourseLevel::parse_or_default("advanced"), CourseLevel::Advanced);
        assert_eq!(CourseLevel::parse_or_default("intermediate"), CourseLevel::Intermediate);
        assert_eq!(CourseLevel::parse_or_default("expert"), CourseLevel::Beginner);
        assert_eq!(CourseLevel::parse_or_default(""), CourseLevel::Beginner);
        // Submitted values are matched exactly
        assert_eq!(CourseLevel::parse_or_default("Advanced"), CourseLevel::Beginner);
    }

    #[test]
    fn test_parse_duration_hours() {
        assert_eq!(parse_duration_hours("12"), 12);
        assert_eq!(parse_duration_hours(" 40 "), 40);
        assert_eq!(parse_duration_hours(""), 0);
        assert_eq!(parse_duration_hours("-3"), 0);
        assert_eq!(parse_duration_hours("1.5"), 0);
        assert_eq!(parse_duration_hours("ten"), 0);
        assert_eq!(parse_duration_hours("99999999999999999999"), 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn property_digit_durations_parse(n in 0u32..100_000) {
            prop_assert_eq!(parse_duration_hours(&n.to_string()), n);
        }

        #[test]
        fn property_non_digit_durations_are_zero(s in "[0-9]{0,4}[a-zA-Z.,+-][0-9]{0,4}") {
            prop_assert_eq!(parse_duration_hours(&s), 0);
        }
    }
}
