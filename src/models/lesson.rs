//! Lesson model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Learning material attached to a course.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Lesson {
    /// Unique identifier
    pub id: i64,
    /// Owning course
    pub course_id: i64,
    /// Lesson title
    pub title: String,
    /// Free-text description
    pub description: String,
    /// Uploaded file, relative to the media root
    pub file_path: Option<String>,
    /// Who may see the lesson
    pub visibility: LessonVisibility,
    /// Account that uploaded the lesson
    pub created_by: Option<i64>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Lesson visibility; only public lessons appear in the student catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LessonVisibility {
    #[default]
    Public,
    Private,
    Draft,
}

impl LessonVisibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            LessonVisibility::Public => "public",
            LessonVisibility::Private => "private",
            LessonVisibility::Draft => "draft",
        }
    }

    /// Parse a submitted visibility; anything unrecognised is public
    pub fn parse_or_default(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl fmt::Display for LessonVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LessonVisibility {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(LessonVisibility::Public),
            "private" => Ok(LessonVisibility::Private),
            "draft" => Ok(LessonVisibility::Draft),
            _ => Err(anyhow::anyhow!("Invalid lesson visibility: {}", s)),
        }
    }
}

/// Fields needed to insert a lesson
#[derive(Debug, Clone)]
pub struct NewLesson {
    pub course_id: i64,
    pub title: String,
    pub description: String,
    pub file_path: Option<String>,
    pub visibility: LessonVisibility,
    pub created_by: Option<i64>,
}

/// A lesson with the names of its course and category
#[derive(Debug, Clone, Serialize)]
pub struct LessonWithCourse {
    #[serde(flatten)]
    pub lesson: Lesson,
    pub course_title: String,
    pub category_name: String,
}

/// Filters for the administrative lesson listing; `None` matches any
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LessonFilter {
    pub category_id: Option<i64>,
    pub visibility: Option<LessonVisibility>,
    /// Matched against lesson title, description and course title
    pub search: Option<String>,
}

impl LessonFilter {
    pub fn search_pattern(&self) -> Option<String> {
        super::ledger::like_pattern(self.search.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_parse_or_default() {
        assert_eq!(LessonVisibility::parse_or_default("draft"), LessonVisibility::Draft);
        assert_eq!(LessonVisibility::parse_or_default("private"), LessonVisibility::Private);
        assert_eq!(LessonVisibility::parse_or_default("hidden"), LessonVisibility::Public);
    }

    #[test]
    fn test_visibility_display() {
        assert_eq!(LessonVisibility::Public.to_string(), "public");
        assert_eq!(LessonVisibility::Draft.to_string(), "draft");
    }
}
