//! Course category model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named group of courses. Names are unique regardless of case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CourseCategory {
    /// Unique identifier
    pub id: i64,
    /// Category name
    pub name: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// A category together with some of its courses, for grouped listings
#[derive(Debug, Clone, Serialize)]
pub struct CategoryGroup<T> {
    #[serde(flatten)]
    pub category: CourseCategory,
    pub courses: Vec<T>,
}

/// Normalise a free-text category name: surrounding whitespace is dropped.
///
/// Returns `None` when nothing is left.
pub fn normalize_category_name(raw: &str) -> Option<String> {
    let name = raw.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
