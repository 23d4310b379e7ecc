//! Attendance repository
//!
//! Database operations for daily attendance records and per-student summaries.
//!
//! This module provides:
//! - `AttendanceRepository` trait defining the interface for attendance data access
//! - `SqlxAttendanceRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{
    AttendanceListing, AttendanceRecord, AttendanceSource, AttendanceSummaryRow, LedgerFilter,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Attendance repository trait
#[async_trait]
pub trait AttendanceRepository: Send + Sync {
    /// Record attendance for a day unless the day is already recorded.
    /// An existing row keeps its original source. Returns true if inserted.
    async fn create_if_absent(
        &self,
        student_id: i64,
        course_id: i64,
        date: NaiveDate,
        source: AttendanceSource,
    ) -> Result<bool>;

    /// Attendance rows of a student, by date desc then marked_at desc
    async fn list_for_student(&self, student_id: i64) -> Result<Vec<AttendanceRecord>>;

    /// One row per enrolled course (newest enrollment first) with the count
    /// of attended days and the latest attended day
    async fn summary_for_student(&self, student_id: i64) -> Result<Vec<AttendanceSummaryRow>>;

    /// Attendance across all students for the admin listing, newest day first
    async fn list_filtered(&self, filter: &LedgerFilter, limit: i64)
        -> Result<Vec<AttendanceListing>>;
}

/// SQLx-based attendance repository implementation
pub struct SqlxAttendanceRepository {
    pool: DynDatabasePool,
}

impl SqlxAttendanceRepository {
    /// Create a new SQLx attendance repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn AttendanceRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl AttendanceRepository for SqlxAttendanceRepository {
    async fn create_if_absent(
        &self,
        student_id: i64,
        course_id: i64,
        date: NaiveDate,
        source: AttendanceSource,
    ) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_attendance_sqlite(
                    self.pool.as_sqlite().unwrap(),
                    student_id,
                    course_id,
                    date,
                    source,
                )
                .await
            }
            DatabaseDriver::Mysql => {
                create_attendance_mysql(
                    self.pool.as_mysql().unwrap(),
                    student_id,
                    course_id,
                    date,
                    source,
                )
                .await
            }
        }
    }

    async fn list_for_student(&self, student_id: i64) -> Result<Vec<AttendanceRecord>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_attendance_sqlite(self.pool.as_sqlite().unwrap(), student_id).await
            }
            DatabaseDriver::Mysql => {
                list_attendance_mysql(self.pool.as_mysql().unwrap(), student_id).await
            }
        }
    }

    async fn summary_for_student(&self, student_id: i64) -> Result<Vec<AttendanceSummaryRow>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                summary_sqlite(self.pool.as_sqlite().unwrap(), student_id).await
            }
            DatabaseDriver::Mysql => summary_mysql(self.pool.as_mysql().unwrap(), student_id).await,
        }
    }

    async fn list_filtered(
        &self,
        filter: &LedgerFilter,
        limit: i64,
    ) -> Result<Vec<AttendanceListing>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_filtered_sqlite(self.pool.as_sqlite().unwrap(), filter, limit).await
            }
            DatabaseDriver::Mysql => {
                list_filtered_mysql(self.pool.as_mysql().unwrap(), filter, limit).await
            }
        }
    }
}

const LIST_SQL: &str = "SELECT id, student_id, course_id, attendance_date, source, marked_at \
     FROM attendance_records WHERE student_id = ? \
     ORDER BY attendance_date DESC, marked_at DESC, id DESC";

const SUMMARY_SQL: &str = "SELECT e.course_id, cat.name AS category, c.title AS course, \
       COUNT(a.id) AS present_days, MAX(a.attendance_date) AS last_attended \
     FROM course_enrollments e \
     JOIN courses c ON c.id = e.course_id \
     JOIN course_categories cat ON cat.id = c.category_id \
     LEFT JOIN attendance_records a ON a.student_id = e.student_id AND a.course_id = e.course_id \
     WHERE e.student_id = ? \
     GROUP BY e.id, e.course_id, cat.name, c.title, e.enrolled_at \
     ORDER BY e.enrolled_at DESC, e.id DESC";

const FILTERED_SQL: &str = "SELECT a.id, u.username, c.title, cat.name AS category, \
       a.attendance_date, a.source, a.marked_at \
     FROM attendance_records a \
     JOIN users u ON u.id = a.student_id \
     JOIN courses c ON c.id = a.course_id \
     JOIN course_categories cat ON cat.id = c.category_id \
     WHERE (? IS NULL OR cat.id = ?) \
       AND (? IS NULL OR a.source = ?) \
       AND (? IS NULL OR a.attendance_date = ?) \
       AND (? IS NULL OR u.username LIKE ? OR c.title LIKE ?) \
     ORDER BY a.attendance_date DESC, a.marked_at DESC, a.id DESC \
     LIMIT ?";

fn parse_source(raw: &str) -> AttendanceSource {
    raw.parse().unwrap_or_default()
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_attendance_sqlite(
    pool: &SqlitePool,
    student_id: i64,
    course_id: i64,
    date: NaiveDate,
    source: AttendanceSource,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO attendance_records (student_id, course_id, attendance_date, source, marked_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(student_id)
    .bind(course_id)
    .bind(date)
    .bind(source.as_str())
    .bind(Utc::now())
    .execute(pool)
    .await
    .context("Failed to mark attendance")?;

    Ok(result.rows_affected() > 0)
}

async fn list_attendance_sqlite(pool: &SqlitePool, student_id: i64) -> Result<Vec<AttendanceRecord>> {
    let rows = sqlx::query(LIST_SQL)
        .bind(student_id)
        .fetch_all(pool)
        .await
        .context("Failed to list attendance")?;

    Ok(rows
        .iter()
        .map(|row| {
            let source: String = row.get("source");
            AttendanceRecord {
                id: row.get("id"),
                student_id: row.get("student_id"),
                course_id: row.get("course_id"),
                attendance_date: row.get("attendance_date"),
                source: parse_source(&source),
                marked_at: row.get("marked_at"),
            }
        })
        .collect())
}

async fn summary_sqlite(pool: &SqlitePool, student_id: i64) -> Result<Vec<AttendanceSummaryRow>> {
    let rows = sqlx::query(SUMMARY_SQL)
        .bind(student_id)
        .fetch_all(pool)
        .await
        .context("Failed to summarise attendance")?;

    rows.iter()
        .map(|row| {
            // MAX() over a DATE column comes back as plain text in SQLite
            let last: Option<String> = row.get("last_attended");
            let last_attended = last
                .map(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d"))
                .transpose()
                .context("Invalid attendance date")?;
            Ok(AttendanceSummaryRow {
                course_id: row.get("course_id"),
                category: row.get("category"),
                course: row.get("course"),
                present_days: row.get("present_days"),
                last_attended,
            })
        })
        .collect()
}

async fn list_filtered_sqlite(
    pool: &SqlitePool,
    filter: &LedgerFilter,
    limit: i64,
) -> Result<Vec<AttendanceListing>> {
    let source = filter.source.map(|s| s.as_str());
    let pattern = filter.search_pattern();
    let rows = sqlx::query(FILTERED_SQL)
        .bind(filter.category_id)
        .bind(filter.category_id)
        .bind(source)
        .bind(source)
        .bind(filter.date)
        .bind(filter.date)
        .bind(pattern.as_deref())
        .bind(pattern.as_deref())
        .bind(pattern.as_deref())
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to list attendance")?;

    Ok(rows
        .iter()
        .map(|row| {
            let source: String = row.get("source");
            AttendanceListing {
                id: row.get("id"),
                student_username: row.get("username"),
                course_title: row.get("title"),
                category_name: row.get("category"),
                attendance_date: row.get("attendance_date"),
                source: parse_source(&source),
                marked_at: row.get("marked_at"),
            }
        })
        .collect())
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_attendance_mysql(
    pool: &MySqlPool,
    student_id: i64,
    course_id: i64,
    date: NaiveDate,
    source: AttendanceSource,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT IGNORE INTO attendance_records (student_id, course_id, attendance_date, source, marked_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(student_id)
    .bind(course_id)
    .bind(date)
    .bind(source.as_str())
    .bind(Utc::now())
    .execute(pool)
    .await
    .context("Failed to mark attendance")?;

    Ok(result.rows_affected() > 0)
}

async fn list_attendance_mysql(pool: &MySqlPool, student_id: i64) -> Result<Vec<AttendanceRecord>> {
    let rows = sqlx::query(LIST_SQL)
        .bind(student_id)
        .fetch_all(pool)
        .await
        .context("Failed to list attendance")?;

    Ok(rows
        .iter()
        .map(|row| {
            let source: String = row.get("source");
            AttendanceRecord {
                id: row.get("id"),
                student_id: row.get("student_id"),
                course_id: row.get("course_id"),
                attendance_date: row.get("attendance_date"),
                source: parse_source(&source),
                marked_at: row.get("marked_at"),
            }
        })
        .collect())
}

async fn summary_mysql(pool: &MySqlPool, student_id: i64) -> Result<Vec<AttendanceSummaryRow>> {
    let rows = sqlx::query(SUMMARY_SQL)
        .bind(student_id)
        .fetch_all(pool)
        .await
        .context("Failed to summarise attendance")?;

    Ok(rows
        .iter()
        .map(|row| AttendanceSummaryRow {
            course_id: row.get("course_id"),
            category: row.get("category"),
            course: row.get("course"),
            present_days: row.get("present_days"),
            last_attended: row.get("last_attended"),
        })
        .collect())
}

async fn list_filtered_mysql(
    pool: &MySqlPool,
    filter: &LedgerFilter,
    limit: i64,
) -> Result<Vec<AttendanceListing>> {
    let source = filter.source.map(|s| s.as_str());
    let pattern = filter.search_pattern();
    let rows = sqlx::query(FILTERED_SQL)
        .bind(filter.category_id)
        .bind(filter.category_id)
        .bind(source)
        .bind(source)
        .bind(filter.date)
        .bind(filter.date)
        .bind(pattern.as_deref())
        .bind(pattern.as_deref())
        .bind(pattern.as_deref())
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to list attendance")?;

    Ok(rows
        .iter()
        .map(|row| {
            let source: String = row.get("source");
            AttendanceListing {
                id: row.get("id"),
                student_username: row.get("username"),
                course_title: row.get("title"),
                category_name: row.get("category"),
                attendance_date: row.get("attendance_date"),
                source: parse_source(&source),
                marked_at: row.get("marked_at"),
            }
        })
        .collect())
}
