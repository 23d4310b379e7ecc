//! Enrollment and attendance ledger
//!
//! Both student actions are idempotent. Enrolling (or entering) a course
//! creates the enrollment once, then marks attendance for today; the first
//! mark of the day keeps its source.

use crate::db::repositories::{AttendanceRepository, CourseRepository, EnrollmentRepository};
use crate::models::{
    AttendanceListing, AttendanceRecord, AttendanceSource, AttendanceSummaryRow,
    CourseWithCategory, EnrollmentListing, LedgerFilter,
};
use anyhow::Context;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::Arc;

/// Source of "today" for attendance marks
pub type DateSource = fn() -> NaiveDate;

/// Rows shown on the administrative ledger listings
pub const LEDGER_LISTING_LIMIT: i64 = 200;

/// Server-local calendar date
pub fn local_today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Error types for ledger operations
#[derive(Debug, thiserror::Error)]
pub enum LedgerServiceError {
    /// Course missing or inactive
    #[error("Course not found: {0}")]
    CourseNotFound(i64),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// What a student action did, plus the notice to show afterwards
#[derive(Debug, Clone)]
pub struct LedgerOutcome {
    pub course: CourseWithCategory,
    pub date: NaiveDate,
    pub enrolled: bool,
    pub attendance_marked: bool,
    pub notice: String,
}

/// Ledger service
pub struct LedgerService {
    courses: Arc<dyn CourseRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
    attendance: Arc<dyn AttendanceRepository>,
    today: DateSource,
}

impl LedgerService {
    /// Create a ledger service dated by the server's local clock
    pub fn new(
        courses: Arc<dyn CourseRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
        attendance: Arc<dyn AttendanceRepository>,
    ) -> Self {
        Self::with_date_source(courses, enrollments, attendance, local_today)
    }

    /// Create a ledger service with a custom date source
    pub fn with_date_source(
        courses: Arc<dyn CourseRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
        attendance: Arc<dyn AttendanceRepository>,
        today: DateSource,
    ) -> Self {
        Self {
            courses,
            enrollments,
            attendance,
            today,
        }
    }

    /// Enroll a student in an active course and mark today's attendance
    pub async fn enroll(
        &self,
        student_id: i64,
        course_id: i64,
    ) -> Result<LedgerOutcome, LedgerServiceError> {
        let mut outcome = self
            .record(student_id, course_id, AttendanceSource::Enroll)
            .await?;
        outcome.notice = format!(
            "Enrolled in \"{}\" under \"{}\".",
            outcome.course.course.title, outcome.course.category_name
        );
        Ok(outcome)
    }

    /// Enter an active course: enroll if needed, then mark today's attendance
    pub async fn enter(
        &self,
        student_id: i64,
        course_id: i64,
    ) -> Result<LedgerOutcome, LedgerServiceError> {
        let mut outcome = self
            .record(student_id, course_id, AttendanceSource::Enter)
            .await?;
        outcome.notice = format!(
            "Attendance marked for \"{}\" on {}.",
            outcome.course.course.title,
            outcome.date.format("%Y-%m-%d")
        );
        Ok(outcome)
    }

    /// Mark today's attendance. Returns false if the day was already marked.
    pub async fn mark_attendance(
        &self,
        student_id: i64,
        course_id: i64,
        source: AttendanceSource,
    ) -> Result<bool, LedgerServiceError> {
        self.mark_attendance_on(student_id, course_id, (self.today)(), source)
            .await
    }

    async fn mark_attendance_on(
        &self,
        student_id: i64,
        course_id: i64,
        date: NaiveDate,
        source: AttendanceSource,
    ) -> Result<bool, LedgerServiceError> {
        let marked = self
            .attendance
            .create_if_absent(student_id, course_id, date, source)
            .await
            .context("Failed to mark attendance")?;
        if !marked {
            tracing::debug!(
                "Attendance already marked for student {} in course {}",
                student_id,
                course_id
            );
        }
        Ok(marked)
    }

    /// Ids of the courses a student is enrolled in
    pub async fn enrolled_course_ids(
        &self,
        student_id: i64,
    ) -> Result<HashSet<i64>, LedgerServiceError> {
        let ids = self
            .enrollments
            .list_course_ids(student_id)
            .await
            .context("Failed to list enrolled courses")?;
        Ok(ids.into_iter().collect())
    }

    /// Per enrolled course: days present and last attendance, newest
    /// enrollment first
    pub async fn attendance_summary(
        &self,
        student_id: i64,
    ) -> Result<Vec<AttendanceSummaryRow>, LedgerServiceError> {
        let rows = self
            .attendance
            .summary_for_student(student_id)
            .await
            .context("Failed to summarise attendance")?;
        Ok(rows)
    }

    /// Individual attendance marks, most recent day first
    pub async fn attendance_history(
        &self,
        student_id: i64,
    ) -> Result<Vec<AttendanceRecord>, LedgerServiceError> {
        let records = self
            .attendance
            .list_for_student(student_id)
            .await
            .context("Failed to list attendance")?;
        Ok(records)
    }

    /// Enrollments for the admin listing, newest first
    pub async fn list_enrollments(
        &self,
        filter: &LedgerFilter,
    ) -> Result<Vec<EnrollmentListing>, LedgerServiceError> {
        let rows = self
            .enrollments
            .list_filtered(filter, LEDGER_LISTING_LIMIT)
            .await
            .context("Failed to list enrollments")?;
        Ok(rows)
    }

    /// Attendance marks for the admin listing, most recent day first
    pub async fn list_attendance(
        &self,
        filter: &LedgerFilter,
    ) -> Result<Vec<AttendanceListing>, LedgerServiceError> {
        let rows = self
            .attendance
            .list_filtered(filter, LEDGER_LISTING_LIMIT)
            .await
            .context("Failed to list attendance")?;
        Ok(rows)
    }

    async fn record(
        &self,
        student_id: i64,
        course_id: i64,
        source: AttendanceSource,
    ) -> Result<LedgerOutcome, LedgerServiceError> {
        let course = self
            .courses
            .get_active_with_category(course_id)
            .await
            .context("Failed to get course")?
            .ok_or(LedgerServiceError::CourseNotFound(course_id))?;

        let enrolled = self
            .enrollments
            .create_if_absent(student_id, course_id)
            .await
            .context("Failed to create enrollment")?;
        if enrolled {
            tracing::info!("Student {} enrolled in course {}", student_id, course_id);
        }

        let date = (self.today)();
        let attendance_marked = self
            .mark_attendance_on(student_id, course_id, date, source)
            .await?;

        Ok(LedgerOutcome {
            course,
            date,
            enrolled,
            attendance_marked,
            notice: String::new(),
        })
    }
}
