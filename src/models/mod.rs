//! Data models
//!
//! Plain data structures shared by the repositories, services and views:
//! - Accounts and sessions (User, Role, Session)
//! - Catalog (CourseCategory, Course, Lesson)
//! - Ledger (Enrollment, AttendanceRecord)
//! - Site assets (SiteBranding, WebsiteImage)

mod category;
mod course;
mod ledger;
mod lesson;
mod session;
mod site;
mod user;

pub use category::{normalize_category_name, CategoryGroup, CourseCategory};
pub use course::{
    parse_duration_hours, CatalogCounts, CatalogCourse, Course, CourseLevel, CourseStats,
    CourseWithCategory, NewCourse,
};
pub use ledger::{
    AttendanceListing, AttendanceRecord, AttendanceSource, AttendanceSummaryRow, Enrollment,
    EnrollmentListing, LedgerFilter,
};
pub use lesson::{Lesson, LessonFilter, LessonVisibility, LessonWithCourse, NewLesson};
pub use session::{generate_session_id, Session};
pub use site::{PageSlot, SiteBranding, WebsiteImage, DEFAULT_SITE_NAME};
pub use user::{NewUser, Role, User};
