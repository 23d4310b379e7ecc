//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository owns the SQL for one entity, for both SQLite and MySQL.

pub mod attendance;
pub mod category;
pub mod course;
pub mod enrollment;
pub mod lesson;
pub mod session;
pub mod site;
pub mod user;

pub use attendance::{AttendanceRepository, SqlxAttendanceRepository};
pub use category::{CategoryRepository, SqlxCategoryRepository};
pub use course::{CourseRepository, SqlxCourseRepository};
pub use enrollment::{EnrollmentRepository, SqlxEnrollmentRepository};
pub use lesson::{LessonRepository, SqlxLessonRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use site::{SiteRepository, SqlxSiteRepository};
pub use user::{SqlxUserRepository, UserRepository};
