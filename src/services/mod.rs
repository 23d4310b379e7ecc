//! Services layer - Business logic
//!
//! Services sit between the web handlers and the repositories:
//! - validating form input and producing the messages shown to users
//! - enforcing the access rules and idempotency of student actions
//! - storing uploaded files under the media root

pub mod branding;
pub mod catalog;
pub mod guard;
pub mod ledger;
pub mod lesson;
pub mod media;
pub mod password;
pub mod session;
pub mod user;

pub use branding::{BrandingService, BrandingServiceError, SiteAssets};
pub use catalog::{CatalogService, CatalogServiceError, CreateCourseInput, CreatedCourse};
pub use guard::GuardOutcome;
pub use ledger::{LedgerOutcome, LedgerService, LedgerServiceError};
pub use lesson::{LessonService, LessonServiceError, LessonUploadInput, UploadedLesson};
pub use media::{MediaError, MediaStore, UploadedFile};
pub use password::{hash_password, verify_password};
pub use session::{SessionService, SessionServiceError, SELECTED_ROLE_KEY, STUDENT_NOTICE_KEY};
pub use user::{UserService, UserServiceError};
