//! Classroom domain services.
//!
//! Every service consults [`guard::AccessGuard`] before any side effect.
//! Two policies apply, fixed per operation:
//!
//! - reads scoped by enrollment (listing assignments, submissions,
//!   announcements, comments, members) return an empty result to callers
//!   who are not enrolled;
//! - operations on an existing resource fail with
//!   [`ClassroomError::Unauthorized`] (or [`ClassroomError::NotFound`] when the
//!   id does not resolve).

pub mod announcements;
pub mod courses;
pub mod coursework;
pub mod enrollment;
pub mod guard;
pub mod invitations;

use std::sync::Arc;

use thiserror::Error;

use crate::mail::{MailError, Mailer};
use crate::notifications::NotificationService;
use crate::store::{Store, StoreError};

pub use announcements::AnnouncementService;
pub use courses::CourseService;
pub use coursework::CourseworkService;
pub use enrollment::EnrollmentService;
pub use guard::{AccessGuard, Actor};
pub use invitations::{InvitationReport, InvitationService};

#[derive(Debug, Error)]
pub enum ClassroomError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidOperation(String),

    #[error("{0}")]
    Validation(String),

    #[error("Delivery failed: {0}")]
    DeliveryFailure(String),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl From<MailError> for ClassroomError {
    fn from(e: MailError) -> Self {
        ClassroomError::DeliveryFailure(e.to_string())
    }
}

pub type ClassroomResult<T> = Result<T, ClassroomError>;

/// Require a non-blank string, returning it trimmed.
pub(crate) fn required<'a>(value: &'a str, field: &str) -> ClassroomResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ClassroomError::Validation(format!("{field} is required")));
    }
    Ok(trimmed)
}

/// All classroom services over one store, hub and mailer.
#[derive(Clone)]
pub struct Classroom {
    pub courses: CourseService,
    pub enrollment: EnrollmentService,
    pub coursework: CourseworkService,
    pub announcements: AnnouncementService,
    pub invitations: InvitationService,
    pub notifications: NotificationService,
}

impl Classroom {
    pub fn new(store: Arc<dyn Store>, notifications: NotificationService, mailer: Arc<dyn Mailer>) -> Self {
        let guard = AccessGuard::new(store.clone());
        Self {
            courses: CourseService::new(store.clone(), guard.clone()),
            enrollment: EnrollmentService::new(store.clone(), guard.clone(), notifications.clone()),
            coursework: CourseworkService::new(store.clone(), guard.clone(), notifications.clone()),
            announcements: AnnouncementService::new(store.clone(), guard.clone(), notifications.clone()),
            invitations: InvitationService::new(store, guard, mailer),
            notifications,
        }
    }
}
