//! Course invitations by email.
//!
//! Invitations are not persisted. The invited person still registers and
//! requests enrollment; the mail only tells them where to go.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::guard::{AccessGuard, Actor};
use super::{ClassroomError, ClassroomResult};
use crate::mail::{MailMessage, Mailer};
use crate::models::course::Course;
use crate::store::Store;

/// Outcome of a bulk invitation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InvitationReport {
    pub sent: Vec<String>,
    pub failed: Vec<String>,
}

#[derive(Clone)]
pub struct InvitationService {
    store: Arc<dyn Store>,
    guard: AccessGuard,
    mailer: Arc<dyn Mailer>,
}

impl InvitationService {
    pub fn new(store: Arc<dyn Store>, guard: AccessGuard, mailer: Arc<dyn Mailer>) -> Self {
        Self { store, guard, mailer }
    }

    /// Mail an invitation to each address. Delivery failures and malformed
    /// addresses end up in `failed`; they never fail the call.
    pub async fn invite(&self, actor: &Actor, course_id: i64, emails: &[String]) -> ClassroomResult<InvitationReport> {
        let course = self
            .store
            .get_course(course_id)
            .await?
            .ok_or_else(|| ClassroomError::NotFound("Course not found".into()))?;
        self.guard.require_teacher_of(course_id, actor.id).await?;

        let addresses: BTreeSet<String> = emails
            .iter()
            .map(|e| e.trim().to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        if addresses.is_empty() {
            return Err(ClassroomError::Validation(
                "At least one email address is required".into(),
            ));
        }

        let inviter = self
            .store
            .find_principal(actor.id)
            .await?
            .map(|p| p.principal.name)
            .unwrap_or_else(|| "Your teacher".to_string());

        let mut report = InvitationReport::default();
        for address in addresses {
            match self.deliver(&course, &inviter, &address).await {
                Ok(()) => report.sent.push(address),
                Err(e) => {
                    warn!(course_id, to = %address, error = %e, "invitation not delivered");
                    report.failed.push(address);
                }
            }
        }
        info!(
            course_id,
            sent = report.sent.len(),
            failed = report.failed.len(),
            "invitations processed"
        );
        Ok(report)
    }

    async fn deliver(&self, course: &Course, inviter: &str, address: &str) -> ClassroomResult<()> {
        if !is_plausible_email(address) {
            return Err(ClassroomError::Validation(format!("Invalid email address: {address}")));
        }
        let message = MailMessage {
            to: address.to_string(),
            subject: format!("Invitation to join {}", course.name),
            body: format!(
                "{inviter} has invited you to join the course \"{}\" on Lectern.\n\n\
                 Sign in (or register) and request enrollment in course #{}.",
                course.name, course.id
            ),
        };
        self.mailer.send(&message).await?;
        Ok(())
    }
}

fn is_plausible_email(address: &str) -> bool {
    match address.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::super::testing::Fixture;
    use super::*;
    use crate::mail::MailError;

    /// Accepts everything except addresses on `bounce.test`.
    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<MailMessage>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
            if message.to.ends_with("@bounce.test") {
                return Err(MailError::Rejected {
                    status: 550,
                    body: "mailbox unavailable".into(),
                });
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn failed_addresses_are_reported() {
        let mailer = Arc::new(RecordingMailer::default());
        let fx = Fixture::with_mailer(mailer.clone());
        let (teacher, _, course_id) = fx.course_with_student().await;

        let emails = vec![
            "a@school.test".to_string(),
            " A@School.test ".to_string(),
            "gone@bounce.test".to_string(),
            "not-an-email".to_string(),
        ];
        let report = fx
            .classroom
            .invitations
            .invite(&teacher, course_id, &emails)
            .await
            .unwrap();
        assert_eq!(report.sent, vec!["a@school.test"]);
        assert_eq!(report.failed, vec!["gone@bounce.test", "not-an-email"]);

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].subject.contains("Physics"));
    }

    #[tokio::test]
    async fn only_teachers_of_the_course_invite() {
        let fx = Fixture::new();
        let (_, student, course_id) = fx.course_with_student().await;
        let err = fx
            .classroom
            .invitations
            .invite(&student, course_id, &["x@y.test".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, ClassroomError::Unauthorized(_)));
    }

    #[test]
    fn plausible_emails() {
        assert!(is_plausible_email("a@b.io"));
        assert!(!is_plausible_email("a@b"));
        assert!(!is_plausible_email("@b.io"));
        assert!(!is_plausible_email("ab.io"));
    }
}
