//! Role, membership and ownership checks.

use std::sync::Arc;

use super::{ClassroomError, ClassroomResult};
use crate::models::auth::{Role, TokenClaims};
use crate::models::course::Membership;
use crate::store::Store;

/// The authenticated caller of a service operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: i64,
    pub role: Role,
}

impl Actor {
    pub fn new(id: i64, role: Role) -> Self {
        Self { id, role }
    }

    /// Build from verified claims. `None` if `sub` is not a principal id.
    pub fn from_claims(claims: &TokenClaims) -> Option<Self> {
        claims.principal_id().map(|id| Self::new(id, claims.role))
    }

    pub fn is_teacher(&self) -> bool {
        self.role == Role::Teacher
    }

    pub fn is_student(&self) -> bool {
        self.role == Role::Student
    }
}

/// Membership-backed authorization predicates.
#[derive(Clone)]
pub struct AccessGuard {
    store: Arc<dyn Store>,
}

impl AccessGuard {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn membership(&self, course_id: i64, principal_id: i64) -> ClassroomResult<Option<Membership>> {
        Ok(self.store.get_membership(course_id, principal_id).await?)
    }

    /// Member of the course in any role.
    pub async fn is_enrolled(&self, course_id: i64, principal_id: i64) -> ClassroomResult<bool> {
        Ok(self.membership(course_id, principal_id).await?.is_some())
    }

    pub async fn is_teacher_of(&self, course_id: i64, principal_id: i64) -> ClassroomResult<bool> {
        Ok(self
            .membership(course_id, principal_id)
            .await?
            .is_some_and(|m| m.role == Role::Teacher))
    }

    pub async fn is_owner_or_teacher(
        &self,
        owner_id: i64,
        course_id: i64,
        principal_id: i64,
    ) -> ClassroomResult<bool> {
        if owner_id == principal_id {
            return Ok(true);
        }
        self.is_teacher_of(course_id, principal_id).await
    }

    pub async fn require_enrolled(&self, course_id: i64, principal_id: i64) -> ClassroomResult<()> {
        if !self.is_enrolled(course_id, principal_id).await? {
            return Err(ClassroomError::Unauthorized(
                "You are not a member of this course".into(),
            ));
        }
        Ok(())
    }

    pub async fn require_teacher_of(&self, course_id: i64, principal_id: i64) -> ClassroomResult<()> {
        if !self.is_teacher_of(course_id, principal_id).await? {
            return Err(ClassroomError::Unauthorized(
                "Only the course teacher can do this".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn predicates_follow_memberships() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let guard = AccessGuard::new(store.clone());
        let course = store.create_course(1, "Chemistry", None).await.unwrap();

        assert!(guard.is_enrolled(course.id, 1).await.unwrap());
        assert!(guard.is_teacher_of(course.id, 1).await.unwrap());
        assert!(!guard.is_enrolled(course.id, 2).await.unwrap());
        assert!(guard.is_owner_or_teacher(2, course.id, 2).await.unwrap());
        assert!(!guard.is_owner_or_teacher(3, course.id, 2).await.unwrap());

        assert!(matches!(
            guard.require_teacher_of(course.id, 2).await,
            Err(ClassroomError::Unauthorized(_))
        ));
        assert!(guard.require_enrolled(course.id, 1).await.is_ok());
    }

    #[test]
    fn actor_from_claims_requires_numeric_subject() {
        let mut claims = TokenClaims {
            sub: "12".into(),
            email: "e".into(),
            name: "n".into(),
            role: Role::Student,
            jti: "j".into(),
            iss: "i".into(),
            aud: "a".into(),
            iat: 0,
            exp: 0,
        };
        assert_eq!(Actor::from_claims(&claims), Some(Actor::new(12, Role::Student)));
        claims.sub = "abc".into();
        assert_eq!(Actor::from_claims(&claims), None);
    }
}
