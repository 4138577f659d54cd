//! Request-scoped identity and authorization checks

use common::{Action, Role};
use uuid::Uuid;

use crate::error::{LibraryError, LibraryResult};

/// Who is making the request, resolved once per request by the auth middleware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fail with `Forbidden` unless the role permits `action`
    pub fn require(&self, action: Action) -> LibraryResult<()> {
        if self.role.permits(action) {
            Ok(())
        } else {
            Err(LibraryError::Forbidden)
        }
    }

    /// Fail with `Forbidden` unless the caller owns the resource or is an admin
    pub fn require_owner(&self, owner_id: Option<Uuid>) -> LibraryResult<()> {
        if self.is_admin() || owner_id == Some(self.user_id) {
            Ok(())
        } else {
            Err(LibraryError::Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_or_admin() {
        let publisher = Identity::new(Uuid::new_v4(), Role::Publisher);
        let admin = Identity::new(Uuid::new_v4(), Role::Admin);
        let other = Uuid::new_v4();

        assert!(publisher.require_owner(Some(publisher.user_id)).is_ok());
        assert!(matches!(
            publisher.require_owner(Some(other)),
            Err(LibraryError::Forbidden)
        ));
        assert!(publisher.require_owner(None).is_err());
        assert!(admin.require_owner(Some(other)).is_ok());
        assert!(admin.require_owner(None).is_ok());
    }

    #[test]
    fn require_follows_role_policy() {
        let user = Identity::new(Uuid::new_v4(), Role::User);
        assert!(user.require(Action::Borrow).is_ok());
        assert!(matches!(
            user.require(Action::ManageCatalog),
            Err(LibraryError::Forbidden)
        ));
    }
}
