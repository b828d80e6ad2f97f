//! The authenticated caller and the ownership checks shared by services.

use uuid::Uuid;

use crate::application::error::AppError;
use crate::domain::entities::ContentRecord;
use crate::domain::types::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden("administrator role required"))
        }
    }

    pub fn require_owner(&self, owner_id: Uuid) -> Result<(), AppError> {
        if self.user_id == owner_id {
            Ok(())
        } else {
            Err(AppError::Forbidden("only the author may change this resource"))
        }
    }

    pub fn require_owner_or_admin(&self, owner_id: Uuid) -> Result<(), AppError> {
        if self.user_id == owner_id || self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "only the author or an administrator may change this resource",
            ))
        }
    }
}

/// Unaccepted events are visible to admins and their author only.
pub fn can_see(viewer: Option<&Principal>, content: &ContentRecord) -> bool {
    content.is_publicly_visible()
        || viewer.is_some_and(|viewer| viewer.is_admin() || viewer.user_id == content.author_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admins_pass_owner_or_admin_checks() {
        let owner = Uuid::new_v4();
        let admin = Principal::new(Uuid::new_v4(), Role::Admin);
        let stranger = Principal::new(Uuid::new_v4(), Role::User);

        assert!(admin.require_owner_or_admin(owner).is_ok());
        assert!(admin.require_owner(owner).is_err());
        assert!(stranger.require_owner_or_admin(owner).is_err());
        assert!(Principal::new(owner, Role::User).require_owner(owner).is_ok());
    }
}
