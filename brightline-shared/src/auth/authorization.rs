/// Role-based permission checks
///
/// Policy lives here as free functions over a [`UserRole`] value rather than on
/// the user model, so handlers can check a caller's role without loading the
/// full account.
///
/// | Permission          | Minimum role     |
/// |---------------------|------------------|
/// | `SubmitForms`       | anonymous        |
/// | `UploadFiles`       | registered       |
/// | `ManageContent`     | content_editor   |
/// | `ViewSubmissions`   | administrator    |
/// | `ManageUsers`       | administrator    |
///
/// # Example
///
/// ```
/// use brightline_shared::auth::authorization::{require_permission, Permission};
/// use brightline_shared::models::user::UserRole;
///
/// assert!(require_permission(UserRole::ContentEditor, Permission::ManageContent).is_ok());
/// assert!(require_permission(UserRole::Registered, Permission::ManageContent).is_err());
/// ```

use uuid::Uuid;

use crate::models::user::UserRole;

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Role is below what the permission needs
    #[error("Insufficient permissions: {permission:?} requires {required:?}, caller is {actual:?}")]
    InsufficientRole {
        permission: Permission,
        required: UserRole,
        actual: UserRole,
    },

    /// Caller neither owns the resource nor has an overriding role
    #[error("Not authorized to access this resource")]
    NotOwner,
}

/// Things a caller may be allowed to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    SubmitForms,
    UploadFiles,
    ManageContent,
    ViewSubmissions,
    ManageUsers,
}

impl Permission {
    /// Lowest role that holds this permission
    pub fn min_role(&self) -> UserRole {
        match self {
            Permission::SubmitForms => UserRole::Anonymous,
            Permission::UploadFiles => UserRole::Registered,
            Permission::ManageContent => UserRole::ContentEditor,
            Permission::ViewSubmissions | Permission::ManageUsers => UserRole::Administrator,
        }
    }
}

/// Whether `role` holds `permission`
pub fn has_permission(role: UserRole, permission: Permission) -> bool {
    role.level() >= permission.min_role().level()
}

/// Fails with [`AuthzError::InsufficientRole`] unless `role` holds `permission`
pub fn require_permission(role: UserRole, permission: Permission) -> Result<(), AuthzError> {
    if has_permission(role, permission) {
        Ok(())
    } else {
        Err(AuthzError::InsufficientRole {
            permission,
            required: permission.min_role(),
            actual: role,
        })
    }
}

/// Create, edit and delete services, case studies, impact stories and their
/// reference data
pub fn can_manage_content(role: UserRole) -> bool {
    has_permission(role, Permission::ManageContent)
}

/// List and edit accounts
pub fn can_manage_users(role: UserRole) -> bool {
    has_permission(role, Permission::ManageUsers)
}

/// Read stored form submissions
pub fn can_view_submissions(role: UserRole) -> bool {
    has_permission(role, Permission::ViewSubmissions)
}

/// See unpublished content in public listings
pub fn can_view_unpublished(role: UserRole) -> bool {
    can_manage_content(role)
}

/// Owner-or-administrator check for per-user resources such as uploads
pub fn require_owner_or_admin(
    role: UserRole,
    caller_id: Uuid,
    owner_id: Uuid,
) -> Result<(), AuthzError> {
    if caller_id == owner_id || role == UserRole::Administrator {
        Ok(())
    } else {
        Err(AuthzError::NotOwner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_matrix() {
        use Permission::*;
        use UserRole::*;

        let cases = [
            (Anonymous, SubmitForms, true),
            (Anonymous, UploadFiles, false),
            (Registered, UploadFiles, true),
            (Registered, ManageContent, false),
            (ContentEditor, ManageContent, true),
            (ContentEditor, ViewSubmissions, false),
            (ContentEditor, ManageUsers, false),
            (Administrator, ViewSubmissions, true),
            (Administrator, ManageUsers, true),
            (Administrator, ManageContent, true),
        ];

        for (role, permission, expected) in cases {
            assert_eq!(
                has_permission(role, permission),
                expected,
                "{:?} / {:?}",
                role,
                permission
            );
        }
    }

    #[test]
    fn test_named_checks() {
        assert!(can_manage_content(UserRole::ContentEditor));
        assert!(!can_manage_content(UserRole::Registered));
        assert!(can_manage_users(UserRole::Administrator));
        assert!(!can_manage_users(UserRole::ContentEditor));
        assert!(can_view_submissions(UserRole::Administrator));
        assert!(!can_view_unpublished(UserRole::Anonymous));
    }

    #[test]
    fn test_require_permission_error() {
        let err = require_permission(UserRole::Registered, Permission::ManageUsers).unwrap_err();
        match err {
            AuthzError::InsufficientRole { required, actual, .. } => {
                assert_eq!(required, UserRole::Administrator);
                assert_eq!(actual, UserRole::Registered);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_owner_or_admin() {
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();

        assert!(require_owner_or_admin(UserRole::Registered, owner, owner).is_ok());
        assert!(require_owner_or_admin(UserRole::Administrator, other, owner).is_ok());
        assert!(matches!(
            require_owner_or_admin(UserRole::ContentEditor, other, owner),
            Err(AuthzError::NotOwner)
        ));
    }
}
