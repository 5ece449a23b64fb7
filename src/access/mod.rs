//! Role-based access control.
//!
//! Roles and permissions are closed enumerations; the lookup table is an
//! exhaustive `match`, so adding a role without deciding its permissions
//! does not compile.

use std::fmt;
use std::str::FromStr;

use crate::errors::{PvaError, Result};

/// A user's role.  Stored by name (`admin`, `manager`, `viewer`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Can do anything with any resource.
    Admin,
    /// Can view and edit resources it has access to.
    Manager,
    /// Can view resources it has access to.
    Viewer,
}

/// An action gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    ViewPasswords,
    ManagePasswords,
    ViewDevices,
    ManageDevices,
    ManageUsers,
}

impl Role {
    /// The role given to every user after the first.
    pub const LOWEST: Role = Role::Viewer;

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Viewer => "viewer",
        }
    }

    /// Permission set granted to this role, excluding the admin shortcut.
    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            Role::Admin => &[
                Permission::ViewPasswords,
                Permission::ManagePasswords,
                Permission::ViewDevices,
                Permission::ManageDevices,
                Permission::ManageUsers,
            ],
            Role::Manager => &[
                Permission::ViewPasswords,
                Permission::ManagePasswords,
                Permission::ViewDevices,
                Permission::ManageDevices,
            ],
            Role::Viewer => &[Permission::ViewPasswords, Permission::ViewDevices],
        }
    }

    /// Whether this role may perform `permission`.  Admin passes every check.
    pub fn allows(&self, permission: Permission) -> bool {
        if *self == Role::Admin {
            return true;
        }
        self.permissions().contains(&permission)
    }

    /// Like `allows`, but as a `Result` for use with `?`.
    pub fn require(&self, permission: Permission) -> Result<()> {
        if self.allows(permission) {
            Ok(())
        } else {
            Err(PvaError::Forbidden(permission))
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = PvaError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "viewer" => Ok(Role::Viewer),
            other => Err(PvaError::Validation(format!("unknown role '{other}'"))),
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Permission::ViewPasswords => "passwords.view",
            Permission::ManagePasswords => "passwords.manage",
            Permission::ViewDevices => "devices.view",
            Permission::ManageDevices => "devices.manage",
            Permission::ManageUsers => "users.manage",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_passes_every_check() {
        for p in [
            Permission::ViewPasswords,
            Permission::ManagePasswords,
            Permission::ViewDevices,
            Permission::ManageDevices,
            Permission::ManageUsers,
        ] {
            assert!(Role::Admin.allows(p));
        }
    }

    #[test]
    fn manager_can_manage_passwords_but_not_users() {
        assert!(Role::Manager.allows(Permission::ViewPasswords));
        assert!(Role::Manager.allows(Permission::ManagePasswords));
        assert!(Role::Manager.allows(Permission::ManageDevices));
        assert!(!Role::Manager.allows(Permission::ManageUsers));
    }

    #[test]
    fn viewer_can_only_view() {
        assert!(Role::Viewer.allows(Permission::ViewPasswords));
        assert!(Role::Viewer.allows(Permission::ViewDevices));
        assert!(!Role::Viewer.allows(Permission::ManagePasswords));
        assert!(!Role::Viewer.allows(Permission::ManageDevices));
        assert!(!Role::Viewer.allows(Permission::ManageUsers));
    }

    #[test]
    fn require_returns_forbidden() {
        let err = Role::Viewer
            .require(Permission::ManagePasswords)
            .unwrap_err();
        assert!(matches!(
            err,
            PvaError::Forbidden(Permission::ManagePasswords)
        ));
    }

    #[test]
    fn role_names_round_trip() {
        for role in [Role::Admin, Role::Manager, Role::Viewer] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn unknown_role_names_are_rejected() {
        for name in ["superuser", "", "Admin"] {
            assert!(matches!(
                name.parse::<Role>(),
                Err(PvaError::Validation(_))
            ));
        }
    }
}
