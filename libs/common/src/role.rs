//! Account roles and the authorization policy shared by the services

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role assigned to an account at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Publisher,
    Admin,
}

/// Something a request may attempt, checked against the caller's role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Take a copy of a book on loan
    Borrow,
    /// Return a borrowing that belongs to someone else
    ReturnOthers,
    /// Create, edit and delete catalog entries
    ManageCatalog,
    /// Deactivate or delete accounts, see dashboards
    ManageUsers,
    /// Read every user's borrowing history
    ViewAllHistory,
    /// Leave a rating and review
    Review,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::User, Role::Publisher, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Publisher => "publisher",
            Role::Admin => "admin",
        }
    }

    /// The single policy table for role-based checks.
    ///
    /// Ownership rules (a publisher editing only their own books, a user
    /// returning only their own borrowings) are applied by the operations on
    /// top of this.
    pub fn permits(&self, action: Action) -> bool {
        match (self, action) {
            (Role::User, Action::Borrow) => true,
            (_, Action::Borrow) => false,
            (Role::Admin, _) => true,
            (Role::Publisher, Action::ManageCatalog) => true,
            (_, Action::Review) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a known role
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "publisher" => Ok(Role::Publisher),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}
