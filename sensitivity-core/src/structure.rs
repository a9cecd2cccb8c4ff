//! Organisational structures and the actors acting on their behalf.

use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Organisational unit owning records.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Structure {
    pub id: u64,
    pub name: String,
}

impl Structure {
    /// Construct a structure.
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Model-level permission on sensitive areas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Permission {
    Read,
    Add,
    Change,
    Delete,
}

/// Authenticated user.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct User {
    pub id: u64,
    pub username: String,
    /// Structure the user belongs to.
    pub structure: u64,
    pub permissions: BTreeSet<Permission>,
}

impl User {
    /// Construct a user without permissions.
    pub fn new(id: u64, username: impl Into<String>, structure: u64) -> Self {
        Self {
            id,
            username: username.into(),
            structure,
            permissions: BTreeSet::new(),
        }
    }

    /// Grant permissions, keeping the existing ones.
    #[must_use]
    pub fn with_permissions<I>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = Permission>,
    {
        self.permissions.extend(permissions);
        self
    }

    /// Grant every model permission.
    #[must_use]
    pub fn with_all_permissions(self) -> Self {
        self.with_permissions([
            Permission::Read,
            Permission::Add,
            Permission::Change,
            Permission::Delete,
        ])
    }

    /// Whether the user holds `permission`.
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}

/// Whoever issues a request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Actor {
    #[default]
    Anonymous,
    User(User),
}

impl Actor {
    /// The authenticated user, if any.
    pub const fn user(&self) -> Option<&User> {
        match self {
            Self::Anonymous => None,
            Self::User(user) => Some(user),
        }
    }

    /// Whether the actor is authenticated.
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::User(_))
    }

    /// Whether the actor is an authenticated user holding `permission`.
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.user()
            .is_some_and(|user| user.has_permission(permission))
    }

    /// Whether the actor belongs to the structure `owner`.
    ///
    /// Anonymous actors belong to no structure.
    pub fn same_structure(&self, owner: u64) -> bool {
        self.user().is_some_and(|user| user.structure == owner)
    }
}

impl From<User> for Actor {
    fn from(user: User) -> Self {
        Self::User(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_actor_owns_nothing() {
        let actor = Actor::Anonymous;
        assert!(!actor.same_structure(1));
        assert!(!actor.has_permission(Permission::Read));
    }

    #[test]
    fn user_matches_own_structure_only() {
        let actor = Actor::from(User::new(1, "ranger", 7).with_permissions([Permission::Read]));
        assert!(actor.same_structure(7));
        assert!(!actor.same_structure(8));
        assert!(actor.has_permission(Permission::Read));
        assert!(!actor.has_permission(Permission::Delete));
    }
}
