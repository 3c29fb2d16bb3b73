//! Role to permission registry
//!
//! Roles and permissions are closed sets. The default table is built once per
//! process and only ever read afterwards. Role lookups are case-insensitive and
//! permissive: strings that name no known role grant nothing and are skipped.

use crate::error::RoleError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

/// Process wide default registry
static DEFAULT_REGISTRY: LazyLock<RolePermissionRegistry> =
    LazyLock::new(RolePermissionRegistry::default_table);

/// Roles understood by the registry
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
    Viewer,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::User, Role::Viewer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
            Role::Viewer => "viewer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            "viewer" => Ok(Role::Viewer),
            _ => Err(RoleError::InvalidRole(s.to_string())),
        }
    }
}

/// Actions a role may be allowed to perform
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "read:tools")]
    ReadTools,
    #[serde(rename = "write:tools")]
    WriteTools,
    #[serde(rename = "manage:users")]
    ManageUsers,
    #[serde(rename = "manage:roles")]
    ManageRoles,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ReadTools => "read:tools",
            Permission::WriteTools => "write:tools",
            Permission::ManageUsers => "manage:users",
            Permission::ManageRoles => "manage:roles",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "read:tools" => Ok(Permission::ReadTools),
            "write:tools" => Ok(Permission::WriteTools),
            "manage:users" => Ok(Permission::ManageUsers),
            "manage:roles" => Ok(Permission::ManageRoles),
            _ => Err(format!("Unknown permission: {}", s)),
        }
    }
}

/// Immutable mapping from role to the permissions it grants
#[derive(Debug, Clone)]
pub struct RolePermissionRegistry {
    grants: HashMap<Role, BTreeSet<Permission>>,
}

impl RolePermissionRegistry {
    /// The shared default registry
    pub fn global() -> &'static RolePermissionRegistry {
        &DEFAULT_REGISTRY
    }

    fn default_table() -> Self {
        use Permission::*;

        let grants = HashMap::from([
            (
                Role::Admin,
                BTreeSet::from([ReadTools, WriteTools, ManageUsers, ManageRoles]),
            ),
            (Role::User, BTreeSet::from([ReadTools, WriteTools])),
            (Role::Viewer, BTreeSet::from([ReadTools])),
        ]);

        Self { grants }
    }

    /// Build a registry from an explicit table
    ///
    /// Every role must be present with at least one permission.
    pub fn from_map(grants: HashMap<Role, BTreeSet<Permission>>) -> Result<Self, RoleError> {
        for role in Role::ALL {
            if grants.get(&role).map_or(true, BTreeSet::is_empty) {
                return Err(RoleError::InvalidRole(role.to_string()));
            }
        }

        Ok(Self { grants })
    }

    fn grants_for(&self, role: &str) -> Option<&BTreeSet<Permission>> {
        role.parse::<Role>()
            .ok()
            .and_then(|role| self.grants.get(&role))
    }

    /// Union of the permissions granted by `roles`; unknown roles are skipped
    pub fn permissions_for<I, S>(&self, roles: I) -> BTreeSet<Permission>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        roles
            .into_iter()
            .filter_map(|role| self.grants_for(role.as_ref()))
            .flatten()
            .copied()
            .collect()
    }

    /// Whether any of `roles` grants `required`
    pub fn has_permission<I, S>(&self, roles: I, required: Permission) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        roles.into_iter().any(|role| {
            self.grants_for(role.as_ref())
                .is_some_and(|grants| grants.contains(&required))
        })
    }

    /// Fail on the first role with no entry in the registry
    pub fn validate_roles<I, S>(&self, roles: I) -> Result<(), RoleError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for role in roles {
            let role = role.as_ref();
            if self.grants_for(role).is_none() {
                return Err(RoleError::InvalidRole(role.to_string()));
            }
        }
        Ok(())
    }
}

pub fn permissions_for<I, S>(roles: I) -> BTreeSet<Permission>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    RolePermissionRegistry::global().permissions_for(roles)
}

pub fn has_permission<I, S>(roles: I, required: Permission) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    RolePermissionRegistry::global().has_permission(roles, required)
}

pub fn validate_roles<I, S>(roles: I) -> Result<(), RoleError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    RolePermissionRegistry::global().validate_roles(roles)
}
