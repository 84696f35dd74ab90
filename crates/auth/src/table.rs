//! The role → permission mapping.
//!
//! A [`PermissionTable`] is built once at startup and never mutated; every
//! process of a deployment must load the same table (same `version`).
//! Changing it requires a coordinated redeploy.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::permissions::{crm, notification, profile, system};
use crate::{Permission, Role};

/// Version of the compiled-in table returned by [`PermissionTable::standard`].
pub const STANDARD_TABLE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PermissionTableError {
    #[error("invalid permission table document: {0}")]
    Document(#[from] serde_json::Error),

    #[error("role '{0}' is not defined in the permission table")]
    UnknownRole(Role),
}

/// Immutable role → permission-set mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionTable {
    version: u32,
    roles: BTreeMap<Role, BTreeSet<Permission>>,
}

impl PermissionTable {
    pub fn new<I, P>(version: u32, rows: I) -> Self
    where
        I: IntoIterator<Item = (Role, P)>,
        P: IntoIterator<Item = Permission>,
    {
        let mut roles: BTreeMap<Role, BTreeSet<Permission>> = BTreeMap::new();
        for (role, perms) in rows {
            roles.entry(role).or_default().extend(perms);
        }
        Self { version, roles }
    }

    /// The shared table every service compiles in.
    pub fn standard() -> Self {
        Self::new(
            STANDARD_TABLE_VERSION,
            [
                // Admin is implicit; the empty row only makes the role known.
                (Role::ADMIN, vec![]),
                (
                    Role::MANAGER,
                    vec![
                        crm::ALL,
                        notification::ALL,
                        profile::ALL,
                        system::SETTINGS_READ,
                        system::ROLES_READ,
                    ],
                ),
                (
                    Role::SALESPERSON,
                    vec![
                        crm::READ_CUSTOMER,
                        crm::CREATE_CUSTOMER,
                        crm::UPDATE_CUSTOMER,
                        crm::READ_INTERACTION,
                        crm::CREATE_INTERACTION,
                        notification::READ,
                        profile::READ_SELF,
                        profile::UPDATE_SELF,
                    ],
                ),
                (
                    Role::SUPPORT,
                    vec![
                        crm::READ_CUSTOMER,
                        crm::READ_INTERACTION,
                        crm::CREATE_INTERACTION,
                        notification::READ,
                        notification::SEND,
                        profile::READ_SELF,
                    ],
                ),
                (
                    Role::ACCOUNTANT,
                    vec![
                        crm::READ_CUSTOMER,
                        system::SETTINGS_READ,
                        notification::READ,
                        profile::READ_SELF,
                    ],
                ),
                (
                    Role::VIEWER,
                    vec![crm::READ_CUSTOMER, notification::READ, profile::READ_SELF],
                ),
            ],
        )
    }

    /// Parse a table from its JSON document form:
    /// `{ "version": 3, "roles": { "viewer": ["crm:read_customer"] } }`.
    ///
    /// Role names and permissions are validated while decoding.
    pub fn from_json(document: &str) -> Result<Self, PermissionTableError> {
        Ok(serde_json::from_str(document)?)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn permissions_for(&self, role: &Role) -> Option<&BTreeSet<Permission>> {
        self.roles.get(role)
    }

    pub fn roles(&self) -> impl Iterator<Item = (&Role, &BTreeSet<Permission>)> {
        self.roles.iter()
    }

    /// Whether the role is known. `admin` is always known.
    pub fn contains_role(&self, role: &Role) -> bool {
        role.is_admin() || self.roles.contains_key(role)
    }

    /// Reject the first role the table does not define.
    pub fn ensure_known<'a>(
        &self,
        roles: impl IntoIterator<Item = &'a Role>,
    ) -> Result<(), PermissionTableError> {
        match roles.into_iter().find(|r| !self.contains_role(r)) {
            Some(unknown) => Err(PermissionTableError::UnknownRole(unknown.clone())),
            None => Ok(()),
        }
    }
}

impl Default for PermissionTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_table_defines_every_named_role() {
        let table = PermissionTable::standard();
        for role in [
            Role::ADMIN,
            Role::MANAGER,
            Role::SALESPERSON,
            Role::SUPPORT,
            Role::ACCOUNTANT,
            Role::VIEWER,
        ] {
            assert!(table.contains_role(&role), "{role} missing");
        }
        assert_eq!(table.version(), STANDARD_TABLE_VERSION);
    }

    #[test]
    fn rows_with_the_same_role_are_merged() {
        let table = PermissionTable::new(
            7,
            [
                (Role::VIEWER, vec![crm::READ_CUSTOMER]),
                (Role::VIEWER, vec![notification::READ, crm::READ_CUSTOMER]),
            ],
        );
        let perms = table.permissions_for(&Role::VIEWER).unwrap();
        assert_eq!(perms.len(), 2);
    }

    #[test]
    fn from_json_loads_and_validates() {
        let table = PermissionTable::from_json(
            r#"{ "version": 4, "roles": { "warehouse": ["inventory:*", "crm:read_customer"] } }"#,
        )
        .unwrap();
        assert_eq!(table.version(), 4);
        let warehouse = Role::parse("warehouse").unwrap();
        assert_eq!(table.permissions_for(&warehouse).unwrap().len(), 2);

        let bad = PermissionTable::from_json(r#"{ "version": 1, "roles": { "viewer": ["crm"] } }"#);
        assert!(matches!(bad, Err(PermissionTableError::Document(_))));
    }

    #[test]
    fn ensure_known_reports_first_unknown_role() {
        let table = PermissionTable::standard();
        let ghost = Role::parse("ghost").unwrap();
        assert!(table.ensure_known([&Role::ADMIN, &Role::VIEWER]).is_ok());

        let err = table.ensure_known([&Role::VIEWER, &ghost]).unwrap_err();
        assert!(matches!(err, PermissionTableError::UnknownRole(r) if r == ghost));
    }

    #[test]
    fn admin_is_known_even_when_absent() {
        let table = PermissionTable::new(1, Vec::<(Role, Vec<Permission>)>::new());
        assert!(table.contains_role(&Role::ADMIN));
    }
}
