//! Principal identity and role administration.
//!
//! Principals are created at registration and never deleted here. Their roles
//! change only through an administrator's action.
//!
//! The gateway only uses [`Principal::with_known_roles`] (for
//! `/internal/tokens`). Registration and role assignment are library API for
//! the profile service, which owns the principal records and calls them before
//! persisting; no gateway route exposes them.

use serde::{Deserialize, Serialize};

use keystone_core::{DomainError, DomainResult, PrincipalId};

use crate::{PermissionTable, Role};

const MAX_DISPLAY_NAME_LEN: usize = 128;

/// The authenticated identity a request acts as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub display_name: String,
    pub roles: Vec<Role>,
}

impl Principal {
    /// Build a principal from an already-verified source (e.g. the profile
    /// service after credential and TOTP checks).
    pub fn new(id: PrincipalId, display_name: impl Into<String>, roles: Vec<Role>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            roles,
        }
    }

    /// Register a new principal with roles the table knows about.
    pub fn register(
        display_name: impl Into<String>,
        roles: Vec<Role>,
        table: &PermissionTable,
    ) -> DomainResult<Self> {
        Self::with_known_roles(PrincipalId::new(), display_name, roles, table)
    }

    /// Validate an existing principal's name and roles against `table`.
    ///
    /// Duplicate roles are collapsed, keeping first-seen order.
    pub fn with_known_roles(
        id: PrincipalId,
        display_name: impl Into<String>,
        roles: Vec<Role>,
        table: &PermissionTable,
    ) -> DomainResult<Self> {
        let display_name = validate_display_name(display_name.into())?;
        table
            .ensure_known(&roles)
            .map_err(|e| DomainError::validation(e.to_string()))?;

        let mut deduped: Vec<Role> = Vec::with_capacity(roles.len());
        for role in roles {
            if !deduped.contains(&role) {
                deduped.push(role);
            }
        }

        Ok(Self::new(id, display_name, deduped))
    }

    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(Role::is_admin)
    }

    /// Grant a role. Returns `false` if the principal already held it.
    pub fn assign_role(
        &mut self,
        role: Role,
        actor_roles: &[Role],
        table: &PermissionTable,
    ) -> DomainResult<bool> {
        ensure_admin(actor_roles)?;
        if !table.contains_role(&role) {
            return Err(DomainError::validation(format!(
                "role '{role}' is not defined in the permission table"
            )));
        }
        if self.roles.contains(&role) {
            return Ok(false);
        }
        self.roles.push(role);
        Ok(true)
    }

    /// Remove a role. Returns `false` if the principal did not hold it.
    pub fn revoke_role(&mut self, role: &Role, actor_roles: &[Role]) -> DomainResult<bool> {
        ensure_admin(actor_roles)?;
        let before = self.roles.len();
        self.roles.retain(|r| r != role);
        Ok(self.roles.len() != before)
    }
}

fn ensure_admin(actor_roles: &[Role]) -> DomainResult<()> {
    if actor_roles.iter().any(Role::is_admin) {
        Ok(())
    } else {
        Err(DomainError::Unauthorized)
    }
}

fn validate_display_name(name: String) -> DomainResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("display name must not be empty"));
    }
    if trimmed.chars().count() > MAX_DISPLAY_NAME_LEN {
        return Err(DomainError::validation(format!(
            "display name must be at most {MAX_DISPLAY_NAME_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}
