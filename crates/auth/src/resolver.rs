use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::{Permission, PermissionTable, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(Permission),
}

/// Maps roles to the permissions they grant.
///
/// Cheap to clone; the table is shared read-only.
///
/// - No IO
/// - No panics
/// - Pure union across roles; unknown roles contribute nothing
#[derive(Debug, Clone)]
pub struct PermissionResolver {
    table: Arc<PermissionTable>,
}

impl PermissionResolver {
    pub fn new(table: Arc<PermissionTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &PermissionTable {
        &self.table
    }

    /// De-duplicated union of the permissions granted by `roles`.
    ///
    /// `admin` contributes only what its table row lists; its implicit
    /// all-access is applied by [`Self::has_permission`].
    pub fn resolve(&self, roles: &[Role]) -> BTreeSet<Permission> {
        roles
            .iter()
            .filter_map(|role| self.table.permissions_for(role))
            .flatten()
            .cloned()
            .collect()
    }

    pub fn has_permission(&self, roles: &[Role], required: &Permission) -> bool {
        if roles.iter().any(Role::is_admin) {
            return true;
        }
        self.resolve(roles).iter().any(|granted| granted.grants(required))
    }

    pub fn authorize(&self, roles: &[Role], required: &Permission) -> Result<(), AuthzError> {
        if self.has_permission(roles, required) {
            Ok(())
        } else {
            Err(AuthzError::Forbidden(required.clone()))
        }
    }

    /// Explain why a permission check would be granted or denied.
    ///
    /// Answers "why was this request denied?" for the RBAC introspection
    /// endpoints. The decision always agrees with [`Self::has_permission`].
    pub fn explain(&self, roles: &[Role], required: &Permission) -> AuthorizationExplanation {
        let effective: BTreeSet<Permission> = self.resolve(roles);
        let role_names: Vec<String> = roles.iter().map(|r| r.as_str().to_string()).collect();
        let effective_permissions: Vec<String> =
            effective.iter().map(|p| p.as_str().to_string()).collect();
        let is_admin = roles.iter().any(Role::is_admin);

        if is_admin {
            return AuthorizationExplanation {
                required_permission: required.to_string(),
                granted: true,
                reason: "Principal holds the 'admin' role, which grants every permission"
                    .to_string(),
                roles: role_names,
                effective_permissions,
                matched_by: None,
                suggestions: Vec::new(),
            };
        }

        if let Some(grant) = effective.iter().find(|p| p.grants(required)) {
            let reason = if grant.is_wildcard() {
                format!("Principal has wildcard permission '{grant}'")
            } else {
                format!("Principal has explicit permission '{grant}'")
            };
            return AuthorizationExplanation {
                required_permission: required.to_string(),
                granted: true,
                reason,
                roles: role_names,
                effective_permissions,
                matched_by: Some(grant.to_string()),
                suggestions: Vec::new(),
            };
        }

        let unknown: Vec<&Role> = roles.iter().filter(|r| !self.table.contains_role(r)).collect();
        let granting_roles: Vec<String> = self
            .table
            .roles()
            .filter(|(_, perms)| perms.iter().any(|p| p.grants(required)))
            .map(|(role, _)| role.as_str().to_string())
            .collect();

        let mut suggestions = Vec::new();
        if !granting_roles.is_empty() {
            suggestions.push(format!(
                "Assign one of the roles that grant '{required}': {}",
                granting_roles.join(", ")
            ));
        }
        if !unknown.is_empty() {
            suggestions.push(format!(
                "Roles not defined in permission table v{} were ignored: {}",
                self.table.version(),
                unknown.iter().map(|r| r.as_str()).collect::<Vec<_>>().join(", ")
            ));
        }

        AuthorizationExplanation {
            required_permission: required.to_string(),
            granted: false,
            reason: format!("Principal does not have permission '{required}'"),
            roles: role_names,
            effective_permissions,
            matched_by: None,
            suggestions,
        }
    }
}

/// Detailed explanation of an authorization decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizationExplanation {
    pub required_permission: String,
    pub granted: bool,
    pub reason: String,
    pub roles: Vec<String>,
    pub effective_permissions: Vec<String>,
    /// The grant that satisfied the requirement, if any.
    pub matched_by: Option<String>,
    pub suggestions: Vec<String>,
}
