use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Suffix marking a wildcard grant (`resource:*`).
const WILDCARD_ACTION: &str = "*";

/// Permission identifier.
///
/// Permissions are opaque `resource:action` strings (e.g. `"crm:read_customer"`).
/// A grant of the form `resource:*` authorizes every action under `resource`.
/// Deny cannot be expressed: a permission is either granted or absent.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Permission(Cow<'static, str>);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PermissionParseError {
    #[error("permission '{0}' is not of the form resource:action")]
    MissingSeparator(String),

    #[error("permission '{0}' has an empty resource or action")]
    EmptyPart(String),

    #[error("permission '{0}' contains invalid characters")]
    InvalidCharacters(String),
}

fn valid_segment(segment: &str) -> bool {
    segment
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'))
}

impl Permission {
    pub fn parse(name: impl Into<Cow<'static, str>>) -> Result<Self, PermissionParseError> {
        let name = name.into();
        let Some((resource, action)) = name.split_once(':') else {
            return Err(PermissionParseError::MissingSeparator(name.into_owned()));
        };
        if resource.is_empty() || action.is_empty() {
            return Err(PermissionParseError::EmptyPart(name.into_owned()));
        }
        if !valid_segment(resource) || (action != WILDCARD_ACTION && !valid_segment(action)) {
            return Err(PermissionParseError::InvalidCharacters(name.into_owned()));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part before the colon.
    pub fn resource(&self) -> &str {
        self.split().0
    }

    /// The part after the colon (`*` for wildcard grants).
    pub fn action(&self) -> &str {
        self.split().1
    }

    pub fn is_wildcard(&self) -> bool {
        self.action() == WILDCARD_ACTION
    }

    /// Whether holding `self` satisfies a requirement for `required`.
    ///
    /// A wildcard only covers permissions whose resource is exactly its own:
    /// `inventory:*` grants `inventory:read_item` but not `inventoryx:read_item`.
    pub fn grants(&self, required: &Permission) -> bool {
        if self == required {
            return true;
        }
        self.is_wildcard()
            && required
                .as_str()
                .strip_prefix(self.resource())
                .is_some_and(|rest| rest.starts_with(':'))
    }

    fn split(&self) -> (&str, &str) {
        // Construction guarantees a separator.
        self.0.split_once(':').unwrap_or((&self.0, ""))
    }
}

impl TryFrom<String> for Permission {
    type Error = PermissionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Permission> for String {
    fn from(value: Permission) -> Self {
        value.0.into_owned()
    }
}

impl core::str::FromStr for Permission {
    type Err = PermissionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s.to_owned())
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! permission_consts {
    ($($name:ident => $value:literal),* $(,)?) => {
        $(pub const $name: Permission = Permission(Cow::Borrowed($value));)*
    };
}

/// Customer relations.
pub mod crm {
    use super::*;

    permission_consts! {
        ALL => "crm:*",
        READ_CUSTOMER => "crm:read_customer",
        CREATE_CUSTOMER => "crm:create_customer",
        UPDATE_CUSTOMER => "crm:update_customer",
        DELETE_CUSTOMER => "crm:delete_customer",
        READ_INTERACTION => "crm:read_interaction",
        CREATE_INTERACTION => "crm:create_interaction",
    }
}

/// System settings and RBAC administration.
pub mod system {
    use super::*;

    permission_consts! {
        ALL => "system:*",
        SETTINGS_READ => "system:settings_read",
        SETTINGS_MANAGE => "system:settings_manage",
        ROLES_READ => "system:roles_read",
        ROLES_MANAGE => "system:roles_manage",
    }
}

/// Notifications.
pub mod notification {
    use super::*;

    permission_consts! {
        ALL => "notification:*",
        READ => "notification:read",
        SEND => "notification:send",
    }
}

/// User profiles.
pub mod profile {
    use super::*;

    permission_consts! {
        ALL => "profile:*",
        READ_SELF => "profile:read_self",
        UPDATE_SELF => "profile:update_self",
        READ_ANY => "profile:read_any",
    }
}
