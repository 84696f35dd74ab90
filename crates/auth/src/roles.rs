use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum length of a role identifier.
const MAX_ROLE_LEN: usize = 64;

/// Role identifier used for RBAC.
///
/// Roles are keys into the [`crate::PermissionTable`]; there is no hierarchy.
/// Construction goes through [`Role::parse`] (and serde uses the same check),
/// so a role decoded from a token is always a well-formed identifier even if
/// the table does not know it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Role(Cow<'static, str>);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoleParseError {
    #[error("role name is empty")]
    Empty,

    #[error("role name exceeds 64 characters")]
    TooLong,

    #[error("role name '{0}' contains invalid characters")]
    InvalidCharacters(String),
}

impl Role {
    /// The role that implicitly grants every permission.
    pub const ADMIN: Role = Role(Cow::Borrowed("admin"));
    pub const MANAGER: Role = Role(Cow::Borrowed("manager"));
    pub const SALESPERSON: Role = Role(Cow::Borrowed("salesperson"));
    pub const SUPPORT: Role = Role(Cow::Borrowed("support"));
    pub const ACCOUNTANT: Role = Role(Cow::Borrowed("accountant"));
    pub const VIEWER: Role = Role(Cow::Borrowed("viewer"));

    pub fn parse(name: impl Into<Cow<'static, str>>) -> Result<Self, RoleParseError> {
        let name = name.into();
        if name.is_empty() {
            return Err(RoleParseError::Empty);
        }
        if name.len() > MAX_ROLE_LEN {
            return Err(RoleParseError::TooLong);
        }
        let valid = name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-');
        if !valid {
            return Err(RoleParseError::InvalidCharacters(name.into_owned()));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_admin(&self) -> bool {
        self.as_str() == Self::ADMIN.as_str()
    }
}

impl TryFrom<String> for Role {
    type Error = RoleParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.0.into_owned()
    }
}

impl core::str::FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s.to_owned())
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_identifiers() {
        assert_eq!(Role::parse("sales_lead-2").unwrap().as_str(), "sales_lead-2");
        assert!(Role::parse("admin").unwrap().is_admin());
    }

    #[test]
    fn parse_rejects_malformed_names() {
        assert_eq!(Role::parse(""), Err(RoleParseError::Empty));
        assert!(matches!(
            Role::parse("Admin"),
            Err(RoleParseError::InvalidCharacters(_))
        ));
        assert!(matches!(
            Role::parse("crm:reader"),
            Err(RoleParseError::InvalidCharacters(_))
        ));
        assert_eq!(Role::parse("r".repeat(65)), Err(RoleParseError::TooLong));
    }

    #[test]
    fn deserialization_validates() {
        let ok: Vec<Role> = serde_json::from_str(r#"["admin","viewer"]"#).unwrap();
        assert_eq!(ok, vec![Role::ADMIN, Role::VIEWER]);

        let bad: Result<Vec<Role>, _> = serde_json::from_str(r#"["admin","DROP TABLE"]"#);
        assert!(bad.is_err());
    }
}
