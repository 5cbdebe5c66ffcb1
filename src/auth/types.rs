use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::AuthzError;

/// Top-level scope asserted for a user at authentication time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Platform,
    #[default]
    Factory,
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserType::Platform => write!(f, "platform"),
            UserType::Factory => write!(f, "factory"),
        }
    }
}

impl FromStr for UserType {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "platform" => Ok(UserType::Platform),
            "factory" => Ok(UserType::Factory),
            _ => Err(AuthzError::UnknownUserType(s.to_string())),
        }
    }
}

/// User type as derived by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedUserType {
    PlatformAdmin,
    FactoryUser,
}

impl ResolvedUserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolvedUserType::PlatformAdmin => "platform_admin",
            ResolvedUserType::FactoryUser => "factory_user",
        }
    }
}

impl fmt::Display for ResolvedUserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Legacy role object (`role.name`) still sent by older clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRef {
    pub name: String,
}

/// Snapshot of the authenticated user supplied by the identity collaborator.
///
/// Field names follow the camelCase JSON of the session payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub user_type: UserType,
    #[serde(default)]
    pub role_code: Option<String>,
    #[serde(default)]
    pub role: Option<RoleRef>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub factory_id: Option<String>,
}

impl User {
    /// Factory user with the given role code
    pub fn factory(id: impl Into<String>, role_code: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user_type: UserType::Factory,
            role_code: Some(role_code.into()),
            ..Default::default()
        }
    }

    /// Platform user with the given role code
    pub fn platform(id: impl Into<String>, role_code: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user_type: UserType::Platform,
            role_code: Some(role_code.into()),
            ..Default::default()
        }
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn with_factory(mut self, factory_id: impl Into<String>) -> Self {
        self.factory_id = Some(factory_id.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Role code as declared on the record: `roleCode`, falling back to
    /// `role.name`. Blank values count as absent.
    pub fn declared_role(&self) -> Option<&str> {
        self.role_code
            .as_deref()
            .filter(|code| !code.trim().is_empty())
            .or_else(|| {
                self.role
                    .as_ref()
                    .map(|role| role.name.as_str())
                    .filter(|name| !name.trim().is_empty())
            })
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_session_payload() {
        let user: User = serde_json::from_value(json!({
            "id": 42,
            "userType": "factory",
            "roleCode": "department_admin",
            "department": "processing",
            "factoryId": "F1"
        }))
        .unwrap();

        assert_eq!(user.id, "42");
        assert_eq!(user.user_type, UserType::Factory);
        assert_eq!(user.declared_role(), Some("department_admin"));
        assert_eq!(user.department.as_deref(), Some("processing"));
        assert_eq!(user.factory_id.as_deref(), Some("F1"));
    }

    #[test]
    fn legacy_role_name_is_used_when_role_code_missing() {
        let user: User = serde_json::from_value(json!({
            "id": "u-7",
            "role": { "name": "operator" }
        }))
        .unwrap();

        assert_eq!(user.user_type, UserType::Factory);
        assert_eq!(user.declared_role(), Some("operator"));
    }

    #[test]
    fn blank_role_code_falls_back_to_role_name() {
        let mut user = User::factory("1", "  ");
        assert_eq!(user.declared_role(), None);
        user.role = Some(RoleRef {
            name: "viewer".into(),
        });
        assert_eq!(user.declared_role(), Some("viewer"));
    }

    #[test]
    fn user_type_parsing() {
        assert_eq!("Platform".parse::<UserType>().unwrap(), UserType::Platform);
        assert!("tenant".parse::<UserType>().is_err());
    }
}
