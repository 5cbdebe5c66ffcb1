use thiserror::Error;

use crate::config::AppConfigError;

/// Errors raised at the edges of the authorization engine.
///
/// Permission queries themselves never fail; these variants cover parsing of
/// external identifiers and construction of a [`crate::auth::PermissionConfig`].
#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("Unknown module: {0}")]
    UnknownModule(String),

    #[error("Unknown permission level: {0}")]
    UnknownPermissionLevel(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Unknown user type: {0}")]
    UnknownUserType(String),

    #[error("Role '{0}' is referenced by a permission matrix but has no metadata")]
    MissingRoleMetadata(String),

    #[error("Role '{0}' is defined in both the platform and factory matrices")]
    RoleNamespaceConflict(String),

    #[error("Configuration error: {0}")]
    Config(#[from] AppConfigError),
}

pub type AuthzResult<T> = Result<T, AuthzError>;
