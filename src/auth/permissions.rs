/*!
 * # Permissions Module
 *
 * Business modules, per-module permission levels and the named platform
 * capabilities. Factory roles are granted a level per module; platform roles
 * are granted capability flags.
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::{AsRefStr, EnumIter, IntoEnumIterator};

use crate::errors::AuthzError;

/// A business functionality area with its own read/write level per role.
///
/// Declaration order is the order used for accessible-module listings.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Module {
    Dashboard,
    Production,
    Warehouse,
    Quality,
    Procurement,
    Sales,
    Hr,
    Equipment,
    Finance,
    System,
    Analytics,
}

impl Module {
    /// All known modules in listing order
    pub fn all() -> Vec<Module> {
        Module::iter().collect()
    }

    pub fn as_str(&self) -> &str {
        self.as_ref()
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Module {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Module::iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| AuthzError::UnknownModule(s.to_string()))
    }
}

/// Level granted to a factory role on a module.
///
/// `Write` does not imply `Read`: a write-only grant models data entry
/// without visibility of existing records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionLevel {
    #[default]
    None,
    Read,
    Write,
    ReadWrite,
}

impl PermissionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionLevel::None => "none",
            PermissionLevel::Read => "read",
            PermissionLevel::Write => "write",
            PermissionLevel::ReadWrite => "read_write",
        }
    }

    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::Read => matches!(self, PermissionLevel::Read | PermissionLevel::ReadWrite),
            Action::Write => matches!(self, PermissionLevel::Write | PermissionLevel::ReadWrite),
        }
    }

    /// True for any grant other than `None`
    pub fn is_granted(&self) -> bool {
        !matches!(self, PermissionLevel::None)
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionLevel {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" | "" => Ok(PermissionLevel::None),
            "read" => Ok(PermissionLevel::Read),
            "write" => Ok(PermissionLevel::Write),
            "read_write" => Ok(PermissionLevel::ReadWrite),
            _ => Err(AuthzError::UnknownPermissionLevel(s.to_string())),
        }
    }
}

/// Operation being checked against a module level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    #[default]
    Read,
    Write,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Write => "write",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Action::Read),
            "write" => Ok(Action::Write),
            _ => Err(AuthzError::UnknownAction(s.to_string())),
        }
    }
}

/// Platform capability names
pub mod consts {
    // Factory lifecycle
    pub const CREATE_FACTORY: &str = "create_factory";
    pub const DELETE_FACTORY: &str = "delete_factory";
    pub const MANAGE_FACTORIES: &str = "manage_factories";
    pub const VIEW_ALL_FACTORIES: &str = "view_all_factories";

    // Platform accounts
    pub const MANAGE_PLATFORM_ADMINS: &str = "manage_platform_admins";
    pub const MANAGE_FACTORY_USERS: &str = "manage_factory_users";

    // Operations
    pub const MANAGE_WHITELIST: &str = "manage_whitelist";
    pub const VIEW_PLATFORM_ANALYTICS: &str = "view_platform_analytics";
    pub const MANAGE_SUBSCRIPTIONS: &str = "manage_subscriptions";
    pub const SYSTEM_CONFIG: &str = "system_config";
    pub const VIEW_AUDIT_LOGS: &str = "view_audit_logs";
}

/// Format a module permission string, e.g. `production:write`
pub fn format_permission(module: Module, action: Action) -> String {
    format!("{}:{}", module, action)
}

/// A permission string that names a module, optionally with an action.
///
/// `production` and `production:read` both mean read access; `production:write`
/// means write access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModulePermission {
    pub module: Module,
    pub action: Action,
}

impl ModulePermission {
    pub fn new(module: Module, action: Action) -> Self {
        Self { module, action }
    }

    /// Parse `module` or `module:action`; `None` when the string is not a
    /// module reference (for example a platform capability name).
    pub fn parse(permission: &str) -> Option<Self> {
        let (module, action) = match permission.split_once(':') {
            Some((module, action)) => (module, Some(action)),
            None => (permission, None),
        };
        let module = module.parse::<Module>().ok()?;
        let action = match action {
            Some(raw) => raw.parse::<Action>().ok()?,
            None => Action::Read,
        };
        Some(Self { module, action })
    }
}

impl fmt::Display for ModulePermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.action)
    }
}
