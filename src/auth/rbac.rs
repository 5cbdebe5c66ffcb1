/*!
 * # Role-Based Access Control (RBAC) Module
 *
 * Role metadata and the two permission matrices:
 *
 * - platform roles map to a flat set of capability flags
 * - factory roles map each [`Module`] to a [`PermissionLevel`]
 *
 * The tables are read-only. They are bundled in a [`PermissionConfig`] that is
 * handed to the resolver, so alternate tables can be injected without touching
 * the compiled-in defaults. The factory matrix mirrors the backend permission
 * table and must be kept in sync with it on deployment.
 */

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::warn;

use super::permissions::{consts as caps, format_permission, Action, Module, PermissionLevel};
use crate::errors::{AuthzError, AuthzResult};

/// Level reported for unknown roles and absent users
pub const UNKNOWN_ROLE_LEVEL: u32 = 99;

/// Roles at or below this level count as managers
pub const MANAGER_LEVEL_THRESHOLD: u32 = 10;

/// Role codes of the built-in tables
pub mod roles {
    // Platform namespace
    pub const PLATFORM_SUPER_ADMIN: &str = "platform_super_admin";
    pub const PLATFORM_OPERATOR: &str = "platform_operator";

    // Factory namespace
    pub const FACTORY_SUPER_ADMIN: &str = "factory_super_admin";
    pub const PERMISSION_ADMIN: &str = "permission_admin";
    pub const DEPARTMENT_ADMIN: &str = "department_admin";
    pub const OPERATOR: &str = "operator";
    pub const VIEWER: &str = "viewer";

    /// Role assumed when nothing else can be resolved
    pub const DEFAULT_ROLE: &str = VIEWER;
}

/// Static description of a role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMetadata {
    /// Authority rank, lower means more authority
    pub level: u32,
    pub display_name: String,
    pub description: String,
}

impl RoleMetadata {
    pub fn new(level: u32, display_name: &str, description: &str) -> Self {
        Self {
            level,
            display_name: display_name.to_string(),
            description: description.to_string(),
        }
    }
}

lazy_static! {
    static ref UNKNOWN_ROLE: RoleMetadata =
        RoleMetadata::new(UNKNOWN_ROLE_LEVEL, "访客", "Unrecognized role, treated as a guest");
    static ref BUILTIN: Arc<PermissionConfig> = Arc::new(PermissionConfig {
        roles: builtin_role_metadata(),
        platform: builtin_platform_matrix(),
        factory: builtin_factory_matrix(),
    });
}

/// Effective permissions of a user, shaped by its user type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "grants", rename_all = "snake_case")]
pub enum Permissions {
    /// Platform roles: capability flags granted wholesale
    Capabilities(BTreeSet<String>),
    /// Factory roles: a level per module; missing modules mean `none`
    ModuleLevels(BTreeMap<Module, PermissionLevel>),
}

impl Permissions {
    pub fn empty_modules() -> Self {
        Permissions::ModuleLevels(BTreeMap::new())
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        match self {
            Permissions::Capabilities(set) => set.contains(capability),
            Permissions::ModuleLevels(_) => false,
        }
    }

    pub fn level(&self, module: Module) -> PermissionLevel {
        match self {
            Permissions::Capabilities(_) => PermissionLevel::None,
            Permissions::ModuleLevels(levels) => levels.get(&module).copied().unwrap_or_default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Permissions::Capabilities(set) => set.is_empty(),
            Permissions::ModuleLevels(levels) => levels.values().all(|l| !l.is_granted()),
        }
    }

    /// Flat list of permission strings: capability names, or
    /// `module:read` / `module:write` entries for module grants.
    pub fn flatten(&self) -> Vec<String> {
        match self {
            Permissions::Capabilities(set) => set.iter().cloned().collect(),
            Permissions::ModuleLevels(levels) => levels
                .iter()
                .flat_map(|(module, level)| {
                    [Action::Read, Action::Write]
                        .into_iter()
                        .filter(move |action| level.allows(*action))
                        .map(move |action| format_permission(*module, action))
                })
                .collect(),
        }
    }
}

/// Read-only role and permission tables consumed by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionConfig {
    roles: HashMap<String, RoleMetadata>,
    platform: HashMap<String, BTreeSet<String>>,
    factory: HashMap<String, BTreeMap<Module, PermissionLevel>>,
}

impl PermissionConfig {
    /// Build a configuration from explicit tables.
    ///
    /// Every role referenced by a matrix needs a metadata entry, and a role
    /// code may live in only one of the two matrices.
    pub fn new(
        roles: HashMap<String, RoleMetadata>,
        platform: HashMap<String, BTreeSet<String>>,
        factory: HashMap<String, BTreeMap<Module, PermissionLevel>>,
    ) -> AuthzResult<Self> {
        let config = Self {
            roles,
            platform,
            factory,
        };
        config.validate()?;
        Ok(config)
    }

    /// The compiled-in tables
    pub fn builtin() -> Arc<PermissionConfig> {
        BUILTIN.clone()
    }

    pub fn validate(&self) -> AuthzResult<()> {
        for code in self.platform.keys() {
            if self.factory.contains_key(code) {
                return Err(AuthzError::RoleNamespaceConflict(code.clone()));
            }
        }
        for code in self.platform.keys().chain(self.factory.keys()) {
            if !self.roles.contains_key(code) {
                return Err(AuthzError::MissingRoleMetadata(code.clone()));
            }
        }
        Ok(())
    }

    /// Metadata for a role, or the guest entry (level 99) when unknown
    pub fn role_metadata(&self, role_code: &str) -> &RoleMetadata {
        match self.roles.get(role_code) {
            Some(meta) => meta,
            None => {
                warn!("Role not found: {}", role_code);
                &*UNKNOWN_ROLE
            }
        }
    }

    pub fn role_level(&self, role_code: &str) -> u32 {
        self.role_metadata(role_code).level
    }

    pub fn is_known_role(&self, role_code: &str) -> bool {
        self.roles.contains_key(role_code)
    }

    pub fn is_platform_role(&self, role_code: &str) -> bool {
        self.platform.contains_key(role_code)
    }

    pub fn is_factory_role(&self, role_code: &str) -> bool {
        self.factory.contains_key(role_code)
    }

    pub fn capabilities(&self, role_code: &str) -> Option<&BTreeSet<String>> {
        self.platform.get(role_code)
    }

    pub fn module_levels(&self, role_code: &str) -> Option<&BTreeMap<Module, PermissionLevel>> {
        self.factory.get(role_code)
    }

    pub fn module_level(&self, role_code: &str, module: Module) -> PermissionLevel {
        self.factory
            .get(role_code)
            .and_then(|levels| levels.get(&module))
            .copied()
            .unwrap_or_default()
    }

    /// All role codes with metadata, most authoritative first
    pub fn role_codes(&self) -> Vec<&str> {
        let mut codes: Vec<(&str, u32)> = self
            .roles
            .iter()
            .map(|(code, meta)| (code.as_str(), meta.level))
            .collect();
        codes.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        codes.into_iter().map(|(code, _)| code).collect()
    }

    pub fn factory_role_codes(&self) -> impl Iterator<Item = &str> {
        self.factory.keys().map(String::as_str)
    }

    pub fn platform_role_codes(&self) -> impl Iterator<Item = &str> {
        self.platform.keys().map(String::as_str)
    }
}

impl Default for PermissionConfig {
    fn default() -> Self {
        (**BUILTIN).clone()
    }
}

/// Level of a role in the built-in table, 99 when unknown
pub fn get_role_level(role_code: &str) -> u32 {
    BUILTIN.role_level(role_code)
}

/// Metadata of a role in the built-in table, the guest entry when unknown
pub fn get_role_metadata(role_code: &str) -> &'static RoleMetadata {
    let config: &'static PermissionConfig = &**BUILTIN;
    config.role_metadata(role_code)
}

fn builtin_role_metadata() -> HashMap<String, RoleMetadata> {
    let mut table = HashMap::new();

    table.insert(
        roles::PLATFORM_SUPER_ADMIN.to_string(),
        RoleMetadata::new(
            1,
            "平台超级管理员",
            "Full control over the platform and every factory",
        ),
    );
    table.insert(
        roles::PLATFORM_OPERATOR.to_string(),
        RoleMetadata::new(2, "平台操作员", "Day-to-day platform operations"),
    );
    table.insert(
        roles::FACTORY_SUPER_ADMIN.to_string(),
        RoleMetadata::new(3, "工厂超级管理员", "Full control over one factory"),
    );
    table.insert(
        roles::PERMISSION_ADMIN.to_string(),
        RoleMetadata::new(5, "权限管理员", "Manages users and roles across departments"),
    );
    table.insert(
        roles::DEPARTMENT_ADMIN.to_string(),
        RoleMetadata::new(10, "部门管理员", "Manages one department"),
    );
    table.insert(
        roles::OPERATOR.to_string(),
        RoleMetadata::new(20, "操作员", "Records production data"),
    );
    table.insert(
        roles::VIEWER.to_string(),
        RoleMetadata::new(30, "查看者", "Read-only access"),
    );

    table
}

fn capability_set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|name| name.to_string()).collect()
}

fn builtin_platform_matrix() -> HashMap<String, BTreeSet<String>> {
    let mut matrix = HashMap::new();

    matrix.insert(
        roles::PLATFORM_SUPER_ADMIN.to_string(),
        capability_set(&[
            caps::CREATE_FACTORY,
            caps::DELETE_FACTORY,
            caps::MANAGE_FACTORIES,
            caps::VIEW_ALL_FACTORIES,
            caps::MANAGE_PLATFORM_ADMINS,
            caps::MANAGE_FACTORY_USERS,
            caps::MANAGE_WHITELIST,
            caps::VIEW_PLATFORM_ANALYTICS,
            caps::MANAGE_SUBSCRIPTIONS,
            caps::SYSTEM_CONFIG,
            caps::VIEW_AUDIT_LOGS,
        ]),
    );

    matrix.insert(
        roles::PLATFORM_OPERATOR.to_string(),
        capability_set(&[
            caps::VIEW_ALL_FACTORIES,
            caps::MANAGE_WHITELIST,
            caps::VIEW_PLATFORM_ANALYTICS,
        ]),
    );

    matrix
}

fn module_grants(grants: &[(Module, PermissionLevel)]) -> BTreeMap<Module, PermissionLevel> {
    grants.iter().copied().collect()
}

fn builtin_factory_matrix() -> HashMap<String, BTreeMap<Module, PermissionLevel>> {
    use Module::*;
    use PermissionLevel::{None as Denied, Read, ReadWrite, Write};

    let mut matrix = HashMap::new();

    // Super admin: everything
    matrix.insert(
        roles::FACTORY_SUPER_ADMIN.to_string(),
        Module::all().into_iter().map(|m| (m, ReadWrite)).collect(),
    );

    // Permission admin: people and system settings
    matrix.insert(
        roles::PERMISSION_ADMIN.to_string(),
        module_grants(&[
            (Dashboard, Read),
            (Hr, ReadWrite),
            (System, ReadWrite),
            (Analytics, Read),
        ]),
    );

    // Department admin: operational modules, no finance or system
    matrix.insert(
        roles::DEPARTMENT_ADMIN.to_string(),
        module_grants(&[
            (Dashboard, Read),
            (Production, ReadWrite),
            (Warehouse, ReadWrite),
            (Quality, ReadWrite),
            (Procurement, Read),
            (Sales, Read),
            (Hr, Read),
            (Equipment, ReadWrite),
            (Finance, Denied),
            (System, Denied),
            (Analytics, Read),
        ]),
    );

    // Operator: data entry, write without read on production records
    matrix.insert(
        roles::OPERATOR.to_string(),
        module_grants(&[
            (Dashboard, Read),
            (Production, Write),
            (Warehouse, Write),
            (Quality, Write),
            (Equipment, Read),
        ]),
    );

    // Viewer
    matrix.insert(
        roles::VIEWER.to_string(),
        module_grants(&[
            (Dashboard, Read),
            (Production, Read),
            (Warehouse, Read),
            (Quality, Read),
            (Finance, Denied),
        ]),
    );

    matrix
}
