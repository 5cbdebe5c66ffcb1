/*!
 * # Permission Resolver
 *
 * Derives role, type and permission facts from a [`User`] snapshot and answers
 * permission queries against an injected [`PermissionConfig`].
 *
 * Every query is total. An absent user (`None`) is the least privileged
 * subject: `false`, an empty list, level 99 or the `viewer` role.
 */

use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use super::permissions::{Action, Module, ModulePermission};
use super::rbac::{
    roles, PermissionConfig, Permissions, MANAGER_LEVEL_THRESHOLD, UNKNOWN_ROLE_LEVEL,
};
use super::types::{ResolvedUserType, User, UserType};

/// Modules whose read access opens the SmartBI views
pub const SMART_BI_READ_MODULES: [Module; 3] = [Module::Analytics, Module::Sales, Module::Finance];

/// Display name used when no user is present
pub const GUEST_DISPLAY_NAME: &str = "访客";

/// How platform users are recognized.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PlatformDetection {
    /// Only the server-asserted `userType` field counts
    #[default]
    Explicit,
    /// Deprecated: additionally treat distinguished usernames and role names
    /// carrying a platform prefix as platform administrators
    LegacyUsername {
        usernames: Vec<String>,
        role_prefix: String,
    },
}

impl PlatformDetection {
    pub fn legacy_defaults() -> Self {
        PlatformDetection::LegacyUsername {
            usernames: vec!["platform_admin".to_string(), "super_admin".to_string()],
            role_prefix: "platform_".to_string(),
        }
    }

    fn is_distinguished_username(&self, user: &User) -> bool {
        match self {
            PlatformDetection::Explicit => false,
            PlatformDetection::LegacyUsername { usernames, .. } => user
                .username
                .as_deref()
                .map_or(false, |name| usernames.iter().any(|u| u == name)),
        }
    }

    fn has_platform_role_marker(&self, user: &User) -> bool {
        match self {
            PlatformDetection::Explicit => false,
            PlatformDetection::LegacyUsername { role_prefix, .. } => {
                !role_prefix.is_empty()
                    && user
                        .role
                        .as_ref()
                        .map_or(false, |role| role.name.starts_with(role_prefix.as_str()))
            }
        }
    }
}

/// Serializable view of everything the resolver derives for one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserAccessSummary {
    pub user_type: Option<ResolvedUserType>,
    pub role_code: String,
    pub role_level: u32,
    pub role_display_name: String,
    pub is_platform_admin: bool,
    pub is_super_admin: bool,
    pub is_manager: bool,
    pub accessible_modules: Vec<Module>,
    pub permissions: Vec<String>,
    pub can_access_smart_bi: bool,
    pub can_write_smart_bi: bool,
}

/// Resolves permissions for users against a fixed configuration
#[derive(Debug, Clone)]
pub struct PermissionResolver {
    config: Arc<PermissionConfig>,
    detection: PlatformDetection,
}

impl PermissionResolver {
    pub fn new(config: Arc<PermissionConfig>) -> Self {
        Self {
            config,
            detection: PlatformDetection::Explicit,
        }
    }

    pub fn with_detection(mut self, detection: PlatformDetection) -> Self {
        self.detection = detection;
        self
    }

    pub fn config(&self) -> &PermissionConfig {
        &self.config
    }

    pub fn detection(&self) -> &PlatformDetection {
        &self.detection
    }

    // ==================== Derivations ====================

    /// `None` only when no user is present
    pub fn get_user_type(&self, user: Option<&User>) -> Option<ResolvedUserType> {
        let user = user?;
        if user.user_type == UserType::Platform
            || self.detection.is_distinguished_username(user)
            || self.detection.has_platform_role_marker(user)
        {
            Some(ResolvedUserType::PlatformAdmin)
        } else {
            Some(ResolvedUserType::FactoryUser)
        }
    }

    /// Normalized role code of the user
    pub fn get_user_role<'a>(&self, user: Option<&'a User>) -> &'a str {
        let Some(user) = user else {
            return roles::DEFAULT_ROLE;
        };

        match self.get_user_type(Some(user)) {
            Some(ResolvedUserType::PlatformAdmin) => {
                if let Some(code) = user
                    .declared_role()
                    .filter(|code| self.config.is_platform_role(code))
                {
                    return code;
                }
                if self.detection.is_distinguished_username(user) {
                    debug!(user_id = %user.id, "platform role derived from legacy username");
                    roles::PLATFORM_SUPER_ADMIN
                } else {
                    roles::PLATFORM_OPERATOR
                }
            }
            _ => user
                .declared_role()
                .filter(|code| !self.config.is_platform_role(code))
                .unwrap_or(roles::DEFAULT_ROLE),
        }
    }

    pub fn get_user_level(&self, user: Option<&User>) -> u32 {
        match user {
            Some(_) => self.config.role_level(self.get_user_role(user)),
            None => UNKNOWN_ROLE_LEVEL,
        }
    }

    pub fn role_display_name(&self, user: Option<&User>) -> &str {
        match user {
            Some(_) => &self.config.role_metadata(self.get_user_role(user)).display_name,
            None => GUEST_DISPLAY_NAME,
        }
    }

    pub fn is_platform_admin(&self, user: Option<&User>) -> bool {
        self.get_user_type(user) == Some(ResolvedUserType::PlatformAdmin)
    }

    pub fn is_factory_user(&self, user: Option<&User>) -> bool {
        self.get_user_type(user) == Some(ResolvedUserType::FactoryUser)
    }

    /// Factory user holding `factory_super_admin`
    pub fn is_super_admin(&self, user: Option<&User>) -> bool {
        self.is_factory_user(user) && self.get_user_role(user) == roles::FACTORY_SUPER_ADMIN
    }

    /// Platform user holding `platform_super_admin`
    pub fn is_platform_super_admin(&self, user: Option<&User>) -> bool {
        self.is_platform_admin(user) && self.get_user_role(user) == roles::PLATFORM_SUPER_ADMIN
    }

    pub fn is_manager(&self, user: Option<&User>) -> bool {
        user.is_some() && self.get_user_level(user) <= MANAGER_LEVEL_THRESHOLD
    }

    /// Permissions of the user's role, shaped by its user type
    pub fn effective_permissions(&self, user: Option<&User>) -> Permissions {
        let role = self.get_user_role(user);
        match self.get_user_type(user) {
            None => Permissions::empty_modules(),
            Some(ResolvedUserType::PlatformAdmin) => Permissions::Capabilities(
                self.config.capabilities(role).cloned().unwrap_or_default(),
            ),
            Some(ResolvedUserType::FactoryUser) => Permissions::ModuleLevels(
                self.config.module_levels(role).cloned().unwrap_or_default(),
            ),
        }
    }

    /// Flat permission list: capability names or `module:action` entries
    pub fn permission_list(&self, user: Option<&User>) -> Vec<String> {
        self.effective_permissions(user).flatten()
    }

    // ==================== Permission queries ====================

    /// Platform capability check. Factory users hold no capabilities.
    pub fn has_capability(&self, user: Option<&User>, capability: &str) -> bool {
        if !self.is_platform_admin(user) {
            return false;
        }
        self.config
            .capabilities(self.get_user_role(user))
            .map_or(false, |set| set.contains(capability))
    }

    /// Leveled module check. Platform administrators pass every module check.
    pub fn has_module_permission(
        &self,
        user: Option<&User>,
        module: Module,
        action: Action,
    ) -> bool {
        if user.is_none() {
            return false;
        }
        if self.is_platform_admin(user) {
            return true;
        }
        self.config
            .module_level(self.get_user_role(user), module)
            .allows(action)
    }

    /// Check a permission string.
    ///
    /// `module`, `module:read` and `module:write` are module checks (bare
    /// module means read); anything else is a platform capability name.
    pub fn has_permission(&self, user: Option<&User>, permission: &str) -> bool {
        match ModulePermission::parse(permission) {
            Some(mp) => self.has_module_permission(user, mp.module, mp.action),
            None => self.has_capability(user, permission),
        }
    }

    /// Any of the permissions; `false` for an empty list
    pub fn has_any_permission<S: AsRef<str>>(
        &self,
        user: Option<&User>,
        permissions: &[S],
    ) -> bool {
        permissions
            .iter()
            .any(|p| self.has_permission(user, p.as_ref()))
    }

    /// All of the permissions; `true` for an empty list when a user is present
    pub fn has_all_permissions<S: AsRef<str>>(
        &self,
        user: Option<&User>,
        permissions: &[S],
    ) -> bool {
        user.is_some()
            && permissions
                .iter()
                .all(|p| self.has_permission(user, p.as_ref()))
    }

    pub fn can_access_module(&self, user: Option<&User>, module: Module) -> bool {
        self.has_module_permission(user, module, Action::Read)
            || self.has_module_permission(user, module, Action::Write)
    }

    /// Modules with any grant, in listing order
    pub fn get_accessible_modules(&self, user: Option<&User>) -> Vec<Module> {
        if user.is_none() {
            return Vec::new();
        }
        if self.is_platform_admin(user) {
            return Module::all();
        }
        let role = self.get_user_role(user);
        Module::all()
            .into_iter()
            .filter(|module| self.config.module_level(role, *module).is_granted())
            .collect()
    }

    /// Exact, case-sensitive department match unless the role spans
    /// departments (platform admins, factory super admin, permission admin)
    pub fn can_access_department(&self, user: Option<&User>, department: &str) -> bool {
        let Some(current) = user else {
            return false;
        };
        if self.is_platform_admin(user) {
            return true;
        }
        if self.spans_departments(user) {
            return true;
        }
        current.department.as_deref() == Some(department)
    }

    /// Roles allowed across departments inside a factory
    pub fn spans_departments(&self, user: Option<&User>) -> bool {
        matches!(
            self.get_user_role(user),
            roles::FACTORY_SUPER_ADMIN | roles::PERMISSION_ADMIN
        )
    }

    /// Whether `user` may administer `target`.
    ///
    /// Only the platform super admin crosses factory boundaries; the factory
    /// check runs before any role rule.
    pub fn can_manage_user(&self, user: Option<&User>, target: Option<&User>) -> bool {
        let (Some(manager), Some(subject)) = (user, target) else {
            return false;
        };

        if self.is_platform_super_admin(user) {
            return true;
        }

        if manager.factory_id != subject.factory_id {
            debug!(
                user_id = %manager.id,
                target_id = %subject.id,
                "user management denied across factories"
            );
            return false;
        }

        let target_role = self.get_user_role(target);
        match self.get_user_role(user) {
            roles::FACTORY_SUPER_ADMIN => true,
            roles::PERMISSION_ADMIN => target_role != roles::FACTORY_SUPER_ADMIN,
            roles::DEPARTMENT_ADMIN => {
                let same_department = manager.department.is_some()
                    && manager.department == subject.department;
                same_department && matches!(target_role, roles::OPERATOR | roles::VIEWER)
            }
            _ => false,
        }
    }

    pub fn can_access_smart_bi(&self, user: Option<&User>) -> bool {
        if self.is_platform_admin(user) {
            return true;
        }
        SMART_BI_READ_MODULES
            .iter()
            .any(|module| self.has_module_permission(user, *module, Action::Read))
    }

    /// Only write on analytics grants BI write; sales or finance write does not
    pub fn can_write_smart_bi(&self, user: Option<&User>) -> bool {
        if self.is_platform_admin(user) {
            return true;
        }
        self.has_module_permission(user, Module::Analytics, Action::Write)
    }

    pub fn summarize(&self, user: Option<&User>) -> UserAccessSummary {
        UserAccessSummary {
            user_type: self.get_user_type(user),
            role_code: self.get_user_role(user).to_string(),
            role_level: self.get_user_level(user),
            role_display_name: self.role_display_name(user).to_string(),
            is_platform_admin: self.is_platform_admin(user),
            is_super_admin: self.is_super_admin(user),
            is_manager: self.is_manager(user),
            accessible_modules: self.get_accessible_modules(user),
            permissions: self.permission_list(user),
            can_access_smart_bi: self.can_access_smart_bi(user),
            can_write_smart_bi: self.can_write_smart_bi(user),
        }
    }
}

impl Default for PermissionResolver {
    fn default() -> Self {
        Self::new(PermissionConfig::builtin())
    }
}
