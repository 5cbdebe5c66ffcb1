/*!
 * # Guard Composition
 *
 * Declarative access checks evaluated against a resolved user. A guard is
 * built fresh at each decision point and holds no state between calls.
 *
 * - [`AccessGuard`]: permission, permission set, department, role list and
 *   custom predicate criteria; every supplied criterion must pass
 * - user-type guards: only the resolved user type is compared
 * - [`CompositeGuard`]: typed checks folded with AND/OR
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use super::rbac::roles;
use super::resolver::PermissionResolver;
use super::types::{ResolvedUserType, User};

/// Roles that pass a department guard with `allow_cross_department` set
pub const CROSS_DEPARTMENT_ROLES: [&str; 2] = [roles::FACTORY_SUPER_ADMIN, roles::PERMISSION_ADMIN];

/// Boolean operator used to combine checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operator {
    #[default]
    And,
    Or,
}

impl Operator {
    fn combine(self, acc: bool, next: impl FnOnce() -> bool) -> bool {
        match self {
            Operator::And => acc && next(),
            Operator::Or => acc || next(),
        }
    }
}

/// Zero-argument predicate over external state
#[derive(Clone)]
pub struct CustomCheck(Arc<dyn Fn() -> bool + Send + Sync>);

impl CustomCheck {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(predicate))
    }

    pub fn check(&self) -> bool {
        (self.0)()
    }
}

impl fmt::Debug for CustomCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomCheck(..)")
    }
}

/// Permission list with its combination mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionSet {
    pub permissions: Vec<String>,
    pub require_all: bool,
}

/// Non-composite guard. Unset criteria are skipped; the set criteria are
/// combined with an implicit AND.
#[derive(Debug, Clone, Default)]
pub struct AccessGuard {
    pub permission: Option<String>,
    pub permissions: Option<PermissionSet>,
    pub department: Option<String>,
    pub allow_cross_department: bool,
    pub roles: Option<Vec<String>>,
    pub custom: Option<CustomCheck>,
}

impl AccessGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permission = Some(permission.into());
        self
    }

    pub fn with_permissions<I, S>(mut self, permissions: I, require_all: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = Some(PermissionSet {
            permissions: permissions.into_iter().map(Into::into).collect(),
            require_all,
        });
        self
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn allow_cross_department(mut self) -> Self {
        self.allow_cross_department = true;
        self
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = Some(roles.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_custom<F>(mut self, predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.custom = Some(CustomCheck::new(predicate));
        self
    }

    fn evaluate(&self, resolver: &PermissionResolver, user: Option<&User>) -> bool {
        if let Some(permission) = &self.permission {
            if !resolver.has_permission(user, permission) {
                debug!(permission = %permission, "guard denied: missing permission");
                return false;
            }
        }

        if let Some(set) = &self.permissions {
            let allowed = if set.require_all {
                resolver.has_all_permissions(user, set.permissions.as_slice())
            } else {
                resolver.has_any_permission(user, set.permissions.as_slice())
            };
            if !allowed {
                debug!(
                    permissions = ?set.permissions,
                    require_all = set.require_all,
                    "guard denied: permission set not satisfied"
                );
                return false;
            }
        }

        if let Some(department) = &self.department {
            let role = resolver.get_user_role(user);
            let cross = self.allow_cross_department
                && CROSS_DEPARTMENT_ROLES.iter().any(|r| *r == role);
            if !cross && !resolver.can_access_department(user, department) {
                debug!(department = %department, "guard denied: department mismatch");
                return false;
            }
        }

        if let Some(allowed_roles) = &self.roles {
            let role = resolver.get_user_role(user);
            if !allowed_roles.iter().any(|r| r == role) {
                debug!(role = %role, "guard denied: role not allowed");
                return false;
            }
        }

        if let Some(custom) = &self.custom {
            if !custom.check() {
                debug!("guard denied: custom predicate");
                return false;
            }
        }

        true
    }
}

/// Permission criterion of a composite check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionCheck {
    One(String),
    /// Passes when any permission in the list is held
    AnyOf(Vec<String>),
}

/// Typed check inside a composite guard
#[derive(Debug, Clone)]
pub enum CheckKind {
    Permission(PermissionCheck),
    Role(Vec<String>),
    Department(String),
    Custom(CustomCheck),
}

#[derive(Debug, Clone)]
pub struct Check {
    pub kind: CheckKind,
    /// Overrides the composite's default operator for this check
    pub operator: Option<Operator>,
}

impl Check {
    fn of(kind: CheckKind) -> Self {
        Self {
            kind,
            operator: None,
        }
    }

    pub fn permission(permission: impl Into<String>) -> Self {
        Self::of(CheckKind::Permission(PermissionCheck::One(permission.into())))
    }

    pub fn any_permission<I, S>(permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::of(CheckKind::Permission(PermissionCheck::AnyOf(
            permissions.into_iter().map(Into::into).collect(),
        )))
    }

    pub fn role<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::of(CheckKind::Role(roles.into_iter().map(Into::into).collect()))
    }

    pub fn department(department: impl Into<String>) -> Self {
        Self::of(CheckKind::Department(department.into()))
    }

    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self::of(CheckKind::Custom(CustomCheck::new(predicate)))
    }

    pub fn with_operator(mut self, operator: Operator) -> Self {
        self.operator = Some(operator);
        self
    }

    pub fn evaluate(&self, resolver: &PermissionResolver, user: Option<&User>) -> bool {
        match &self.kind {
            CheckKind::Permission(PermissionCheck::One(permission)) => {
                resolver.has_permission(user, permission)
            }
            CheckKind::Permission(PermissionCheck::AnyOf(permissions)) => {
                resolver.has_any_permission(user, permissions.as_slice())
            }
            CheckKind::Role(allowed) => {
                let role = resolver.get_user_role(user);
                allowed.iter().any(|r| r == role)
            }
            CheckKind::Department(department) => resolver.can_access_department(user, department),
            CheckKind::Custom(custom) => custom.check(),
        }
    }
}

/// Checks folded left to right. Each check after the first joins the running
/// result with its own operator, or the default operator when it has none.
/// An empty composite is `true` under AND and `false` under OR.
#[derive(Debug, Clone, Default)]
pub struct CompositeGuard {
    pub checks: Vec<Check>,
    pub default_operator: Operator,
}

impl CompositeGuard {
    pub fn new(default_operator: Operator) -> Self {
        Self {
            checks: Vec::new(),
            default_operator,
        }
    }

    pub fn with(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    fn evaluate(&self, resolver: &PermissionResolver, user: Option<&User>) -> bool {
        let mut checks = self.checks.iter();
        let Some(first) = checks.next() else {
            return self.default_operator == Operator::And;
        };

        let mut result = first.evaluate(resolver, user);
        for check in checks {
            let operator = check.operator.unwrap_or(self.default_operator);
            result = operator.combine(result, || check.evaluate(resolver, user));
        }
        if !result {
            debug!(
                checks = self.checks.len(),
                default_operator = ?self.default_operator,
                "guard denied: composite checks not satisfied"
            );
        }
        result
    }
}

/// An access-check descriptor
#[derive(Debug, Clone)]
pub enum Guard {
    Access(AccessGuard),
    /// Passes only for the given resolved user type; finer criteria do not apply
    UserType(ResolvedUserType),
    Composite(CompositeGuard),
}

impl Guard {
    pub fn permission(permission: impl Into<String>) -> Self {
        Guard::Access(AccessGuard::new().with_permission(permission))
    }

    pub fn any_of<I, S>(permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Guard::Access(AccessGuard::new().with_permissions(permissions, false))
    }

    pub fn all_of<I, S>(permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Guard::Access(AccessGuard::new().with_permissions(permissions, true))
    }

    pub fn department(department: impl Into<String>) -> Self {
        Guard::Access(AccessGuard::new().with_department(department))
    }

    pub fn roles<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Guard::Access(AccessGuard::new().with_roles(roles))
    }

    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Guard::Access(AccessGuard::new().with_custom(predicate))
    }

    pub fn platform_only() -> Self {
        Guard::UserType(ResolvedUserType::PlatformAdmin)
    }

    pub fn factory_only() -> Self {
        Guard::UserType(ResolvedUserType::FactoryUser)
    }

    /// Allow/deny decision. An absent user is always denied.
    pub fn evaluate(&self, resolver: &PermissionResolver, user: Option<&User>) -> bool {
        if user.is_none() {
            return false;
        }
        match self {
            Guard::Access(guard) => guard.evaluate(resolver, user),
            Guard::UserType(expected) => {
                let actual = resolver.get_user_type(user);
                if actual != Some(*expected) {
                    debug!(
                        expected = %expected,
                        actual = ?actual,
                        "guard denied: user type mismatch"
                    );
                    return false;
                }
                true
            }
            Guard::Composite(guard) => guard.evaluate(resolver, user),
        }
    }
}

impl From<AccessGuard> for Guard {
    fn from(guard: AccessGuard) -> Self {
        Guard::Access(guard)
    }
}

impl From<CompositeGuard> for Guard {
    fn from(guard: CompositeGuard) -> Self {
        Guard::Composite(guard)
    }
}

/// Evaluate `guard` for `user`
pub fn evaluate(guard: &Guard, resolver: &PermissionResolver, user: Option<&User>) -> bool {
    guard.evaluate(resolver, user)
}
