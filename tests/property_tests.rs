//! Property-based tests for the permission engine.
//!
//! These tests use proptest to check the matrix and department invariants
//! over generated roles, modules and department names.

use proptest::prelude::*;
use trace_authz::auth::roles;
use trace_authz::{
    Action, Check, CompositeGuard, Guard, Module, Operator, PermissionConfig, PermissionLevel,
    PermissionResolver, User,
};

const FACTORY_ROLES: [&str; 5] = [
    roles::FACTORY_SUPER_ADMIN,
    roles::PERMISSION_ADMIN,
    roles::DEPARTMENT_ADMIN,
    roles::OPERATOR,
    roles::VIEWER,
];

// Strategies for generating test data
fn role_strategy() -> impl Strategy<Value = &'static str> {
    prop::sample::select(FACTORY_ROLES.to_vec())
}

fn module_strategy() -> impl Strategy<Value = Module> {
    prop::sample::select(Module::all())
}

fn department_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z_]{0,12}"
}

// Property: module queries follow the matrix level
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn module_queries_follow_matrix_level(role in role_strategy(), module in module_strategy()) {
        let resolver = PermissionResolver::default();
        let user = User::factory("p", role).with_factory("F1");
        let level = PermissionConfig::builtin().module_level(role, module);

        let read = resolver.has_module_permission(Some(&user), module, Action::Read);
        let write = resolver.has_module_permission(Some(&user), module, Action::Write);

        prop_assert_eq!(read, matches!(level, PermissionLevel::Read | PermissionLevel::ReadWrite));
        prop_assert_eq!(write, matches!(level, PermissionLevel::Write | PermissionLevel::ReadWrite));
        prop_assert_eq!(resolver.can_access_module(Some(&user), module), level.is_granted());
    }

    #[test]
    fn platform_users_access_every_module(module in module_strategy()) {
        let resolver = PermissionResolver::default();
        let user = User::platform("p", roles::PLATFORM_OPERATOR);
        prop_assert!(resolver.can_access_module(Some(&user), module));
    }
}

// Property: department access
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn spanning_roles_access_any_department(own in department_strategy(), other in department_strategy()) {
        let resolver = PermissionResolver::default();
        for role in [roles::FACTORY_SUPER_ADMIN, roles::PERMISSION_ADMIN] {
            let user = User::factory("p", role).with_department(own.clone());
            prop_assert!(resolver.can_access_department(Some(&user), &other));
        }
    }

    #[test]
    fn other_roles_need_exact_department(
        role in prop::sample::select(vec![roles::DEPARTMENT_ADMIN, roles::OPERATOR, roles::VIEWER]),
        own in department_strategy(),
        other in department_strategy(),
    ) {
        let resolver = PermissionResolver::default();
        let user = User::factory("p", role).with_department(own.clone());
        prop_assert_eq!(resolver.can_access_department(Some(&user), &other), own == other);
    }

    #[test]
    fn cross_factory_management_always_denied(
        manager_role in role_strategy(),
        target_role in role_strategy(),
        factory_a in "F[0-9]{1,3}",
        factory_b in "F[0-9]{1,3}",
    ) {
        prop_assume!(factory_a != factory_b);
        let resolver = PermissionResolver::default();
        let manager = User::factory("m", manager_role).with_department("processing").with_factory(factory_a);
        let target = User::factory("t", target_role).with_department("processing").with_factory(factory_b);
        prop_assert!(!resolver.can_manage_user(Some(&manager), Some(&target)));
    }
}

// Property: composite reduction matches all/any over check results
proptest! {
    #[test]
    fn composite_reduces_like_all_and_any(outcomes in prop::collection::vec(any::<bool>(), 0..8)) {
        let resolver = PermissionResolver::default();
        let user = User::factory("p", roles::VIEWER);

        let build = |operator: Operator| -> Guard {
            outcomes
                .iter()
                .fold(CompositeGuard::new(operator), |guard, outcome| {
                    let outcome = *outcome;
                    guard.with(Check::custom(move || outcome))
                })
                .into()
        };

        prop_assert_eq!(build(Operator::And).evaluate(&resolver, Some(&user)), outcomes.iter().all(|o| *o));
        prop_assert_eq!(build(Operator::Or).evaluate(&resolver, Some(&user)), outcomes.iter().any(|o| *o));
    }
}
