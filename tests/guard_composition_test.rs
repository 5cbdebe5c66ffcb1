//! Guard composition tests.
//!
//! Tests cover:
//! - Single and multi-permission guards
//! - Department guards with and without cross-department override
//! - Role-list and user-type guards
//! - Composite guards with default and per-check operators
//! - Implicit AND across criteria of one guard

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use trace_authz::auth::{consts, evaluate, roles};
use trace_authz::{
    decide, AccessGuard, AuthSnapshot, Check, CompositeGuard, Guard, GuardOutcome, Operator,
    PermissionResolver, User,
};

fn department_admin() -> User {
    User::factory("d1", roles::DEPARTMENT_ADMIN)
        .with_department("processing")
        .with_factory("F1")
}

fn operator() -> User {
    User::factory("o1", roles::OPERATOR)
        .with_department("processing")
        .with_factory("F1")
}

fn allows(guard: &Guard, user: &User) -> bool {
    evaluate(guard, &PermissionResolver::default(), Some(user))
}

// ==================== Simple guards ====================

#[test]
fn single_permission_guard() {
    assert!(allows(&Guard::permission("production:write"), &operator()));
    assert!(!allows(&Guard::permission("production:read"), &operator()));
}

#[test]
fn multi_permission_guard_any_and_all() {
    let perms = ["finance", "production:write"];
    assert!(allows(&Guard::any_of(perms), &operator()));
    assert!(!allows(&Guard::all_of(perms), &operator()));
    assert!(allows(
        &Guard::all_of(["production:read", "production:write"]),
        &department_admin()
    ));
}

#[test]
fn department_guard() {
    assert!(allows(&Guard::department("processing"), &operator()));
    assert!(!allows(&Guard::department("farming"), &operator()));
}

#[test]
fn cross_department_override() {
    let permission_admin = User::factory("pa", roles::PERMISSION_ADMIN)
        .with_department("office")
        .with_factory("F1");
    let guard = Guard::Access(AccessGuard::new().with_department("farming").allow_cross_department());

    assert!(allows(&guard, &permission_admin));
    assert!(!allows(&guard, &operator()));
}

#[test]
fn role_list_guard() {
    let guard = Guard::roles([roles::FACTORY_SUPER_ADMIN, roles::DEPARTMENT_ADMIN]);
    assert!(allows(&guard, &department_admin()));
    assert!(!allows(&guard, &operator()));
}

#[test]
fn user_type_guards() {
    let platform = User::platform("p1", roles::PLATFORM_OPERATOR);
    assert!(allows(&Guard::platform_only(), &platform));
    assert!(!allows(&Guard::platform_only(), &operator()));
    assert!(allows(&Guard::factory_only(), &operator()));
    assert!(!allows(&Guard::factory_only(), &platform));
}

#[test]
fn custom_guard_reads_external_state() {
    let flag = Arc::new(AtomicBool::new(false));
    let observed = flag.clone();
    let guard = Guard::custom(move || observed.load(Ordering::SeqCst));

    assert!(!allows(&guard, &operator()));
    flag.store(true, Ordering::SeqCst);
    assert!(allows(&guard, &operator()));
}

#[test]
fn absent_user_is_denied_by_every_guard() {
    let resolver = PermissionResolver::default();
    let guards = [
        Guard::permission("dashboard"),
        Guard::any_of(Vec::<String>::new()),
        Guard::roles([roles::VIEWER]),
        Guard::platform_only(),
        Guard::factory_only(),
        Guard::custom(|| true),
        Guard::from(CompositeGuard::new(Operator::And)),
    ];
    for guard in &guards {
        assert!(!guard.evaluate(&resolver, None));
    }
}

// ==================== Implicit AND ====================

#[test]
fn all_supplied_criteria_must_pass() {
    let guard = Guard::Access(
        AccessGuard::new()
            .with_permission("production:write")
            .with_department("farming"),
    );
    // permission passes, department fails
    assert!(!allows(&guard, &operator()));

    let guard = Guard::Access(
        AccessGuard::new()
            .with_permission("production:write")
            .with_department("processing")
            .with_roles([roles::OPERATOR]),
    );
    assert!(allows(&guard, &operator()));
}

// ==================== Composite ====================

fn two_failing_one_passing(default_operator: Operator) -> Guard {
    CompositeGuard::new(default_operator)
        .with(Check::permission("finance"))
        .with(Check::role([roles::FACTORY_SUPER_ADMIN]))
        .with(Check::department("processing"))
        .into()
}

#[test]
fn composite_or_passes_with_one_passing_check() {
    assert!(allows(&two_failing_one_passing(Operator::Or), &operator()));
}

#[test]
fn composite_and_fails_with_one_failing_check() {
    assert!(!allows(&two_failing_one_passing(Operator::And), &operator()));
}

#[test]
fn permission_list_is_one_atomic_or_check_inside_and() {
    let guard: Guard = CompositeGuard::new(Operator::And)
        .with(Check::any_permission(["finance", "production:write"]))
        .with(Check::department("processing"))
        .into();
    assert!(allows(&guard, &operator()));
}

#[test]
fn composite_mixes_custom_checks() {
    let guard: Guard = CompositeGuard::new(Operator::And)
        .with(Check::role([roles::DEPARTMENT_ADMIN]))
        .with(Check::custom(|| false))
        .into();
    assert!(!allows(&guard, &department_admin()));

    let guard: Guard = CompositeGuard::new(Operator::And)
        .with(Check::custom(|| false))
        .with(Check::role([roles::DEPARTMENT_ADMIN]).with_operator(Operator::Or))
        .into();
    assert!(allows(&guard, &department_admin()));
}

#[test]
fn composite_capability_checks_for_platform_users() {
    let platform = User::platform("p1", roles::PLATFORM_OPERATOR);
    let guard: Guard = CompositeGuard::new(Operator::Or)
        .with(Check::permission(consts::CREATE_FACTORY))
        .with(Check::permission(consts::MANAGE_WHITELIST))
        .into();
    assert!(allows(&guard, &platform));
}

// ==================== Decisions ====================

#[test]
fn decision_adapter_respects_loading_flag() {
    let resolver = PermissionResolver::default();
    let guard = Guard::permission("dashboard");

    assert_eq!(decide(&resolver, &guard, &AuthSnapshot::loading()), GuardOutcome::Loading);
    assert_eq!(
        decide(&resolver, &guard, &AuthSnapshot::signed_in(operator())),
        GuardOutcome::Allowed
    );
    assert_eq!(
        decide(&resolver, &Guard::platform_only(), &AuthSnapshot::signed_in(operator())),
        GuardOutcome::Denied
    );
}
