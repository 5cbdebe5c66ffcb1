//! Trace Authz Library
//!
//! Role and permission evaluation for the traceability platform: static role
//! metadata and permission matrices, a resolver deriving facts from a user
//! snapshot, and composable guards producing allow/deny decisions.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

use std::path::Path;

pub mod auth;
pub mod config;
pub mod errors;

pub use auth::{
    decide, AccessGuard, Action, AuthSnapshot, Check, CompositeGuard, Guard, GuardOutcome, Module,
    Operator, PermissionConfig, PermissionLevel, PermissionResolver, Permissions,
    PlatformDetection, ResolvedUserType, User, UserType,
};
pub use errors::{AuthzError, AuthzResult};

/// Resolver over the compiled-in tables, configured from settings
pub fn resolver_from_settings(settings: &config::AuthzSettings) -> PermissionResolver {
    PermissionResolver::new(PermissionConfig::builtin())
        .with_detection(settings.platform_detection())
}

/// Loads settings from `config_dir` and builds the resolver they configure
pub fn load_resolver(
    config_dir: &Path,
) -> AuthzResult<(config::AuthzSettings, PermissionResolver)> {
    let settings = config::load_config_from(config_dir)?;
    let resolver = resolver_from_settings(&settings);
    Ok((settings, resolver))
}
