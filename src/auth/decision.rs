//! Adapter between guard evaluation and whatever renders the result.
//!
//! The identity collaborator supplies the current user together with an
//! `is_loading` flag; while loading no guard is evaluated.

use serde::{Deserialize, Serialize};

use super::guard::Guard;
use super::resolver::PermissionResolver;
use super::types::User;

/// Session state as handed over by the identity collaborator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSnapshot {
    pub user: Option<User>,
    #[serde(default)]
    pub is_loading: bool,
}

impl AuthSnapshot {
    pub fn loading() -> Self {
        Self {
            user: None,
            is_loading: true,
        }
    }

    pub fn signed_in(user: User) -> Self {
        Self {
            user: Some(user),
            is_loading: false,
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }
}

/// What the presentation layer should show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardOutcome {
    /// Render the loading placeholder
    Loading,
    /// Render the protected content
    Allowed,
    /// Render the fallback
    Denied,
}

impl GuardOutcome {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardOutcome::Allowed)
    }
}

pub fn decide(
    resolver: &PermissionResolver,
    guard: &Guard,
    snapshot: &AuthSnapshot,
) -> GuardOutcome {
    if snapshot.is_loading {
        return GuardOutcome::Loading;
    }
    if guard.evaluate(resolver, snapshot.user.as_ref()) {
        GuardOutcome::Allowed
    } else {
        GuardOutcome::Denied
    }
}
