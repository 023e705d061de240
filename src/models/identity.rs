// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity model: the authenticated-or-absent principal.

use crate::gateway::SessionUser;
use serde::Serialize;
use std::sync::Arc;

/// Profile of an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    /// Stable unique user ID (also the storage namespace)
    pub user_id: String,
    /// Short handle shown in the UI
    pub display_handle: String,
    /// Full display name, if the provider shared one
    pub display_name: Option<String>,
    /// Email address (may be None if not shared)
    pub email: Option<String>,
}

impl UserProfile {
    /// Storage namespace for this user (`<user_id>/`).
    pub fn namespace(&self) -> String {
        format!("{}/", self.user_id)
    }

    /// Storage key for an object owned by this user.
    pub fn object_key(&self, name: &str) -> String {
        format!("{}/{}", self.user_id, name)
    }
}

impl From<&SessionUser> for UserProfile {
    fn from(user: &SessionUser) -> Self {
        // Handle falls back from provider handle to email to the raw ID.
        let display_handle = user
            .display_handle
            .clone()
            .or_else(|| user.email.clone())
            .unwrap_or_else(|| user.id.clone());

        Self {
            user_id: user.id.clone(),
            display_handle,
            display_name: user.display_name.clone(),
            email: user.email.clone(),
        }
    }
}

/// Who is signed in right now.
///
/// Identities are immutable: a changed user is a new `Identity` value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "user", rename_all = "snake_case")]
pub enum Identity {
    #[default]
    Anonymous,
    User(Arc<UserProfile>),
}

impl Identity {
    pub fn user(profile: UserProfile) -> Self {
        Identity::User(Arc::new(profile))
    }

    /// The user profile, or `None` for "no user".
    pub fn profile(&self) -> Option<&UserProfile> {
        match self {
            Identity::Anonymous => None,
            Identity::User(profile) => Some(profile),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.profile().map(|p| p.user_id.as_str())
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Identity::Anonymous)
    }

    /// Whether both values name the same principal (ignores profile edits).
    pub fn same_principal(&self, other: &Identity) -> bool {
        self.user_id() == other.user_id()
    }
}

impl From<Option<&SessionUser>> for Identity {
    fn from(user: Option<&SessionUser>) -> Self {
        user.map_or(Identity::Anonymous, |u| Identity::user(UserProfile::from(u)))
    }
}
