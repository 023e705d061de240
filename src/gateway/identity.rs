// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity provider interface.

use crate::error::GatewayError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Authenticated user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub display_handle: Option<String>,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

/// An authenticated session.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub user: SessionUser,
}

// Tokens stay out of logs.
impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

/// Kind of provider-originated session change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// A change notification: the event plus the session after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionChange {
    pub event: AuthEvent,
    pub session: Option<Session>,
}

impl SessionChange {
    pub fn signed_in(session: Session) -> Self {
        Self {
            event: AuthEvent::SignedIn,
            session: Some(session),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            event: AuthEvent::SignedOut,
            session: None,
        }
    }
}

/// Where to send the user to start a provider sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInRedirect {
    pub provider: String,
    pub url: String,
}

/// Ordered stream of session changes. Dropping it unregisters the listener.
pub type SessionChanges = mpsc::UnboundedReceiver<SessionChange>;

/// Remote authentication service.
#[async_trait]
pub trait IdentityGateway: Send + Sync {
    /// The session the gateway currently holds, if any.
    async fn current_session(&self) -> Result<Option<Session>, GatewayError>;

    /// Register for change notifications, delivered in emission order.
    fn on_session_change(&self) -> SessionChanges;

    /// Start a redirect-based sign-in. Completion arrives as a change notification.
    async fn sign_in_with_provider(&self, provider: &str) -> Result<SignInRedirect, GatewayError>;

    /// Finish a sign-in from the provider's redirect URL.
    async fn complete_sign_in(&self, callback_url: &str) -> Result<Session, GatewayError>;

    /// Exchange the refresh token for a new access token.
    async fn refresh_session(&self) -> Result<Session, GatewayError>;

    /// Revoke the current session.
    async fn sign_out(&self) -> Result<(), GatewayError>;
}

/// Listener registry shared by gateway implementations.
///
/// Every listener receives every change in emission order; closed listeners
/// are pruned on the next emit.
#[derive(Default)]
pub struct SessionChangeFanout {
    senders: Mutex<Vec<mpsc::UnboundedSender<SessionChange>>>,
}

impl SessionChangeFanout {
    pub fn subscribe(&self) -> SessionChanges {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.lock().push(tx);
        rx
    }

    pub fn emit(&self, change: SessionChange) {
        let mut senders = self.senders.lock();
        senders.retain(|tx| tx.send(change.clone()).is_ok());
        tracing::debug!(
            event = ?change.event,
            listeners = senders.len(),
            "Session change emitted"
        );
    }

    pub fn listener_count(&self) -> usize {
        let mut senders = self.senders.lock();
        senders.retain(|tx| !tx.is_closed());
        senders.len()
    }
}
