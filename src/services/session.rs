// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session controller: the single source of truth for who is signed in.
//!
//! The controller is the only caller of the [`IdentityGateway`]. A pump task
//! drains the gateway's change stream in order and republishes every change
//! to registered handlers. Handlers run while the registry lock is held, so
//! they see identities strictly in emission order and must not call back
//! into the controller.

use crate::error::{GatewayError, SessionError};
use crate::gateway::{IdentityGateway, SessionChange, SessionChanges, SignInRedirect};
use crate::models::Identity;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;

type Handler = Box<dyn FnMut(&Identity) + Send>;

#[derive(Default)]
struct Registry {
    current: Identity,
    handlers: Vec<(u64, Handler)>,
    next_id: u64,
    /// Number of gateway notifications applied so far.
    applied: u64,
    closed: bool,
}

#[derive(Default)]
struct Shared {
    registry: Mutex<Registry>,
}

impl Shared {
    fn apply_change(&self, change: SessionChange) {
        let identity = Identity::from(change.session.as_ref().map(|s| &s.user));
        tracing::info!(
            event = ?change.event,
            user_id = identity.user_id().unwrap_or("<none>"),
            "Session changed"
        );

        let mut registry = self.registry.lock();
        registry.applied += 1;
        Self::publish(&mut registry, identity);
    }

    /// Publish the startup identity unless a change notification got there first.
    fn publish_initial(&self, identity: Identity, applied_before: u64) -> Identity {
        let mut registry = self.registry.lock();
        if registry.applied != applied_before {
            tracing::debug!("Session changed during startup fetch, keeping newer identity");
            return registry.current.clone();
        }
        Self::publish(&mut registry, identity.clone());
        identity
    }

    fn publish(registry: &mut Registry, identity: Identity) {
        if registry.closed {
            return;
        }
        registry.current = identity;
        let identity = registry.current.clone();
        for (_, handler) in registry.handlers.iter_mut() {
            handler(&identity);
        }
    }
}

/// Handle for a registered change handler.
///
/// The handler is removed exactly once: on [`Subscription::unsubscribe`], on
/// drop, or when the controller shuts down, whichever comes first.
#[must_use = "dropping a Subscription unregisters its handler"]
pub struct Subscription {
    id: u64,
    shared: Weak<Shared>,
    released: bool,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if std::mem::replace(&mut self.released, true) {
            return;
        }
        if let Some(shared) = self.shared.upgrade() {
            shared
                .registry
                .lock()
                .handlers
                .retain(|(id, _)| *id != self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

/// Owns the authentication state machine.
pub struct SessionController {
    gateway: Arc<dyn IdentityGateway>,
    shared: Arc<Shared>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl SessionController {
    /// Create the controller and start listening for gateway changes.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(gateway: Arc<dyn IdentityGateway>) -> Self {
        let shared = Arc::new(Shared::default());
        let changes = gateway.on_session_change();
        let pump = tokio::spawn(pump_changes(changes, Arc::downgrade(&shared)));

        Self {
            gateway,
            shared,
            pump: Mutex::new(Some(pump)),
        }
    }

    /// Fetch the current session once and publish it.
    ///
    /// Never fails: a gateway error is logged and treated as "no user".
    pub async fn initialize(&self) -> Identity {
        let applied_before = self.shared.registry.lock().applied;

        let identity = match self.gateway.current_session().await {
            Ok(session) => Identity::from(session.as_ref().map(|s| &s.user)),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch session, continuing signed out");
                Identity::Anonymous
            }
        };

        let identity = self.shared.publish_initial(identity, applied_before);
        tracing::info!(
            user_id = identity.user_id().unwrap_or("<none>"),
            "Session initialized"
        );
        identity
    }

    /// The identity published most recently.
    pub fn current(&self) -> Identity {
        self.shared.registry.lock().current.clone()
    }

    /// Register a handler for every identity change, in emission order.
    pub fn subscribe_to_changes<F>(&self, handler: F) -> Subscription
    where
        F: FnMut(&Identity) + Send + 'static,
    {
        self.register(Box::new(handler), false)
    }

    /// Like [`subscribe_to_changes`](Self::subscribe_to_changes), but first
    /// calls `handler` with the current identity.
    ///
    /// Both happen under the registry lock, so no change can slip in between
    /// the replayed identity and the first notification.
    pub fn subscribe_with_current<F>(&self, handler: F) -> Subscription
    where
        F: FnMut(&Identity) + Send + 'static,
    {
        self.register(Box::new(handler), true)
    }

    fn register(&self, mut handler: Handler, replay_current: bool) -> Subscription {
        let mut registry = self.shared.registry.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        if !registry.closed {
            if replay_current {
                handler(&registry.current);
            }
            registry.handlers.push((id, handler));
        }

        Subscription {
            id,
            shared: Arc::downgrade(&self.shared),
            released: false,
        }
    }

    /// Number of registered handlers.
    pub fn subscriber_count(&self) -> usize {
        self.shared.registry.lock().handlers.len()
    }

    /// Start a redirect-based sign-in with a named provider.
    ///
    /// Returns once the handshake is initiated; the new identity arrives
    /// later through the change subscription.
    pub async fn sign_in(&self, provider: &str) -> Result<SignInRedirect, SessionError> {
        self.gateway
            .sign_in_with_provider(provider)
            .await
            .map_err(|e| {
                tracing::error!(provider, error = %e, "Failed to initiate sign-in");
                SessionError::AuthInitiation(e)
            })
    }

    /// Hand the provider's redirect URL back to the gateway.
    pub async fn complete_sign_in(&self, callback_url: &str) -> Result<Identity, SessionError> {
        match self.gateway.complete_sign_in(callback_url).await {
            Ok(session) => Ok(Identity::from(Some(&session.user))),
            Err(GatewayError::Decode(msg)) => {
                tracing::warn!(error = %msg, "Rejected sign-in callback");
                Err(SessionError::Callback(msg))
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to complete sign-in");
                Err(SessionError::AuthInitiation(e))
            }
        }
    }

    /// Exchange the refresh token for a fresh access token.
    pub async fn refresh_session(&self) -> Result<(), SessionError> {
        self.gateway.refresh_session().await.map(|_| ()).map_err(|e| {
            tracing::warn!(error = %e, "Failed to refresh session");
            SessionError::Refresh(e)
        })
    }

    /// Revoke the current session.
    ///
    /// The local identity is left alone; "no user" arrives through the
    /// change subscription once the gateway reports it.
    pub async fn sign_out(&self) -> Result<(), SessionError> {
        self.gateway.sign_out().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to sign out");
            SessionError::AuthRevocation(e)
        })
    }

    /// Stop the change pump and drop every handler. Idempotent.
    pub fn shutdown(&self) {
        if let Some(pump) = self.pump.lock().take() {
            pump.abort();
        }

        let handlers = {
            let mut registry = self.shared.registry.lock();
            registry.closed = true;
            std::mem::take(&mut registry.handlers)
        };
        if !handlers.is_empty() {
            tracing::debug!(handlers = handlers.len(), "Released session handlers");
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn pump_changes(mut changes: SessionChanges, shared: Weak<Shared>) {
    while let Some(change) = changes.recv().await {
        let Some(shared) = shared.upgrade() else {
            break;
        };
        shared.apply_change(change);
    }
    tracing::debug!("Session change pump stopped");
}
