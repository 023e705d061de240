// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory gateways for controller tests.

#![allow(dead_code)]

use async_trait::async_trait;
use audio_vault::error::GatewayError;
use audio_vault::gateway::{
    AuthEvent, IdentityGateway, ListOptions, ObjectRef, ObjectStoreGateway, Session,
    SessionChange, SessionChangeFanout, SessionChanges, SessionUser, SignInRedirect,
    StoredObject,
};
use audio_vault::models::{Identity, UserProfile};
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

pub fn session_user(user_id: &str) -> SessionUser {
    SessionUser {
        id: user_id.to_string(),
        display_handle: Some(format!("{user_id}-handle")),
        display_name: None,
        email: Some(format!("{user_id}@example.com")),
    }
}

pub fn session_for(user_id: &str) -> Session {
    Session {
        access_token: format!("{user_id}-access"),
        refresh_token: format!("{user_id}-refresh"),
        expires_at: None,
        user: session_user(user_id),
    }
}

pub fn identity(user_id: &str) -> Identity {
    Identity::user(UserProfile::from(&session_user(user_id)))
}

/// Poll until `cond` holds, failing the test after two seconds.
pub async fn wait_until<F: Fn() -> bool>(what: &str, cond: F) {
    let waited = tokio::time::timeout(Duration::from_secs(2), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "timed out waiting for {what}");
}

// ─── Identity ────────────────────────────────────────────────

/// Identity gateway holding its session in memory.
#[derive(Default)]
pub struct FakeIdentityGateway {
    pub changes: SessionChangeFanout,
    session: Mutex<Option<Session>>,
    pub fail_current: AtomicBool,
    pub fail_sign_out: AtomicBool,
    pub sign_out_calls: AtomicUsize,
    pub current_calls: AtomicUsize,
    current_gate: Mutex<Option<Arc<Semaphore>>>,
}

impl FakeIdentityGateway {
    pub fn with_session(user_id: &str) -> Self {
        let gateway = Self::default();
        *gateway.session.lock() = Some(session_for(user_id));
        gateway
    }

    /// Provider-originated change.
    pub fn emit(&self, change: SessionChange) {
        *self.session.lock() = change.session.clone();
        self.changes.emit(change);
    }

    pub fn sign_in_as(&self, user_id: &str) {
        self.emit(SessionChange::signed_in(session_for(user_id)));
    }

    pub fn sign_out_remote(&self) {
        self.emit(SessionChange::signed_out());
    }

    pub fn token_refreshed(&self, user_id: &str) {
        self.emit(SessionChange {
            event: AuthEvent::TokenRefreshed,
            session: Some(session_for(user_id)),
        });
    }

    /// Hold `current_session` until a permit is added to the returned gate.
    pub fn gate_current(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.current_gate.lock() = Some(Arc::clone(&gate));
        gate
    }
}

#[async_trait]
impl IdentityGateway for FakeIdentityGateway {
    async fn current_session(&self) -> Result<Option<Session>, GatewayError> {
        self.current_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.current_gate.lock().clone();
        if let Some(gate) = gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        if self.fail_current.load(Ordering::SeqCst) {
            return Err(GatewayError::Transport("connection refused".to_string()));
        }
        Ok(self.session.lock().clone())
    }

    fn on_session_change(&self) -> SessionChanges {
        self.changes.subscribe()
    }

    async fn sign_in_with_provider(&self, provider: &str) -> Result<SignInRedirect, GatewayError> {
        if !matches!(provider, "github" | "google") {
            return Err(GatewayError::UnknownProvider(provider.to_string()));
        }
        Ok(SignInRedirect {
            provider: provider.to_string(),
            url: format!("https://auth.example.com/authorize?provider={provider}"),
        })
    }

    async fn complete_sign_in(&self, callback_url: &str) -> Result<Session, GatewayError> {
        if !callback_url.contains("access_token=") {
            return Err(GatewayError::Decode("missing access_token".to_string()));
        }
        let session = session_for("callback-user");
        self.emit(SessionChange::signed_in(session.clone()));
        Ok(session)
    }

    async fn refresh_session(&self) -> Result<Session, GatewayError> {
        let session = self.session.lock().clone().ok_or(GatewayError::NoSession)?;
        self.emit(SessionChange {
            event: AuthEvent::TokenRefreshed,
            session: Some(session.clone()),
        });
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), GatewayError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(GatewayError::Status {
                status: 500,
                message: "logout failed".to_string(),
            });
        }
        self.sign_out_remote();
        Ok(())
    }
}

// ─── Object store ────────────────────────────────────────────

/// Object store keeping `key -> size` in a sorted map.
#[derive(Default)]
pub struct FakeObjectStore {
    objects: Mutex<BTreeMap<String, u64>>,
    pub upload_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub completed_lists: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub fail_list: AtomicBool,
    pub fail_upload: AtomicBool,
    pub fail_delete: AtomicBool,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    list_call_gates: Mutex<HashMap<usize, Arc<Semaphore>>>,
}

impl FakeObjectStore {
    pub fn put(&self, key: &str, size: u64) {
        self.objects.lock().insert(key.to_string(), size);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().contains_key(key)
    }

    pub fn calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
            + self.list_calls.load(Ordering::SeqCst)
            + self.delete_calls.load(Ordering::SeqCst)
    }

    /// Hold list and upload calls under `prefix` until permits are added.
    pub fn gate(&self, prefix: &str) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.gates
            .lock()
            .insert(prefix.to_string(), Arc::clone(&gate));
        gate
    }

    /// Hold only the `n`th list call (counting from zero) until a permit is
    /// added. Its result reflects the store contents at release time.
    pub fn gate_list_call(&self, n: usize) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.list_call_gates.lock().insert(n, Arc::clone(&gate));
        gate
    }

    async fn pass_gate(&self, key_or_prefix: &str) {
        let gate = self
            .gates
            .lock()
            .iter()
            .find(|(prefix, _)| key_or_prefix.starts_with(prefix.as_str()))
            .map(|(_, gate)| Arc::clone(gate));
        if let Some(gate) = gate {
            gate.acquire().await.expect("gate closed").forget();
        }
    }
}

#[async_trait]
impl ObjectStoreGateway for FakeObjectStore {
    async fn upload(
        &self,
        key: &str,
        body: Bytes,
        _content_type: &str,
    ) -> Result<ObjectRef, GatewayError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        self.pass_gate(key).await;
        if self.fail_upload.load(Ordering::SeqCst) {
            return Err(GatewayError::Transport("upload interrupted".to_string()));
        }

        let mut objects = self.objects.lock();
        if objects.contains_key(key) {
            return Err(GatewayError::Status {
                status: 409,
                message: "The resource already exists".to_string(),
            });
        }
        objects.insert(key.to_string(), body.len() as u64);
        Ok(ObjectRef {
            key: key.to_string(),
        })
    }

    async fn list(
        &self,
        prefix: &str,
        options: &ListOptions,
    ) -> Result<Vec<StoredObject>, GatewayError> {
        let call = self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.pass_gate(prefix).await;
        let call_gate = self.list_call_gates.lock().get(&call).cloned();
        if let Some(gate) = call_gate {
            gate.acquire().await.expect("gate closed").forget();
        }

        let result = if self.fail_list.load(Ordering::SeqCst) {
            Err(GatewayError::Status {
                status: 503,
                message: "storage unavailable".to_string(),
            })
        } else {
            Ok(self
                .objects
                .lock()
                .iter()
                .filter_map(|(key, size)| {
                    key.strip_prefix(prefix).map(|name| StoredObject {
                        name: name.to_string(),
                        id: Some(format!("id-{key}")),
                        size_bytes: Some(*size),
                        ..StoredObject::default()
                    })
                })
                .skip(options.offset as usize)
                .take(options.limit as usize)
                .collect())
        };

        self.completed_lists.fetch_add(1, Ordering::SeqCst);
        result
    }

    async fn delete(&self, key: &str) -> Result<(), GatewayError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(GatewayError::Status {
                status: 500,
                message: "delete failed".to_string(),
            });
        }
        self.objects.lock().remove(key);
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://cdn.example.com/audio/{key}")
    }
}
