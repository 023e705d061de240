// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Audio library controller: the per-user collection of uploaded audio.
//!
//! The controller is the only caller of the [`ObjectStoreGateway`]. Every
//! refresh and every identity change bumps a generation counter; a list
//! response is applied only if its generation is still the latest and its
//! identity is still the active one. Results for any other user, or for a
//! library that has been dropped, are discarded.

use super::session::{SessionController, Subscription};
use crate::error::{GatewayError, LibraryError, Result};
use crate::gateway::{ListOptions, ObjectStoreGateway};
use crate::models::{
    AudioFile, AudioObject, Identity, LibrarySnapshot, RefreshOutcome, SyncStatus, UploadReceipt,
    ViewCommand,
};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::sync::watch;

#[derive(Default)]
struct LibraryState {
    identity: Identity,
    objects: Vec<AudioObject>,
    status: SyncStatus,
    last_error: Option<String>,
    generation: u64,
}

impl LibraryState {
    fn snapshot(&self) -> LibrarySnapshot {
        LibrarySnapshot {
            identity: self.identity.clone(),
            objects: self.objects.clone(),
            status: self.status,
            last_error: self.last_error.clone(),
        }
    }
}

/// A list request in flight, tagged with the identity it was issued for.
struct RefreshTicket {
    identity: Identity,
    prefix: String,
    generation: u64,
}

struct LibraryInner {
    store: Arc<dyn ObjectStoreGateway>,
    page_size: u32,
    state: Mutex<LibraryState>,
    snapshots: watch::Sender<LibrarySnapshot>,
}

impl LibraryInner {
    fn publish(&self, state: &LibraryState) {
        self.snapshots.send_replace(state.snapshot());
    }

    /// Switch to `identity` and start a refresh for it.
    ///
    /// Returns `None` for "no user": the collection is cleared and the status
    /// forced to idle, invalidating anything still in flight.
    fn begin_refresh(&self, identity: &Identity) -> Option<RefreshTicket> {
        let mut state = self.state.lock();
        state.generation += 1;

        // Never show one user's objects under another user.
        if !state.identity.same_principal(identity) {
            state.objects.clear();
            state.last_error = None;
        }
        state.identity = identity.clone();

        let Some(profile) = identity.profile() else {
            state.status = SyncStatus::Idle;
            self.publish(&state);
            return None;
        };

        state.status = SyncStatus::Loading;
        self.publish(&state);

        Some(RefreshTicket {
            identity: identity.clone(),
            prefix: profile.namespace(),
            generation: state.generation,
        })
    }

    /// Apply a list response unless it has gone stale.
    fn finish_refresh(
        &self,
        ticket: RefreshTicket,
        result: std::result::Result<Vec<AudioObject>, GatewayError>,
    ) -> Result<RefreshOutcome> {
        let mut state = self.state.lock();

        if state.generation != ticket.generation || !state.identity.same_principal(&ticket.identity)
        {
            tracing::debug!(
                user_id = ticket.identity.user_id().unwrap_or("<none>"),
                issued = ticket.generation,
                current = state.generation,
                failed = result.is_err(),
                "Discarding stale refresh result"
            );
            return Ok(RefreshOutcome::Discarded);
        }

        match result {
            Ok(objects) => {
                tracing::debug!(
                    user_id = ticket.identity.user_id().unwrap_or("<none>"),
                    count = objects.len(),
                    "Library refreshed"
                );
                state.objects = objects;
                state.status = SyncStatus::Ready;
                state.last_error = None;
                self.publish(&state);
                Ok(RefreshOutcome::Applied)
            }
            Err(e) => {
                tracing::error!(
                    user_id = ticket.identity.user_id().unwrap_or("<none>"),
                    error = %e,
                    "Failed to list audio"
                );
                state.status = SyncStatus::Error;
                state.last_error = Some(e.to_string());
                self.publish(&state);
                Err(LibraryError::ListFailure(e))
            }
        }
    }

    /// React to a published identity. Same-principal updates (token refresh,
    /// profile edits) only replace the stored identity.
    fn on_identity(&self, identity: &Identity) -> Option<RefreshTicket> {
        {
            let mut state = self.state.lock();
            if state.identity.same_principal(identity) {
                if state.identity != *identity {
                    state.identity = identity.clone();
                    self.publish(&state);
                }
                return None;
            }
        }
        self.begin_refresh(identity)
    }

    /// Append an uploaded object if its owner is still the active user.
    fn append_uploaded(&self, owner: &Identity, object: AudioObject) -> bool {
        let mut state = self.state.lock();
        if !state.identity.same_principal(owner) {
            tracing::debug!(
                user_id = owner.user_id().unwrap_or("<none>"),
                name = %object.name,
                "Identity changed during upload, skipping local append"
            );
            return false;
        }
        state.objects.push(object);
        self.publish(&state);
        true
    }

    fn is_active(&self, identity: &Identity) -> bool {
        self.state.lock().identity.same_principal(identity)
    }
}

/// Fetch every page under `prefix`, drop placeholders, sort by name.
///
/// Paging ends at the first short page.
async fn list_all(
    store: &dyn ObjectStoreGateway,
    prefix: &str,
    page_size: u32,
) -> std::result::Result<Vec<AudioObject>, GatewayError> {
    let mut options = ListOptions::by_name(page_size);
    let mut objects = Vec::new();

    loop {
        let page = store.list(prefix, &options).await?;
        let last_page = page.len() < page_size as usize;
        objects.extend(page.iter().filter_map(AudioObject::from_stored));
        if last_page {
            break;
        }
        options = options.next_page();
    }

    objects.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(objects)
}

/// Owns the audio collection of the active identity.
pub struct AudioLibraryController {
    inner: Arc<LibraryInner>,
    subscription: Mutex<Option<Subscription>>,
}

impl AudioLibraryController {
    pub fn new(store: Arc<dyn ObjectStoreGateway>, page_size: u32) -> Self {
        let (snapshots, _) = watch::channel(LibrarySnapshot::default());
        Self {
            inner: Arc::new(LibraryInner {
                store,
                page_size: page_size.max(1),
                state: Mutex::new(LibraryState::default()),
                snapshots,
            }),
            subscription: Mutex::new(None),
        }
    }

    /// Follow the session: sync to its current identity, then refresh on
    /// every change of principal.
    ///
    /// Replaces any earlier attachment. Must be called from within a Tokio
    /// runtime.
    pub fn attach(&self, session: &SessionController) {
        let weak = Arc::downgrade(&self.inner);
        let subscription = session.subscribe_with_current(move |identity| {
            spawn_refresh_for(&weak, identity);
        });

        // Replacing the old subscription unregisters it.
        let previous = self.subscription.lock().replace(subscription);
        drop(previous);
    }

    /// Stop following the session. Idempotent.
    pub fn detach(&self) {
        let subscription = self.subscription.lock().take();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
            tracing::debug!("Library detached from session");
        }
    }

    /// Re-synchronize the collection from the store for `identity`.
    ///
    /// A result that went stale while the list was in flight (the identity
    /// changed, or a newer refresh started) is dropped, whether it succeeded
    /// or failed, and reported as [`RefreshOutcome::Discarded`].
    pub async fn refresh(&self, identity: &Identity) -> Result<RefreshOutcome> {
        let Some(ticket) = self.inner.begin_refresh(identity) else {
            return Ok(RefreshOutcome::Cleared);
        };
        let result = list_all(self.inner.store.as_ref(), &ticket.prefix, self.inner.page_size).await;
        self.inner.finish_refresh(ticket, result)
    }

    /// Upload a file into the user's namespace and append it locally.
    ///
    /// Name collisions are left to the store.
    pub async fn upload(&self, identity: &Identity, file: AudioFile) -> Result<UploadReceipt> {
        let profile = identity.profile().ok_or(LibraryError::NotAuthenticated)?;
        file.validate_name().map_err(LibraryError::InvalidFileName)?;

        let key = profile.object_key(&file.name);
        let content_type = file.content_type();
        let object = AudioObject {
            name: file.name.clone(),
            size_bytes: file.size_bytes(),
        };

        let uploaded = self
            .inner
            .store
            .upload(&key, file.bytes, content_type)
            .await
            .map_err(|e| {
                tracing::error!(key = %key, error = %e, "Failed to upload audio");
                LibraryError::UploadFailure(e)
            })?;

        tracing::info!(key = %uploaded.key, size = object.size_bytes, "Audio uploaded");
        let appended = self.inner.append_uploaded(identity, object.clone());

        Ok(UploadReceipt {
            key: uploaded.key,
            object,
            appended,
            command: ViewCommand::ClearFileSelection,
        })
    }

    /// Delete an object, then reload the collection from the store.
    pub async fn delete(&self, identity: &Identity, name: &str) -> Result<()> {
        let profile = identity.profile().ok_or(LibraryError::NotAuthenticated)?;
        let key = profile.object_key(name);

        self.inner.store.delete(&key).await.map_err(|e| {
            tracing::error!(key = %key, error = %e, "Failed to delete audio");
            LibraryError::DeleteFailure(e)
        })?;
        tracing::info!(key = %key, "Audio deleted");

        if !self.inner.is_active(identity) {
            tracing::debug!(key = %key, "Identity changed during delete, skipping refresh");
            return Ok(());
        }
        self.refresh(identity).await.map(|_| ())
    }

    /// Playback URL for an object, or `None` for "no user".
    pub fn public_url(&self, identity: &Identity, name: &str) -> Option<String> {
        identity
            .profile()
            .map(|profile| self.inner.store.public_url(&profile.object_key(name)))
    }

    pub fn snapshot(&self) -> LibrarySnapshot {
        self.inner.snapshots.borrow().clone()
    }

    /// Receiver notified after every state change.
    pub fn watch(&self) -> watch::Receiver<LibrarySnapshot> {
        self.inner.snapshots.subscribe()
    }

    pub fn status(&self) -> SyncStatus {
        self.inner.state.lock().status
    }

    pub fn objects(&self) -> Vec<AudioObject> {
        self.inner.state.lock().objects.clone()
    }

    pub fn identity(&self) -> Identity {
        self.inner.state.lock().identity.clone()
    }
}

/// Handler body for identity changes. Tagging runs synchronously so changes
/// apply in order; only the list call itself runs in the background.
fn spawn_refresh_for(weak: &Weak<LibraryInner>, identity: &Identity) {
    let Some(inner) = weak.upgrade() else {
        return;
    };
    let Some(ticket) = inner.on_identity(identity) else {
        return;
    };

    let store = Arc::clone(&inner.store);
    let page_size = inner.page_size;
    let weak = weak.clone();
    drop(inner);

    tokio::spawn(async move {
        let result = list_all(store.as_ref(), &ticket.prefix, page_size).await;
        match weak.upgrade() {
            Some(inner) => {
                if let Err(e) = inner.finish_refresh(ticket, result) {
                    tracing::warn!(error = %e, "Background library refresh failed");
                }
            }
            None => tracing::debug!("Library dropped, discarding refresh result"),
        }
    });
}
