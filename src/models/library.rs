// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! View-facing library state.

use super::{AudioObject, Identity};
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Whether the collection is being loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum SyncStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Error,
}

/// Read-only copy of the library for rendering.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LibrarySnapshot {
    pub identity: Identity,
    pub objects: Vec<AudioObject>,
    pub status: SyncStatus,
    /// Message from the last failed operation
    pub last_error: Option<String>,
}

impl LibrarySnapshot {
    pub fn names(&self) -> Vec<&str> {
        self.objects.iter().map(|o| o.name.as_str()).collect()
    }
}

/// What a refresh did to the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The listed objects replaced the collection.
    Applied,
    /// No user: the collection was emptied without a list call.
    Cleared,
    /// Superseded before it completed; the collection was left alone.
    Discarded,
}

/// Instruction returned to the view layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewCommand {
    /// Reset the file-selection input.
    ClearFileSelection,
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    /// Full storage key returned by the store
    pub key: String,
    pub object: AudioObject,
    /// False if the identity changed before the upload completed
    pub appended: bool,
    pub command: ViewCommand,
}
