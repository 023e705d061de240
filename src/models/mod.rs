// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod audio;
pub mod identity;
pub mod library;

pub use audio::{is_placeholder, AudioFile, AudioObject, PLACEHOLDER_PREFIX};
pub use identity::{Identity, UserProfile};
pub use library::{LibrarySnapshot, RefreshOutcome, SyncStatus, UploadReceipt, ViewCommand};
