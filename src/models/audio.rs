// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Audio object metadata and upload payloads.

use crate::gateway::StoredObject;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Name prefix the store uses for empty-folder marker objects.
pub const PLACEHOLDER_PREFIX: &str = ".emptyFolderPlaceholder";

/// One stored audio file in a user's namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AudioObject {
    /// Object name within the namespace (also the title shown to the user)
    pub name: String,
    /// Size in bytes
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub size_bytes: u64,
}

impl AudioObject {
    /// Convert a listed object, dropping store placeholders.
    pub fn from_stored(object: &StoredObject) -> Option<Self> {
        if is_placeholder(&object.name) {
            return None;
        }
        Some(Self {
            name: object.name.clone(),
            size_bytes: object.size_bytes.unwrap_or(0),
        })
    }
}

/// Whether a listed name is a store-internal placeholder rather than user data.
pub fn is_placeholder(name: &str) -> bool {
    name.starts_with(PLACEHOLDER_PREFIX)
}

/// A file selected for upload.
#[derive(Debug, Clone)]
pub struct AudioFile {
    pub name: String,
    pub bytes: Bytes,
}

impl AudioFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// MIME type inferred from the file extension.
    pub fn content_type(&self) -> &'static str {
        let ext = self
            .name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());

        match ext.as_deref() {
            Some("mp3") => "audio/mpeg",
            Some("wav") => "audio/wav",
            Some("ogg" | "oga") => "audio/ogg",
            Some("opus") => "audio/opus",
            Some("flac") => "audio/flac",
            Some("m4a" | "mp4") => "audio/mp4",
            Some("aac") => "audio/aac",
            Some("webm") => "audio/webm",
            _ => "application/octet-stream",
        }
    }

    /// Check that the name can be used as a key inside one namespace.
    pub fn validate_name(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name is empty".to_string());
        }
        if self.name.contains('/') {
            return Err(format!("{} contains '/'", self.name));
        }
        if is_placeholder(&self.name) {
            return Err(format!("{} is reserved", self.name));
        }
        Ok(())
    }
}
