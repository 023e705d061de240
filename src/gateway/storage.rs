// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Object store interface.

use crate::error::GatewayError;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// An entry returned by a list call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredObject {
    /// Name relative to the listed prefix
    pub name: String,
    /// Store-assigned ID; `None` for folders
    pub id: Option<String>,
    pub size_bytes: Option<u64>,
    pub content_type: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Reference to an uploaded object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    /// Key within the bucket
    pub key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortBy {
    pub column: String,
    pub order: SortOrder,
}

/// Paging and ordering for list calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOptions {
    pub limit: u32,
    pub offset: u32,
    pub sort_by: SortBy,
}

impl ListOptions {
    /// First page sorted by name ascending.
    pub fn by_name(limit: u32) -> Self {
        Self {
            limit,
            offset: 0,
            sort_by: SortBy {
                column: "name".to_string(),
                order: SortOrder::Asc,
            },
        }
    }

    pub fn next_page(&self) -> Self {
        Self {
            offset: self.offset + self.limit,
            ..self.clone()
        }
    }
}

/// Remote namespaced object store, scoped to one bucket.
#[async_trait]
pub trait ObjectStoreGateway: Send + Sync {
    async fn upload(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<ObjectRef, GatewayError>;

    async fn list(
        &self,
        prefix: &str,
        options: &ListOptions,
    ) -> Result<Vec<StoredObject>, GatewayError>;

    async fn delete(&self, key: &str) -> Result<(), GatewayError>;

    /// Public read URL for a key (consumed by the playback widget).
    fn public_url(&self, key: &str) -> String;
}
