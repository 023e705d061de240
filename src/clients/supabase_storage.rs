// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Storage API client implementing [`ObjectStoreGateway`] for one bucket.

use super::http::{check_response, check_response_json, encode_key, transport_error, AccessToken};
use crate::config::Config;
use crate::error::GatewayError;
use crate::gateway::{ListOptions, ObjectRef, ObjectStoreGateway, StoredObject};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Storage API client scoped to a single bucket.
#[derive(Clone)]
pub struct SupabaseStorageClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    bucket: String,
    access_token: AccessToken,
}

impl SupabaseStorageClient {
    pub fn new(config: &Config, http: reqwest::Client, access_token: AccessToken) -> Self {
        Self {
            http,
            base_url: config.storage_url(),
            api_key: config.supabase_key.clone(),
            bucket: config.bucket.clone(),
            access_token,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Requests run as the signed-in user so row-level policies apply.
    fn bearer(&self) -> String {
        self.access_token
            .get()
            .unwrap_or_else(|| self.api_key.clone())
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "{}/object/{}/{}",
            self.base_url,
            urlencoding::encode(&self.bucket),
            encode_key(key)
        )
    }
}

#[async_trait]
impl ObjectStoreGateway for SupabaseStorageClient {
    async fn upload(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<ObjectRef, GatewayError> {
        let response = self
            .http
            .post(self.object_url(key))
            .header("apikey", &self.api_key)
            .bearer_auth(self.bearer())
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header(reqwest::header::CACHE_CONTROL, "max-age=3600")
            .header("x-upsert", "false")
            .body(body)
            .send()
            .await
            .map_err(transport_error)?;

        let uploaded: UploadResponse = check_response_json(response).await?;

        // The store reports the key with the bucket name in front.
        let bucket_prefix = format!("{}/", self.bucket);
        let key = uploaded
            .key
            .strip_prefix(&bucket_prefix)
            .map_or(uploaded.key.clone(), str::to_string);

        Ok(ObjectRef { key })
    }

    async fn list(
        &self,
        prefix: &str,
        options: &ListOptions,
    ) -> Result<Vec<StoredObject>, GatewayError> {
        let body = ListRequest { prefix, options };

        let response = self
            .http
            .post(format!(
                "{}/object/list/{}",
                self.base_url,
                urlencoding::encode(&self.bucket)
            ))
            .header("apikey", &self.api_key)
            .bearer_auth(self.bearer())
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let entries: Vec<ListEntry> = check_response_json(response).await?;
        Ok(entries.into_iter().map(StoredObject::from).collect())
    }

    async fn delete(&self, key: &str) -> Result<(), GatewayError> {
        let response = self
            .http
            .delete(self.object_url(key))
            .header("apikey", &self.api_key)
            .bearer_auth(self.bearer())
            .send()
            .await
            .map_err(transport_error)?;

        check_response(response).await?;
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!(
            "{}/object/public/{}/{}",
            self.base_url,
            urlencoding::encode(&self.bucket),
            encode_key(key)
        )
    }
}

#[derive(Serialize)]
struct ListRequest<'a> {
    prefix: &'a str,
    #[serde(flatten)]
    options: &'a ListOptions,
}

#[derive(Deserialize)]
struct UploadResponse {
    #[serde(rename = "Key")]
    key: String,
}

#[derive(Deserialize)]
struct ListEntry {
    name: String,
    id: Option<String>,
    updated_at: Option<DateTime<Utc>>,
    metadata: Option<ObjectMetadata>,
}

#[derive(Deserialize)]
struct ObjectMetadata {
    size: Option<u64>,
    mimetype: Option<String>,
}

impl From<ListEntry> for StoredObject {
    fn from(entry: ListEntry) -> Self {
        let (size_bytes, content_type) = entry
            .metadata
            .map_or((None, None), |m| (m.size, m.mimetype));

        Self {
            name: entry.name,
            id: entry.id,
            size_bytes,
            content_type,
            updated_at: entry.updated_at,
        }
    }
}
