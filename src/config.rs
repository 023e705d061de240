// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! The backend URL and access key have no defaults: a missing value is fatal
//! for the host process and is reported before any controller is built.

use std::env;
use validator::Validate;

/// Default storage bucket holding user audio.
pub const DEFAULT_BUCKET: &str = "audio";

/// Default number of objects requested per list call.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone, Validate)]
pub struct Config {
    /// Base URL of the backend serving both the auth and storage APIs
    #[validate(url)]
    pub supabase_url: String,
    /// Project access key sent as `apikey` on every request
    #[validate(length(min = 1))]
    pub supabase_key: String,
    /// Bucket holding per-user audio folders
    #[validate(length(min = 1, max = 63))]
    pub bucket: String,
    /// Page size for list requests
    #[validate(range(min = 1, max = 1000))]
    pub page_size: u32,
    /// Where the identity provider redirects after consent
    #[validate(url)]
    pub redirect_url: Option<String>,
}

impl Config {
    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_key: "test_anon_key".to_string(),
            bucket: DEFAULT_BUCKET.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            redirect_url: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// `SUPABASE_URL` and `SUPABASE_KEY` are required. The `VITE_`-prefixed
    /// names used by the web build are accepted as fallbacks.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let config = Self {
            supabase_url: required("SUPABASE_URL", "VITE_SUPABASE_URL")?
                .trim_end_matches('/')
                .to_string(),
            supabase_key: required("SUPABASE_KEY", "VITE_SUPABASE_KEY")?,
            bucket: env::var("AUDIO_BUCKET").unwrap_or_else(|_| DEFAULT_BUCKET.to_string()),
            page_size: match env::var("AUDIO_PAGE_SIZE") {
                Ok(v) => v
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::Invalid(format!("AUDIO_PAGE_SIZE={v}")))?,
                Err(_) => DEFAULT_PAGE_SIZE,
            },
            redirect_url: env::var("AUTH_REDIRECT_URL").ok().filter(|v| !v.is_empty()),
        };

        config
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        Ok(config)
    }

    /// Base URL of the auth API.
    pub fn auth_url(&self) -> String {
        format!("{}/auth/v1", self.supabase_url)
    }

    /// Base URL of the storage API.
    pub fn storage_url(&self) -> String {
        format!("{}/storage/v1", self.supabase_url)
    }
}

fn required(name: &'static str, fallback: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .or_else(|_| env::var(fallback))
        .map(|v| v.trim().to_string())
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
