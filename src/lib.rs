// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Audio Vault: a signed-in user's personal audio library.
//!
//! This crate provides the client core: a session controller that tracks
//! who is signed in with the identity provider, and a library controller
//! that keeps that user's uploaded audio in sync with the object store.

pub mod clients;
pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod services;

use clients::{build_http_client, AccessToken, SupabaseAuthClient, SupabaseStorageClient};
use config::Config;
use error::GatewayError;
use gateway::{IdentityGateway, ObjectStoreGateway};
use models::Identity;
use services::{AudioLibraryController, SessionController};
use std::sync::Arc;

/// Controllers wired to their gateways.
pub struct AppContext {
    pub config: Config,
    pub session: SessionController,
    pub library: AudioLibraryController,
}

impl AppContext {
    /// Build the context against the hosted auth and storage APIs.
    pub fn from_config(config: Config) -> Result<Self, GatewayError> {
        let http = build_http_client()?;
        let access_token = AccessToken::default();

        let auth = Arc::new(SupabaseAuthClient::new(
            &config,
            http.clone(),
            access_token.clone(),
        ));
        let storage = Arc::new(SupabaseStorageClient::new(&config, http, access_token));

        Ok(Self::with_gateways(config, auth, storage))
    }

    /// Build the context from any gateway implementations.
    pub fn with_gateways(
        config: Config,
        identity: Arc<dyn IdentityGateway>,
        store: Arc<dyn ObjectStoreGateway>,
    ) -> Self {
        let session = SessionController::new(identity);
        let library = AudioLibraryController::new(store, config.page_size);
        library.attach(&session);

        Self {
            config,
            session,
            library,
        }
    }

    /// Discover the existing session; the library follows automatically.
    pub async fn start(&self) -> Identity {
        self.session.initialize().await
    }

    /// Release the session subscription and stop the change pump.
    pub fn shutdown(&self) {
        self.library.detach();
        self.session.shutdown();
    }
}
