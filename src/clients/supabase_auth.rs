// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Auth API client (GoTrue-compatible) implementing [`IdentityGateway`].
//!
//! Handles:
//! - Provider sign-in via redirect (implicit flow)
//! - Session refresh before the access token expires
//! - Sign-out / token revocation
//! - Ordered change notifications to every listener

use super::http::{check_response, check_response_json, transport_error, AccessToken};
use crate::config::Config;
use crate::error::GatewayError;
use crate::gateway::{
    AuthEvent, IdentityGateway, Session, SessionChange, SessionChangeFanout, SessionChanges,
    SessionUser, SignInRedirect,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashMap;
use url::{form_urlencoded, Url};

/// Margin before token expiration when we proactively refresh (5 minutes).
const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// Client for the hosted auth API.
pub struct SupabaseAuthClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    redirect_url: Option<String>,
    session: Mutex<Option<Session>>,
    access_token: AccessToken,
    changes: SessionChangeFanout,
    /// Serializes refreshes so a refresh token is only spent once.
    refresh_lock: tokio::sync::Mutex<()>,
}

impl SupabaseAuthClient {
    pub fn new(
        config: &Config,
        http: reqwest::Client,
        access_token: AccessToken,
    ) -> Self {
        Self {
            http,
            base_url: config.auth_url(),
            api_key: config.supabase_key.clone(),
            redirect_url: config.redirect_url.clone(),
            session: Mutex::new(None),
            access_token,
            changes: SessionChangeFanout::default(),
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Number of live change listeners.
    pub fn listener_count(&self) -> usize {
        self.changes.listener_count()
    }

    fn store_session(&self, session: &Session) {
        self.access_token.set(&session.access_token);
        *self.session.lock() = Some(session.clone());
    }

    fn clear_session(&self) {
        self.access_token.clear();
        *self.session.lock() = None;
    }

    /// Names of the external providers enabled for this project.
    async fn enabled_providers(&self) -> Result<Vec<String>, GatewayError> {
        let response = self
            .http
            .get(format!("{}/settings", self.base_url))
            .header("apikey", &self.api_key)
            .send()
            .await
            .map_err(transport_error)?;

        let settings: SettingsResponse = check_response_json(response).await?;
        let mut enabled: Vec<String> = settings
            .external
            .into_iter()
            .filter_map(|(name, on)| on.then_some(name))
            .collect();
        enabled.sort();
        Ok(enabled)
    }

    /// Fetch the user behind an access token.
    async fn get_user(&self, access_token: &str) -> Result<SessionUser, GatewayError> {
        let response = self
            .http
            .get(format!("{}/user", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(transport_error)?;

        let user: UserResponse = check_response_json(response).await?;
        Ok(user.into())
    }
}

#[async_trait]
impl IdentityGateway for SupabaseAuthClient {
    async fn current_session(&self) -> Result<Option<Session>, GatewayError> {
        let Some(session) = self.session.lock().clone() else {
            return Ok(None);
        };

        if !expires_soon(&session, Utc::now()) {
            return Ok(Some(session));
        }

        tracing::debug!(user_id = %session.user.id, "Session expiring, refreshing");
        match self.refresh_session().await {
            Ok(session) => Ok(Some(session)),
            Err(e) if e.is_unauthorized() => {
                tracing::warn!(error = %e, "Refresh token rejected, dropping session");
                self.clear_session();
                self.changes.emit(SessionChange::signed_out());
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn on_session_change(&self) -> SessionChanges {
        self.changes.subscribe()
    }

    async fn sign_in_with_provider(&self, provider: &str) -> Result<SignInRedirect, GatewayError> {
        let enabled = self.enabled_providers().await?;
        if !enabled.iter().any(|p| p == provider) {
            return Err(GatewayError::UnknownProvider(provider.to_string()));
        }

        let mut url = format!(
            "{}/authorize?provider={}",
            self.base_url,
            urlencoding::encode(provider)
        );
        if let Some(redirect) = &self.redirect_url {
            url.push_str("&redirect_to=");
            url.push_str(&urlencoding::encode(redirect));
        }

        tracing::info!(provider, "Starting provider sign-in");

        Ok(SignInRedirect {
            provider: provider.to_string(),
            url,
        })
    }

    async fn complete_sign_in(&self, callback_url: &str) -> Result<Session, GatewayError> {
        let params = parse_callback_params(callback_url)?;

        if let Some(error) = params.get("error") {
            let description = params
                .get("error_description")
                .map_or(error.as_str(), String::as_str);
            return Err(GatewayError::Decode(format!(
                "provider returned an error: {description}"
            )));
        }

        let access_token = params
            .get("access_token")
            .ok_or_else(|| GatewayError::Decode("missing access_token".to_string()))?;
        let refresh_token = params
            .get("refresh_token")
            .ok_or_else(|| GatewayError::Decode("missing refresh_token".to_string()))?;
        let expires_at = expiry_from(
            params.get("expires_at").and_then(|v| v.parse().ok()),
            params.get("expires_in").and_then(|v| v.parse().ok()),
        );

        let user = self.get_user(access_token).await?;
        let session = Session {
            access_token: access_token.clone(),
            refresh_token: refresh_token.clone(),
            expires_at,
            user,
        };

        self.store_session(&session);
        tracing::info!(user_id = %session.user.id, "Sign-in completed");
        self.changes.emit(SessionChange::signed_in(session.clone()));

        Ok(session)
    }

    async fn refresh_session(&self) -> Result<Session, GatewayError> {
        let seen = self
            .session
            .lock()
            .as_ref()
            .map(|s| s.refresh_token.clone());

        let _guard = self.refresh_lock.lock().await;

        let current = self.session.lock().clone().ok_or(GatewayError::NoSession)?;

        // Another task refreshed while we waited on the lock.
        if seen.as_deref() != Some(current.refresh_token.as_str()) {
            return Ok(current);
        }

        let response = self
            .http
            .post(format!("{}/token?grant_type=refresh_token", self.base_url))
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({ "refresh_token": current.refresh_token }))
            .send()
            .await
            .map_err(transport_error)?;

        let token: TokenResponse = check_response_json(response).await?;
        let session = Session {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: expiry_from(token.expires_at, token.expires_in),
            user: token.user.map_or(current.user, SessionUser::from),
        };

        self.store_session(&session);
        tracing::info!(user_id = %session.user.id, "Session refreshed");
        self.changes.emit(SessionChange {
            event: AuthEvent::TokenRefreshed,
            session: Some(session.clone()),
        });

        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), GatewayError> {
        let token = self.session.lock().as_ref().map(|s| s.access_token.clone());

        if let Some(token) = token {
            let response = self
                .http
                .post(format!("{}/logout", self.base_url))
                .header("apikey", &self.api_key)
                .bearer_auth(token)
                .send()
                .await
                .map_err(transport_error)?;

            match check_response(response).await {
                Ok(_) => {}
                // The session is already gone on the server side.
                Err(e) if e.is_unauthorized() || e.status() == Some(404) => {
                    tracing::debug!(error = %e, "Session already revoked");
                }
                Err(e) => return Err(e),
            }
        }

        self.clear_session();
        tracing::info!("Signed out");
        self.changes.emit(SessionChange::signed_out());
        Ok(())
    }
}

fn expires_soon(session: &Session, now: DateTime<Utc>) -> bool {
    session
        .expires_at
        .is_some_and(|at| now + Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) >= at)
}

/// Absolute expiry from either an epoch timestamp or a lifetime in seconds.
fn expiry_from(expires_at: Option<i64>, expires_in: Option<i64>) -> Option<DateTime<Utc>> {
    expires_at
        .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
        .or_else(|| expires_in.map(|secs| Utc::now() + Duration::seconds(secs)))
}

/// Parameters from the redirect URL: the fragment for the implicit flow, the
/// query string when the fragment carries none.
fn parse_callback_params(callback_url: &str) -> Result<HashMap<String, String>, GatewayError> {
    let url = Url::parse(callback_url)
        .map_err(|e| GatewayError::Decode(format!("invalid callback URL: {e}")))?;

    let params: HashMap<String, String> = url
        .fragment()
        .map(|fragment| form_urlencoded::parse(fragment.as_bytes()).into_owned().collect())
        .unwrap_or_default();
    if !params.is_empty() {
        return Ok(params);
    }

    Ok(url.query_pairs().into_owned().collect())
}

#[derive(Deserialize)]
struct SettingsResponse {
    #[serde(default)]
    external: HashMap<String, bool>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: Option<UserResponse>,
}

#[derive(Deserialize)]
struct UserResponse {
    id: String,
    email: Option<String>,
    #[serde(default)]
    user_metadata: UserMetadata,
}

#[derive(Default, Deserialize)]
struct UserMetadata {
    user_name: Option<String>,
    preferred_username: Option<String>,
    full_name: Option<String>,
    name: Option<String>,
}

impl From<UserResponse> for SessionUser {
    fn from(user: UserResponse) -> Self {
        let meta = user.user_metadata;
        Self {
            id: user.id,
            display_handle: meta.user_name.or(meta.preferred_username),
            display_name: meta.full_name.or(meta.name),
            email: user.email.filter(|e| !e.is_empty()),
        }
    }
}
