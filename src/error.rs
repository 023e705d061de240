// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Error types for the gateways and the two controllers.
//!
//! Gateway adapters report [`GatewayError`]. The controllers wrap those into
//! the identity-layer [`SessionError`] and library-layer [`LibraryError`]
//! kinds so callers can tell which operation failed without inspecting
//! transport details.

/// Failure reported by a remote gateway (identity provider or object store).
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Unknown or disabled provider: {0}")]
    UnknownProvider(String),

    #[error("No active session")]
    NoSession,
}

impl GatewayError {
    /// Whether the gateway rejected the caller's credentials.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, GatewayError::Status { status: 401 | 403, .. })
            || matches!(self, GatewayError::NoSession)
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Identity-layer errors raised by the session controller.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Sign-in could not be initiated: {0}")]
    AuthInitiation(#[source] GatewayError),

    #[error("Sign-out failed: {0}")]
    AuthRevocation(#[source] GatewayError),

    #[error("Invalid sign-in callback: {0}")]
    Callback(String),

    #[error("Session refresh failed: {0}")]
    Refresh(#[source] GatewayError),
}

/// Library-layer errors raised by the audio library controller.
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("Authentication required")]
    NotAuthenticated,

    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    #[error("Failed to list audio: {0}")]
    ListFailure(#[source] GatewayError),

    #[error("Failed to upload audio: {0}")]
    UploadFailure(#[source] GatewayError),

    #[error("Failed to delete audio: {0}")]
    DeleteFailure(#[source] GatewayError),
}

impl LibraryError {
    /// Whether the failure came from the object store rather than a local check.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            LibraryError::ListFailure(_)
                | LibraryError::UploadFailure(_)
                | LibraryError::DeleteFailure(_)
        )
    }
}

/// Result type alias for library operations
pub type Result<T> = std::result::Result<T, LibraryError>;
