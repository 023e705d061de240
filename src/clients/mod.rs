// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP implementations of the gateway interfaces.

pub mod http;
pub mod supabase_auth;
pub mod supabase_storage;

pub use http::{build_http_client, AccessToken};
pub use supabase_auth::SupabaseAuthClient;
pub use supabase_storage::SupabaseStorageClient;
