// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Interfaces of the two remote services the core consumes.

pub mod identity;
pub mod storage;

pub use identity::{
    AuthEvent, IdentityGateway, Session, SessionChange, SessionChangeFanout, SessionChanges,
    SessionUser, SignInRedirect,
};
pub use storage::{ListOptions, ObjectRef, ObjectStoreGateway, SortBy, SortOrder, StoredObject};
