// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - the session and library controllers.

pub mod library;
pub mod session;

pub use library::AudioLibraryController;
pub use session::{SessionController, Subscription};
