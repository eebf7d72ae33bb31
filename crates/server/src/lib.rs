// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Library surface for the `pulsed` binary (`src/main.rs`), split out so
//! integration tests can drive a real composition root and router the
//! way `rustpress-server` exposes both a `lib.rs` and a `main.rs` from
//! the same crate.

pub mod config;
pub mod error;
pub mod plugin_proxy;
pub mod routes;
pub mod shutdown;
pub mod startup;
pub mod state;
pub mod websocket;
pub mod ws_proxy;

pub use startup::{start, Node, StartupError};
pub use state::AppState;
