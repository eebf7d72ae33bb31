// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! pulse-wire: the structured RPC envelope exchanged with external
//! plugins. Plugins are reached over a TCP control connection; each call is a single JSON
//! request followed by a single JSON response, matching the teacher's length-prefixed JSON
//! framing.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod frame;
mod rpc;

pub use frame::{read_message, write_message, FrameError};
pub use rpc::{
    CommandInvocation, CommandResult, HealthCheck, HttpRequest, HttpResponse, InitializeRequest,
    PluginCall, PluginReply,
};
