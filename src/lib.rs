//! Gust: minimal server-side WebSocket engine for short text messages
#![allow(clippy::result_large_err)]

pub mod error;
pub mod protocol;
pub mod stream;

#[cfg(feature = "handshake")]
pub mod handshake;
#[cfg(feature = "handshake")]
pub mod server;

/// Longest payload a single frame can carry without the extended length encodings.
pub const MAX_FRAME_PAYLOAD: usize = 125;

pub use crate::{
    error::{Error, Result},
    protocol::{
        config::WebSocketConfig,
        frame::{Frame, FrameHeader, OpCode, Utf8Bytes},
        websocket::{MessageSender, WebSocket}
    }
};

#[cfg(feature = "handshake")]
pub use crate::{
    handshake::Request,
    server::{accept, accept_with_config, upgrade, upgrade_with_config}
};
