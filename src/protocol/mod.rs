//! Protocol module

pub mod config;
pub mod frame;
pub mod websocket;
