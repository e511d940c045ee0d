//! Frame module

pub mod codec;

#[allow(clippy::module_inception)]
mod frame;
mod mask;
mod utf;

pub use self::{
    codec::OpCode,
    frame::{Frame, FrameHeader},
    utf::Utf8Bytes
};
