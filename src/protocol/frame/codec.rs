//! Codes defined in RFC 6455

use std::fmt::Display;

/// WebSocket frame opcode as in RFC 6455, covering the full 4-bit space.
///
/// The values RFC 6455 leaves undefined (0x3-0x7 and 0xB-0xF) decode into
/// [`OpCode::Reserved`] so the frame layer can reject them without losing the raw bits.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum OpCode {
    /// A continuation frame
    Continuation,
    /// A text frame
    Text,
    /// A binary frame
    Binary,
    /// A close frame
    Close,
    /// A ping frame
    Ping,
    /// A pong frame
    Pong,
    /// One of the reserved opcodes
    Reserved(u8)
}

impl OpCode {
    /// Check if this opcode is one RFC 6455 leaves undefined.
    pub fn is_reserved(self) -> bool {
        matches!(self, Self::Reserved(_))
    }
}

impl Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Continuation => write!(f, "CONTINUE"),
            Self::Text => write!(f, "TEXT"),
            Self::Binary => write!(f, "BINARY"),
            Self::Close => write!(f, "CLOSE"),
            Self::Ping => write!(f, "PING"),
            Self::Pong => write!(f, "PONG"),
            Self::Reserved(other) => write!(f, "RESERVED_{other}")
        }
    }
}

impl From<u8> for OpCode {
    fn from(byte: u8) -> Self {
        match byte & 0x0F {
            0x0 => OpCode::Continuation,
            0x1 => OpCode::Text,
            0x2 => OpCode::Binary,
            0x8 => OpCode::Close,
            0x9 => OpCode::Ping,
            0xA => OpCode::Pong,
            other => OpCode::Reserved(other)
        }
    }
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> Self {
        match op {
            OpCode::Continuation => 0x0,
            OpCode::Text => 0x1,
            OpCode::Binary => 0x2,
            OpCode::Close => 0x8,
            OpCode::Ping => 0x9,
            OpCode::Pong => 0xA,
            OpCode::Reserved(b) => b
        }
    }
}
