//! WebSocket frame codec

use std::{io::{Read, Write}, mem, result::Result as StdResult, str::Utf8Error};

use bytes::Bytes;
use log::trace;

use super::mask::{apply_mask, generate};
use crate::{
    error::{CapacityError, Error, ProtocolError, Result},
    protocol::frame::{OpCode, Utf8Bytes},
    MAX_FRAME_PAYLOAD
};

/// A struct representing a WebSocket frame header.
#[allow(missing_copy_implementations)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    /// Indicates if the frame is the last one of a possibly fragmented message
    pub fin: bool,
    /// Reserved for protocol extensions.
    pub rsv1: bool,
    /// Reserved for protocol extensions.
    pub rsv2: bool,
    /// Reserved for protocol extensions.
    pub rsv3: bool,
    /// WebSocket protocol opcode.
    pub opcode: OpCode,
    /// A frame mask (if any)
    pub mask: Option<[u8; 4]>,
}

impl Default for FrameHeader {
    fn default() -> Self {
        FrameHeader {
            fin: true,
            rsv1: false,
            rsv2: false,
            rsv3: false,
            opcode: OpCode::Text,
            mask: None
        }
    }
}

impl FrameHeader {
    /// Read and validate a frame header. Returns the header along with the payload
    /// length it announces.
    ///
    /// A stream that dies mid-header surfaces as `UnexpectedEof` out of `read_exact`.
    fn read(stream: &mut impl Read) -> Result<(Self, usize)> {
        let mut head = [0u8; 2];
        stream.read_exact(&mut head)?;

        let fin = head[0] & 0x80 != 0;
        let rsv1 = head[0] & 0x40 != 0;
        let rsv2 = head[0] & 0x20 != 0;
        let rsv3 = head[0] & 0x10 != 0;
        let opcode = OpCode::from(head[0] & 0x0F);

        let masked = head[1] & 0x80 != 0;
        let length = head[1] & 0x7F;

        // 126 and 127 announce the 16-bit and 64-bit length encodings. Reading on
        // would take the extension bytes for payload, so fail before the stream is
        // touched again.
        if length as usize > MAX_FRAME_PAYLOAD {
            return Err(Error::Protocol(ProtocolError::UnsupportedExtendedLength(length)));
        }

        if rsv1 || rsv2 || rsv3 {
            return Err(Error::Protocol(ProtocolError::NonZeroReservedBits));
        }

        if let OpCode::Reserved(code) = opcode {
            return Err(Error::Protocol(ProtocolError::ReservedOpCode(code)));
        }

        let mask = if masked {
            let mut key = [0u8; 4];
            stream.read_exact(&mut key)?;
            Some(key)
        } else {
            None
        };

        Ok((FrameHeader { fin, rsv1, rsv2, rsv3, opcode, mask }, length as usize))
    }

    /// Format the header for the given payload size.
    fn format(&self, length: usize, output: &mut impl Write) -> Result<()> {
        let code: u8 = self.opcode.into();

        let first_byte = {
            code | if self.fin { 0x80 } else { 0 }
                | if self.rsv1 { 0x40 } else { 0 }
                | if self.rsv2 { 0x20 } else { 0 }
                | if self.rsv3 { 0x10 } else { 0 }
        };

        let second_byte = length as u8 | if self.mask.is_some() { 0x80 } else { 0 };

        output.write_all(&[first_byte, second_byte])?;

        if let Some(ref mask) = self.mask {
            output.write_all(mask)?;
        }

        Ok(())
    }
}

/// The WebSocket Frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    header: FrameHeader,
    payload: Bytes
}

impl Frame {
    /// Initializes a new frame
    pub fn new(header: FrameHeader, payload: Bytes) -> Self {
        Frame { header, payload }
    }

    /// Create an unmasked single-frame text message.
    pub fn text(payload: impl Into<Utf8Bytes>) -> Frame {
        let payload: Utf8Bytes = payload.into();

        Frame { header: FrameHeader::default(), payload: payload.into() }
    }

    /// Get a reference to the frame's header.
    #[inline]
    pub fn header(&self) -> &FrameHeader {
        &self.header
    }

    /// Get a mutable reference to the frame's header.
    #[inline]
    pub fn header_mut(&mut self) -> &mut FrameHeader {
        &mut self.header
    }

    /// Get a reference to the frame's payload.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Generate a random frame mask and store it in the header, as a client-role
    /// peer must before writing.
    ///
    /// This just generates a mask, payload is not changed. The actual masking is
    /// performed on `write`.
    #[inline]
    pub fn set_random_mask(&mut self) {
        self.header.mask = Some(generate());
    }

    /// Consume the frame into its payload as string.
    #[inline]
    pub fn into_text(self) -> StdResult<Utf8Bytes, Utf8Error> {
        self.payload.try_into()
    }

    /// Read one frame from the stream, blocking until it arrives whole.
    ///
    /// The announced payload is consumed for every opcode. Skipping it for frames
    /// the caller does not care about would leave the next read starting inside
    /// this frame's payload bytes.
    pub fn read(stream: &mut impl Read) -> Result<Frame> {
        let (header, length) = FrameHeader::read(stream)?;

        let mut payload = vec![0u8; length];
        stream.read_exact(&mut payload)?;

        if let Some(key) = header.mask {
            apply_mask(&mut payload, key);
        }

        trace!("read {} frame with {length} payload bytes", header.opcode);

        Ok(Frame { header, payload: payload.into() })
    }

    /// Write the frame out to the stream, without flushing.
    ///
    /// Fails before anything is written if the payload does not fit a single
    /// unextended frame.
    pub fn write(mut self, stream: &mut impl Write) -> Result<()> {
        let length = self.payload.len();

        if length > MAX_FRAME_PAYLOAD {
            return Err(Error::Capacity(CapacityError::PayloadTooLarge {
                size: length,
                max: MAX_FRAME_PAYLOAD
            }));
        }

        self.header.format(length, stream)?;

        if let Some(mask) = self.header.mask.take() {
            let mut data = Vec::from(mem::take(&mut self.payload));
            apply_mask(&mut data, mask);

            stream.write_all(&data)?;
        } else {
            stream.write_all(&self.payload)?;
        }

        Ok(())
    }
}
