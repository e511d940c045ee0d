//! WebSocket connection

use std::{
    io::{BufReader, BufWriter, Read, Write},
    sync::{Arc, Mutex}
};

use log::debug;

use crate::{
    error::Result,
    protocol::frame::{Frame, Utf8Bytes},
    stream::{Shutdown, TryClone}
};

/// WebSocket input-output stream.
///
/// This is THE structure you want to create to be able to speak the WebSocket protocol.
/// It is usually created by [`accept`ing](crate::server::accept) an incoming connection.
///
/// Use [`WebSocket::read`] and [`WebSocket::send`] to receive and send messages. A
/// connection exclusively owns both halves of its stream; there is exactly one of these
/// per peer and it is gone once the transport dies.
#[derive(Debug)]
pub struct WebSocket<S: Write> {
    reader: BufReader<S>,
    writer: Arc<Mutex<BufWriter<S>>>
}

impl<S: Read + Write + TryClone> WebSocket<S> {
    /// Splits the stream into an owned reader half and an owned writer half and wraps
    /// them. The stream must already be past the opening handshake.
    pub fn from_stream(stream: S) -> Result<Self> {
        let read_half = stream.try_clone()?;

        Ok(Self::from_halves(read_half, stream))
    }
}

impl<S: Read + Write> WebSocket<S> {
    /// Creates a connection from pre-split halves of one duplex stream.
    pub fn from_halves(read_half: S, write_half: S) -> Self {
        WebSocket {
            reader: BufReader::new(read_half),
            writer: Arc::new(Mutex::new(BufWriter::new(write_half)))
        }
    }

    /// Read one text message from the peer, blocking until it arrives whole.
    ///
    /// Exactly one frame is decoded per call and its payload returned as text,
    /// whatever the opcode. After a decode failure the stream position is unknown,
    /// so treat the connection as dead.
    pub fn read(&mut self) -> Result<Utf8Bytes> {
        let frame = Frame::read(&mut self.reader)?;

        Ok(frame.into_text()?)
    }

    /// Send a text message to the peer.
    ///
    /// Header, payload and flush all happen under the connection's write lock, so
    /// messages from concurrent senders never interleave on the wire. Payloads over
    /// [`MAX_FRAME_PAYLOAD`](crate::MAX_FRAME_PAYLOAD) bytes fail before anything
    /// is written and leave the connection usable.
    pub fn send(&self, text: &str) -> Result<()> {
        write_frame(&self.writer, Frame::text(text))
    }

    /// Create a cheap handle that can send on (and shut down) this connection from
    /// other threads.
    pub fn sender(&self) -> MessageSender<S> {
        MessageSender { writer: Arc::clone(&self.writer) }
    }
}

impl<S: Read + Write + Shutdown> WebSocket<S> {
    /// Close the connection, tearing the transport down in both directions.
    ///
    /// Consumes the connection. Surviving [`MessageSender`] handles get I/O errors
    /// from then on.
    pub fn close(self) -> Result<()> {
        debug!("closing connection");

        let writer = self.writer.lock().expect("Bug: writer lock poisoned");
        writer.get_ref().shutdown()?;

        Ok(())
    }
}

/// A cloneable sending handle onto one connection's write half.
///
/// This is what a broadcast registry should store. A handle shares the connection's
/// write lock, so sends through it and through the owning [`WebSocket`] serialize
/// against each other. It never outlives the transport: once the stream is shut down,
/// every handle's operation fails.
#[derive(Debug)]
pub struct MessageSender<S: Write> {
    writer: Arc<Mutex<BufWriter<S>>>
}

impl<S: Write> Clone for MessageSender<S> {
    fn clone(&self) -> Self {
        MessageSender { writer: Arc::clone(&self.writer) }
    }
}

impl<S: Write> MessageSender<S> {
    /// Send a text message. Same contract as [`WebSocket::send`].
    pub fn send(&self, text: &str) -> Result<()> {
        write_frame(&self.writer, Frame::text(text))
    }
}

impl<S: Write + Shutdown> MessageSender<S> {
    /// Tear the connection down, unblocking a reader parked on it.
    pub fn shutdown(&self) -> Result<()> {
        let writer = self.writer.lock().expect("Bug: writer lock poisoned");
        writer.get_ref().shutdown()?;

        Ok(())
    }
}

fn write_frame<S: Write>(writer: &Mutex<BufWriter<S>>, frame: Frame) -> Result<()> {
    let mut writer = writer.lock().expect("Bug: writer lock poisoned");

    frame.write(&mut *writer)?;
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{
        io::Write,
        net::{TcpListener, TcpStream},
        thread,
        time::Duration
    };

    use super::*;
    use crate::error::{CapacityError, Error};

    fn tcp_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let client = TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();

        (client, server)
    }

    #[test]
    fn test_read_returns_peer_text() {
        let (mut client, server) = tcp_pair();
        let mut ws = WebSocket::from_stream(server).unwrap();

        let mut frame = Frame::text("Hello");
        frame.set_random_mask();

        let mut wire = Vec::new();
        frame.write(&mut wire).unwrap();
        client.write_all(&wire).unwrap();

        assert_eq!(ws.read().unwrap(), "Hello");
    }

    #[test]
    fn test_send_reaches_peer_unmasked() {
        let (client, server) = tcp_pair();
        let ws = WebSocket::from_stream(server).unwrap();

        ws.send("Hello").unwrap();

        let mut reader = BufReader::new(client);
        let frame = Frame::read(&mut reader).unwrap();

        assert_eq!(frame.header().mask, None);
        assert_eq!(frame.payload(), b"Hello");
    }

    #[test]
    fn test_oversized_send_leaves_connection_usable() {
        let (client, server) = tcp_pair();
        let ws = WebSocket::from_stream(server).unwrap();

        let err = ws.send(&"a".repeat(126)).unwrap_err();
        assert!(matches!(err, Error::Capacity(CapacityError::PayloadTooLarge { .. })));

        ws.send("ok").unwrap();

        // The first frame on the wire is the successful one, so the failed send
        // never wrote.
        let mut reader = BufReader::new(client);
        let frame = Frame::read(&mut reader).unwrap();
        assert_eq!(frame.payload(), b"ok");
    }

    #[test]
    fn test_concurrent_sends_do_not_interleave() {
        let (client, server) = tcp_pair();
        let ws = WebSocket::from_stream(server).unwrap();

        let mut handles = Vec::new();
        for byte in [b'a', b'b'] {
            let sender = ws.sender();
            handles.push(thread::spawn(move || {
                let text = String::from_utf8(vec![byte; 120]).unwrap();
                for _ in 0..50 {
                    sender.send(&text).unwrap();
                }
            }));
        }

        // Every frame observed on the wire must be wholly one sender's.
        let mut reader = BufReader::new(client);
        for _ in 0..100 {
            let frame = Frame::read(&mut reader).unwrap();
            let payload = frame.payload();

            assert_eq!(payload.len(), 120);
            assert!(payload.iter().all(|&b| b == payload[0]));
        }

        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_sender_shutdown_unblocks_reader() {
        let (_client, server) = tcp_pair();
        let mut ws = WebSocket::from_stream(server).unwrap();
        let sender = ws.sender();

        let reader = thread::spawn(move || ws.read());

        thread::sleep(Duration::from_millis(50));
        sender.shutdown().unwrap();

        assert!(reader.join().unwrap().is_err());
    }

    #[test]
    fn test_send_after_close_fails() {
        let (_client, server) = tcp_pair();
        let ws = WebSocket::from_stream(server).unwrap();
        let sender = ws.sender();

        ws.close().unwrap();

        assert!(sender.send("late").is_err());
    }
}
