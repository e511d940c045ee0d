//! Utilities to accept an incoming WebSocket connection on a server

use std::io::{Read, Write};

use log::debug;

use crate::{
    error::Result,
    handshake::{self, Request},
    protocol::{config::WebSocketConfig, websocket::WebSocket},
    stream::{Timeouts, TryClone}
};

/// Accept the given Stream as a WebSocket.
///
/// Reads the client's upgrade request off the stream, performs the opening
/// handshake and hands back the established connection. Any `Read + Write` stream
/// that can be split with [`TryClone`] is supported.
///
/// On failure nothing has been written to the stream and the stream is dropped,
/// which closes the connection.
pub fn accept<S: Read + Write + TryClone>(mut stream: S) -> Result<WebSocket<S>> {
    let req = handshake::read_request(&mut stream)?;

    upgrade(&req, stream)
}

/// Accept the given Stream as a WebSocket, with deadlines.
///
/// The configured timeouts are applied to the transport before the first handshake
/// byte is read, so the handshake and every later frame read and write are all
/// bounded.
pub fn accept_with_config<S: Read + Write + TryClone + Timeouts>(
    mut stream: S,
    config: WebSocketConfig
) -> Result<WebSocket<S>> {
    config.apply(&mut stream)?;

    accept(stream)
}

/// Upgrade a stream whose request head was already read and parsed by the hosting
/// HTTP layer.
///
/// Validates the headers, writes and flushes the `101 Switching Protocols`
/// response and hands back the established connection. A validation failure writes
/// nothing.
pub fn upgrade<S: Read + Write + TryClone>(req: &Request, mut stream: S) -> Result<WebSocket<S>> {
    let response = match handshake::create_response(req) {
        Ok(response) => response,
        Err(e) => {
            debug!("rejecting upgrade for {}: {e}", req.uri());
            return Err(e);
        }
    };

    stream.write_all(response.as_bytes())?;
    stream.flush()?;

    debug!("accepted upgrade for {}", req.uri());

    WebSocket::from_stream(stream)
}

/// Same as [`upgrade`], applying deadlines to the transport first.
pub fn upgrade_with_config<S: Read + Write + TryClone + Timeouts>(
    req: &Request,
    mut stream: S,
    config: WebSocketConfig
) -> Result<WebSocket<S>> {
    config.apply(&mut stream)?;

    upgrade(req, stream)
}

#[cfg(test)]
mod tests {
    use std::{
        io::{self, BufReader, Read, Write},
        net::{TcpListener, TcpStream},
        thread,
        time::Duration
    };

    use super::*;
    use crate::{
        error::{Error, HandshakeError},
        protocol::frame::Frame
    };

    const UPGRADE_REQUEST: &[u8] = b"GET /server HTTP/1.1\r\n\
        Host: localhost\r\n\
        Upgrade: websocket\r\n\
        Connection: Upgrade\r\n\
        Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
        Sec-WebSocket-Version: 13\r\n\r\n";

    const UPGRADE_RESPONSE: &[u8] = b"HTTP/1.1 101 Switching Protocols\r\n\
        Upgrade: websocket\r\n\
        Connection: Upgrade\r\n\
        Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n\r\n";

    #[test]
    fn test_accept_end_to_end() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut ws = accept(stream).unwrap();

            let msg = ws.read().unwrap();
            ws.send(&format!("echo: {msg}")).unwrap();
        });

        let mut client = TcpStream::connect(addr).unwrap();
        client.write_all(UPGRADE_REQUEST).unwrap();

        // The response is a fixed literal, so read exactly its length.
        let mut response = vec![0u8; UPGRADE_RESPONSE.len()];
        client.read_exact(&mut response).unwrap();
        assert_eq!(response, UPGRADE_RESPONSE);

        // Masked client frame in, unmasked server frame out.
        let mut frame = Frame::text("Hello");
        frame.set_random_mask();

        let mut wire = Vec::new();
        frame.write(&mut wire).unwrap();
        client.write_all(&wire).unwrap();

        let mut reader = BufReader::new(client);
        let reply = Frame::read(&mut reader).unwrap();
        assert_eq!(reply.header().mask, None);
        assert_eq!(reply.payload(), b"echo: Hello");

        server.join().unwrap();
    }

    #[test]
    fn test_rejected_handshake_writes_nothing() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            accept(stream).unwrap_err()
        });

        let mut client = TcpStream::connect(addr).unwrap();
        client
            .write_all(
                b"GET /server HTTP/1.1\r\n\
                  Host: localhost\r\n\
                  Upgrade: websocket\r\n\
                  Connection: Upgrade\r\n\
                  Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
                  Sec-WebSocket-Version: 8\r\n\r\n"
            )
            .unwrap();

        let err = server.join().unwrap();
        assert!(matches!(
            err,
            Error::Handshake(HandshakeError::MissingVersionHeader)
        ));

        // The server dropped the stream without responding: EOF, zero bytes first.
        let mut buf = [0u8; 64];
        assert_eq!(client.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_upgrade_takes_preparsed_request() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let mut client = TcpStream::connect(addr).unwrap();
        let (stream, _) = listener.accept().unwrap();

        let req = Request::builder()
            .method("GET")
            .uri("/server")
            .header("Upgrade", "websocket")
            .header("Connection", "Upgrade")
            .header("Sec-WebSocket-Key", "dGhlIHNhbXBsZSBub25jZQ==")
            .header("Sec-WebSocket-Version", "13")
            .body(())
            .unwrap();

        let ws = upgrade(&req, stream).unwrap();
        drop(ws);

        let mut response = vec![0u8; UPGRADE_RESPONSE.len()];
        client.read_exact(&mut response).unwrap();
        assert_eq!(response, UPGRADE_RESPONSE);
    }

    #[test]
    fn test_config_deadline_bounds_reads() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || -> crate::error::Result<()> {
            let (stream, _) = listener.accept().unwrap();
            let config = WebSocketConfig {
                read_timeout: Some(Duration::from_millis(100)),
                write_timeout: None
            };

            let mut ws = accept_with_config(stream, config)?;
            ws.read().map(|_| ())
        });

        let mut client = TcpStream::connect(addr).unwrap();
        client.write_all(UPGRADE_REQUEST).unwrap();

        // Handshake completes, then the client goes quiet; the read deadline must
        // unblock the server on its own.
        let err = server.join().unwrap().unwrap_err();
        match err {
            Error::Io(e) => assert!(
                matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut),
                "unexpected kind: {:?}",
                e.kind()
            ),
            other => panic!("expected timeout, got {other:?}")
        }
    }
}
