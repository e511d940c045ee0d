//! Server side of the opening handshake

use std::io::Read;

use base64::Engine;
use http::{HeaderName, HeaderValue, Method, Request as HttpRequest, Version};
use httparse::{Status, EMPTY_HEADER};
use sha1::{Digest, Sha1};

use crate::error::{Error, HandshakeError, Result};

/// Server Request type
pub type Request = HttpRequest<()>;

/// Upper bound on headers in an upgrade request.
const MAX_HEADERS: usize = 124;

/// Upper bound on the size of a request head. Anything still incomplete past this
/// is junk or an attack, not a handshake.
const MAX_REQUEST_BYTES: usize = 64 * 1024;

/// Derives the `Sec-WebSocket-Accept` header value from a `Sec-WebSocket-Key` request header.
///
/// Pure function; no key material is retained.
pub fn derive_accept_key(req_key: &[u8]) -> String {
    const WS_GUID: &[u8] = b"258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

    let mut hasher = Sha1::default();
    <Sha1 as Digest>::update(&mut hasher, req_key);
    <Sha1 as Digest>::update(&mut hasher, WS_GUID);

    base64::engine::general_purpose::STANDARD.encode(<Sha1 as Digest>::finalize(hasher))
}

/// Validates the upgrade request and renders the complete `101 Switching Protocols`
/// response for it, byte-exact and ready to write.
///
/// Nothing is rendered for an invalid request, so a failure here guarantees the
/// stream has not been promised an upgrade.
pub fn create_response(req: &Request) -> Result<String> {
    let key = check_headers(req)?;

    Ok(build_response(&derive_accept_key(key.as_bytes())))
}

/// Header validation, in order. Values are compared exactly, the way a conforming
/// client writes them; header names are case-insensitive via [`http::HeaderMap`].
fn check_headers(req: &Request) -> Result<&HeaderValue> {
    let headers = req.headers();

    if !headers
        .get("Upgrade")
        .map(|h| h == "websocket")
        .unwrap_or(false)
    {
        return Err(Error::Handshake(HandshakeError::MissingUpgradeHeader));
    }

    if !headers
        .get("Connection")
        .map(|h| h == "Upgrade")
        .unwrap_or(false)
    {
        return Err(Error::Handshake(HandshakeError::MissingConnectionUpgradeHeader));
    }

    if !headers
        .get("Sec-WebSocket-Version")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.parse::<u32>().ok())
        .map(|v| v == 13)
        .unwrap_or(false)
    {
        return Err(Error::Handshake(HandshakeError::MissingVersionHeader));
    }

    headers
        .get("Sec-WebSocket-Key")
        .ok_or(Error::Handshake(HandshakeError::MissingKeyHeader))
}

/// The header order is fixed, so the response is a literal rather than a serialized
/// header map.
fn build_response(accept: &str) -> String {
    format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {accept}\r\n\r\n"
    )
}

/// Read the upgrade request off the stream, blocking until the head is complete.
///
/// The request head must be the only thing on the stream: bytes pipelined after it
/// (before the server has responded) fail the handshake rather than getting lost in
/// the read buffer.
pub fn read_request<S: Read>(stream: &mut S) -> Result<Request> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 4096];

    loop {
        let read = stream.read(&mut chunk)?;
        if read == 0 {
            return Err(Error::Handshake(HandshakeError::IncompleteHandshake));
        }

        buf.extend_from_slice(&chunk[..read]);
        if buf.len() > MAX_REQUEST_BYTES {
            return Err(Error::Handshake(HandshakeError::OversizedRequest));
        }

        if let Some((size, req)) = try_parse(&buf)? {
            if size < buf.len() {
                return Err(Error::Handshake(HandshakeError::JunkAfterRequest));
            }

            return Ok(req);
        }
    }
}

fn try_parse(data: &[u8]) -> Result<Option<(usize, Request)>> {
    let mut header_buf = [EMPTY_HEADER; MAX_HEADERS];
    let mut req = httparse::Request::new(&mut header_buf);

    Ok(match req.parse(data)? {
        Status::Complete(size) => Some((size, from_httparse(req)?)),
        Status::Partial => None
    })
}

fn from_httparse(raw: httparse::Request<'_, '_>) -> Result<Request> {
    if raw.method != Some("GET") {
        return Err(Error::Handshake(HandshakeError::InvalidHttpMethod));
    }

    if raw.version != Some(1) {
        return Err(Error::Handshake(HandshakeError::InvalidHttpVersion));
    }

    let mut req = Request::new(());
    *req.method_mut() = Method::GET;
    *req.uri_mut() = raw.path.expect("Bug: no path in header").parse()?;
    *req.version_mut() = Version::HTTP_11;

    let headers = req.headers_mut();
    for header in raw.headers.iter() {
        headers.append(
            HeaderName::from_bytes(header.name.as_bytes())?,
            HeaderValue::from_bytes(header.value)?
        );
    }

    Ok(req)
}
