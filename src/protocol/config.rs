use std::{io, time::Duration};

use crate::stream::Timeouts;

/// Per-connection deadlines.
///
/// Without them a connection whose peer goes quiet blocks its reader thread forever,
/// and the only way out is shutting the stream down from another thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConfig {
    /// Bound on each blocking read, the handshake request included. `None` waits
    /// without limit.
    pub read_timeout: Option<Duration>,
    /// Bound on each blocking write. `None` waits without limit.
    pub write_timeout: Option<Duration>
}

impl WebSocketConfig {
    /// Apply the deadlines to a transport that supports them.
    pub fn apply<S: Timeouts>(&self, stream: &mut S) -> io::Result<()> {
        stream.set_read_timeout(self.read_timeout)?;
        stream.set_write_timeout(self.write_timeout)
    }
}
