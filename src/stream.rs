use std::{io, net::TcpStream, time::Duration};

pub trait NoDelay {
    fn set_nodelay(&mut self, no_delay: bool) -> io::Result<()>;
}

impl NoDelay for TcpStream {
    fn set_nodelay(&mut self, no_delay: bool) -> io::Result<()> {
        TcpStream::set_nodelay(self, no_delay)
    }
}

/// Duplicates a stream handle so one connection can be split into an owned
/// reader half and an owned writer half.
pub trait TryClone: Sized {
    fn try_clone(&self) -> io::Result<Self>;
}

impl TryClone for TcpStream {
    fn try_clone(&self) -> io::Result<Self> {
        TcpStream::try_clone(self)
    }
}

/// Tears the transport down in both directions, unblocking any reader
/// parked on it.
pub trait Shutdown {
    fn shutdown(&self) -> io::Result<()>;
}

impl Shutdown for TcpStream {
    fn shutdown(&self) -> io::Result<()> {
        TcpStream::shutdown(self, std::net::Shutdown::Both)
    }
}

/// Deadline support. `None` means block without limit.
pub trait Timeouts {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()>;
    fn set_write_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()>;
}

impl Timeouts for TcpStream {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        TcpStream::set_read_timeout(self, timeout)
    }

    fn set_write_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        TcpStream::set_write_timeout(self, timeout)
    }
}
