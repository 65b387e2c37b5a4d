//! Plain TCP transport for hosted targets.

use crate::network::error::Error;
use crate::network::{Close, Connect, Connection, Read, Write};
use std::io::{Read as _, Write as _};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

/// How long a read waits before reporting [`Error::Timeout`].
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(50);

/// Opens [`TcpConnection`]s to `host:port` addresses.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    read_timeout: Duration,
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

impl TcpConnector {
    /// A connector using [`DEFAULT_READ_TIMEOUT`].
    pub fn new() -> Self {
        Self::default()
    }

    /// A connector whose connections wait at most `read_timeout` for data.
    /// A zero duration is raised to one millisecond.
    pub fn with_read_timeout(read_timeout: Duration) -> Self {
        Self {
            read_timeout: read_timeout.max(Duration::from_millis(1)),
        }
    }
}

impl Connect for TcpConnector {
    type Connection = TcpConnection;
    type Error = Error;

    fn connect(&mut self, remote: &str) -> Result<TcpConnection, Error> {
        let stream = TcpStream::connect(remote)?;
        stream.set_read_timeout(Some(self.read_timeout))?;
        stream.set_nodelay(true)?;
        Ok(TcpConnection { stream })
    }
}

/// A TCP stream speaking the crate's transport traits.
///
/// A read that times out is [`Error::Timeout`]; end of stream is
/// [`Error::ConnectionClosed`].
#[derive(Debug)]
pub struct TcpConnection {
    stream: TcpStream,
}

impl TcpConnection {
    /// Wrap an already connected stream. Set a read timeout on it first,
    /// otherwise reads block until data arrives.
    pub fn from_stream(stream: TcpStream) -> Self {
        Self { stream }
    }

    /// The underlying stream.
    pub fn stream(&self) -> &TcpStream {
        &self.stream
    }
}

impl Read for TcpConnection {
    type Error = Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        match self.stream.read(buf) {
            Ok(0) if !buf.is_empty() => Err(Error::ConnectionClosed),
            Ok(n) => Ok(n),
            Err(e) => Err(e.into()),
        }
    }
}

impl Write for TcpConnection {
    type Error = Error;

    fn write(&mut self, buf: &[u8]) -> Result<usize, Error> {
        self.stream.write(buf).map_err(|e| match Error::from(e) {
            Error::ReadError => Error::WriteError,
            other => other,
        })
    }

    fn flush(&mut self) -> Result<(), Error> {
        self.stream.flush().map_err(|_| Error::WriteError)
    }
}

impl Close for TcpConnection {
    type Error = Error;

    fn close(self) -> Result<(), Error> {
        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Connection for TcpConnection {}
