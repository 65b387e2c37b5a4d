//! A network abstraction layer for embedded systems
//!
//! This module provides the byte-stream traits the MQTT engine runs on. A
//! transport is anything that can read, write, flush and close a reliable,
//! ordered stream of bytes: a TCP socket, a TLS session, a UART bridge. The
//! engine never opens sockets itself; it asks a [`Connect`] implementation for
//! a [`Connection`] and pumps bytes through it.
//!
//! # Error contract
//!
//! Every transport error type converts into [`error::Error`]. The engine uses
//! that conversion to tell "no data yet" ([`error::Error::Timeout`]) apart from
//! a dead link (everything else). A read returning `Ok(0)` also means "no data
//! yet".
//!

#![allow(async_fn_in_trait)]
#![deny(unsafe_code)]

/// Common error types for network operations
pub mod error;

/// Concrete transport implementations
pub mod client;

/// Application protocols built on the transport traits
pub mod application;

/// Re-exports of common traits
pub mod prelude {
    #[cfg(feature = "async")]
    pub use super::{AsyncClose, AsyncConnect, AsyncConnection, AsyncRead, AsyncWrite};
    pub use super::{Close, Connect, Connection, Read, Write};
}

use error::Error;

// Core synchronous traits

/// Read half of a byte stream.
pub trait Read {
    /// Associated error type
    type Error: core::fmt::Debug + Into<Error>;
    /// Read available data into `buf`, returning the number of bytes copied.
    ///
    /// Returning `Ok(0)` or an error converting to [`Error::Timeout`] means
    /// nothing is available right now.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

/// Write half of a byte stream.
pub trait Write {
    /// Associated error type
    type Error: core::fmt::Debug + Into<Error>;
    /// Write data to the connection
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error>;
    /// Flush the write buffer
    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// Orderly shutdown of a byte stream.
pub trait Close {
    /// Associated error type
    type Error: core::fmt::Debug + Into<Error>;
    /// Close the connection
    fn close(self) -> Result<(), Self::Error>;
}

/// A synchronous connection
pub trait Connection: Read + Write + Close {}

/// A synchronous connector (client)
///
/// The `remote` string is the broker address from the client configuration,
/// passed through unmodified. Its format is up to the connector.
pub trait Connect {
    /// Associated connection type
    type Connection: Connection;
    /// Associated error type
    type Error: core::fmt::Debug + Into<Error>;
    /// Open a connection
    fn connect(&mut self, remote: &str) -> Result<Self::Connection, Self::Error>;
}

// Core async traits

/// Read half of an asynchronous byte stream.
#[cfg(feature = "async")]
pub trait AsyncRead {
    /// Associated error type
    type Error: core::fmt::Debug + Into<Error>;
    /// Read data from the connection asynchronously
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

/// Write half of an asynchronous byte stream.
#[cfg(feature = "async")]
pub trait AsyncWrite {
    /// Associated error type
    type Error: core::fmt::Debug + Into<Error>;
    /// Write data to the connection asynchronously
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error>;
    /// Flush the write buffer asynchronously
    async fn flush(&mut self) -> Result<(), Self::Error>;
}

/// Orderly asynchronous shutdown of a byte stream.
#[cfg(feature = "async")]
pub trait AsyncClose {
    /// Associated error type
    type Error: core::fmt::Debug + Into<Error>;
    /// Close the connection asynchronously
    async fn close(self) -> Result<(), Self::Error>;
}

/// An asynchronous connection
#[cfg(feature = "async")]
pub trait AsyncConnection: AsyncRead + AsyncWrite + AsyncClose {}

/// An asynchronous connector (client)
#[cfg(feature = "async")]
pub trait AsyncConnect {
    /// Associated connection type
    type Connection: AsyncConnection;
    /// Associated error type
    type Error: core::fmt::Debug + Into<Error>;
    /// Open a connection asynchronously
    async fn connect(&mut self, remote: &str) -> Result<Self::Connection, Self::Error>;
}
