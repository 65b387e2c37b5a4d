//! Concrete transports.
//!
//! Embedded targets bring their own [`Connect`](crate::network::Connect)
//! implementation (an `embassy-net` socket, a modem driver). Hosted targets
//! can use the `std::net` transport behind the `std` feature.

/// TCP over `std::net`.
#[cfg(feature = "std")]
pub mod tcp;

#[cfg(feature = "std")]
pub use tcp::{TcpConnection, TcpConnector};
