//! # Application Layer Network Protocols
//!
//! Protocols that run on top of the transport traits in [`crate::network`].
//!
//! ## Available Protocols
//!
//! - **[`mqtt`]**: MQTT v5 client engine for publish-subscribe messaging
//!
//! ## Design Principles
//!
//! - **Connection Agnostic**: Work with any type implementing [`Connect`](crate::network::Connect)
//! - **No-std Compatible**: Designed for embedded systems without heap allocation
//! - **Resource Conscious**: Use fixed-size buffers and minimal memory
//! - **Error Handling**: Every failure is a typed error or an event

/// MQTT v5 client.
///
/// A sans-I/O session with blocking and async drivers, supporting QoS 0
/// and QoS 1, v5 properties and reason codes.
pub mod mqtt;
