//! # libmqtt5 - MQTT v5 client engine
//!
//! A small MQTT v5 client for embedded and hosted IoT devices. Every buffer
//! has a fixed capacity, nothing is allocated, and the protocol core never
//! touches a socket or a clock, so the same engine runs on a
//! microcontroller, under an async executor or in a unit test.
//!
//! ## Features
//!
//! ### Protocol
//! - CONNECT with v5 properties, last will and credentials
//! - QoS 0 and QoS 1 publish, with DUP retransmission and receive-maximum
//!   backpressure
//! - SUBSCRIBE and UNSUBSCRIBE with per-filter results
//! - Keep-alive, server-negotiated limits, inbound topic aliases
//! - DISCONNECT with reason codes, in either direction
//!
//! ### Architecture
//! - A sans-I/O [`Session`](network::application::mqtt::Session) state machine
//! - Blocking and async drivers over the [`network`] transport traits
//! - Events delivered to an [`Observer`](network::application::mqtt::Observer),
//!   closures included
//! - Device glue for driving an LED from a command topic ([`gpio`])
//!
//! ## Usage
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! libmqtt5 = "0.1.0"
//! ```
//!
//! ### Hosted example
//!
//! ```rust,no_run
//! # #[cfg(feature = "std")]
//! # fn main() {
//! use libmqtt5::network::application::mqtt::{Client, Config, Event, Instant, QoS};
//! use libmqtt5::network::client::TcpConnector;
//!
//! let start = std::time::Instant::now();
//! let now = || Instant::from_millis(start.elapsed().as_millis() as u64);
//!
//! let config = Config::new("test.mosquitto.org:1883", "libmqtt5-demo").unwrap();
//! let mut client: Client<_, _> = Client::new(TcpConnector::new(), config, |event: &Event<'_>| {
//!     if let Event::MessageReceived(message) = event {
//!         println!("{}: {:?}", message.topic, message.payload);
//!     }
//! });
//!
//! client.connect(now()).unwrap();
//! loop {
//!     client.poll(now());
//!     if client.session().is_connected() {
//!         client.subscribe("libmqtt5/demo", QoS::AtLeastOnce, now()).ok();
//!         break;
//!     }
//! }
//! # }
//! # #[cfg(not(feature = "std"))]
//! # fn main() {}
//! ```
//!
//! ## Platform Support
//!
//! This library is designed to work on:
//! - Embedded microcontrollers (ARM Cortex-M, RISC-V, etc.)
//! - Linux-based IoT devices (Raspberry Pi, etc.)
//! - Any platform supporting Rust's `core` library
//!
//! ## Optional Features
//!
//! - `std`: standard library support and a `std::net` TCP transport
//! - `async`: async transport traits and the async client
//! - `defmt`: `defmt` logging and `defmt::Format` on public types
//! - `log`: logging through the `log` facade

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]
#![doc(html_root_url = "https://shishir-dey.github.io/libmqtt5/")]

#[macro_use]
mod fmt;

/// Transport traits, transports, and the MQTT engine built on them.
///
/// The traits abstract any byte stream (TCP, TLS, a cellular modem) so the
/// protocol code stays independent of the network stack.
pub mod network;

/// Driving an output pin from MQTT commands.
///
/// The LED example device: status reports on connect and subscribe, and
/// `"1"`/`"0"` commands that switch the pin.
pub mod gpio;
