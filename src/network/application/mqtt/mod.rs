//! MQTT v5 client engine for embedded systems.
//!
//! The engine is split into a sans-I/O core and thin drivers:
//!
//! - [`codec`] and [`properties`] encode and decode the wire primitives and
//!   the MQTT v5 property blocks.
//! - [`packet`] frames and parses the packets a QoS 0/1 client needs.
//! - [`outbox`] tracks QoS 1 publishes until they are acknowledged, retrying
//!   them with the DUP flag.
//! - [`event`] delivers lifecycle and message events to an [`Observer`].
//! - [`session`] is the connection state machine. It never touches a socket:
//!   bytes go in through [`Session::receive`], come out of
//!   [`Session::outgoing`], and timers advance through [`Session::tick`].
//! - [`client`] (and [`async_client`] with the `async` feature) glue a session
//!   to the transport traits in [`crate::network`].
//!
//! Every buffer has a fixed capacity, set by the constants in this module.
//!
//! # Example
//!
//! ```rust,no_run
//! use libmqtt5::network::application::mqtt::{Client, Config, Event, Instant, QoS};
//! # use libmqtt5::network::{Close, Connect, Connection, Read, Write};
//! # use libmqtt5::network::error::Error;
//! # struct Tcp;
//! # impl Read for Tcp {
//! #     type Error = Error;
//! #     fn read(&mut self, _buf: &mut [u8]) -> Result<usize, Error> { Ok(0) }
//! # }
//! # impl Write for Tcp {
//! #     type Error = Error;
//! #     fn write(&mut self, buf: &[u8]) -> Result<usize, Error> { Ok(buf.len()) }
//! #     fn flush(&mut self) -> Result<(), Error> { Ok(()) }
//! # }
//! # impl Close for Tcp {
//! #     type Error = Error;
//! #     fn close(self) -> Result<(), Error> { Ok(()) }
//! # }
//! # impl Connection for Tcp {}
//! # struct Net;
//! # impl Connect for Net {
//! #     type Connection = Tcp;
//! #     type Error = Error;
//! #     fn connect(&mut self, _remote: &str) -> Result<Tcp, Error> { Ok(Tcp) }
//! # }
//! # fn millis() -> u64 { 0 }
//!
//! let config = Config::new("broker.example.com:1883", "sensor-01").unwrap();
//! let observer = |event: &Event<'_>| {
//!     if let Event::MessageReceived(message) = event {
//!         let _ = (message.topic, message.payload);
//!     }
//! };
//! let mut client: Client<_, _> = Client::new(Net, config, observer);
//!
//! client.connect(Instant::from_millis(millis())).unwrap();
//! loop {
//!     client.poll(Instant::from_millis(millis()));
//! #   break;
//! }
//! client.publish("sensors/temperature", b"23.5", QoS::AtLeastOnce, false, Instant::from_millis(millis())).ok();
//! ```

/// Wire primitives: variable byte integers, strings, binary data.
pub mod codec;

/// Connection configuration.
pub mod config;

/// Engine error type.
pub mod error;

/// Event types and observers.
pub mod event;

/// In-flight QoS 1 publish tracking.
pub mod outbox;

/// Packet framing.
pub mod packet;

/// MQTT v5 property sets.
pub mod properties;

/// Reason codes.
pub mod reason;

/// The sans-I/O connection state machine.
pub mod session;

/// Caller-supplied monotonic time.
pub mod time;

/// Blocking driver over [`crate::network::Connect`].
pub mod client;

/// Async driver over [`crate::network::AsyncConnect`].
#[cfg(feature = "async")]
pub mod async_client;

#[cfg(feature = "async")]
pub use async_client::AsyncClient;
pub use client::Client;
pub use config::{Config, LastWill};
pub use error::Error;
pub use event::{Dispatcher, Event, Message, NoopObserver, Observer};
pub use outbox::{InFlight, Outbox};
pub use packet::{Packet, Publish, QoS, SubscribeOptions, Subscription};
pub use properties::{Properties, UserProperty};
pub use reason::ReasonCode;
pub use session::{Session, State};
pub use time::{Duration, Instant};

/// Longest topic name or filter, in bytes.
pub const MAX_TOPIC_LEN: usize = 256;
/// Largest application payload, in bytes.
pub const MAX_PAYLOAD_LEN: usize = 1024;
/// Longest string property, in bytes.
pub const MAX_STRING_PROPERTY_LEN: usize = 128;
/// Longest binary property, in bytes.
pub const MAX_BINARY_PROPERTY_LEN: usize = 64;
/// Most user properties in one property set.
pub const MAX_USER_PROPERTIES: usize = 8;
/// Longest user property key or value, in bytes.
pub const MAX_USER_PROPERTY_LEN: usize = 64;
/// Most subscription identifiers on one inbound message.
pub const MAX_SUBSCRIPTION_IDENTIFIERS: usize = 4;
/// Longest client identifier, in bytes.
pub const MAX_CLIENT_ID_LEN: usize = 64;
/// Longest user name or password, in bytes.
pub const MAX_CREDENTIAL_LEN: usize = 64;
/// Longest broker address string, in bytes.
pub const MAX_BROKER_ADDRESS_LEN: usize = 128;
/// Most topic filters in one SUBSCRIBE or UNSUBSCRIBE.
pub const MAX_TOPIC_FILTERS: usize = 4;
/// Size of the receive buffer.
pub const RX_BUFFER_LEN: usize = 2048;
/// Largest inbound packet we accept and advertise as our maximum packet
/// size. Any frame this size has a payload that fits a [`Payload`].
pub const MAX_INBOUND_PACKET_LEN: usize = MAX_PAYLOAD_LEN;
/// Size of the transmit buffer.
pub const TX_BUFFER_LEN: usize = 4096;
/// Default outbox capacity.
pub const OUTBOX_CAPACITY: usize = 16;
/// Most SUBSCRIBE/UNSUBSCRIBE requests awaiting acknowledgement.
pub const MAX_PENDING_REQUESTS: usize = 8;
/// Most inbound topic aliases we track.
pub const MAX_TOPIC_ALIASES: usize = 8;

/// A topic name or filter.
pub type Topic = heapless::String<MAX_TOPIC_LEN>;
/// An application payload.
pub type Payload = heapless::Vec<u8, MAX_PAYLOAD_LEN>;
