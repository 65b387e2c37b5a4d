//! Error type for the MQTT v5 engine

use super::reason::ReasonCode;
use crate::network::error::Error as NetworkError;

/// Everything the engine can report, either as a returned `Err` or inside an
/// [`Event`](super::event::Event).
///
/// All variants are `Copy` and carry enough detail (a reason code or a byte
/// offset) to reproduce the failure.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// A property block could not be decoded. `offset` is the byte offset of
    /// the offending property inside the buffer handed to the decoder.
    MalformedProperty {
        /// Byte offset of the failure.
        offset: usize,
    },
    /// A packet could not be decoded. `offset` is relative to the start of
    /// the frame.
    Malformed {
        /// Byte offset of the failure.
        offset: usize,
    },
    /// The operation needs a connected session.
    NotConnected,
    /// No room for another in-flight publish.
    OutboxFull,
    /// No PINGRESP arrived within one and a half keep-alive intervals.
    KeepAliveTimeout,
    /// No CONNACK arrived within the configured connect timeout.
    ConnectTimeout,
    /// The broker refused the connection with this reason code.
    ConnectionError(ReasonCode),
    /// The broker rejected a publish, subscription or unsubscription.
    Rejected(ReasonCode),
    /// The peer violated the protocol; the code is what goes into our DISCONNECT.
    Protocol(ReasonCode),
    /// The transport failed or closed.
    TransportError(NetworkError),
    /// A fixed-capacity buffer is too small for the value.
    BufferOverflow,
    /// A frame exceeds the maximum packet size.
    PacketTooLarge {
        /// Size of the frame in bytes.
        size: usize,
        /// The limit that applies.
        maximum: usize,
    },
    /// The feature (QoS 2, retained messages on a server without them, ...) is not available.
    Unsupported,
    /// The call is not valid in the current session state.
    InvalidState,
    /// A topic name or filter is not acceptable.
    InvalidTopic,
    /// A QoS 1 publish was resent the maximum number of times without a PUBACK.
    RetriesExhausted,
}

impl Error {
    /// Reason code to put in the DISCONNECT we send when this error tears
    /// the connection down, if any.
    pub fn disconnect_reason(&self) -> Option<ReasonCode> {
        match self {
            Error::Malformed { .. } => Some(ReasonCode::MalformedPacket),
            Error::MalformedProperty { .. } => Some(ReasonCode::MalformedPacket),
            Error::PacketTooLarge { .. } => Some(ReasonCode::PacketTooLarge),
            Error::Protocol(code) => Some(*code),
            Error::KeepAliveTimeout => Some(ReasonCode::KeepAliveTimeout),
            _ => None,
        }
    }
}

impl From<NetworkError> for Error {
    fn from(e: NetworkError) -> Self {
        Error::TransportError(e)
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::MalformedProperty { offset } => {
                write!(f, "malformed property at byte {}", offset)
            }
            Error::Malformed { offset } => write!(f, "malformed packet at byte {}", offset),
            Error::NotConnected => f.write_str("not connected"),
            Error::OutboxFull => f.write_str("outbox full"),
            Error::KeepAliveTimeout => f.write_str("keep-alive timeout"),
            Error::ConnectTimeout => f.write_str("connect timeout"),
            Error::ConnectionError(code) => write!(f, "connection refused: {:?}", code),
            Error::Rejected(code) => write!(f, "rejected by broker: {:?}", code),
            Error::Protocol(code) => write!(f, "protocol violation: {:?}", code),
            Error::TransportError(e) => write!(f, "transport error: {}", e),
            Error::BufferOverflow => f.write_str("buffer overflow"),
            Error::PacketTooLarge { size, maximum } => {
                write!(f, "packet of {} bytes exceeds maximum of {}", size, maximum)
            }
            Error::Unsupported => f.write_str("unsupported"),
            Error::InvalidState => f.write_str("invalid state"),
            Error::InvalidTopic => f.write_str("invalid topic"),
            Error::RetriesExhausted => f.write_str("retries exhausted"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::MalformedProperty { offset } => {
                defmt::write!(f, "MalformedProperty({=usize})", offset)
            }
            Error::Malformed { offset } => defmt::write!(f, "Malformed({=usize})", offset),
            Error::NotConnected => defmt::write!(f, "NotConnected"),
            Error::OutboxFull => defmt::write!(f, "OutboxFull"),
            Error::KeepAliveTimeout => defmt::write!(f, "KeepAliveTimeout"),
            Error::ConnectTimeout => defmt::write!(f, "ConnectTimeout"),
            Error::ConnectionError(code) => defmt::write!(f, "ConnectionError({})", code),
            Error::Rejected(code) => defmt::write!(f, "Rejected({})", code),
            Error::Protocol(code) => defmt::write!(f, "Protocol({})", code),
            Error::TransportError(e) => defmt::write!(f, "TransportError({})", e),
            Error::BufferOverflow => defmt::write!(f, "BufferOverflow"),
            Error::PacketTooLarge { size, maximum } => {
                defmt::write!(f, "PacketTooLarge({=usize} > {=usize})", size, maximum)
            }
            Error::Unsupported => defmt::write!(f, "Unsupported"),
            Error::InvalidState => defmt::write!(f, "InvalidState"),
            Error::InvalidTopic => defmt::write!(f, "InvalidTopic"),
            Error::RetriesExhausted => defmt::write!(f, "RetriesExhausted"),
        }
    }
}
