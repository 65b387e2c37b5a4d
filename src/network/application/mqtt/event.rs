//! Events and observers.
//!
//! The session reports everything that happens through [`Event`]s, handed
//! synchronously to a single registered [`Observer`] in the order the
//! underlying packets arrived. Events borrow from the decoded packet, so an
//! observer that wants to keep data has to copy it.

use super::error::Error;
use super::packet::QoS;
use super::properties::Properties;
use super::reason::ReasonCode;

/// An inbound application message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message<'a> {
    /// Topic name, with any topic alias already resolved.
    pub topic: &'a str,
    /// Raw payload.
    pub payload: &'a [u8],
    /// QoS the broker delivered it at.
    pub qos: QoS,
    /// Retained message.
    pub retain: bool,
    /// The broker resent it.
    pub dup: bool,
    /// Message properties.
    pub properties: &'a Properties,
}

/// Something the session wants the application to know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event<'a> {
    /// The broker accepted the connection.
    Connected {
        /// The broker resumed a previous session.
        session_present: bool,
        /// CONNACK properties.
        properties: &'a Properties,
    },
    /// The connection closed in an orderly way, from either side.
    Disconnected {
        /// Reason code of the DISCONNECT.
        reason: ReasonCode,
        /// The server's DISCONNECT properties, if the server closed it.
        properties: Option<&'a Properties>,
    },
    /// A SUBSCRIBE was acknowledged.
    Subscribed {
        /// Request identifier returned by `subscribe`.
        packet_id: u16,
        /// Granted QoS or failure per filter.
        granted: &'a [ReasonCode],
        /// SUBACK properties.
        properties: &'a Properties,
    },
    /// An UNSUBSCRIBE was acknowledged.
    Unsubscribed {
        /// Request identifier returned by `unsubscribe`.
        packet_id: u16,
        /// Result per filter.
        results: &'a [ReasonCode],
        /// UNSUBACK properties.
        properties: &'a Properties,
    },
    /// A QoS 1 publish was acknowledged.
    Published {
        /// Packet id returned by `publish`.
        packet_id: u16,
        /// `Success` or `NoMatchingSubscribers`.
        reason: ReasonCode,
        /// PUBACK properties.
        properties: &'a Properties,
    },
    /// A QoS 1 publish will never be acknowledged.
    PublishFailed {
        /// Packet id returned by `publish`.
        packet_id: u16,
        /// Why: rejected, retries exhausted, or the connection went away.
        reason: Error,
    },
    /// A SUBSCRIBE or UNSUBSCRIBE will never be acknowledged.
    RequestFailed {
        /// Request identifier.
        packet_id: u16,
        /// Why.
        reason: Error,
    },
    /// An application message arrived.
    MessageReceived(Message<'a>),
    /// A connection attempt failed.
    ConnectionError(Error),
    /// The connection was lost.
    TransportError(Error),
}

/// Receiver of session events.
///
/// Closures taking `&Event` implement it, so most applications never name
/// the trait:
///
/// ```rust
/// use libmqtt5::network::application::mqtt::{Dispatcher, Event, Observer};
///
/// let mut count = 0;
/// let mut dispatcher = Dispatcher::new(|_: &Event<'_>| count += 1);
/// dispatcher.dispatch(&Event::ConnectionError(
///     libmqtt5::network::application::mqtt::Error::ConnectTimeout,
/// ));
/// drop(dispatcher);
/// assert_eq!(count, 1);
/// ```
pub trait Observer {
    /// Handle one event.
    fn on_event(&mut self, event: &Event<'_>);
}

impl<F> Observer for F
where
    F: FnMut(&Event<'_>),
{
    fn on_event(&mut self, event: &Event<'_>) {
        self(event)
    }
}

/// An observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn on_event(&mut self, _event: &Event<'_>) {}
}

/// Owns the registered observer and hands it events.
#[derive(Debug)]
pub struct Dispatcher<O> {
    observer: O,
}

impl<O: Observer> Dispatcher<O> {
    /// Dispatch to `observer`.
    pub fn new(observer: O) -> Self {
        Self { observer }
    }

    /// Replace the observer, returning the previous one.
    pub fn register(&mut self, observer: O) -> O {
        core::mem::replace(&mut self.observer, observer)
    }

    /// Deliver one event.
    pub fn dispatch(&mut self, event: &Event<'_>) {
        self.observer.on_event(event);
    }

    /// The registered observer.
    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// The registered observer, mutably.
    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        kinds: heapless::Vec<&'static str, 8>,
    }

    impl Observer for Recorder {
        fn on_event(&mut self, event: &Event<'_>) {
            let kind = match event {
                Event::Connected { .. } => "connected",
                Event::Disconnected { .. } => "disconnected",
                Event::MessageReceived(_) => "message",
                _ => "other",
            };
            self.kinds.push(kind).unwrap();
        }
    }

    #[test]
    fn events_arrive_in_dispatch_order() {
        let props = Properties::default();
        let mut dispatcher = Dispatcher::new(Recorder::default());
        dispatcher.dispatch(&Event::Connected {
            session_present: false,
            properties: &props,
        });
        dispatcher.dispatch(&Event::MessageReceived(Message {
            topic: "t",
            payload: b"1",
            qos: QoS::AtMostOnce,
            retain: false,
            dup: false,
            properties: &props,
        }));
        dispatcher.dispatch(&Event::Disconnected {
            reason: ReasonCode::NORMAL_DISCONNECTION,
            properties: None,
        });
        assert_eq!(
            &dispatcher.observer().kinds[..],
            &["connected", "message", "disconnected"]
        );
    }

    #[test]
    fn register_replaces_observer() {
        let mut dispatcher = Dispatcher::new(Recorder::default());
        dispatcher.dispatch(&Event::ConnectionError(Error::ConnectTimeout));
        let previous = dispatcher.register(Recorder::default());
        assert_eq!(previous.kinds.len(), 1);
        assert!(dispatcher.observer().kinds.is_empty());
    }
}
