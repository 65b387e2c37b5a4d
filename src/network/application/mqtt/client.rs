//! Blocking driver: a [`Session`] bound to a [`Connect`] implementation.

use super::OUTBOX_CAPACITY;
use super::config::Config;
use super::error::Error;
use super::event::Observer;
use super::packet::{Publish, QoS};
use super::properties::Properties;
use super::reason::ReasonCode;
use super::session::{Session, State};
use super::time::Instant;
use crate::network::error::Error as NetworkError;
use crate::network::{Close, Connect, Read, Write};

/// Bytes read from the transport per call.
const READ_CHUNK: usize = 512;
/// Reads attempted per `poll` before timers get a turn.
const MAX_READS_PER_POLL: usize = 8;

/// An MQTT v5 client over a blocking transport.
///
/// The client never waits for a network round trip. Operations queue
/// packets and write them straight away; replies arrive as events from
/// [`Client::poll`], which the application calls regularly with the current
/// time. The connection's `read` should return `Ok(0)` or
/// [`NetworkError::Timeout`] when no data is available, and
/// [`NetworkError::ConnectionClosed`] once the peer has closed.
///
/// After an involuntary disconnect the client reconnects on its own once
/// the configured `reconnect_interval` has passed. A user
/// [`disconnect`](Client::disconnect) is never followed by a reconnect.
pub struct Client<K: Connect, O, const N: usize = OUTBOX_CAPACITY> {
    connector: K,
    connection: Option<K::Connection>,
    session: Session<O, N>,
    reconnect_at: Option<Instant>,
    user_disconnect: bool,
}

impl<K: Connect, O: core::fmt::Debug, const N: usize> core::fmt::Debug for Client<K, O, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Client")
            .field("session", &self.session)
            .field("transport_open", &self.connection.is_some())
            .field("reconnect_at", &self.reconnect_at)
            .finish_non_exhaustive()
    }
}

impl<K: Connect, O: Observer, const N: usize> Client<K, O, N> {
    /// A disconnected client. Nothing touches the network until
    /// [`connect`](Client::connect).
    pub fn new(connector: K, config: Config, observer: O) -> Self {
        Self {
            connector,
            connection: None,
            session: Session::new(config, observer),
            reconnect_at: None,
            user_disconnect: false,
        }
    }

    /// The underlying session.
    pub fn session(&self) -> &Session<O, N> {
        &self.session
    }

    /// Current lifecycle state.
    pub fn state(&self) -> State {
        self.session.state()
    }

    /// The registered observer.
    pub fn observer(&self) -> &O {
        self.session.observer()
    }

    /// The registered observer, mutably.
    pub fn observer_mut(&mut self) -> &mut O {
        self.session.observer_mut()
    }

    /// Replace the observer, returning the previous one.
    pub fn register_observer(&mut self, observer: O) -> O {
        self.session.register_observer(observer)
    }

    /// `true` while a transport connection is open.
    pub fn is_transport_open(&self) -> bool {
        self.connection.is_some()
    }

    /// When the next automatic reconnect is due, if one is scheduled.
    pub fn reconnect_at(&self) -> Option<Instant> {
        self.reconnect_at
    }

    /// Open the transport to the configured broker and send CONNECT.
    ///
    /// A transport failure is reported as [`Event::ConnectionError`] and
    /// returned; a reconnect is scheduled if the config asks for one.
    ///
    /// [`Event::ConnectionError`]: super::Event::ConnectionError
    pub fn connect(&mut self, now: Instant) -> Result<(), Error> {
        if self.session.state() != State::Disconnected {
            return Err(Error::InvalidState);
        }
        self.user_disconnect = false;
        self.reconnect_at = None;
        self.open(now)
    }

    fn open(&mut self, now: Instant) -> Result<(), Error> {
        self.close_transport();
        match self.connector.connect(&self.session.config().broker) {
            Ok(connection) => self.connection = Some(connection),
            Err(e) => {
                let e: NetworkError = e.into();
                warn!("transport connect failed: {:?}", e);
                self.session.on_connect_error(e);
                self.schedule_reconnect(now);
                return Err(Error::TransportError(e));
            }
        }
        self.session.connect(now)?;
        self.pump(now);
        Ok(())
    }

    /// Publish `payload` on `topic`. See [`Session::publish`].
    pub fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
        now: Instant,
    ) -> Result<Option<u16>, Error> {
        let result = self.session.publish(topic, payload, qos, retain, now);
        self.pump(now);
        result
    }

    /// Publish a prepared message. See [`Session::publish_message`].
    pub fn publish_message(&mut self, publish: Publish, now: Instant) -> Result<Option<u16>, Error> {
        let result = self.session.publish_message(publish, now);
        self.pump(now);
        result
    }

    /// Subscribe to `filter`. See [`Session::subscribe`].
    pub fn subscribe(&mut self, filter: &str, qos: QoS, now: Instant) -> Result<u16, Error> {
        let result = self.session.subscribe(filter, qos, now);
        self.pump(now);
        result
    }

    /// Unsubscribe from `filter`. See [`Session::unsubscribe`].
    pub fn unsubscribe(&mut self, filter: &str, now: Instant) -> Result<u16, Error> {
        let result = self.session.unsubscribe(filter, now);
        self.pump(now);
        result
    }

    /// Send DISCONNECT and close the transport once it is written.
    pub fn disconnect(
        &mut self,
        reason: ReasonCode,
        properties: Properties,
        now: Instant,
    ) -> Result<(), Error> {
        self.session.disconnect(reason, properties, now)?;
        self.user_disconnect = true;
        self.reconnect_at = None;
        self.pump(now);
        Ok(())
    }

    /// Read what the transport has, advance timers, write what is queued.
    ///
    /// Also performs a scheduled reconnect once it is due.
    pub fn poll(&mut self, now: Instant) {
        if self.connection.is_none() {
            match self.reconnect_at {
                Some(at) if now >= at => {
                    info!("reconnecting");
                    self.reconnect_at = None;
                    if self.open(now).is_err() {
                        return;
                    }
                }
                _ => return,
            }
        }
        self.read_available(now);
        self.session.tick(now);
        self.pump(now);
    }

    fn read_available(&mut self, now: Instant) {
        let mut buf = [0u8; READ_CHUNK];
        for _ in 0..MAX_READS_PER_POLL {
            let Some(connection) = self.connection.as_mut() else {
                return;
            };
            match connection.read(&mut buf) {
                Ok(0) => return,
                Ok(n) => {
                    trace!("read {} bytes", n);
                    if self.session.receive(&buf[..n], now).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    self.session.on_io_error(e.into());
                    return;
                }
            }
        }
    }

    fn transmit(&mut self) {
        let Some(connection) = self.connection.as_mut() else {
            return;
        };
        if self.session.outgoing().is_empty() {
            return;
        }
        while !self.session.outgoing().is_empty() {
            match connection.write(self.session.outgoing()) {
                Ok(0) => {
                    self.session.on_transport_closed();
                    return;
                }
                Ok(n) => self.session.consume_outgoing(n),
                Err(e) => {
                    self.session.on_io_error(e.into());
                    return;
                }
            }
        }
        match connection.flush() {
            Ok(()) => self.session.flushed(),
            Err(e) => self.session.on_io_error(e.into()),
        }
    }

    /// Write queued bytes, then close the transport if the session ended.
    fn pump(&mut self, now: Instant) {
        self.transmit();
        if self.session.state() == State::Disconnected && self.connection.is_some() {
            self.close_transport();
            if !self.user_disconnect {
                self.schedule_reconnect(now);
            }
        }
    }

    fn schedule_reconnect(&mut self, now: Instant) {
        if let Some(interval) = self.session.config().reconnect_interval {
            debug!("reconnect in {} ms", interval.as_millis() as u64);
            self.reconnect_at = Some(now + interval);
        }
    }

    fn close_transport(&mut self) {
        if let Some(connection) = self.connection.take() {
            if let Err(e) = connection.close() {
                let e: NetworkError = e.into();
                debug!("close failed: {:?}", e);
            }
        }
    }
}
