//! Async driver: a [`Session`] bound to an [`AsyncConnect`] implementation.
//!
//! Mirrors [`Client`](super::Client). The connection's `read` should give up
//! after a short wait with `Ok(0)` or [`NetworkError::Timeout`], otherwise
//! `poll` will not get back to its timers.

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
use crate::network::{AsyncClose, AsyncConnect, AsyncRead, AsyncWrite};

const READ_CHUNK: usize = 512;
const MAX_READS_PER_POLL: usize = 8;

/// An MQTT v5 client over an async transport.
pub struct AsyncClient<K: AsyncConnect, O, const N: usize = OUTBOX_CAPACITY> {
    connector: K,
    connection: Option<K::Connection>,
    session: Session<O, N>,
    reconnect_at: Option<Instant>,
    user_disconnect: bool,
}

impl<K: AsyncConnect, O: core::fmt::Debug, const N: usize> core::fmt::Debug
    for AsyncClient<K, O, N>
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AsyncClient")
            .field("session", &self.session)
            .field("transport_open", &self.connection.is_some())
            .field("reconnect_at", &self.reconnect_at)
            .finish_non_exhaustive()
    }
}

impl<K: AsyncConnect, O: Observer, const N: usize> AsyncClient<K, O, N> {
    /// A disconnected client.
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

    /// When the next automatic reconnect is due, if one is scheduled.
    pub fn reconnect_at(&self) -> Option<Instant> {
        self.reconnect_at
    }

    /// Open the transport and send CONNECT.
    pub async fn connect(&mut self, now: Instant) -> Result<(), Error> {
        if self.session.state() != State::Disconnected {
            return Err(Error::InvalidState);
        }
        self.user_disconnect = false;
        self.reconnect_at = None;
        self.open(now).await
    }

    async fn open(&mut self, now: Instant) -> Result<(), Error> {
        self.close_transport().await;
        match self.connector.connect(&self.session.config().broker).await {
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
        self.pump(now).await;
        Ok(())
    }

    /// Publish `payload` on `topic`.
    pub async fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
        now: Instant,
    ) -> Result<Option<u16>, Error> {
        let result = self.session.publish(topic, payload, qos, retain, now);
        self.pump(now).await;
        result
    }

    /// Publish a prepared message.
    pub async fn publish_message(
        &mut self,
        publish: Publish,
        now: Instant,
    ) -> Result<Option<u16>, Error> {
        let result = self.session.publish_message(publish, now);
        self.pump(now).await;
        result
    }

    /// Subscribe to `filter`.
    pub async fn subscribe(&mut self, filter: &str, qos: QoS, now: Instant) -> Result<u16, Error> {
        let result = self.session.subscribe(filter, qos, now);
        self.pump(now).await;
        result
    }

    /// Unsubscribe from `filter`.
    pub async fn unsubscribe(&mut self, filter: &str, now: Instant) -> Result<u16, Error> {
        let result = self.session.unsubscribe(filter, now);
        self.pump(now).await;
        result
    }

    /// Send DISCONNECT and close the transport once it is written.
    pub async fn disconnect(
        &mut self,
        reason: ReasonCode,
        properties: Properties,
        now: Instant,
    ) -> Result<(), Error> {
        self.session.disconnect(reason, properties, now)?;
        self.user_disconnect = true;
        self.reconnect_at = None;
        self.pump(now).await;
        Ok(())
    }

    /// Read what the transport has, advance timers, write what is queued.
    pub async fn poll(&mut self, now: Instant) {
        if self.connection.is_none() {
            match self.reconnect_at {
                Some(at) if now >= at => {
                    info!("reconnecting");
                    self.reconnect_at = None;
                    if self.open(now).await.is_err() {
                        return;
                    }
                }
                _ => return,
            }
        }
        self.read_available(now).await;
        self.session.tick(now);
        self.pump(now).await;
    }

    async fn read_available(&mut self, now: Instant) {
        let mut buf = [0u8; READ_CHUNK];
        for _ in 0..MAX_READS_PER_POLL {
            let Some(connection) = self.connection.as_mut() else {
                return;
            };
            match connection.read(&mut buf).await {
                Ok(0) => return,
                Ok(n) => {
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

    async fn transmit(&mut self) {
        let Some(connection) = self.connection.as_mut() else {
            return;
        };
        if self.session.outgoing().is_empty() {
            return;
        }
        while !self.session.outgoing().is_empty() {
            match connection.write(self.session.outgoing()).await {
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
        match connection.flush().await {
            Ok(()) => self.session.flushed(),
            Err(e) => self.session.on_io_error(e.into()),
        }
    }

    async fn pump(&mut self, now: Instant) {
        self.transmit().await;
        if self.session.state() == State::Disconnected && self.connection.is_some() {
            self.close_transport().await;
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

    async fn close_transport(&mut self) {
        if let Some(connection) = self.connection.take() {
            if let Err(e) = connection.close().await {
                let e: NetworkError = e.into();
                debug!("close failed: {:?}", e);
            }
        }
    }
}
