//! The MQTT v5 connection state machine.
//!
//! [`Session`] is sans-I/O. It owns the configuration, the outbox, the
//! observer and two fixed buffers, and it is driven from the outside:
//!
//! - bytes read from the transport go into [`Session::receive`];
//! - bytes to write are in [`Session::outgoing`], and the driver reports
//!   progress with [`Session::consume_outgoing`] and [`Session::flushed`];
//! - timers (connect timeout, keep-alive, publish retries) advance only in
//!   [`Session::tick`];
//! - transport failures come in through [`Session::on_transport_error`] and
//!   [`Session::on_transport_closed`].
//!
//! Every method takes `&mut self`, so all packet processing, application
//! calls and timer work for one session are serialized by the borrow.
//!
//! ```text
//! Disconnected --connect--> Connecting --CONNACK ok--> Connected
//!      ^                        |                          |
//!      +---CONNACK error/timeout+          disconnect()    |
//!      |                                                   v
//!      +--------------flushed------------------------ Disconnecting
//!      ^
//!      +-- transport error, malformed packet, protocol violation,
//!          keep-alive timeout, server DISCONNECT (from any state)
//! ```

use super::config::Config;
use super::error::Error;
use super::event::{Dispatcher, Event, Message, Observer};
use super::outbox::{InFlight, Outbox, Retry};
use super::packet::{
    self, Disconnect, Packet, PubAck, Publish, QoS, Subscribe, SubscribeOptions, Subscription,
    Unsubscribe, is_valid_topic_filter, is_valid_topic_name,
};
use super::properties::{Properties, PropertyString};
use super::reason::ReasonCode;
use super::time::{Duration, Instant};
use super::{
    MAX_PENDING_REQUESTS, MAX_TOPIC_ALIASES, OUTBOX_CAPACITY, RX_BUFFER_LEN, TX_BUFFER_LEN, Topic,
};
use crate::network::error::Error as NetworkError;
use heapless::Vec;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// No connection. The only state in which `connect` is accepted.
    Disconnected,
    /// CONNECT queued, waiting for CONNACK.
    Connecting,
    /// CONNACK received with success.
    Connected,
    /// DISCONNECT queued, waiting for it to be flushed.
    Disconnecting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Request {
    Subscribe,
    Unsubscribe,
}

/// What the server told us in its CONNACK.
#[derive(Debug, Clone, Copy)]
struct ServerLimits {
    receive_maximum: u16,
    maximum_packet_size: Option<u32>,
    maximum_qos: QoS,
    retain_available: bool,
}

impl Default for ServerLimits {
    fn default() -> Self {
        Self {
            receive_maximum: u16::MAX,
            maximum_packet_size: None,
            maximum_qos: QoS::AtLeastOnce,
            retain_available: true,
        }
    }
}

type TxBuffer = Vec<u8, TX_BUFFER_LEN>;

/// Encode `packet` at the end of `tx`, honouring the server's maximum packet size.
fn queue_packet(tx: &mut TxBuffer, limit: Option<u32>, packet: &Packet) -> Result<usize, Error> {
    let len = packet.encoded_len();
    if let Some(maximum) = limit {
        if len > maximum as usize {
            return Err(Error::PacketTooLarge {
                size: len,
                maximum: maximum as usize,
            });
        }
    }
    let start = tx.len();
    tx.resize(start + len, 0).map_err(|_| Error::BufferOverflow)?;
    match packet.encode(&mut tx[start..]) {
        Ok(n) => {
            tx.truncate(start + n);
            Ok(n)
        }
        Err(e) => {
            tx.truncate(start);
            Err(e)
        }
    }
}

/// A single MQTT v5 session.
///
/// `O` receives the events, `N` bounds the number of in-flight QoS 1
/// publishes.
#[derive(Debug)]
pub struct Session<O, const N: usize = OUTBOX_CAPACITY> {
    config: Config,
    state: State,
    dispatcher: Dispatcher<O>,
    outbox: Outbox<N>,
    requests: Vec<(u16, Request), MAX_PENDING_REQUESTS>,
    next_packet_id: u16,
    rx: Vec<u8, RX_BUFFER_LEN>,
    tx: TxBuffer,
    connect_sent_at: Option<Instant>,
    last_outbound: Instant,
    ping_sent_at: Option<Instant>,
    keep_alive: u16,
    server: ServerLimits,
    aliases: Vec<(u16, Topic), MAX_TOPIC_ALIASES>,
    assigned_client_id: Option<PropertyString>,
    disconnect_reason: ReasonCode,
}

impl<O: Observer, const N: usize> Session<O, N> {
    /// A disconnected session.
    pub fn new(config: Config, observer: O) -> Self {
        let outbox = Outbox::new(config.retry_timeout, config.max_retries);
        let keep_alive = config.keep_alive;
        Self {
            config,
            state: State::Disconnected,
            dispatcher: Dispatcher::new(observer),
            outbox,
            requests: Vec::new(),
            next_packet_id: 1,
            rx: Vec::new(),
            tx: Vec::new(),
            connect_sent_at: None,
            last_outbound: Instant::default(),
            ping_sent_at: None,
            keep_alive,
            server: ServerLimits::default(),
            aliases: Vec::new(),
            assigned_client_id: None,
            disconnect_reason: ReasonCode::NORMAL_DISCONNECTION,
        }
    }

    /// Replace the observer, returning the previous one.
    pub fn register_observer(&mut self, observer: O) -> O {
        self.dispatcher.register(observer)
    }

    /// The registered observer.
    pub fn observer(&self) -> &O {
        self.dispatcher.observer()
    }

    /// The registered observer, mutably.
    pub fn observer_mut(&mut self) -> &mut O {
        self.dispatcher.observer_mut()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> State {
        self.state
    }

    /// `true` in [`State::Connected`].
    pub fn is_connected(&self) -> bool {
        self.state == State::Connected
    }

    /// The configuration the session was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// In-flight QoS 1 publishes.
    pub fn outbox(&self) -> &Outbox<N> {
        &self.outbox
    }

    /// SUBSCRIBE and UNSUBSCRIBE requests awaiting acknowledgement.
    pub fn pending_requests(&self) -> usize {
        self.requests.len()
    }

    /// Keep-alive in effect, in seconds. The server may override ours.
    pub fn keep_alive(&self) -> u16 {
        self.keep_alive
    }

    /// Client identifier assigned by the server, if any.
    pub fn assigned_client_id(&self) -> Option<&str> {
        self.assigned_client_id.as_deref()
    }

    /// Bytes waiting to be written to the transport.
    pub fn outgoing(&self) -> &[u8] {
        &self.tx
    }

    /// Drop the first `n` outgoing bytes after the transport accepted them.
    pub fn consume_outgoing(&mut self, n: usize) {
        let len = self.tx.len();
        let n = n.min(len);
        self.tx.copy_within(n..len, 0);
        self.tx.truncate(len - n);
    }

    /// The transport flushed everything handed to it.
    ///
    /// Completes a pending disconnect once the DISCONNECT has left.
    pub fn flushed(&mut self) {
        if self.state == State::Disconnecting && self.tx.is_empty() {
            self.finish_disconnect();
        }
    }

    fn enqueue(&mut self, packet: &Packet, now: Instant) -> Result<(), Error> {
        let n = queue_packet(&mut self.tx, self.server.maximum_packet_size, packet)?;
        trace!("queued {} bytes", n);
        self.last_outbound = now;
        Ok(())
    }

    fn allocate_packet_id(&mut self) -> Result<u16, Error> {
        for _ in 0..u16::MAX {
            let id = self.next_packet_id;
            self.next_packet_id = if id == u16::MAX { 1 } else { id + 1 };
            let in_use =
                self.outbox.contains(id) || self.requests.iter().any(|(pending, _)| *pending == id);
            if !in_use {
                return Ok(id);
            }
        }
        Err(Error::OutboxFull)
    }

    /// Queue a CONNECT and start waiting for the CONNACK.
    pub fn connect(&mut self, now: Instant) -> Result<(), Error> {
        if self.state != State::Disconnected {
            return Err(Error::InvalidState);
        }
        self.tx.clear();
        self.rx.clear();
        self.aliases.clear();
        self.server = ServerLimits::default();
        self.keep_alive = self.config.keep_alive;
        self.ping_sent_at = None;
        self.assigned_client_id = None;

        let connect = Packet::Connect(self.config.connect_packet());
        self.enqueue(&connect, now)?;
        self.state = State::Connecting;
        self.connect_sent_at = Some(now);
        info!("connecting as '{}'", self.config.client_id.as_str());
        Ok(())
    }

    /// Publish `payload` on `topic`.
    ///
    /// QoS 0 returns `Ok(None)` once the packet is queued. QoS 1 returns the
    /// packet id; the outcome arrives later as [`Event::Published`] or
    /// [`Event::PublishFailed`].
    pub fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
        now: Instant,
    ) -> Result<Option<u16>, Error> {
        if self.state != State::Connected {
            return Err(Error::NotConnected);
        }
        self.publish_message(Publish::new(topic, payload, qos, retain)?, now)
    }

    /// Publish a prepared message, properties included.
    pub fn publish_message(&mut self, mut publish: Publish, now: Instant) -> Result<Option<u16>, Error> {
        if self.state != State::Connected {
            return Err(Error::NotConnected);
        }
        if publish.qos == QoS::ExactlyOnce || publish.qos > self.server.maximum_qos {
            return Err(Error::Unsupported);
        }
        if publish.retain && !self.server.retain_available {
            return Err(Error::Unsupported);
        }
        if !is_valid_topic_name(&publish.topic) {
            return Err(Error::InvalidTopic);
        }
        publish.dup = false;

        if publish.qos == QoS::AtMostOnce {
            publish.packet_id = None;
            self.enqueue(&Packet::Publish(publish), now)?;
            debug!("published QoS 0");
            return Ok(None);
        }

        if self.outbox.is_full() {
            return Err(Error::OutboxFull);
        }
        let packet_id = self.allocate_packet_id()?;
        publish.packet_id = Some(packet_id);
        let packet = Packet::Publish(publish);
        self.enqueue(&packet, now)?;
        if let Packet::Publish(publish) = packet {
            self.outbox.track(InFlight::new(publish, now)?)?;
        }
        debug!("published QoS 1, packet id {}", packet_id);
        Ok(Some(packet_id))
    }

    /// Subscribe to `filter`. Returns the request's packet id; the outcome
    /// arrives as [`Event::Subscribed`] or [`Event::RequestFailed`].
    pub fn subscribe(&mut self, filter: &str, qos: QoS, now: Instant) -> Result<u16, Error> {
        self.subscribe_with_options(filter, SubscribeOptions::new(qos), now)
    }

    /// Subscribe with explicit subscription options.
    pub fn subscribe_with_options(
        &mut self,
        filter: &str,
        options: SubscribeOptions,
        now: Instant,
    ) -> Result<u16, Error> {
        if self.state != State::Connected {
            return Err(Error::NotConnected);
        }
        if options.qos == QoS::ExactlyOnce {
            return Err(Error::Unsupported);
        }
        if !is_valid_topic_filter(filter) {
            return Err(Error::InvalidTopic);
        }
        if self.requests.is_full() {
            return Err(Error::OutboxFull);
        }

        let mut filters = Vec::new();
        filters
            .push(Subscription {
                topic_filter: Topic::try_from(filter).map_err(|_| Error::BufferOverflow)?,
                options,
            })
            .map_err(|_| Error::BufferOverflow)?;
        let packet_id = self.allocate_packet_id()?;
        self.enqueue(
            &Packet::Subscribe(Subscribe {
                packet_id,
                properties: Properties::default(),
                filters,
            }),
            now,
        )?;
        self.requests
            .push((packet_id, Request::Subscribe))
            .map_err(|_| Error::OutboxFull)?;
        debug!("subscribe '{}', packet id {}", filter, packet_id);
        Ok(packet_id)
    }

    /// Unsubscribe from `filter`. Returns the request's packet id; the
    /// outcome arrives as [`Event::Unsubscribed`] or [`Event::RequestFailed`].
    pub fn unsubscribe(&mut self, filter: &str, now: Instant) -> Result<u16, Error> {
        if self.state != State::Connected {
            return Err(Error::NotConnected);
        }
        if !is_valid_topic_filter(filter) {
            return Err(Error::InvalidTopic);
        }
        if self.requests.is_full() {
            return Err(Error::OutboxFull);
        }

        let mut filters = Vec::new();
        filters
            .push(Topic::try_from(filter).map_err(|_| Error::BufferOverflow)?)
            .map_err(|_| Error::BufferOverflow)?;
        let packet_id = self.allocate_packet_id()?;
        self.enqueue(
            &Packet::Unsubscribe(Unsubscribe {
                packet_id,
                properties: Properties::default(),
                filters,
            }),
            now,
        )?;
        self.requests
            .push((packet_id, Request::Unsubscribe))
            .map_err(|_| Error::OutboxFull)?;
        debug!("unsubscribe '{}', packet id {}", filter, packet_id);
        Ok(packet_id)
    }

    /// Queue a DISCONNECT with `reason` and `properties`.
    ///
    /// The session moves to [`State::Disconnecting`] and finishes the
    /// disconnect once the driver reports the bytes flushed. Raising the
    /// session expiry interval from zero is a protocol error.
    pub fn disconnect(
        &mut self,
        reason: ReasonCode,
        properties: Properties,
        now: Instant,
    ) -> Result<(), Error> {
        if self.state != State::Connected {
            return Err(Error::NotConnected);
        }
        let raises_expiry = matches!(properties.session_expiry_interval, Some(v) if v != 0);
        if raises_expiry && self.config.session_expiry_interval == 0 {
            return Err(Error::Protocol(ReasonCode::ProtocolError));
        }
        self.enqueue(
            &Packet::Disconnect(Disconnect {
                reason_code: reason,
                properties,
            }),
            now,
        )?;
        self.state = State::Disconnecting;
        self.disconnect_reason = reason;
        info!("disconnecting");
        Ok(())
    }

    /// Feed bytes read from the transport.
    ///
    /// Complete packets are processed immediately, in order. An `Err` means
    /// the data tore the connection down; the failure has already been
    /// reported to the observer.
    pub fn receive(&mut self, mut data: &[u8], now: Instant) -> Result<(), Error> {
        while !data.is_empty() {
            if self.state == State::Disconnected {
                debug!("dropping {} bytes received while disconnected", data.len());
                return Ok(());
            }
            let room = RX_BUFFER_LEN - self.rx.len();
            if room == 0 {
                let size = packet::frame_len(&self.rx).ok().flatten().unwrap_or(self.rx.len());
                return Err(self.fail(Error::PacketTooLarge {
                    size,
                    maximum: RX_BUFFER_LEN,
                }));
            }
            let take = room.min(data.len());
            self.rx
                .extend_from_slice(&data[..take])
                .map_err(|_| Error::BufferOverflow)?;
            data = &data[take..];
            self.process_frames(now)?;
        }
        Ok(())
    }

    fn inbound_limit(&self) -> usize {
        self.config.advertised_maximum_packet_size() as usize
    }

    fn process_frames(&mut self, now: Instant) -> Result<(), Error> {
        while self.state != State::Disconnected {
            let maximum = self.inbound_limit();
            let size = match packet::frame_len(&self.rx) {
                Err(e) => return Err(self.fail(e)),
                Ok(None) => return Ok(()),
                Ok(Some(size)) if size > maximum => {
                    return Err(self.fail(Error::PacketTooLarge { size, maximum }));
                }
                Ok(Some(size)) if size > self.rx.len() => return Ok(()),
                Ok(Some(size)) => size,
            };

            let (packet, used) = match Packet::decode(&self.rx) {
                Ok(Some(frame)) => frame,
                Ok(None) => return Ok(()),
                // A field longer than we can hold.
                Err(Error::BufferOverflow) => {
                    return Err(self.fail(Error::PacketTooLarge { size, maximum }));
                }
                Err(e) => return Err(self.fail(e)),
            };
            let len = self.rx.len();
            self.rx.copy_within(used..len, 0);
            self.rx.truncate(len - used);

            if let Err(e) = self.handle(packet, now) {
                return Err(self.fail(e));
            }
        }
        Ok(())
    }

    fn handle(&mut self, packet: Packet, now: Instant) -> Result<(), Error> {
        use State::*;
        match (self.state, packet) {
            (Connecting, Packet::ConnAck(ack)) => {
                self.connect_sent_at = None;
                if ack.reason_code.is_error() {
                    warn!("connection refused: {:?}", ack.reason_code);
                    self.connection_failed(Error::ConnectionError(ack.reason_code));
                    return Ok(());
                }

                let p = &ack.properties;
                self.server = ServerLimits {
                    receive_maximum: p.receive_maximum.unwrap_or(u16::MAX),
                    maximum_packet_size: p.maximum_packet_size,
                    maximum_qos: if p.maximum_qos == Some(0) {
                        QoS::AtMostOnce
                    } else {
                        QoS::AtLeastOnce
                    },
                    retain_available: p.retain_available.unwrap_or(true),
                };
                self.outbox.set_receive_maximum(self.server.receive_maximum);
                self.keep_alive = p.server_keep_alive.unwrap_or(self.config.keep_alive);
                self.assigned_client_id = p.assigned_client_identifier.clone();
                self.ping_sent_at = None;
                self.state = Connected;
                info!(
                    "connected, keep-alive {}s, receive maximum {}",
                    self.keep_alive,
                    self.server.receive_maximum
                );
                self.dispatcher.dispatch(&Event::Connected {
                    session_present: ack.session_present,
                    properties: &ack.properties,
                });
                Ok(())
            }
            (Connected | Disconnecting, Packet::Publish(mut publish)) => {
                if publish.qos == QoS::ExactlyOnce {
                    return Err(Error::Protocol(ReasonCode::QoSNotSupported));
                }
                self.resolve_topic_alias(&mut publish)?;
                trace!("message on '{}'", publish.topic.as_str());
                self.dispatcher.dispatch(&Event::MessageReceived(Message {
                    topic: &publish.topic,
                    payload: &publish.payload,
                    qos: publish.qos,
                    retain: publish.retain,
                    dup: publish.dup,
                    properties: &publish.properties,
                }));
                if let Some(packet_id) = publish.packet_id {
                    self.enqueue(
                        &Packet::PubAck(PubAck {
                            packet_id,
                            reason_code: ReasonCode::Success,
                            properties: Properties::default(),
                        }),
                        now,
                    )?;
                }
                Ok(())
            }
            (Connected | Disconnecting, Packet::PubAck(ack)) => {
                match self.outbox.acknowledge(ack.packet_id) {
                    Some(_) if ack.reason_code.is_error() => {
                        warn!("publish {} rejected: {:?}", ack.packet_id, ack.reason_code);
                        self.dispatcher.dispatch(&Event::PublishFailed {
                            packet_id: ack.packet_id,
                            reason: Error::Rejected(ack.reason_code),
                        });
                    }
                    Some(_) => self.dispatcher.dispatch(&Event::Published {
                        packet_id: ack.packet_id,
                        reason: ack.reason_code,
                        properties: &ack.properties,
                    }),
                    None => warn!("PUBACK for unknown packet id {}", ack.packet_id),
                }
                Ok(())
            }
            (Connected | Disconnecting, Packet::SubAck(ack)) => {
                if self.take_request(ack.packet_id, Request::Subscribe) {
                    self.dispatcher.dispatch(&Event::Subscribed {
                        packet_id: ack.packet_id,
                        granted: &ack.reason_codes,
                        properties: &ack.properties,
                    });
                } else {
                    warn!("SUBACK for unknown packet id {}", ack.packet_id);
                }
                Ok(())
            }
            (Connected | Disconnecting, Packet::UnsubAck(ack)) => {
                if self.take_request(ack.packet_id, Request::Unsubscribe) {
                    self.dispatcher.dispatch(&Event::Unsubscribed {
                        packet_id: ack.packet_id,
                        results: &ack.reason_codes,
                        properties: &ack.properties,
                    });
                } else {
                    warn!("UNSUBACK for unknown packet id {}", ack.packet_id);
                }
                Ok(())
            }
            (Connected | Disconnecting, Packet::PingResp) => {
                trace!("PINGRESP");
                self.ping_sent_at = None;
                Ok(())
            }
            (Connecting | Connected | Disconnecting, Packet::Disconnect(disconnect)) => {
                warn!("server disconnected: {:?}", disconnect.reason_code);
                self.reset();
                self.tx.clear();
                self.dispatcher.dispatch(&Event::Disconnected {
                    reason: disconnect.reason_code,
                    properties: Some(&disconnect.properties),
                });
                self.flush_pending(Error::ConnectionError(disconnect.reason_code));
                Ok(())
            }
            _ => Err(Error::Protocol(ReasonCode::ProtocolError)),
        }
    }

    fn take_request(&mut self, packet_id: u16, kind: Request) -> bool {
        match self
            .requests
            .iter()
            .position(|(id, k)| *id == packet_id && *k == kind)
        {
            Some(index) => {
                self.requests.remove(index);
                true
            }
            None => false,
        }
    }

    fn resolve_topic_alias(&mut self, publish: &mut Publish) -> Result<(), Error> {
        let Some(alias) = publish.properties.topic_alias else {
            if publish.topic.is_empty() {
                return Err(Error::Protocol(ReasonCode::ProtocolError));
            }
            return Ok(());
        };
        if alias == 0 || alias > self.config.advertised_topic_alias_maximum() {
            return Err(Error::Protocol(ReasonCode::TopicAliasInvalid));
        }

        let slot = self.aliases.iter().position(|(a, _)| *a == alias);
        if publish.topic.is_empty() {
            let index = slot.ok_or(Error::Protocol(ReasonCode::ProtocolError))?;
            publish.topic = self.aliases[index].1.clone();
            return Ok(());
        }
        match slot {
            Some(index) => self.aliases[index].1 = publish.topic.clone(),
            None => self
                .aliases
                .push((alias, publish.topic.clone()))
                .map_err(|_| Error::Protocol(ReasonCode::TopicAliasInvalid))?,
        }
        Ok(())
    }

    /// Advance timers: connect timeout, keep-alive, publish retries.
    pub fn tick(&mut self, now: Instant) {
        match self.state {
            State::Connecting => {
                let expired = self
                    .connect_sent_at
                    .is_some_and(|sent| now.duration_since(sent) >= self.config.connect_timeout);
                if expired {
                    warn!("no CONNACK within the connect timeout");
                    self.connection_failed(Error::ConnectTimeout);
                }
            }
            State::Connected => {
                self.check_keep_alive(now);
                if self.state == State::Connected {
                    self.retry_publishes(now);
                }
            }
            State::Disconnecting | State::Disconnected => {}
        }
    }

    fn check_keep_alive(&mut self, now: Instant) {
        if self.keep_alive == 0 {
            return;
        }
        let interval = Duration::from_secs(self.keep_alive as u64);
        if let Some(sent) = self.ping_sent_at {
            if now.duration_since(sent) >= interval * 3 / 2 {
                error!("no PINGRESP within {}s", self.keep_alive as u32 * 3 / 2);
                self.fail(Error::KeepAliveTimeout);
            }
            return;
        }
        if now.duration_since(self.last_outbound) >= interval {
            match self.enqueue(&Packet::PingReq, now) {
                Ok(()) => {
                    trace!("PINGREQ");
                    self.ping_sent_at = Some(now);
                }
                Err(e) => warn!("could not queue PINGREQ: {:?}", e),
            }
        }
    }

    fn retry_publishes(&mut self, now: Instant) {
        let limit = self.server.maximum_packet_size;
        let mut resent = false;
        let tx = &mut self.tx;
        let dispatcher = &mut self.dispatcher;
        self.outbox.on_timeout_tick(now, |retry| match retry {
            Retry::Resend(publish) => {
                let packet = Packet::Publish(publish.clone());
                match queue_packet(tx, limit, &packet) {
                    Ok(_) => {
                        debug!("resending packet id {}", publish.packet_id.unwrap_or(0));
                        resent = true;
                        true
                    }
                    Err(e) => {
                        warn!("could not resend publish: {:?}", e);
                        false
                    }
                }
            }
            Retry::Exhausted(record) => {
                warn!("packet id {} unacknowledged, giving up", record.packet_id);
                dispatcher.dispatch(&Event::PublishFailed {
                    packet_id: record.packet_id,
                    reason: Error::RetriesExhausted,
                });
                true
            }
        });
        if resent {
            self.last_outbound = now;
        }
    }

    /// The transport could not be opened. Reported as a connection error.
    pub fn on_connect_error(&mut self, error: NetworkError) {
        if self.state != State::Disconnected {
            self.fail(Error::TransportError(error));
            return;
        }
        self.dispatcher
            .dispatch(&Event::ConnectionError(Error::TransportError(error)));
    }

    /// The transport reported an error.
    pub fn on_transport_error(&mut self, error: NetworkError) {
        self.fail(Error::TransportError(error));
    }

    /// The transport closed.
    ///
    /// While disconnecting this completes the disconnect; otherwise it is a
    /// connection loss.
    pub fn on_transport_closed(&mut self) {
        match self.state {
            State::Disconnecting => {
                self.tx.clear();
                self.finish_disconnect();
            }
            State::Disconnected => {}
            State::Connecting | State::Connected => {
                self.fail(Error::TransportError(NetworkError::ConnectionClosed));
            }
        }
    }

    /// Route an error from a transport read, write or flush. A timeout only
    /// means nothing moved; a closed connection goes to
    /// [`on_transport_closed`](Self::on_transport_closed).
    pub(crate) fn on_io_error(&mut self, error: NetworkError) {
        match error {
            NetworkError::Timeout => {}
            NetworkError::ConnectionClosed => self.on_transport_closed(),
            error => self.on_transport_error(error),
        }
    }

    fn reset(&mut self) {
        self.state = State::Disconnected;
        self.connect_sent_at = None;
        self.ping_sent_at = None;
        self.rx.clear();
        self.aliases.clear();
    }

    fn flush_pending(&mut self, reason: Error) {
        let dispatcher = &mut self.dispatcher;
        self.outbox.flush_all(reason, |record, reason| {
            dispatcher.dispatch(&Event::PublishFailed {
                packet_id: record.packet_id,
                reason,
            });
        });
        for (packet_id, _) in core::mem::take(&mut self.requests) {
            self.dispatcher
                .dispatch(&Event::RequestFailed { packet_id, reason });
        }
    }

    fn finish_disconnect(&mut self) {
        self.reset();
        info!("disconnected");
        self.dispatcher.dispatch(&Event::Disconnected {
            reason: self.disconnect_reason,
            properties: None,
        });
        self.flush_pending(Error::NotConnected);
    }

    fn connection_failed(&mut self, error: Error) {
        self.reset();
        self.tx.clear();
        self.dispatcher.dispatch(&Event::ConnectionError(error));
        self.flush_pending(error);
    }

    /// Tear the connection down after a fatal error, returning the error.
    ///
    /// Emits exactly one [`Event::TransportError`] followed by a failure
    /// event for every in-flight publish and pending request. Protocol-level
    /// errors leave a best-effort DISCONNECT with a matching reason code in
    /// the outgoing buffer.
    fn fail(&mut self, error: Error) -> Error {
        if self.state == State::Disconnected {
            return error;
        }
        let was_open = matches!(self.state, State::Connected | State::Disconnecting);
        error!("connection lost: {:?}", error);
        self.reset();
        self.tx.clear();
        if let (true, Some(reason_code)) = (was_open, error.disconnect_reason()) {
            let goodbye = Packet::Disconnect(Disconnect {
                reason_code,
                properties: Properties::default(),
            });
            if queue_packet(&mut self.tx, None, &goodbye).is_err() {
                self.tx.clear();
            }
        }
        self.dispatcher.dispatch(&Event::TransportError(error));
        self.flush_pending(error);
        error
    }
}
