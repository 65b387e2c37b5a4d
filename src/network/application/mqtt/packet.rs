//! MQTT v5 packet framing.
//!
//! [`Packet`] covers the control packets a QoS 0/1 client exchanges with a
//! broker. [`Packet::encode`] writes a complete frame (fixed header, variable
//! header, payload) into a caller-provided buffer. [`Packet::decode`] parses
//! one frame from the front of a receive buffer and distinguishes three
//! outcomes:
//!
//! - `Ok(Some((packet, consumed)))`: a whole frame was parsed.
//! - `Ok(None)`: the buffer ends before the frame does. Read more bytes.
//! - `Err(Error::Malformed { offset })`: the frame is invalid. The connection
//!   has to be torn down.
//!
//! The QoS 2 handshake packets (PUBREC, PUBREL, PUBCOMP) and AUTH are not
//! part of this client and decode as malformed.

use super::codec::{Reader, Writer, decode_variable_int, variable_int_len};
use super::config::LastWill;
use super::error::Error;
use super::properties::Properties;
use super::reason::ReasonCode;
use super::{MAX_CLIENT_ID_LEN, MAX_CREDENTIAL_LEN, MAX_TOPIC_FILTERS, Payload, Topic};
use heapless::{String, Vec};

// Fixed header packet type values (upper nibble)
const CONNECT: u8 = 0x10;
const CONNACK: u8 = 0x20;
const PUBLISH: u8 = 0x30;
const PUBACK: u8 = 0x40;
const SUBSCRIBE: u8 = 0x80;
const SUBACK: u8 = 0x90;
const UNSUBSCRIBE: u8 = 0xA0;
const UNSUBACK: u8 = 0xB0;
const PINGREQ: u8 = 0xC0;
const PINGRESP: u8 = 0xD0;
const DISCONNECT: u8 = 0xE0;

const PROTOCOL_NAME: &str = "MQTT";
const PROTOCOL_LEVEL: u8 = 5;

/// Quality of Service levels for MQTT messages.
///
/// `ExactlyOnce` exists so inbound frames can be parsed and rejected; the
/// session refuses to send or accept it.
#[derive(Debug, PartialEq, Eq, Clone, Copy, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum QoS {
    /// **QoS 0**: fire and forget.
    AtMostOnce = 0,
    /// **QoS 1**: acknowledged delivery, duplicates possible.
    AtLeastOnce = 1,
    /// **QoS 2**: assured delivery. Not supported by this client.
    ExactlyOnce = 2,
}

impl TryFrom<u8> for QoS {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            _ => Err(()),
        }
    }
}

/// `true` if `topic` may be published to: non-empty, no wildcards, no null.
pub fn is_valid_topic_name(topic: &str) -> bool {
    !topic.is_empty() && !topic.contains(['+', '#', '\0'])
}

/// `true` if `filter` is a well-formed subscription filter.
///
/// `+` must fill a whole level, and `#` must be the whole last level.
pub fn is_valid_topic_filter(filter: &str) -> bool {
    if filter.is_empty() || filter.contains('\0') {
        return false;
    }
    let mut levels = filter.split('/').peekable();
    while let Some(level) = levels.next() {
        let last = levels.peek().is_none();
        match level {
            "+" => {}
            "#" if last => {}
            _ if level.contains(['+', '#']) => return false,
            _ => {}
        }
    }
    true
}

/// CONNECT: opens a session.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Connect {
    /// Discard any previous session state.
    pub clean_start: bool,
    /// Keep-alive in seconds. 0 disables it.
    pub keep_alive: u16,
    /// CONNECT properties.
    pub properties: Properties,
    /// Client identifier. May be empty if the server assigns one.
    pub client_id: String<MAX_CLIENT_ID_LEN>,
    /// Message the broker publishes if we vanish.
    pub will: Option<LastWill>,
    /// User name.
    pub username: Option<String<MAX_CREDENTIAL_LEN>>,
    /// Password.
    pub password: Option<Vec<u8, MAX_CREDENTIAL_LEN>>,
}

/// CONNACK: the broker's answer to CONNECT.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ConnAck {
    /// The broker resumed an existing session.
    pub session_present: bool,
    /// `Success` or the reason for refusal.
    pub reason_code: ReasonCode,
    /// Server limits and diagnostics.
    pub properties: Properties,
}

/// PUBLISH: an application message, in either direction.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Publish {
    /// Set on retransmissions.
    pub dup: bool,
    /// Delivery guarantee.
    pub qos: QoS,
    /// Ask the broker to keep this as the topic's retained message.
    pub retain: bool,
    /// Topic name. Empty when a topic alias stands in for it.
    pub topic: Topic,
    /// Present for QoS 1 and above.
    pub packet_id: Option<u16>,
    /// Message properties.
    pub properties: Properties,
    /// Raw payload.
    pub payload: Payload,
}

impl Publish {
    /// A QoS 0 or 1 publish without properties. The packet id is filled in
    /// by the session.
    pub fn new(topic: &str, payload: &[u8], qos: QoS, retain: bool) -> Result<Self, Error> {
        Ok(Self {
            dup: false,
            qos,
            retain,
            topic: Topic::try_from(topic).map_err(|_| Error::BufferOverflow)?,
            packet_id: None,
            properties: Properties::default(),
            payload: Payload::from_slice(payload).map_err(|_| Error::BufferOverflow)?,
        })
    }
}

/// PUBACK: acknowledges a QoS 1 publish.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PubAck {
    /// Packet being acknowledged.
    pub packet_id: u16,
    /// `Success`, `NoMatchingSubscribers`, or a failure.
    pub reason_code: ReasonCode,
    /// Diagnostics.
    pub properties: Properties,
}

/// Options attached to each filter in a SUBSCRIBE.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct SubscribeOptions {
    /// Highest QoS the broker may use when forwarding.
    pub qos: QoS,
    /// Do not forward our own publishes back to us.
    pub no_local: bool,
    /// Keep the retain flag on forwarded messages.
    pub retain_as_published: bool,
    /// When to send retained messages (0, 1 or 2).
    pub retain_handling: u8,
}

impl SubscribeOptions {
    /// Default options at the given QoS.
    pub fn new(qos: QoS) -> Self {
        Self {
            qos,
            no_local: false,
            retain_as_published: false,
            retain_handling: 0,
        }
    }

    fn to_byte(self) -> u8 {
        (self.qos as u8)
            | (self.no_local as u8) << 2
            | (self.retain_as_published as u8) << 3
            | (self.retain_handling & 0x03) << 4
    }

    fn from_byte(byte: u8) -> Option<Self> {
        if byte & 0xC0 != 0 || (byte >> 4) & 0x03 == 3 {
            return None;
        }
        Some(Self {
            qos: QoS::try_from(byte & 0x03).ok()?,
            no_local: byte & 0x04 != 0,
            retain_as_published: byte & 0x08 != 0,
            retain_handling: (byte >> 4) & 0x03,
        })
    }
}

/// A topic filter with its options.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Subscription {
    /// Filter, wildcards allowed.
    pub topic_filter: Topic,
    /// Subscription options.
    pub options: SubscribeOptions,
}

/// SUBSCRIBE: request one or more subscriptions.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Subscribe {
    /// Request identifier.
    pub packet_id: u16,
    /// SUBSCRIBE properties.
    pub properties: Properties,
    /// Filters, at least one.
    pub filters: Vec<Subscription, MAX_TOPIC_FILTERS>,
}

/// SUBACK: one reason code per requested filter.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SubAck {
    /// Request identifier.
    pub packet_id: u16,
    /// Diagnostics.
    pub properties: Properties,
    /// Granted QoS or failure, in request order.
    pub reason_codes: Vec<ReasonCode, MAX_TOPIC_FILTERS>,
}

/// UNSUBSCRIBE: drop one or more subscriptions.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Unsubscribe {
    /// Request identifier.
    pub packet_id: u16,
    /// UNSUBSCRIBE properties.
    pub properties: Properties,
    /// Filters, at least one.
    pub filters: Vec<Topic, MAX_TOPIC_FILTERS>,
}

/// UNSUBACK: one reason code per filter.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct UnsubAck {
    /// Request identifier.
    pub packet_id: u16,
    /// Diagnostics.
    pub properties: Properties,
    /// Result per filter, in request order.
    pub reason_codes: Vec<ReasonCode, MAX_TOPIC_FILTERS>,
}

/// DISCONNECT: orderly shutdown, in either direction.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Disconnect {
    /// Why the connection is closing.
    pub reason_code: ReasonCode,
    /// Session expiry override, reason string, user properties.
    pub properties: Properties,
}

/// An MQTT v5 control packet.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Packet {
    /// CONNECT
    Connect(Connect),
    /// CONNACK
    ConnAck(ConnAck),
    /// PUBLISH
    Publish(Publish),
    /// PUBACK
    PubAck(PubAck),
    /// SUBSCRIBE
    Subscribe(Subscribe),
    /// SUBACK
    SubAck(SubAck),
    /// UNSUBSCRIBE
    Unsubscribe(Unsubscribe),
    /// UNSUBACK
    UnsubAck(UnsubAck),
    /// PINGREQ
    PingReq,
    /// PINGRESP
    PingResp,
    /// DISCONNECT
    Disconnect(Disconnect),
}

/// Total frame length once the fixed header is complete.
///
/// Returns `Ok(None)` while the remaining-length field is still incomplete.
pub fn frame_len(buf: &[u8]) -> Result<Option<usize>, Error> {
    Ok(decode_variable_int(buf, 1)?.map(|(remaining, len)| 1 + len + remaining as usize))
}

fn reason(r: &mut Reader<'_>) -> Result<ReasonCode, Error> {
    let offset = r.offset();
    ReasonCode::try_from(r.get_u8()?).map_err(|_| Error::Malformed { offset })
}

fn packet_id(r: &mut Reader<'_>) -> Result<u16, Error> {
    let offset = r.offset();
    match r.get_u16()? {
        0 => Err(Error::Malformed { offset }),
        id => Ok(id),
    }
}

fn non_zero(id: u16) -> Result<u16, Error> {
    if id == 0 {
        return Err(Error::InvalidState);
    }
    Ok(id)
}

/// Length of a reason code plus properties that may be omitted when the
/// reason is `Success` and there are no properties.
fn short_form_len(reason_code: ReasonCode, properties: &Properties) -> usize {
    if !properties.is_empty() {
        1 + properties.encoded_len()
    } else if reason_code != ReasonCode::Success {
        1
    } else {
        0
    }
}

fn write_short_form(
    w: &mut Writer<'_>,
    reason_code: ReasonCode,
    properties: &Properties,
) -> Result<(), Error> {
    if !properties.is_empty() {
        w.put_u8(reason_code.into())?;
        properties.write(w)
    } else if reason_code != ReasonCode::Success {
        w.put_u8(reason_code.into())
    } else {
        Ok(())
    }
}

fn read_short_form(r: &mut Reader<'_>) -> Result<(ReasonCode, Properties), Error> {
    let reason_code = if r.is_empty() {
        ReasonCode::Success
    } else {
        reason(r)?
    };
    let properties = if r.is_empty() {
        Properties::default()
    } else {
        Properties::read(r)?
    };
    Ok((reason_code, properties))
}

fn read_reason_codes(r: &mut Reader<'_>) -> Result<Vec<ReasonCode, MAX_TOPIC_FILTERS>, Error> {
    let mut codes = Vec::new();
    if r.is_empty() {
        return Err(Error::Malformed { offset: r.offset() });
    }
    while !r.is_empty() {
        codes.push(reason(r)?).map_err(|_| Error::BufferOverflow)?;
    }
    Ok(codes)
}

impl Packet {
    fn first_byte(&self) -> u8 {
        match self {
            Packet::Connect(_) => CONNECT,
            Packet::ConnAck(_) => CONNACK,
            Packet::Publish(p) => {
                PUBLISH | (p.dup as u8) << 3 | (p.qos as u8) << 1 | p.retain as u8
            }
            Packet::PubAck(_) => PUBACK,
            Packet::Subscribe(_) => SUBSCRIBE | 0x02,
            Packet::SubAck(_) => SUBACK,
            Packet::Unsubscribe(_) => UNSUBSCRIBE | 0x02,
            Packet::UnsubAck(_) => UNSUBACK,
            Packet::PingReq => PINGREQ,
            Packet::PingResp => PINGRESP,
            Packet::Disconnect(_) => DISCONNECT,
        }
    }

    fn body_len(&self) -> usize {
        match self {
            Packet::Connect(c) => {
                let mut len = 2 + PROTOCOL_NAME.len() + 1 + 1 + 2;
                len += c.properties.encoded_len();
                len += 2 + c.client_id.len();
                if let Some(will) = &c.will {
                    len += will.properties.encoded_len();
                    len += 2 + will.topic.len();
                    len += 2 + will.payload.len();
                }
                if let Some(username) = &c.username {
                    len += 2 + username.len();
                }
                if let Some(password) = &c.password {
                    len += 2 + password.len();
                }
                len
            }
            Packet::ConnAck(c) => 2 + c.properties.encoded_len(),
            Packet::Publish(p) => {
                let id_len = if p.qos == QoS::AtMostOnce { 0 } else { 2 };
                2 + p.topic.len() + id_len + p.properties.encoded_len() + p.payload.len()
            }
            Packet::PubAck(a) => 2 + short_form_len(a.reason_code, &a.properties),
            Packet::Subscribe(s) => {
                2 + s.properties.encoded_len()
                    + s.filters
                        .iter()
                        .map(|f| 2 + f.topic_filter.len() + 1)
                        .sum::<usize>()
            }
            Packet::SubAck(a) => 2 + a.properties.encoded_len() + a.reason_codes.len(),
            Packet::Unsubscribe(u) => {
                2 + u.properties.encoded_len() + u.filters.iter().map(|f| 2 + f.len()).sum::<usize>()
            }
            Packet::UnsubAck(a) => 2 + a.properties.encoded_len() + a.reason_codes.len(),
            Packet::PingReq | Packet::PingResp => 0,
            Packet::Disconnect(d) => short_form_len(d.reason_code, &d.properties),
        }
    }

    /// Size of the complete frame in bytes.
    pub fn encoded_len(&self) -> usize {
        let body = self.body_len();
        1 + variable_int_len(body as u32) + body
    }

    /// Serialize into `buf`, returning the frame length.
    ///
    /// Fails with [`Error::BufferOverflow`] if `buf` is too small and with
    /// [`Error::InvalidState`] if the packet breaks a framing rule (a QoS 1
    /// publish without a packet id, a request without filters, ...).
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let body = self.body_len();
        let mut w = Writer::new(buf);
        w.put_u8(self.first_byte())?;
        w.put_variable_int(body as u32)?;

        match self {
            Packet::Connect(c) => {
                w.put_str(PROTOCOL_NAME)?;
                w.put_u8(PROTOCOL_LEVEL)?;
                let mut flags = 0u8;
                if c.clean_start {
                    flags |= 0x02;
                }
                if let Some(will) = &c.will {
                    if will.qos == QoS::ExactlyOnce {
                        return Err(Error::Unsupported);
                    }
                    flags |= 0x04 | (will.qos as u8) << 3;
                    if will.retain {
                        flags |= 0x20;
                    }
                }
                if c.password.is_some() {
                    flags |= 0x40;
                }
                if c.username.is_some() {
                    flags |= 0x80;
                }
                w.put_u8(flags)?;
                w.put_u16(c.keep_alive)?;
                c.properties.write(&mut w)?;
                w.put_str(&c.client_id)?;
                if let Some(will) = &c.will {
                    will.properties.write(&mut w)?;
                    w.put_str(&will.topic)?;
                    w.put_binary(&will.payload)?;
                }
                if let Some(username) = &c.username {
                    w.put_str(username)?;
                }
                if let Some(password) = &c.password {
                    w.put_binary(password)?;
                }
            }
            Packet::ConnAck(c) => {
                w.put_u8(c.session_present as u8)?;
                w.put_u8(c.reason_code.into())?;
                c.properties.write(&mut w)?;
            }
            Packet::Publish(p) => {
                if p.qos == QoS::AtMostOnce && (p.dup || p.packet_id.is_some()) {
                    return Err(Error::InvalidState);
                }
                w.put_str(&p.topic)?;
                if p.qos != QoS::AtMostOnce {
                    let id = p.packet_id.ok_or(Error::InvalidState)?;
                    w.put_u16(non_zero(id)?)?;
                }
                p.properties.write(&mut w)?;
                w.put_slice(&p.payload)?;
            }
            Packet::PubAck(a) => {
                w.put_u16(non_zero(a.packet_id)?)?;
                write_short_form(&mut w, a.reason_code, &a.properties)?;
            }
            Packet::Subscribe(s) => {
                if s.filters.is_empty() {
                    return Err(Error::InvalidState);
                }
                w.put_u16(non_zero(s.packet_id)?)?;
                s.properties.write(&mut w)?;
                for f in &s.filters {
                    w.put_str(&f.topic_filter)?;
                    w.put_u8(f.options.to_byte())?;
                }
            }
            Packet::SubAck(a) => {
                w.put_u16(non_zero(a.packet_id)?)?;
                a.properties.write(&mut w)?;
                for code in &a.reason_codes {
                    w.put_u8((*code).into())?;
                }
            }
            Packet::Unsubscribe(u) => {
                if u.filters.is_empty() {
                    return Err(Error::InvalidState);
                }
                w.put_u16(non_zero(u.packet_id)?)?;
                u.properties.write(&mut w)?;
                for f in &u.filters {
                    w.put_str(f)?;
                }
            }
            Packet::UnsubAck(a) => {
                w.put_u16(non_zero(a.packet_id)?)?;
                a.properties.write(&mut w)?;
                for code in &a.reason_codes {
                    w.put_u8((*code).into())?;
                }
            }
            Packet::PingReq | Packet::PingResp => {}
            Packet::Disconnect(d) => write_short_form(&mut w, d.reason_code, &d.properties)?,
        }

        Ok(w.position())
    }

    /// Parse one frame from the front of `buf`.
    pub fn decode(buf: &[u8]) -> Result<Option<(Packet, usize)>, Error> {
        let Some((remaining, len_bytes)) = decode_variable_int(buf, 1)? else {
            return Ok(None);
        };
        let header_len = 1 + len_bytes;
        let total = header_len + remaining as usize;
        if buf.len() < total {
            return Ok(None);
        }
        let first = buf[0];
        let mut r = Reader::new(&buf[header_len..total], header_len);
        let flags = first & 0x0F;
        let bad_flags = Error::Malformed { offset: 0 };

        let packet = match first & 0xF0 {
            CONNECT if flags == 0 => Packet::Connect(read_connect(&mut r)?),
            CONNACK if flags == 0 => {
                let offset = r.offset();
                let ack_flags = r.get_u8()?;
                if ack_flags & 0xFE != 0 {
                    return Err(Error::Malformed { offset });
                }
                Packet::ConnAck(ConnAck {
                    session_present: ack_flags & 0x01 != 0,
                    reason_code: reason(&mut r)?,
                    properties: Properties::read(&mut r)?,
                })
            }
            PUBLISH => Packet::Publish(read_publish(&mut r, flags)?),
            PUBACK if flags == 0 => {
                let packet_id = packet_id(&mut r)?;
                let (reason_code, properties) = read_short_form(&mut r)?;
                Packet::PubAck(PubAck {
                    packet_id,
                    reason_code,
                    properties,
                })
            }
            SUBSCRIBE if flags == 0x02 => {
                let packet_id = packet_id(&mut r)?;
                let properties = Properties::read(&mut r)?;
                let mut filters = Vec::new();
                if r.is_empty() {
                    return Err(Error::Malformed { offset: r.offset() });
                }
                while !r.is_empty() {
                    let topic_filter = r.get_str()?;
                    let offset = r.offset();
                    let options = SubscribeOptions::from_byte(r.get_u8()?)
                        .ok_or(Error::Malformed { offset })?;
                    filters
                        .push(Subscription {
                            topic_filter,
                            options,
                        })
                        .map_err(|_| Error::BufferOverflow)?;
                }
                Packet::Subscribe(Subscribe {
                    packet_id,
                    properties,
                    filters,
                })
            }
            SUBACK if flags == 0 => Packet::SubAck(SubAck {
                packet_id: packet_id(&mut r)?,
                properties: Properties::read(&mut r)?,
                reason_codes: read_reason_codes(&mut r)?,
            }),
            UNSUBSCRIBE if flags == 0x02 => {
                let packet_id = packet_id(&mut r)?;
                let properties = Properties::read(&mut r)?;
                let mut filters = Vec::new();
                if r.is_empty() {
                    return Err(Error::Malformed { offset: r.offset() });
                }
                while !r.is_empty() {
                    filters
                        .push(r.get_str()?)
                        .map_err(|_| Error::BufferOverflow)?;
                }
                Packet::Unsubscribe(Unsubscribe {
                    packet_id,
                    properties,
                    filters,
                })
            }
            UNSUBACK if flags == 0 => Packet::UnsubAck(UnsubAck {
                packet_id: packet_id(&mut r)?,
                properties: Properties::read(&mut r)?,
                reason_codes: read_reason_codes(&mut r)?,
            }),
            PINGREQ if flags == 0 => Packet::PingReq,
            PINGRESP if flags == 0 => Packet::PingResp,
            DISCONNECT if flags == 0 => {
                let (reason_code, properties) = read_short_form(&mut r)?;
                Packet::Disconnect(Disconnect {
                    reason_code,
                    properties,
                })
            }
            _ => return Err(bad_flags),
        };

        if !r.is_empty() {
            return Err(Error::Malformed { offset: r.offset() });
        }
        Ok(Some((packet, total)))
    }
}

fn read_publish(r: &mut Reader<'_>, flags: u8) -> Result<Publish, Error> {
    let dup = flags & 0x08 != 0;
    let retain = flags & 0x01 != 0;
    let qos = QoS::try_from((flags >> 1) & 0x03).map_err(|_| Error::Malformed { offset: 0 })?;
    if dup && qos == QoS::AtMostOnce {
        return Err(Error::Malformed { offset: 0 });
    }

    let offset = r.offset();
    let topic: Topic = r.get_str()?;
    if topic.contains(['+', '#']) {
        return Err(Error::Malformed { offset });
    }
    let packet_id = match qos {
        QoS::AtMostOnce => None,
        _ => Some(packet_id(r)?),
    };
    let properties = Properties::read(r)?;
    let payload = Payload::from_slice(r.rest()).map_err(|_| Error::BufferOverflow)?;

    Ok(Publish {
        dup,
        qos,
        retain,
        topic,
        packet_id,
        properties,
        payload,
    })
}

fn read_connect(r: &mut Reader<'_>) -> Result<Connect, Error> {
    let offset = r.offset();
    if r.get_str_ref()? != PROTOCOL_NAME {
        return Err(Error::Malformed { offset });
    }
    let offset = r.offset();
    if r.get_u8()? != PROTOCOL_LEVEL {
        return Err(Error::Malformed { offset });
    }

    let offset = r.offset();
    let flags = r.get_u8()?;
    let will_flag = flags & 0x04 != 0;
    let will_qos = (flags >> 3) & 0x03;
    let will_retain = flags & 0x20 != 0;
    if flags & 0x01 != 0 || will_qos == 3 || (!will_flag && (will_qos != 0 || will_retain)) {
        return Err(Error::Malformed { offset });
    }

    let keep_alive = r.get_u16()?;
    let properties = Properties::read(r)?;
    let client_id = r.get_str()?;

    let will = if will_flag {
        let properties = Properties::read(r)?;
        let topic = r.get_str()?;
        let payload = r.get_binary()?;
        Some(LastWill {
            topic,
            payload,
            qos: QoS::try_from(will_qos).map_err(|_| Error::Malformed { offset })?,
            retain: will_retain,
            properties,
        })
    } else {
        None
    };
    let username = if flags & 0x80 != 0 {
        Some(r.get_str()?)
    } else {
        None
    };
    let password = if flags & 0x40 != 0 {
        Some(r.get_binary()?)
    } else {
        None
    };

    Ok(Connect {
        clean_start: flags & 0x02 != 0,
        keep_alive,
        properties,
        client_id,
        will,
        username,
        password,
    })
}
