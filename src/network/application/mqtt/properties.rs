//! MQTT v5 properties.
//!
//! A property block is a variable byte integer holding the block length,
//! followed by `identifier, value` pairs. [`Properties`] is the typed,
//! fixed-capacity form of such a block; every field is optional and absent
//! fields are not written.
//!
//! Decoding is strict: an unknown identifier, a repeated property that may
//! appear only once, a boolean that is neither 0 nor 1, a zero receive
//! maximum or maximum packet size, or a value running past the declared block
//! length all fail with [`Error::MalformedProperty`].

use super::codec::{Reader, Writer, variable_int_len};
use super::error::Error;
use super::{
    MAX_BINARY_PROPERTY_LEN, MAX_STRING_PROPERTY_LEN, MAX_SUBSCRIPTION_IDENTIFIERS,
    MAX_USER_PROPERTIES, MAX_USER_PROPERTY_LEN,
};
use heapless::{String, Vec};

/// A string-valued property.
pub type PropertyString = String<MAX_STRING_PROPERTY_LEN>;
/// A binary-valued property.
pub type PropertyBinary = Vec<u8, MAX_BINARY_PROPERTY_LEN>;

mod id {
    pub const PAYLOAD_FORMAT_INDICATOR: u32 = 0x01;
    pub const MESSAGE_EXPIRY_INTERVAL: u32 = 0x02;
    pub const CONTENT_TYPE: u32 = 0x03;
    pub const RESPONSE_TOPIC: u32 = 0x08;
    pub const CORRELATION_DATA: u32 = 0x09;
    pub const SUBSCRIPTION_IDENTIFIER: u32 = 0x0B;
    pub const SESSION_EXPIRY_INTERVAL: u32 = 0x11;
    pub const ASSIGNED_CLIENT_IDENTIFIER: u32 = 0x12;
    pub const SERVER_KEEP_ALIVE: u32 = 0x13;
    pub const AUTHENTICATION_METHOD: u32 = 0x15;
    pub const AUTHENTICATION_DATA: u32 = 0x16;
    pub const REQUEST_PROBLEM_INFORMATION: u32 = 0x17;
    pub const WILL_DELAY_INTERVAL: u32 = 0x18;
    pub const REQUEST_RESPONSE_INFORMATION: u32 = 0x19;
    pub const RESPONSE_INFORMATION: u32 = 0x1A;
    pub const SERVER_REFERENCE: u32 = 0x1C;
    pub const REASON_STRING: u32 = 0x1F;
    pub const RECEIVE_MAXIMUM: u32 = 0x21;
    pub const TOPIC_ALIAS_MAXIMUM: u32 = 0x22;
    pub const TOPIC_ALIAS: u32 = 0x23;
    pub const MAXIMUM_QOS: u32 = 0x24;
    pub const RETAIN_AVAILABLE: u32 = 0x25;
    pub const USER_PROPERTY: u32 = 0x26;
    pub const MAXIMUM_PACKET_SIZE: u32 = 0x27;
    pub const WILDCARD_SUBSCRIPTION_AVAILABLE: u32 = 0x28;
    pub const SUBSCRIPTION_IDENTIFIER_AVAILABLE: u32 = 0x29;
    pub const SHARED_SUBSCRIPTION_AVAILABLE: u32 = 0x2A;
}

/// A user property: an application-defined key/value pair.
///
/// Keys need not be unique, and order is preserved on the wire.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct UserProperty {
    /// Property name.
    pub key: String<MAX_USER_PROPERTY_LEN>,
    /// Property value.
    pub value: String<MAX_USER_PROPERTY_LEN>,
}

impl UserProperty {
    /// Build a pair, failing with [`Error::BufferOverflow`] if either side is too long.
    pub fn new(key: &str, value: &str) -> Result<Self, Error> {
        Ok(Self {
            key: String::try_from(key).map_err(|_| Error::BufferOverflow)?,
            value: String::try_from(value).map_err(|_| Error::BufferOverflow)?,
        })
    }
}

/// A typed MQTT v5 property set.
///
/// The same struct is used for every packet; which fields make sense depends
/// on the packet carrying it. Decoded sets are returned by value and owned by
/// the caller.
///
/// ```rust
/// use libmqtt5::network::application::mqtt::properties::Properties;
///
/// let mut props = Properties::default();
/// props.session_expiry_interval = Some(10);
/// props.add_user_property("board", "esp32").unwrap();
///
/// let mut buf = [0u8; 64];
/// let len = props.encode(&mut buf).unwrap();
/// let (decoded, used) = Properties::decode(&buf[..len]).unwrap();
/// assert_eq!(used, len);
/// assert_eq!(decoded, props);
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Properties {
    /// `true` if the payload is UTF-8 text.
    pub payload_format_indicator: Option<bool>,
    /// Lifetime of the message in seconds.
    pub message_expiry_interval: Option<u32>,
    /// MIME type of the payload.
    pub content_type: Option<PropertyString>,
    /// Topic for a response message.
    pub response_topic: Option<PropertyString>,
    /// Correlates a response with its request.
    pub correlation_data: Option<PropertyBinary>,
    /// Identifiers of the subscriptions a message matched.
    pub subscription_identifiers: Vec<u32, MAX_SUBSCRIPTION_IDENTIFIERS>,
    /// Seconds the session outlives the network connection.
    pub session_expiry_interval: Option<u32>,
    /// Client identifier chosen by the server.
    pub assigned_client_identifier: Option<PropertyString>,
    /// Keep-alive chosen by the server, overriding ours.
    pub server_keep_alive: Option<u16>,
    /// Extended authentication method.
    pub authentication_method: Option<PropertyString>,
    /// Extended authentication data.
    pub authentication_data: Option<PropertyBinary>,
    /// Whether the server may send reason strings and user properties on failures.
    pub request_problem_information: Option<bool>,
    /// Seconds the server waits before publishing the will message.
    pub will_delay_interval: Option<u32>,
    /// Ask the server for response information in the CONNACK.
    pub request_response_information: Option<bool>,
    /// Basis for response topics, sent by the server.
    pub response_information: Option<PropertyString>,
    /// Another server the client may use.
    pub server_reference: Option<PropertyString>,
    /// Human-readable diagnostic.
    pub reason_string: Option<PropertyString>,
    /// Most unacknowledged QoS 1 publishes the sender will accept.
    pub receive_maximum: Option<u16>,
    /// Highest topic alias the sender will accept.
    pub topic_alias_maximum: Option<u16>,
    /// Alias standing in for the topic name.
    pub topic_alias: Option<u16>,
    /// Highest QoS the server supports (0 or 1).
    pub maximum_qos: Option<u8>,
    /// Whether the server supports retained messages.
    pub retain_available: Option<bool>,
    /// Application-defined pairs, in order.
    pub user_properties: Vec<UserProperty, MAX_USER_PROPERTIES>,
    /// Largest packet the sender will accept.
    pub maximum_packet_size: Option<u32>,
    /// Whether the server supports wildcard subscriptions.
    pub wildcard_subscription_available: Option<bool>,
    /// Whether the server supports subscription identifiers.
    pub subscription_identifier_available: Option<bool>,
    /// Whether the server supports shared subscriptions.
    pub shared_subscription_available: Option<bool>,
}

/// A property value as it appears on the wire.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Value<'a> {
    Byte(u8),
    TwoByte(u16),
    FourByte(u32),
    VarInt(u32),
    Str(&'a str),
    Binary(&'a [u8]),
    Pair(&'a str, &'a str),
}

impl Value<'_> {
    fn len(&self) -> usize {
        match self {
            Value::Byte(_) => 1,
            Value::TwoByte(_) => 2,
            Value::FourByte(_) => 4,
            Value::VarInt(v) => variable_int_len(*v),
            Value::Str(s) => 2 + s.len(),
            Value::Binary(b) => 2 + b.len(),
            Value::Pair(k, v) => 4 + k.len() + v.len(),
        }
    }

    fn write(&self, w: &mut Writer<'_>) -> Result<(), Error> {
        match self {
            Value::Byte(v) => w.put_u8(*v),
            Value::TwoByte(v) => w.put_u16(*v),
            Value::FourByte(v) => w.put_u32(*v),
            Value::VarInt(v) => w.put_variable_int(*v),
            Value::Str(s) => w.put_str(s),
            Value::Binary(b) => w.put_binary(b),
            Value::Pair(k, v) => {
                w.put_str(k)?;
                w.put_str(v)
            }
        }
    }
}

fn store<T>(slot: &mut Option<T>, value: T, offset: usize) -> Result<(), Error> {
    if slot.is_some() {
        return Err(Error::MalformedProperty { offset });
    }
    *slot = Some(value);
    Ok(())
}

impl Properties {
    /// `true` if no property is set.
    pub fn is_empty(&self) -> bool {
        let mut empty = true;
        self.for_each(|_, _| empty = false);
        empty
    }

    /// Append a user property.
    pub fn add_user_property(&mut self, key: &str, value: &str) -> Result<(), Error> {
        self.user_properties
            .push(UserProperty::new(key, value)?)
            .map_err(|_| Error::BufferOverflow)
    }

    /// Visit every present property in identifier order.
    pub(crate) fn for_each(&self, mut f: impl FnMut(u32, Value<'_>)) {
        if let Some(v) = self.payload_format_indicator {
            f(id::PAYLOAD_FORMAT_INDICATOR, Value::Byte(v as u8));
        }
        if let Some(v) = self.message_expiry_interval {
            f(id::MESSAGE_EXPIRY_INTERVAL, Value::FourByte(v));
        }
        if let Some(v) = &self.content_type {
            f(id::CONTENT_TYPE, Value::Str(v));
        }
        if let Some(v) = &self.response_topic {
            f(id::RESPONSE_TOPIC, Value::Str(v));
        }
        if let Some(v) = &self.correlation_data {
            f(id::CORRELATION_DATA, Value::Binary(v));
        }
        for v in &self.subscription_identifiers {
            f(id::SUBSCRIPTION_IDENTIFIER, Value::VarInt(*v));
        }
        if let Some(v) = self.session_expiry_interval {
            f(id::SESSION_EXPIRY_INTERVAL, Value::FourByte(v));
        }
        if let Some(v) = &self.assigned_client_identifier {
            f(id::ASSIGNED_CLIENT_IDENTIFIER, Value::Str(v));
        }
        if let Some(v) = self.server_keep_alive {
            f(id::SERVER_KEEP_ALIVE, Value::TwoByte(v));
        }
        if let Some(v) = &self.authentication_method {
            f(id::AUTHENTICATION_METHOD, Value::Str(v));
        }
        if let Some(v) = &self.authentication_data {
            f(id::AUTHENTICATION_DATA, Value::Binary(v));
        }
        if let Some(v) = self.request_problem_information {
            f(id::REQUEST_PROBLEM_INFORMATION, Value::Byte(v as u8));
        }
        if let Some(v) = self.will_delay_interval {
            f(id::WILL_DELAY_INTERVAL, Value::FourByte(v));
        }
        if let Some(v) = self.request_response_information {
            f(id::REQUEST_RESPONSE_INFORMATION, Value::Byte(v as u8));
        }
        if let Some(v) = &self.response_information {
            f(id::RESPONSE_INFORMATION, Value::Str(v));
        }
        if let Some(v) = &self.server_reference {
            f(id::SERVER_REFERENCE, Value::Str(v));
        }
        if let Some(v) = &self.reason_string {
            f(id::REASON_STRING, Value::Str(v));
        }
        if let Some(v) = self.receive_maximum {
            f(id::RECEIVE_MAXIMUM, Value::TwoByte(v));
        }
        if let Some(v) = self.topic_alias_maximum {
            f(id::TOPIC_ALIAS_MAXIMUM, Value::TwoByte(v));
        }
        if let Some(v) = self.topic_alias {
            f(id::TOPIC_ALIAS, Value::TwoByte(v));
        }
        if let Some(v) = self.maximum_qos {
            f(id::MAXIMUM_QOS, Value::Byte(v));
        }
        if let Some(v) = self.retain_available {
            f(id::RETAIN_AVAILABLE, Value::Byte(v as u8));
        }
        for p in &self.user_properties {
            f(id::USER_PROPERTY, Value::Pair(&p.key, &p.value));
        }
        if let Some(v) = self.maximum_packet_size {
            f(id::MAXIMUM_PACKET_SIZE, Value::FourByte(v));
        }
        if let Some(v) = self.wildcard_subscription_available {
            f(id::WILDCARD_SUBSCRIPTION_AVAILABLE, Value::Byte(v as u8));
        }
        if let Some(v) = self.subscription_identifier_available {
            f(id::SUBSCRIPTION_IDENTIFIER_AVAILABLE, Value::Byte(v as u8));
        }
        if let Some(v) = self.shared_subscription_available {
            f(id::SHARED_SUBSCRIPTION_AVAILABLE, Value::Byte(v as u8));
        }
    }

    /// Length of the property list, without the length prefix.
    pub fn body_len(&self) -> usize {
        let mut len = 0;
        self.for_each(|id, value| len += variable_int_len(id) + value.len());
        len
    }

    /// Length of the whole block, length prefix included.
    pub fn encoded_len(&self) -> usize {
        let body = self.body_len();
        variable_int_len(body as u32) + body
    }

    /// Encode into `buf`, returning the number of bytes written.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut w = Writer::new(buf);
        self.write(&mut w)?;
        Ok(w.position())
    }

    /// Decode a block from the start of `buf`, returning the set and the
    /// number of bytes it took.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), Error> {
        let mut r = Reader::new(buf, 0);
        let props = Self::read(&mut r)?;
        Ok((props, r.position()))
    }

    pub(crate) fn write(&self, w: &mut Writer<'_>) -> Result<(), Error> {
        w.put_variable_int(self.body_len() as u32)?;
        let mut result = Ok(());
        self.for_each(|id, value| {
            if result.is_ok() {
                result = w.put_variable_int(id);
            }
            if result.is_ok() {
                result = value.write(w);
            }
        });
        result
    }

    pub(crate) fn read(r: &mut Reader<'_>) -> Result<Self, Error> {
        Self::read_block(r).map_err(|e| match e {
            Error::Malformed { offset } => Error::MalformedProperty { offset },
            other => other,
        })
    }

    fn read_block(r: &mut Reader<'_>) -> Result<Self, Error> {
        let len = r.get_variable_int()? as usize;
        let mut block = r.sub(len)?;
        let mut props = Properties::default();

        while !block.is_empty() {
            let at = block.offset();
            let bad = Error::MalformedProperty { offset: at };
            match block.get_variable_int()? {
                id::PAYLOAD_FORMAT_INDICATOR => {
                    store(&mut props.payload_format_indicator, block.get_bool()?, at)?
                }
                id::MESSAGE_EXPIRY_INTERVAL => {
                    store(&mut props.message_expiry_interval, block.get_u32()?, at)?
                }
                id::CONTENT_TYPE => store(&mut props.content_type, block.get_str()?, at)?,
                id::RESPONSE_TOPIC => store(&mut props.response_topic, block.get_str()?, at)?,
                id::CORRELATION_DATA => {
                    store(&mut props.correlation_data, block.get_binary()?, at)?
                }
                id::SUBSCRIPTION_IDENTIFIER => {
                    let v = block.get_variable_int()?;
                    if v == 0 {
                        return Err(bad);
                    }
                    props
                        .subscription_identifiers
                        .push(v)
                        .map_err(|_| Error::BufferOverflow)?;
                }
                id::SESSION_EXPIRY_INTERVAL => {
                    store(&mut props.session_expiry_interval, block.get_u32()?, at)?
                }
                id::ASSIGNED_CLIENT_IDENTIFIER => {
                    store(&mut props.assigned_client_identifier, block.get_str()?, at)?
                }
                id::SERVER_KEEP_ALIVE => store(&mut props.server_keep_alive, block.get_u16()?, at)?,
                id::AUTHENTICATION_METHOD => {
                    store(&mut props.authentication_method, block.get_str()?, at)?
                }
                id::AUTHENTICATION_DATA => {
                    store(&mut props.authentication_data, block.get_binary()?, at)?
                }
                id::REQUEST_PROBLEM_INFORMATION => {
                    store(&mut props.request_problem_information, block.get_bool()?, at)?
                }
                id::WILL_DELAY_INTERVAL => {
                    store(&mut props.will_delay_interval, block.get_u32()?, at)?
                }
                id::REQUEST_RESPONSE_INFORMATION => {
                    store(&mut props.request_response_information, block.get_bool()?, at)?
                }
                id::RESPONSE_INFORMATION => {
                    store(&mut props.response_information, block.get_str()?, at)?
                }
                id::SERVER_REFERENCE => store(&mut props.server_reference, block.get_str()?, at)?,
                id::REASON_STRING => store(&mut props.reason_string, block.get_str()?, at)?,
                id::RECEIVE_MAXIMUM => {
                    let v = block.get_u16()?;
                    if v == 0 {
                        return Err(bad);
                    }
                    store(&mut props.receive_maximum, v, at)?
                }
                id::TOPIC_ALIAS_MAXIMUM => {
                    store(&mut props.topic_alias_maximum, block.get_u16()?, at)?
                }
                id::TOPIC_ALIAS => store(&mut props.topic_alias, block.get_u16()?, at)?,
                id::MAXIMUM_QOS => {
                    let v = block.get_u8()?;
                    if v > 1 {
                        return Err(bad);
                    }
                    store(&mut props.maximum_qos, v, at)?
                }
                id::RETAIN_AVAILABLE => store(&mut props.retain_available, block.get_bool()?, at)?,
                id::USER_PROPERTY => {
                    let key = block.get_str()?;
                    let value = block.get_str()?;
                    props
                        .user_properties
                        .push(UserProperty { key, value })
                        .map_err(|_| Error::BufferOverflow)?;
                }
                id::MAXIMUM_PACKET_SIZE => {
                    let v = block.get_u32()?;
                    if v == 0 {
                        return Err(bad);
                    }
                    store(&mut props.maximum_packet_size, v, at)?
                }
                id::WILDCARD_SUBSCRIPTION_AVAILABLE => {
                    store(&mut props.wildcard_subscription_available, block.get_bool()?, at)?
                }
                id::SUBSCRIPTION_IDENTIFIER_AVAILABLE => {
                    store(&mut props.subscription_identifier_available, block.get_bool()?, at)?
                }
                id::SHARED_SUBSCRIPTION_AVAILABLE => {
                    store(&mut props.shared_subscription_available, block.get_bool()?, at)?
                }
                _ => return Err(bad),
            }
        }

        Ok(props)
    }
}
