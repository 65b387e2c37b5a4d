//! Connection configuration.

use super::error::Error;
use super::packet::{Connect, QoS};
use super::properties::{Properties, UserProperty};
use super::time::Duration;
use super::{
    MAX_BROKER_ADDRESS_LEN, MAX_CLIENT_ID_LEN, MAX_CREDENTIAL_LEN, MAX_INBOUND_PACKET_LEN,
    MAX_TOPIC_ALIASES, MAX_USER_PROPERTIES, Payload, Topic,
};
use heapless::{String, Vec};

/// The message the broker publishes on our behalf if the connection drops
/// without a DISCONNECT.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct LastWill {
    /// Topic to publish to.
    pub topic: Topic,
    /// Message body.
    pub payload: Payload,
    /// QoS of the will message.
    pub qos: QoS,
    /// Publish it as retained.
    pub retain: bool,
    /// Will properties: delay interval, payload format, message expiry,
    /// content type, response topic, correlation data, user properties.
    pub properties: Properties,
}

impl LastWill {
    /// A will without properties.
    pub fn new(topic: &str, payload: &[u8], qos: QoS, retain: bool) -> Result<Self, Error> {
        Ok(Self {
            topic: Topic::try_from(topic).map_err(|_| Error::BufferOverflow)?,
            payload: Payload::from_slice(payload).map_err(|_| Error::BufferOverflow)?,
            qos,
            retain,
            properties: Properties::default(),
        })
    }
}

/// Everything needed to open and run a session.
///
/// The session takes ownership of the config and never changes it; the
/// values the server imposes (keep-alive, receive maximum, ...) are tracked
/// separately.
///
/// ```rust
/// use libmqtt5::network::application::mqtt::{Config, Duration};
///
/// let mut config = Config::new("mqtt.eclipseprojects.io:1883", "esp32-led").unwrap();
/// config.keep_alive = 60;
/// config.session_expiry_interval = 10;
/// config.retry_timeout = Duration::from_secs(2);
/// assert!(config.clean_start);
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Broker address, handed to the connector unmodified.
    pub broker: String<MAX_BROKER_ADDRESS_LEN>,
    /// Client identifier. Empty asks the server to assign one.
    pub client_id: String<MAX_CLIENT_ID_LEN>,
    /// Keep-alive in seconds. 0 disables it.
    pub keep_alive: u16,
    /// Start a fresh session.
    pub clean_start: bool,
    /// Seconds the broker keeps the session after the connection closes.
    pub session_expiry_interval: u32,
    /// Most unacknowledged QoS 1 messages we accept from the broker.
    pub receive_maximum: Option<u16>,
    /// Largest packet we accept. Capped by what the session can decode.
    pub maximum_packet_size: Option<u32>,
    /// Highest topic alias the broker may use towards us.
    pub topic_alias_maximum: u16,
    /// Ask for response information in the CONNACK.
    pub request_response_information: bool,
    /// Allow reason strings and user properties on failures.
    pub request_problem_information: bool,
    /// Last will.
    pub last_will: Option<LastWill>,
    /// User properties sent with CONNECT.
    pub user_properties: Vec<UserProperty, MAX_USER_PROPERTIES>,
    /// User name.
    pub username: Option<String<MAX_CREDENTIAL_LEN>>,
    /// Password.
    pub password: Option<Vec<u8, MAX_CREDENTIAL_LEN>>,
    /// How long to wait for CONNACK.
    pub connect_timeout: Duration,
    /// How long to wait for a PUBACK before resending.
    pub retry_timeout: Duration,
    /// Resends before a QoS 1 publish is reported as failed.
    pub max_retries: u8,
    /// Delay before reconnecting after an involuntary disconnect. `None`
    /// disables automatic reconnection.
    pub reconnect_interval: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            broker: String::new(),
            client_id: String::new(),
            keep_alive: 120,
            clean_start: true,
            session_expiry_interval: 0,
            receive_maximum: None,
            maximum_packet_size: None,
            topic_alias_maximum: 0,
            request_response_information: false,
            request_problem_information: true,
            last_will: None,
            user_properties: Vec::new(),
            username: None,
            password: None,
            connect_timeout: Duration::from_secs(10),
            retry_timeout: Duration::from_secs(5),
            max_retries: 3,
            reconnect_interval: Some(Duration::from_secs(10)),
        }
    }
}

impl Config {
    /// Defaults plus a broker address and client id.
    pub fn new(broker: &str, client_id: &str) -> Result<Self, Error> {
        Ok(Self {
            broker: String::try_from(broker).map_err(|_| Error::BufferOverflow)?,
            client_id: String::try_from(client_id).map_err(|_| Error::BufferOverflow)?,
            ..Self::default()
        })
    }

    /// Append a CONNECT user property.
    pub fn add_user_property(&mut self, key: &str, value: &str) -> Result<(), Error> {
        self.user_properties
            .push(UserProperty::new(key, value)?)
            .map_err(|_| Error::BufferOverflow)
    }

    /// Set user name and password.
    pub fn set_credentials(&mut self, username: &str, password: &[u8]) -> Result<(), Error> {
        self.username = Some(String::try_from(username).map_err(|_| Error::BufferOverflow)?);
        self.password = Some(Vec::from_slice(password).map_err(|_| Error::BufferOverflow)?);
        Ok(())
    }

    /// Topic alias maximum sent in CONNECT, capped by what the session can track.
    pub fn advertised_topic_alias_maximum(&self) -> u16 {
        self.topic_alias_maximum.min(MAX_TOPIC_ALIASES as u16)
    }

    /// Maximum packet size sent in CONNECT: the configured value, capped by
    /// the largest packet the session can decode.
    pub fn advertised_maximum_packet_size(&self) -> u32 {
        let decodable = MAX_INBOUND_PACKET_LEN as u32;
        self.maximum_packet_size.map_or(decodable, |m| m.min(decodable))
    }

    /// The CONNECT packet this config describes.
    pub(crate) fn connect_packet(&self) -> Connect {
        let mut properties = Properties {
            receive_maximum: self.receive_maximum,
            maximum_packet_size: Some(self.advertised_maximum_packet_size()),
            user_properties: self.user_properties.clone(),
            ..Default::default()
        };
        if self.session_expiry_interval != 0 {
            properties.session_expiry_interval = Some(self.session_expiry_interval);
        }
        let topic_alias_maximum = self.advertised_topic_alias_maximum();
        if topic_alias_maximum != 0 {
            properties.topic_alias_maximum = Some(topic_alias_maximum);
        }
        if self.request_response_information {
            properties.request_response_information = Some(true);
        }
        if !self.request_problem_information {
            properties.request_problem_information = Some(false);
        }

        Connect {
            clean_start: self.clean_start,
            keep_alive: self.keep_alive,
            properties,
            client_id: self.client_id.clone(),
            will: self.last_will.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}
