//! # LED control over MQTT
//!
//! Drives a single output pin from commands published on one topic:
//!
//! - `"1"` drives the pin high, `"0"` drives it low; only the first byte of
//!   the payload counts.
//! - Any other first byte is counted as an unknown command, an empty payload
//!   is ignored.
//! - Messages on other topics are ignored.
//!
//! [`LedController`] is an [`Observer`]. It never calls the client from
//! inside an event; instead it queues [`Action`]s that the application
//! drains after each poll:
//!
//! | Event          | Action                                                      |
//! |----------------|-------------------------------------------------------------|
//! | `Connected`    | QoS 1 `{"device":..,"status":"connected"}`, QoS 1 subscribe |
//! | `Subscribed`   | QoS 0 `{"device":..,"topic":..,"status":"subscribed"}`      |
//! | `Unsubscribed` | disconnect, asking the broker to keep the session for 60 s  |
//!
//! ```rust,no_run
//! use libmqtt5::gpio::{LedController, OutputPin, device_config};
//! use libmqtt5::network::application::mqtt::{Client, Instant};
//! # use libmqtt5::network::{Close, Connect, Connection, Read, Write};
//! # use libmqtt5::network::error::Error;
//! # struct Tcp;
//! # impl Read for Tcp { type Error = Error; fn read(&mut self, _: &mut [u8]) -> Result<usize, Error> { Ok(0) } }
//! # impl Write for Tcp {
//! #     type Error = Error;
//! #     fn write(&mut self, b: &[u8]) -> Result<usize, Error> { Ok(b.len()) }
//! #     fn flush(&mut self) -> Result<(), Error> { Ok(()) }
//! # }
//! # impl Close for Tcp { type Error = Error; fn close(self) -> Result<(), Error> { Ok(()) } }
//! # impl Connection for Tcp {}
//! # struct Net;
//! # impl Connect for Net {
//! #     type Connection = Tcp;
//! #     type Error = Error;
//! #     fn connect(&mut self, _: &str) -> Result<Tcp, Error> { Ok(Tcp) }
//! # }
//! # fn millis() -> u64 { 0 }
//! struct Led;
//! impl OutputPin for Led {
//!     type Error = core::convert::Infallible;
//!     fn set_high(&mut self) -> Result<(), Self::Error> { Ok(()) }
//!     fn set_low(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! }
//!
//! let topic = "/ifpe/ads/embarcados/esp32/led";
//! let config = device_config("broker.example.com:1883", "esp32", topic).unwrap();
//! let controller = LedController::new(Led, "esp32", topic).unwrap();
//! let mut client: Client<_, _> = Client::new(Net, config, controller);
//!
//! client.connect(Instant::from_millis(millis())).unwrap();
//! loop {
//!     let now = Instant::from_millis(millis());
//!     client.poll(now);
//!     while let Some(action) = client.observer_mut().take_action() {
//!         action.execute(&mut client, now).ok();
//!     }
//! #   break;
//! }
//! ```

use crate::network::Connect;
use crate::network::application::mqtt::{
    Client, Config, Error, Event, Instant, LastWill, MAX_PAYLOAD_LEN, Observer, Payload,
    Properties, QoS, ReasonCode, Topic,
};
use heapless::{Deque, String};
use serde::Serialize;

/// Longest device name, in bytes.
pub const MAX_DEVICE_NAME_LEN: usize = 32;
/// Actions that can be queued between two drains.
pub const ACTION_QUEUE_LEN: usize = 4;
/// Session expiry requested when disconnecting after an unsubscribe.
pub const DISCONNECT_SESSION_EXPIRY: u32 = 60;

/// A digital output.
pub trait OutputPin {
    /// Error raised by the pin driver.
    type Error: core::fmt::Debug;
    /// Drive the pin high.
    fn set_high(&mut self) -> Result<(), Self::Error>;
    /// Drive the pin low.
    fn set_low(&mut self) -> Result<(), Self::Error>;
}

/// Logic level last written to the pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    /// Driven low.
    Low,
    /// Driven high.
    High,
}

/// A command decoded from a message payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// `'1'`: LED on.
    On,
    /// `'0'`: LED off.
    Off,
    /// Any other first byte.
    Unknown(u8),
    /// Empty payload.
    Empty,
}

impl Command {
    /// Decode the first byte of `payload`.
    pub fn parse(payload: &[u8]) -> Self {
        match payload.first() {
            Some(b'1') => Command::On,
            Some(b'0') => Command::Off,
            Some(&other) => Command::Unknown(other),
            None => Command::Empty,
        }
    }
}

/// JSON status report published by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusMessage<'a> {
    /// Device name.
    pub device: &'a str,
    /// Topic the status refers to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<&'a str>,
    /// Status word.
    pub status: &'a str,
}

impl StatusMessage<'_> {
    /// Serialize to a JSON payload.
    pub fn to_payload(&self) -> Result<Payload, Error> {
        let mut payload = Payload::new();
        payload
            .resize(MAX_PAYLOAD_LEN, 0)
            .map_err(|_| Error::BufferOverflow)?;
        let n = serde_json_core::to_slice(self, &mut payload).map_err(|_| Error::BufferOverflow)?;
        payload.truncate(n);
        Ok(payload)
    }
}

/// Work queued by the controller for the application to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Publish a status message.
    Publish {
        /// Topic to publish on.
        topic: Topic,
        /// JSON payload.
        payload: Payload,
        /// Delivery guarantee.
        qos: QoS,
    },
    /// Subscribe to the command topic.
    Subscribe {
        /// Filter to subscribe to.
        filter: Topic,
        /// Maximum QoS.
        qos: QoS,
    },
    /// Disconnect with the given DISCONNECT properties.
    Disconnect {
        /// DISCONNECT properties.
        properties: Properties,
    },
}

impl Action {
    /// Perform the action on `client`.
    pub fn execute<K: Connect, O: Observer, const N: usize>(
        self,
        client: &mut Client<K, O, N>,
        now: Instant,
    ) -> Result<(), Error> {
        match self {
            Action::Publish {
                topic,
                payload,
                qos,
            } => client.publish(&topic, &payload, qos, false, now).map(drop),
            Action::Subscribe { filter, qos } => client.subscribe(&filter, qos, now).map(drop),
            Action::Disconnect { properties } => {
                client.disconnect(ReasonCode::NORMAL_DISCONNECTION, properties, now)
            }
        }
    }

    /// Perform the action on an async client.
    #[cfg(feature = "async")]
    pub async fn execute_async<K, O, const N: usize>(
        self,
        client: &mut crate::network::application::mqtt::AsyncClient<K, O, N>,
        now: Instant,
    ) -> Result<(), Error>
    where
        K: crate::network::AsyncConnect,
        O: Observer,
    {
        match self {
            Action::Publish {
                topic,
                payload,
                qos,
            } => client.publish(&topic, &payload, qos, false, now).await.map(drop),
            Action::Subscribe { filter, qos } => {
                client.subscribe(&filter, qos, now).await.map(drop)
            }
            Action::Disconnect { properties } => {
                client
                    .disconnect(ReasonCode::NORMAL_DISCONNECTION, properties, now)
                    .await
            }
        }
    }
}

/// Drives an LED from MQTT commands and reports its status.
#[derive(Debug)]
pub struct LedController<P> {
    pin: P,
    device: String<MAX_DEVICE_NAME_LEN>,
    topic: Topic,
    level: Level,
    unknown_commands: u32,
    pin_errors: u32,
    actions: Deque<Action, ACTION_QUEUE_LEN>,
}

impl<P: OutputPin> LedController<P> {
    /// Control `pin` from commands on `topic`. `device` names the device in
    /// status messages.
    pub fn new(pin: P, device: &str, topic: &str) -> Result<Self, Error> {
        Ok(Self {
            pin,
            device: String::try_from(device).map_err(|_| Error::BufferOverflow)?,
            topic: Topic::try_from(topic).map_err(|_| Error::BufferOverflow)?,
            level: Level::Low,
            unknown_commands: 0,
            pin_errors: 0,
            actions: Deque::new(),
        })
    }

    /// The pin.
    pub fn pin(&self) -> &P {
        &self.pin
    }

    /// Level last written successfully.
    pub fn level(&self) -> Level {
        self.level
    }

    /// Commands that were neither `'1'` nor `'0'`.
    pub fn unknown_commands(&self) -> u32 {
        self.unknown_commands
    }

    /// Pin writes that failed.
    pub fn pin_errors(&self) -> u32 {
        self.pin_errors
    }

    /// Queued actions.
    pub fn pending_actions(&self) -> usize {
        self.actions.len()
    }

    /// Next queued action, oldest first.
    pub fn take_action(&mut self) -> Option<Action> {
        self.actions.pop_front()
    }

    /// Apply one command to the pin.
    pub fn apply(&mut self, command: Command) {
        let result = match command {
            Command::On => {
                info!("LED on");
                self.pin.set_high().map(|()| Level::High)
            }
            Command::Off => {
                info!("LED off");
                self.pin.set_low().map(|()| Level::Low)
            }
            Command::Unknown(byte) => {
                warn!("unknown command: {}", byte);
                self.unknown_commands = self.unknown_commands.saturating_add(1);
                return;
            }
            Command::Empty => {
                warn!("empty command");
                return;
            }
        };
        match result {
            Ok(level) => self.level = level,
            Err(_) => {
                warn!("pin write failed");
                self.pin_errors = self.pin_errors.saturating_add(1);
            }
        }
    }

    fn schedule(&mut self, action: Action) {
        if self.actions.push_back(action).is_err() {
            warn!("action queue full, dropping action");
        }
    }

    fn schedule_status(&mut self, topic: Option<&str>, status: &str, qos: QoS) {
        let message = StatusMessage {
            device: &self.device,
            topic,
            status,
        };
        match message.to_payload() {
            Ok(payload) => self.schedule(Action::Publish {
                topic: self.topic.clone(),
                payload,
                qos,
            }),
            Err(_) => warn!("status message does not fit a payload"),
        }
    }
}

impl<P: OutputPin> Observer for LedController<P> {
    fn on_event(&mut self, event: &Event<'_>) {
        match event {
            Event::Connected { .. } => {
                self.schedule_status(None, "connected", QoS::AtLeastOnce);
                self.schedule(Action::Subscribe {
                    filter: self.topic.clone(),
                    qos: QoS::AtLeastOnce,
                });
            }
            Event::Subscribed { granted, .. } => {
                if granted.iter().any(|code| code.is_error()) {
                    warn!("subscription refused");
                    return;
                }
                let topic = self.topic.clone();
                self.schedule_status(Some(&topic), "subscribed", QoS::AtMostOnce);
            }
            Event::Unsubscribed { .. } => {
                let mut properties = Properties {
                    session_expiry_interval: Some(DISCONNECT_SESSION_EXPIRY),
                    ..Properties::default()
                };
                let attached = user_properties(&self.device)
                    .into_iter()
                    .try_for_each(|(key, value)| properties.add_user_property(key, value));
                if attached.is_err() {
                    warn!("could not attach user properties");
                }
                self.schedule(Action::Disconnect { properties });
            }
            Event::MessageReceived(message) if message.topic == self.topic.as_str() => {
                self.apply(Command::parse(message.payload));
            }
            Event::MessageReceived(message) => {
                debug!("ignoring message on '{}'", message.topic);
            }
            _ => {}
        }
    }
}

/// User properties the device attaches to its CONNECT, last will and
/// DISCONNECT.
fn user_properties(device: &str) -> [(&str, &str); 3] {
    [("board", device), ("u", "user"), ("p", "password")]
}

/// The connection settings of the LED device: a 10 s session expiry, 1 KiB
/// maximum packet size, two inbound topic aliases, and an `"offline"` QoS 1
/// last will on `topic` carrying a 10 s will delay and message expiry.
pub fn device_config(broker: &str, device: &str, topic: &str) -> Result<Config, Error> {
    let mut config = Config::new(broker, device)?;
    config.session_expiry_interval = 10;
    config.maximum_packet_size = Some(1024);
    config.receive_maximum = Some(u16::MAX);
    config.topic_alias_maximum = 2;
    config.request_response_information = true;
    config.request_problem_information = true;
    for (key, value) in user_properties(device) {
        config.add_user_property(key, value)?;
    }

    let mut will = LastWill::new(topic, b"offline", QoS::AtLeastOnce, false)?;
    will.properties.will_delay_interval = Some(10);
    will.properties.payload_format_indicator = Some(true);
    will.properties.message_expiry_interval = Some(10);
    will.properties.response_topic =
        Some(String::try_from(topic).map_err(|_| Error::BufferOverflow)?);
    will.properties.correlation_data =
        Some(heapless::Vec::from_slice(b"123456").map_err(|_| Error::BufferOverflow)?);
    for (key, value) in user_properties(device) {
        will.properties.add_user_property(key, value)?;
    }
    config.last_will = Some(will);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::application::mqtt::{Message, UserProperty};

    #[derive(Debug, Default)]
    struct MockPin {
        writes: heapless::Vec<Level, 8>,
        fail: bool,
    }

    impl OutputPin for MockPin {
        type Error = ();

        fn set_high(&mut self) -> Result<(), ()> {
            if self.fail {
                return Err(());
            }
            self.writes.push(Level::High).map_err(drop)
        }

        fn set_low(&mut self) -> Result<(), ()> {
            if self.fail {
                return Err(());
            }
            self.writes.push(Level::Low).map_err(drop)
        }
    }

    const TOPIC: &str = "/ifpe/ads/embarcados/esp32/led";
    const EXPECTED_USER_PROPERTIES: [(&str, &str); 3] =
        [("board", "esp32"), ("u", "user"), ("p", "password")];

    fn pairs(properties: &[UserProperty]) -> std::vec::Vec<(&str, &str)> {
        properties
            .iter()
            .map(|p| (p.key.as_str(), p.value.as_str()))
            .collect()
    }

    fn controller() -> LedController<MockPin> {
        LedController::new(MockPin::default(), "esp32", TOPIC).unwrap()
    }

    fn message<'a>(topic: &'a str, payload: &'a [u8], properties: &'a Properties) -> Event<'a> {
        Event::MessageReceived(Message {
            topic,
            payload,
            qos: QoS::AtMostOnce,
            retain: false,
            dup: false,
            properties,
        })
    }

    #[test]
    fn command_parsing_uses_the_first_byte() {
        assert_eq!(Command::parse(b"1"), Command::On);
        assert_eq!(Command::parse(b"0"), Command::Off);
        assert_eq!(Command::parse(b"10"), Command::On);
        assert_eq!(Command::parse(b"x"), Command::Unknown(b'x'));
        assert_eq!(Command::parse(b""), Command::Empty);
    }

    #[test]
    fn commands_drive_the_pin() {
        let props = Properties::default();
        let mut led = controller();
        led.on_event(&message(TOPIC, b"1", &props));
        assert_eq!(led.level(), Level::High);
        led.on_event(&message(TOPIC, b"0", &props));
        assert_eq!(led.level(), Level::Low);
        led.on_event(&message(TOPIC, b"7", &props));
        led.on_event(&message(TOPIC, b"", &props));
        assert_eq!(led.unknown_commands(), 1);
        assert_eq!(&led.pin().writes[..], &[Level::High, Level::Low]);
    }

    #[test]
    fn other_topics_are_ignored() {
        let props = Properties::default();
        let mut led = controller();
        led.on_event(&message("/other", b"1", &props));
        assert!(led.pin().writes.is_empty());
        assert_eq!(led.level(), Level::Low);
    }

    #[test]
    fn pin_failures_are_counted() {
        let props = Properties::default();
        let mut led = LedController::new(
            MockPin {
                fail: true,
                ..MockPin::default()
            },
            "esp32",
            TOPIC,
        )
        .unwrap();
        led.on_event(&message(TOPIC, b"1", &props));
        assert_eq!(led.pin_errors(), 1);
        assert_eq!(led.level(), Level::Low);
    }

    #[test]
    fn connect_schedules_status_and_subscribe() {
        let props = Properties::default();
        let mut led = controller();
        led.on_event(&Event::Connected {
            session_present: false,
            properties: &props,
        });
        assert_eq!(led.pending_actions(), 2);

        match led.take_action() {
            Some(Action::Publish {
                topic,
                payload,
                qos,
            }) => {
                assert_eq!(topic.as_str(), TOPIC);
                assert_eq!(&payload[..], br#"{"device":"esp32","status":"connected"}"#);
                assert_eq!(qos, QoS::AtLeastOnce);
            }
            other => panic!("expected a publish, got {:?}", other),
        }
        assert_eq!(
            led.take_action(),
            Some(Action::Subscribe {
                filter: Topic::try_from(TOPIC).unwrap(),
                qos: QoS::AtLeastOnce,
            })
        );
        assert_eq!(led.take_action(), None);
    }

    #[test]
    fn subscribed_schedules_a_qos0_notice() {
        let props = Properties::default();
        let mut led = controller();
        led.on_event(&Event::Subscribed {
            packet_id: 1,
            granted: &[ReasonCode::GrantedQoS1],
            properties: &props,
        });
        match led.take_action() {
            Some(Action::Publish { payload, qos, .. }) => {
                assert_eq!(
                    core::str::from_utf8(&payload).unwrap(),
                    r#"{"device":"esp32","topic":"/ifpe/ads/embarcados/esp32/led","status":"subscribed"}"#
                );
                assert_eq!(qos, QoS::AtMostOnce);
            }
            other => panic!("expected a publish, got {:?}", other),
        }

        led.on_event(&Event::Subscribed {
            packet_id: 2,
            granted: &[ReasonCode::NotAuthorized],
            properties: &props,
        });
        assert_eq!(led.take_action(), None);
    }

    #[test]
    fn unsubscribed_schedules_a_disconnect() {
        let props = Properties::default();
        let mut led = controller();
        led.on_event(&Event::Unsubscribed {
            packet_id: 3,
            results: &[ReasonCode::Success],
            properties: &props,
        });
        match led.take_action() {
            Some(Action::Disconnect { properties }) => {
                assert_eq!(
                    properties.session_expiry_interval,
                    Some(DISCONNECT_SESSION_EXPIRY)
                );
                assert_eq!(pairs(&properties.user_properties), EXPECTED_USER_PROPERTIES);
            }
            other => panic!("expected a disconnect, got {:?}", other),
        }
    }

    #[test]
    fn device_config_matches_the_device() {
        let config = device_config("localhost:1883", "esp32", TOPIC).unwrap();
        assert_eq!(config.session_expiry_interval, 10);
        assert_eq!(config.maximum_packet_size, Some(1024));
        assert_eq!(config.topic_alias_maximum, 2);
        let will = config.last_will.unwrap();
        assert_eq!(&will.payload[..], b"offline");
        assert_eq!(will.qos, QoS::AtLeastOnce);
        assert_eq!(will.properties.will_delay_interval, Some(10));
        assert_eq!(will.properties.correlation_data.as_deref(), Some(&b"123456"[..]));
        assert_eq!(will.properties.response_topic.as_deref(), Some(TOPIC));
        assert_eq!(pairs(&will.properties.user_properties), EXPECTED_USER_PROPERTIES);
    }

    #[test]
    fn connect_carries_the_device_user_properties() {
        let config = device_config("localhost:1883", "esp32", TOPIC).unwrap();
        assert_eq!(pairs(&config.user_properties), EXPECTED_USER_PROPERTIES);
        let connect = config.connect_packet();
        assert_eq!(pairs(&connect.properties.user_properties), EXPECTED_USER_PROPERTIES);
    }
}
