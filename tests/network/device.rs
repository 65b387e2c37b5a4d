use super::{MockBroker, at};
use libmqtt5::gpio::{LedController, Level, OutputPin, device_config};
use libmqtt5::network::application::mqtt::packet::{ConnAck, PubAck, SubAck, UnsubAck};
use libmqtt5::network::application::mqtt::{
    Client, Instant, Packet, Properties, Publish, QoS, ReasonCode, State,
};

const TOPIC: &str = "/ifpe/ads/embarcados/esp32/led";

#[derive(Debug, Default)]
struct Led {
    writes: Vec<Level>,
}

impl OutputPin for Led {
    type Error = ();

    fn set_high(&mut self) -> Result<(), ()> {
        self.writes.push(Level::High);
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), ()> {
        self.writes.push(Level::Low);
        Ok(())
    }
}

type Device = Client<MockBroker, LedController<Led>>;

fn drain(client: &mut Device, now: Instant) {
    while let Some(action) = client.observer_mut().take_action() {
        action.execute(client, now).unwrap();
    }
}

fn command(payload: &[u8]) -> Packet {
    Packet::Publish(Publish::new(TOPIC, payload, QoS::AtMostOnce, false).unwrap())
}

/// Connect the device and walk it through the status publish and the
/// subscription.
fn online() -> (MockBroker, Device) {
    let broker = MockBroker::new();
    let config = device_config("mock://broker", "esp32", TOPIC).unwrap();
    let controller = LedController::new(Led::default(), "esp32", TOPIC).unwrap();
    let mut client: Device = Client::new(broker.clone(), config, controller);

    client.connect(at(0)).unwrap();
    match broker.received().as_slice() {
        [Packet::Connect(connect)] => {
            assert_eq!(connect.client_id.as_str(), "esp32");
            assert_eq!(connect.properties.session_expiry_interval, Some(10));
            let will = connect.will.as_ref().unwrap();
            assert_eq!(&will.payload[..], b"offline");
            assert_eq!(will.properties.will_delay_interval, Some(10));
        }
        other => panic!("expected CONNECT, got {:?}", other),
    }

    broker.send(&Packet::ConnAck(ConnAck {
        session_present: false,
        reason_code: ReasonCode::Success,
        properties: Properties::default(),
    }));
    client.poll(at(1));
    assert_eq!(client.state(), State::Connected);
    assert_eq!(client.observer().pending_actions(), 2);
    drain(&mut client, at(1));

    let (status_id, subscribe_id) = match broker.received().as_slice() {
        [Packet::Publish(status), Packet::Subscribe(subscribe)] => {
            assert_eq!(status.qos, QoS::AtLeastOnce);
            assert_eq!(
                &status.payload[..],
                br#"{"device":"esp32","status":"connected"}"#
            );
            assert_eq!(subscribe.filters[0].topic_filter.as_str(), TOPIC);
            (status.packet_id.unwrap(), subscribe.packet_id)
        }
        other => panic!("expected status and SUBSCRIBE, got {:?}", other),
    };

    broker.send(&Packet::PubAck(PubAck {
        packet_id: status_id,
        reason_code: ReasonCode::Success,
        properties: Properties::default(),
    }));
    let mut granted = heapless::Vec::new();
    granted.push(ReasonCode::GrantedQoS1).unwrap();
    broker.send(&Packet::SubAck(SubAck {
        packet_id: subscribe_id,
        properties: Properties::default(),
        reason_codes: granted,
    }));
    client.poll(at(2));
    drain(&mut client, at(2));

    match broker.received().as_slice() {
        [Packet::Publish(notice)] => {
            assert_eq!(notice.qos, QoS::AtMostOnce);
            assert_eq!(
                &notice.payload[..],
                br#"{"device":"esp32","topic":"/ifpe/ads/embarcados/esp32/led","status":"subscribed"}"#
            );
        }
        other => panic!("expected the subscribed notice, got {:?}", other),
    }
    assert!(client.session().outbox().is_empty());
    (broker, client)
}

#[test]
fn test_device_comes_online() {
    let (_broker, client) = online();
    assert_eq!(client.observer().level(), Level::Low);
    assert!(client.observer().pin().writes.is_empty());
}

#[test]
fn test_commands_drive_the_led() {
    let (broker, mut client) = online();

    broker.send(&command(b"1"));
    client.poll(at(3));
    assert_eq!(client.observer().level(), Level::High);

    broker.send(&command(b"0"));
    broker.send(&command(b"x"));
    broker.send(&command(b""));
    client.poll(at(4));

    let led = client.observer();
    assert_eq!(led.level(), Level::Low);
    assert_eq!(led.pin().writes, [Level::High, Level::Low]);
    assert_eq!(led.unknown_commands(), 1);
}

#[test]
fn test_echoed_status_is_an_unknown_command() {
    let (broker, mut client) = online();
    let status = Publish::new(
        TOPIC,
        br#"{"device":"esp32","status":"connected"}"#,
        QoS::AtMostOnce,
        false,
    )
    .unwrap();
    broker.send(&Packet::Publish(status));
    client.poll(at(3));
    assert_eq!(client.observer().unknown_commands(), 1);
    assert!(client.observer().pin().writes.is_empty());
}

#[test]
fn test_other_topics_are_ignored() {
    let (broker, mut client) = online();
    let other = Publish::new("/other", b"1", QoS::AtMostOnce, false).unwrap();
    broker.send(&Packet::Publish(other));
    client.poll(at(3));
    assert!(client.observer().pin().writes.is_empty());
}

#[test]
fn test_unsubscribe_takes_the_device_offline() {
    let (broker, mut client) = online();
    let id = client.unsubscribe(TOPIC, at(3)).unwrap();
    assert!(matches!(broker.received().as_slice(), [Packet::Unsubscribe(_)]));

    let mut results = heapless::Vec::new();
    results.push(ReasonCode::Success).unwrap();
    broker.send(&Packet::UnsubAck(UnsubAck {
        packet_id: id,
        properties: Properties::default(),
        reason_codes: results,
    }));
    client.poll(at(4));
    drain(&mut client, at(4));

    match broker.received().as_slice() {
        [Packet::Disconnect(disconnect)] => {
            assert_eq!(disconnect.reason_code, ReasonCode::NORMAL_DISCONNECTION);
            assert_eq!(disconnect.properties.session_expiry_interval, Some(60));
            assert_eq!(
                disconnect.properties.user_properties[0].value.as_str(),
                "esp32"
            );
            assert_eq!(disconnect.properties.user_properties.len(), 3);
        }
        other => panic!("expected DISCONNECT, got {:?}", other),
    }
    assert_eq!(client.state(), State::Disconnected);
    assert!(!client.is_transport_open());

    client.poll(at(100));
    assert_eq!(broker.wire().connects, 1);
}
