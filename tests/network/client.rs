use super::{MockBroker, Recorder, Seen, at, at_ms};
use libmqtt5::network::application::mqtt::packet::{ConnAck, Disconnect, PubAck, SubAck};
use libmqtt5::network::application::mqtt::{
    Client, Config, Duration, Error, Packet, Properties, Publish, QoS, ReasonCode, State,
};
use libmqtt5::network::error::Error as NetworkError;
use std::sync::{Arc, Mutex};
use std::thread;

type TestClient = Client<MockBroker, Recorder>;

fn config() -> Config {
    let mut config = Config::new("mock://broker", "client-test").unwrap();
    config.keep_alive = 0;
    config
}

fn connack(reason_code: ReasonCode) -> Packet {
    Packet::ConnAck(ConnAck {
        session_present: false,
        reason_code,
        properties: Properties::default(),
    })
}

fn puback(packet_id: u16) -> Packet {
    Packet::PubAck(PubAck {
        packet_id,
        reason_code: ReasonCode::Success,
        properties: Properties::default(),
    })
}

fn disconnect(reason_code: ReasonCode) -> Packet {
    Packet::Disconnect(Disconnect {
        reason_code,
        properties: Properties::default(),
    })
}

fn connected_with(config: Config) -> (MockBroker, TestClient) {
    let broker = MockBroker::new();
    let mut client: TestClient = Client::new(broker.clone(), config, Recorder::default());
    client.connect(at(0)).unwrap();
    assert!(matches!(broker.received().as_slice(), [Packet::Connect(_)]));

    broker.send(&connack(ReasonCode::Success));
    client.poll(at(0));
    assert_eq!(client.state(), State::Connected);
    assert_eq!(client.observer_mut().take(), [Seen::Connected(false)]);
    (broker, client)
}

fn connected() -> (MockBroker, TestClient) {
    connected_with(config())
}

#[test]
fn test_connect_sends_configured_connect() {
    let broker = MockBroker::new();
    let mut config = config();
    config.keep_alive = 30;
    config.session_expiry_interval = 10;
    config.add_user_property("board", "esp32").unwrap();
    let mut client: TestClient = Client::new(broker.clone(), config, Recorder::default());

    client.connect(at(0)).unwrap();
    assert_eq!(client.state(), State::Connecting);
    match broker.received().as_slice() {
        [Packet::Connect(connect)] => {
            assert_eq!(connect.client_id.as_str(), "client-test");
            assert_eq!(connect.keep_alive, 30);
            assert_eq!(connect.properties.session_expiry_interval, Some(10));
            assert_eq!(connect.properties.user_properties[0].value.as_str(), "esp32");
        }
        other => panic!("expected CONNECT, got {:?}", other),
    }
    assert_eq!(client.connect(at(0)), Err(Error::InvalidState));
}

#[test]
fn test_qos1_publish_is_acknowledged() {
    let (broker, mut client) = connected();
    let id = client
        .publish("sensors/t", b"21.5", QoS::AtLeastOnce, false, at(1))
        .unwrap()
        .unwrap();

    match broker.received().as_slice() {
        [Packet::Publish(publish)] => {
            assert_eq!(publish.packet_id, Some(id));
            assert_eq!(publish.topic.as_str(), "sensors/t");
            assert!(!publish.dup);
        }
        other => panic!("expected PUBLISH, got {:?}", other),
    }
    assert_eq!(client.session().outbox().len(), 1);

    broker.send(&puback(id));
    client.poll(at(2));
    assert_eq!(client.observer_mut().take(), [Seen::Published(id)]);
    assert!(client.session().outbox().is_empty());
}

#[test]
fn test_publish_with_properties() {
    let (broker, mut client) = connected();
    let mut publish = Publish::new("status", b"{}", QoS::AtMostOnce, false).unwrap();
    publish.properties.content_type = Some("application/json".try_into().unwrap());
    publish.properties.add_user_property("board", "esp32").unwrap();
    client.publish_message(publish.clone(), at(1)).unwrap();
    assert_eq!(broker.received(), [Packet::Publish(publish)]);
}

#[test]
fn test_subscribe_and_receive() {
    let (broker, mut client) = connected();
    let id = client.subscribe("cmd/#", QoS::AtLeastOnce, at(1)).unwrap();
    assert!(matches!(broker.received().as_slice(), [Packet::Subscribe(_)]));

    let mut granted = heapless::Vec::new();
    granted.push(ReasonCode::GrantedQoS1).unwrap();
    broker.send(&Packet::SubAck(SubAck {
        packet_id: id,
        properties: Properties::default(),
        reason_codes: granted,
    }));
    let mut message = Publish::new("cmd/led", b"1", QoS::AtLeastOnce, false).unwrap();
    message.packet_id = Some(42);
    broker.send(&Packet::Publish(message));
    client.poll(at(2));

    assert_eq!(
        client.observer_mut().take(),
        [
            Seen::Subscribed(id),
            Seen::Message("cmd/led".to_string(), b"1".to_vec()),
        ]
    );
    assert_eq!(broker.received(), [puback(42)]);
}

#[test]
fn test_transport_loss_fails_in_flight_publishes() {
    let (broker, mut client) = connected();
    let a = client
        .publish("t", b"1", QoS::AtLeastOnce, false, at(1))
        .unwrap()
        .unwrap();
    let b = client
        .publish("t", b"2", QoS::AtLeastOnce, false, at(1))
        .unwrap()
        .unwrap();

    broker.hang_up();
    client.poll(at(2));

    let lost = Error::TransportError(NetworkError::ConnectionClosed);
    assert_eq!(
        client.observer_mut().take(),
        [
            Seen::TransportError(lost),
            Seen::PublishFailed(a, lost),
            Seen::PublishFailed(b, lost),
        ]
    );
    assert_eq!(client.state(), State::Disconnected);
    assert!(!client.is_transport_open());
    assert_eq!(client.reconnect_at(), Some(at(12)));
}

#[test]
fn test_reconnects_after_the_interval() {
    let (broker, mut client) = connected();
    broker.hang_up();
    client.poll(at(2));
    client.observer_mut().take();
    broker.received();

    client.poll(at(11));
    assert_eq!(broker.wire().connects, 1);

    client.poll(at(12));
    assert_eq!(broker.wire().connects, 2);
    assert!(matches!(broker.received().as_slice(), [Packet::Connect(_)]));
    assert_eq!(client.state(), State::Connecting);

    broker.send(&connack(ReasonCode::Success));
    client.poll(at(12));
    assert_eq!(client.observer_mut().take(), [Seen::Connected(false)]);
}

#[test]
fn test_no_reconnect_when_disabled() {
    let mut config = config();
    config.reconnect_interval = None;
    let (broker, mut client) = connected_with(config);
    broker.hang_up();
    client.poll(at(2));
    assert_eq!(client.reconnect_at(), None);
    client.poll(at(1000));
    assert_eq!(broker.wire().connects, 1);
}

#[test]
fn test_user_disconnect_is_final() {
    let (broker, mut client) = connected();
    client
        .disconnect(ReasonCode::NORMAL_DISCONNECTION, Properties::default(), at(1))
        .unwrap();

    assert_eq!(broker.received(), [disconnect(ReasonCode::NORMAL_DISCONNECTION)]);
    assert_eq!(client.state(), State::Disconnected);
    assert!(!client.is_transport_open());
    assert_eq!(broker.wire().closes, 1);
    assert_eq!(
        client.observer_mut().take(),
        [Seen::Disconnected(ReasonCode::NORMAL_DISCONNECTION)]
    );

    client.poll(at(100));
    assert_eq!(broker.wire().connects, 1);
    assert_eq!(
        client.publish("t", b"x", QoS::AtMostOnce, false, at(100)),
        Err(Error::NotConnected)
    );
}

#[test]
fn test_peer_close_while_disconnecting_completes_the_disconnect() {
    let (broker, mut client) = connected();
    broker.wire().write_budget = Some(1);
    client
        .disconnect(ReasonCode::NORMAL_DISCONNECTION, Properties::default(), at(1))
        .unwrap();
    assert_eq!(client.state(), State::Disconnecting);
    assert!(client.is_transport_open());

    broker.hang_up();
    client.poll(at(2));

    assert_eq!(
        client.observer_mut().take(),
        [Seen::Disconnected(ReasonCode::NORMAL_DISCONNECTION)]
    );
    assert_eq!(client.state(), State::Disconnected);
    assert!(!client.is_transport_open());
    assert_eq!(client.reconnect_at(), None);
    client.poll(at(100));
    assert_eq!(broker.wire().connects, 1);
}

#[test]
fn test_short_writes_resume_on_the_next_poll() {
    let (broker, mut client) = connected();
    broker.wire().write_budget = Some(3);
    client
        .publish("t", b"x", QoS::AtMostOnce, false, at(1))
        .unwrap();
    assert!(client.observer_mut().take().is_empty());
    assert_eq!(client.state(), State::Connected);

    broker.wire().write_budget = None;
    client.poll(at(2));
    assert_eq!(
        broker.received(),
        [Packet::Publish(
            Publish::new("t", b"x", QoS::AtMostOnce, false).unwrap()
        )]
    );
}

#[test]
fn test_server_disconnect() {
    let (broker, mut client) = connected();
    broker.send(&disconnect(ReasonCode::SessionTakenOver));
    client.poll(at(1));
    assert_eq!(
        client.observer_mut().take(),
        [Seen::Disconnected(ReasonCode::SessionTakenOver)]
    );
    assert!(!client.is_transport_open());
    assert!(client.reconnect_at().is_some());
}

#[test]
fn test_refused_transport_is_a_connection_error() {
    let broker = MockBroker::new();
    broker.wire().refuse = true;
    let mut client: TestClient = Client::new(broker.clone(), config(), Recorder::default());

    let refused = Error::TransportError(NetworkError::ConnectionRefused);
    assert_eq!(client.connect(at(0)), Err(refused));
    assert_eq!(client.state(), State::Disconnected);
    assert_eq!(
        client.observer_mut().take(),
        [Seen::ConnectionError(refused)]
    );
    assert_eq!(client.reconnect_at(), Some(at(10)));

    broker.wire().refuse = false;
    client.poll(at(10));
    assert_eq!(client.state(), State::Connecting);
}

#[test]
fn test_refused_connack() {
    let broker = MockBroker::new();
    let mut client: TestClient = Client::new(broker.clone(), config(), Recorder::default());
    client.connect(at(0)).unwrap();
    broker.send(&connack(ReasonCode::BadUserNameOrPassword));
    client.poll(at(0));

    assert_eq!(
        client.observer_mut().take(),
        [Seen::ConnectionError(Error::ConnectionError(
            ReasonCode::BadUserNameOrPassword
        ))]
    );
    assert!(!client.is_transport_open());
}

#[test]
fn test_connack_timeout() {
    let broker = MockBroker::new();
    let mut client: TestClient = Client::new(broker.clone(), config(), Recorder::default());
    client.connect(at(0)).unwrap();

    client.poll(at(9));
    assert_eq!(client.state(), State::Connecting);
    client.poll(at(10));
    assert_eq!(
        client.observer_mut().take(),
        [Seen::ConnectionError(Error::ConnectTimeout)]
    );
    assert!(!client.is_transport_open());
}

#[test]
fn test_write_failure_tears_down() {
    let (broker, mut client) = connected();
    broker.wire().fail_writes = true;
    let id = client
        .publish("t", b"x", QoS::AtLeastOnce, false, at(1))
        .unwrap()
        .unwrap();
    let failed = Error::TransportError(NetworkError::WriteError);
    assert_eq!(
        client.observer_mut().take(),
        [Seen::TransportError(failed), Seen::PublishFailed(id, failed)]
    );
    assert_eq!(client.state(), State::Disconnected);
}

#[test]
fn test_keep_alive_timeout() {
    let mut config = config();
    config.keep_alive = 4;
    let (broker, mut client) = connected_with(config);

    client.poll(at(4));
    assert_eq!(broker.received(), [Packet::PingReq]);
    broker.send(&Packet::PingResp);
    client.poll(at(5));

    client.poll(at(8));
    assert_eq!(broker.received(), [Packet::PingReq]);
    client.poll(at_ms(13_999));
    assert_eq!(client.state(), State::Connected);
    client.poll(at(14));

    assert_eq!(
        client.observer_mut().take(),
        [Seen::TransportError(Error::KeepAliveTimeout)]
    );
    assert_eq!(broker.received(), [disconnect(ReasonCode::KeepAliveTimeout)]);
    assert!(!client.is_transport_open());
}

#[test]
fn test_retry_resends_with_dup() {
    let mut config = config();
    config.retry_timeout = Duration::from_secs(2);
    let (broker, mut client) = connected_with(config);
    let id = client
        .publish("t", b"x", QoS::AtLeastOnce, false, at(1))
        .unwrap()
        .unwrap();
    broker.received();

    client.poll(at(3));
    match broker.received().as_slice() {
        [Packet::Publish(publish)] => {
            assert!(publish.dup);
            assert_eq!(publish.packet_id, Some(id));
        }
        other => panic!("expected a resend, got {:?}", other),
    }
}

#[test]
fn test_malformed_input_is_answered_with_disconnect() {
    let (broker, mut client) = connected();
    // Reserved packet type 0.
    broker.send_raw(&[0x00, 0x00]);
    client.poll(at(1));

    assert_eq!(
        client.observer_mut().take(),
        [Seen::TransportError(Error::Malformed { offset: 0 })]
    );
    assert_eq!(broker.received(), [disconnect(ReasonCode::MalformedPacket)]);
}

#[test]
fn test_shared_between_threads() {
    let (broker, client) = connected();
    let client = Arc::new(Mutex::new(client));

    let publisher = {
        let client = Arc::clone(&client);
        thread::spawn(move || {
            for i in 0..10u8 {
                client
                    .lock()
                    .unwrap()
                    .publish("t", &[i], QoS::AtMostOnce, false, at(1))
                    .unwrap();
            }
        })
    };
    for _ in 0..10 {
        client.lock().unwrap().poll(at(1));
    }
    publisher.join().unwrap();

    let payloads: Vec<u8> = broker
        .received()
        .into_iter()
        .map(|packet| match packet {
            Packet::Publish(publish) => publish.payload[0],
            other => panic!("unexpected {:?}", other),
        })
        .collect();
    assert_eq!(payloads, (0..10).collect::<Vec<u8>>());
}
