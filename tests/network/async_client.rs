use super::{MockBroker, MockConnection, Recorder, Seen, at};
use futures::executor::block_on;
use libmqtt5::gpio::{LedController, Level, OutputPin, device_config};
use libmqtt5::network::application::mqtt::packet::{ConnAck, PubAck};
use libmqtt5::network::application::mqtt::{
    AsyncClient, Config, Error, Packet, Properties, Publish, QoS, ReasonCode, State,
};
use libmqtt5::network::error::Error as NetworkError;
use libmqtt5::network::{
    AsyncClose, AsyncConnect, AsyncConnection, AsyncRead, AsyncWrite, Close, Connect, Read, Write,
};

impl AsyncRead for MockConnection {
    type Error = NetworkError;

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        Read::read(self, buf)
    }
}

impl AsyncWrite for MockConnection {
    type Error = NetworkError;

    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        Write::write(self, buf)
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Write::flush(self)
    }
}

impl AsyncClose for MockConnection {
    type Error = NetworkError;

    async fn close(self) -> Result<(), Self::Error> {
        Close::close(self)
    }
}

impl AsyncConnection for MockConnection {}

impl AsyncConnect for MockBroker {
    type Connection = MockConnection;
    type Error = NetworkError;

    async fn connect(&mut self, remote: &str) -> Result<Self::Connection, Self::Error> {
        Connect::connect(self, remote)
    }
}

fn connack() -> Packet {
    Packet::ConnAck(ConnAck {
        session_present: true,
        reason_code: ReasonCode::Success,
        properties: Properties::default(),
    })
}

fn config() -> Config {
    let mut config = Config::new("mock://broker", "async-test").unwrap();
    config.keep_alive = 0;
    config
}

#[test]
fn test_async_publish_round_trip() {
    block_on(async {
        let broker = MockBroker::new();
        let mut client: AsyncClient<_, _> =
            AsyncClient::new(broker.clone(), config(), Recorder::default());

        client.connect(at(0)).await.unwrap();
        broker.send(&connack());
        client.poll(at(0)).await;
        assert_eq!(client.state(), State::Connected);
        assert_eq!(client.observer_mut().take(), [Seen::Connected(true)]);
        broker.received();

        let id = client
            .publish("sensors/t", b"1", QoS::AtLeastOnce, false, at(1))
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(broker.received().as_slice(), [Packet::Publish(_)]));

        broker.send(&Packet::PubAck(PubAck {
            packet_id: id,
            reason_code: ReasonCode::Success,
            properties: Properties::default(),
        }));
        client.poll(at(2)).await;
        assert_eq!(client.observer_mut().take(), [Seen::Published(id)]);
    });
}

#[test]
fn test_async_transport_loss_schedules_reconnect() {
    block_on(async {
        let broker = MockBroker::new();
        let mut client: AsyncClient<_, _> =
            AsyncClient::new(broker.clone(), config(), Recorder::default());
        client.connect(at(0)).await.unwrap();
        broker.send(&connack());
        client.poll(at(0)).await;
        client.observer_mut().take();

        broker.hang_up();
        client.poll(at(1)).await;
        assert_eq!(
            client.observer_mut().take(),
            [Seen::TransportError(Error::TransportError(
                NetworkError::ConnectionClosed
            ))]
        );
        assert_eq!(client.reconnect_at(), Some(at(11)));

        client.poll(at(11)).await;
        assert_eq!(broker.wire().connects, 2);
        assert_eq!(client.state(), State::Connecting);
    });
}

#[test]
fn test_async_peer_close_while_disconnecting() {
    block_on(async {
        let broker = MockBroker::new();
        let mut client: AsyncClient<_, _> =
            AsyncClient::new(broker.clone(), config(), Recorder::default());
        client.connect(at(0)).await.unwrap();
        broker.send(&connack());
        client.poll(at(0)).await;
        client.observer_mut().take();

        broker.wire().write_budget = Some(1);
        client
            .disconnect(ReasonCode::NORMAL_DISCONNECTION, Properties::default(), at(1))
            .await
            .unwrap();
        assert_eq!(client.state(), State::Disconnecting);

        broker.hang_up();
        client.poll(at(2)).await;
        assert_eq!(
            client.observer_mut().take(),
            [Seen::Disconnected(ReasonCode::NORMAL_DISCONNECTION)]
        );
        assert_eq!(client.state(), State::Disconnected);
        assert_eq!(client.reconnect_at(), None);
    });
}

#[derive(Debug, Default)]
struct Led {
    high: bool,
}

impl OutputPin for Led {
    type Error = ();

    fn set_high(&mut self) -> Result<(), ()> {
        self.high = true;
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), ()> {
        self.high = false;
        Ok(())
    }
}

#[test]
fn test_async_device_actions() {
    const TOPIC: &str = "devices/led";
    block_on(async {
        let broker = MockBroker::new();
        let config = device_config("mock://broker", "esp32", TOPIC).unwrap();
        let controller = LedController::new(Led::default(), "esp32", TOPIC).unwrap();
        let mut client: AsyncClient<_, _> = AsyncClient::new(broker.clone(), config, controller);

        client.connect(at(0)).await.unwrap();
        broker.send(&connack());
        client.poll(at(1)).await;
        while let Some(action) = client.observer_mut().take_action() {
            action.execute_async(&mut client, at(1)).await.unwrap();
        }
        assert!(matches!(
            broker.received().as_slice(),
            [Packet::Connect(_), Packet::Publish(_), Packet::Subscribe(_)]
        ));

        let on = Publish::new(TOPIC, b"1", QoS::AtMostOnce, false).unwrap();
        broker.send(&Packet::Publish(on));
        client.poll(at(2)).await;
        assert_eq!(client.observer().level(), Level::High);
        assert!(client.observer().pin().high);
    });
}
