use criterion::{BatchSize, Criterion, Throughput};
use libmqtt5::network::application::mqtt::packet::{ConnAck, PubAck};
use libmqtt5::network::application::mqtt::{
    Config, Instant, NoopObserver, Packet, Properties, Publish, QoS, ReasonCode, Session,
};

fn encode(packet: &Packet) -> Vec<u8> {
    let mut buf = vec![0u8; packet.encoded_len()];
    packet.encode(&mut buf).expect("buffer sized");
    buf
}

fn connected() -> Session<NoopObserver> {
    let mut config = Config::new("bench", "bench-client").expect("config fits");
    config.keep_alive = 0;
    let mut session = Session::new(config, NoopObserver);
    session.connect(Instant::from_millis(0)).expect("disconnected");
    let connack = encode(&Packet::ConnAck(ConnAck {
        session_present: false,
        reason_code: ReasonCode::Success,
        properties: Properties::default(),
    }));
    session
        .receive(&connack, Instant::from_millis(0))
        .expect("valid CONNACK");
    let n = session.outgoing().len();
    session.consume_outgoing(n);
    session
}

pub fn bench_receive_qos1(c: &mut Criterion) {
    let stream: Vec<u8> = (1..=32u16)
        .flat_map(|id| {
            let mut publish =
                Publish::new("bench/in", b"21.5", QoS::AtLeastOnce, false).expect("fits");
            publish.packet_id = Some(id);
            encode(&Packet::Publish(publish))
        })
        .collect();

    let mut group = c.benchmark_group("session");
    group.throughput(Throughput::Bytes(stream.len() as u64));
    group.bench_function("receive_qos1_x32", |b| {
        b.iter_batched_ref(
            connected,
            |session| {
                session
                    .receive(&stream, Instant::from_millis(1))
                    .expect("valid stream");
                let n = session.outgoing().len();
                session.consume_outgoing(n);
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

pub fn bench_publish_and_ack(c: &mut Criterion) {
    let mut group = c.benchmark_group("session");
    group.bench_function("publish_and_ack", |b| {
        b.iter_batched_ref(
            connected,
            |session| {
                let now = Instant::from_millis(1);
                let id = session
                    .publish("bench/out", b"hello", QoS::AtLeastOnce, false, now)
                    .expect("connected")
                    .expect("qos 1 has an id");
                let n = session.outgoing().len();
                session.consume_outgoing(n);
                let ack = encode(&Packet::PubAck(PubAck {
                    packet_id: id,
                    reason_code: ReasonCode::Success,
                    properties: Properties::default(),
                }));
                session.receive(&ack, now).expect("valid PUBACK");
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}
