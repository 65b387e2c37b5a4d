use criterion::{BatchSize, Criterion, Throughput};
use libmqtt5::network::application::mqtt::{Packet, Properties, Publish, QoS};
use rand::Rng;

fn random_payload(len: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| rng.r#gen()).collect()
}

fn publish(len: usize) -> Packet {
    let payload = random_payload(len);
    let mut publish = Publish::new("bench/topic", &payload, QoS::AtLeastOnce, false)
        .expect("payload fits");
    publish.packet_id = Some(7);
    publish.properties.content_type = Some("application/octet-stream".try_into().unwrap());
    publish
        .properties
        .add_user_property("board", "esp32")
        .expect("property fits");
    Packet::Publish(publish)
}

pub fn bench_encode_publish(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    for len in [16, 256, 1024] {
        let packet = publish(len);
        let mut buf = vec![0u8; packet.encoded_len()];
        group.throughput(Throughput::Bytes(buf.len() as u64));
        group.bench_function(format!("publish/{}", len), |b| {
            b.iter(|| packet.encode(&mut buf).expect("buffer sized"))
        });
    }
    group.finish();
}

pub fn bench_decode_publish(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    for len in [16, 256, 1024] {
        let packet = publish(len);
        let mut buf = vec![0u8; packet.encoded_len()];
        packet.encode(&mut buf).expect("buffer sized");
        group.throughput(Throughput::Bytes(buf.len() as u64));
        group.bench_function(format!("publish/{}", len), |b| {
            b.iter(|| Packet::decode(&buf).expect("valid frame"))
        });
    }
    group.finish();
}

pub fn bench_properties(c: &mut Criterion) {
    let mut properties = Properties {
        session_expiry_interval: Some(10),
        maximum_packet_size: Some(1024),
        receive_maximum: Some(u16::MAX),
        topic_alias_maximum: Some(2),
        request_response_information: Some(true),
        ..Properties::default()
    };
    properties
        .add_user_property("board", "esp32")
        .expect("property fits");
    let mut encoded = vec![0u8; properties.encoded_len()];
    properties.encode(&mut encoded).expect("buffer sized");

    let mut group = c.benchmark_group("properties");
    group.bench_function("encode", |b| {
        b.iter_batched_ref(
            || vec![0u8; properties.encoded_len()],
            |buf| properties.encode(buf).expect("buffer sized"),
            BatchSize::SmallInput,
        )
    });
    group.bench_function("decode", |b| {
        b.iter(|| Properties::decode(&encoded).expect("valid block"))
    });
    group.finish();
}
