use criterion::{criterion_group, criterion_main};

mod network {
    pub mod application {
        pub mod mqtt {
            pub mod codec;
            pub mod session;
        }
    }
}

use network::application::mqtt::{codec, session};

criterion_group!(
    benches,
    codec::bench_encode_publish,
    codec::bench_decode_publish,
    codec::bench_properties,
    session::bench_receive_qos1,
    session::bench_publish_and_ack
);
criterion_main!(benches);
