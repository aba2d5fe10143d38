use bytes::{Bytes, BytesMut};
use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use rand::RngCore;
use secure_transfer::config::FRAME_SIZE;
use secure_transfer::core::codec::FrameCodec;
use secure_transfer::core::types::{ClientId, Name};
use secure_transfer::protocol::message::{Request, Response, ResponsePayload};
use secure_transfer::utils::checksum::crc32;
use tokio_util::codec::{Decoder, Encoder};

fn random_bytes(size: usize) -> Vec<u8> {
    let mut data = vec![0u8; size];
    rand::rng().fill_bytes(&mut data);
    data
}

#[allow(clippy::unwrap_used)]
fn bench_send_file_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("send_file_encode");
    let content_sizes = [64usize, 4096, 65536, 1024 * 1024];
    let file_name = Name::new("payload.bin").unwrap();
    let client_id = ClientId::from_bytes([7; 16]);

    for &size in &content_sizes {
        let content = random_bytes(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("encode_{size}b"), |b| {
            b.iter_batched(
                || content.clone(),
                |content| {
                    Request::send_file(client_id, file_name.clone(), content)
                        .unwrap()
                        .encode()
                        .unwrap()
                },
                BatchSize::SmallInput,
            )
        });
        group.bench_function(format!("crc32_{size}b"), |b| b.iter(|| crc32(&content)));
    }

    group.finish();
}

#[allow(clippy::unwrap_used)]
fn bench_framing(c: &mut Criterion) {
    let mut group = c.benchmark_group("framing");
    let message_sizes = [183usize, 1024, 16 * 1024, 256 * 1024];

    for &size in &message_sizes {
        let message = random_bytes(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("frame_{size}b"), |b| {
            b.iter(|| {
                let mut codec = FrameCodec;
                let mut buf = BytesMut::with_capacity(size.div_ceil(FRAME_SIZE) * FRAME_SIZE);
                for chunk in message.chunks(FRAME_SIZE) {
                    codec.encode(Bytes::copy_from_slice(chunk), &mut buf).unwrap();
                }
                while codec.decode(&mut buf).unwrap().is_some() {}
            })
        });
    }

    group.finish();
}

#[allow(clippy::unwrap_used)]
fn bench_response_decode(c: &mut Criterion) {
    let response = Response::new(ResponsePayload::FileDelivered {
        client_id: ClientId::from_bytes([1; 16]),
        content_size: 4096,
        file_name: Name::new("payload.bin").unwrap(),
        checksum: 0xDEAD_BEEF,
    });
    let mut bytes = response.encode();
    bytes.resize(FRAME_SIZE, 0);

    c.bench_function("file_delivered_decode", |b| {
        b.iter(|| {
            let decoded = Response::decode(&bytes);
            assert!(decoded.is_ok());
        })
    });
}

criterion_group!(benches, bench_send_file_encode, bench_framing, bench_response_decode);
criterion_main!(benches);
