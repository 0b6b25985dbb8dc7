// ABOUTME: Criterion benchmarks for the gateway's PDU codec
// ABOUTME: Measures frame checking, decoding and response encoding on the hot path

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use smpp_gateway::codec::{Encodable, Frame, MAX_PDU_SIZE};
use smpp_gateway::datatypes::*;
use std::io::Cursor;
use std::time::Duration;

fn sample_submit_sm(message: &str) -> SubmitSm {
    SubmitSm::new(1, "12345", "67890", message)
        .with_source_addr_ton(TypeOfNumber::International)
        .with_source_addr_npi(NumericPlanIndicator::Isdn)
        .with_registered_delivery(1)
}

fn sample_bind() -> Bind {
    Bind::new(BindType::Transceiver, 1, "test_system", "password").with_system_type("SMPP")
}

fn bench_frame_check(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_check");
    group.measurement_time(Duration::from_secs(10));

    let submit_bytes = sample_submit_sm("Hello World").to_bytes().unwrap();
    group.bench_function("submit_sm", |b| {
        b.iter(|| {
            let mut cursor = Cursor::new(black_box(&submit_bytes[..]));
            Frame::check(&mut cursor, MAX_PDU_SIZE)
        })
    });

    // Half a frame: the common case when reads split PDUs
    let partial = &submit_bytes[..submit_bytes.len() / 2];
    group.bench_function("submit_sm_partial", |b| {
        b.iter(|| {
            let mut cursor = Cursor::new(black_box(partial));
            Frame::check(&mut cursor, MAX_PDU_SIZE)
        })
    });

    group.finish();
}

fn bench_frame_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_parse");
    group.measurement_time(Duration::from_secs(10));

    let submit_bytes = sample_submit_sm("Hello World").to_bytes().unwrap();
    group.bench_function("submit_sm", |b| {
        b.iter(|| Frame::parse(black_box(&submit_bytes[..]), MAX_PDU_SIZE).unwrap())
    });

    let bind_bytes = sample_bind().to_bytes().unwrap();
    group.bench_function("bind_transceiver", |b| {
        b.iter(|| Frame::parse(black_box(&bind_bytes[..]), MAX_PDU_SIZE).unwrap())
    });

    let enquire_bytes = EnquireLink::new(1).to_bytes().unwrap();
    group.bench_function("enquire_link", |b| {
        b.iter(|| Frame::parse(black_box(&enquire_bytes[..]), MAX_PDU_SIZE).unwrap())
    });

    group.finish();
}

fn bench_response_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("response_encoding");
    group.measurement_time(Duration::from_secs(10));

    let submit_resp = Frame::SubmitSmResp(SubmitSmResponse::new(7, "0000000000abcdef"));
    group.bench_function("submit_sm_resp", |b| {
        b.iter(|| black_box(&submit_resp).to_bytes())
    });

    let bind_resp = Frame::BindResp(BindResponse::new(BindType::Transceiver, 1, "smpp-gateway"));
    group.bench_function("bind_transceiver_resp", |b| {
        b.iter(|| black_box(&bind_resp).to_bytes())
    });

    let nack = Frame::GenericNack(GenericNack::invalid_command_length(3));
    group.bench_function("generic_nack", |b| b.iter(|| black_box(&nack).to_bytes()));

    group.finish();
}

fn bench_message_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("message_sizes");
    group.measurement_time(Duration::from_secs(10));

    for size in [10, 50, 100, 160, 254] {
        let frame_bytes = sample_submit_sm(&"A".repeat(size)).to_bytes().unwrap();

        group.bench_with_input(
            BenchmarkId::new("submit_sm_parse", size),
            &frame_bytes,
            |b, frame_bytes| {
                b.iter(|| Frame::parse(black_box(&frame_bytes[..]), MAX_PDU_SIZE).unwrap())
            },
        );
    }

    group.finish();
}

fn bench_stream_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream_decode");
    group.measurement_time(Duration::from_secs(10));

    // Back-to-back submits as a pipelining client would send them
    let mut stream = Vec::new();
    for sequence_number in 1..=32 {
        let mut submit = sample_submit_sm("pipelined");
        submit.sequence_number = sequence_number;
        stream.extend_from_slice(&submit.to_bytes().unwrap());
    }

    group.bench_function("32_submits", |b| {
        b.iter(|| {
            let mut offset = 0;
            let mut frames = 0;
            while offset < stream.len() {
                let (_, len) = Frame::decode(black_box(&stream[offset..]), MAX_PDU_SIZE).unwrap();
                offset += len;
                frames += 1;
            }
            frames
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_frame_check,
    bench_frame_parse,
    bench_response_encoding,
    bench_message_sizes,
    bench_stream_decode
);
criterion_main!(benches);
