// ABOUTME: Benchmarks for the hot paths of an SMPP session
// ABOUTME: Measures PDU decoding, serialization and request correlation

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use smpp_session::correlation::{CorrelationTable, PendingRequest, SequenceGenerator};
use smpp_session::datatypes::*;
use smpp_session::{BindCredentials, Frame, PduHeader};
use std::io::Cursor;
use std::time::Duration;

fn create_sample_submit_sm() -> Frame {
    let mut submit_sm = SubmitSm::new("67890", b"Hello World".to_vec());
    submit_sm.source_addr = "12345".to_string();
    submit_sm.optional_parameters = vec![Tlv::new(Tlv::USER_MESSAGE_REFERENCE, vec![0x00, 0x2A])];
    Frame::SubmitSm(Box::new(submit_sm))
}

fn create_sample_deliver_sm() -> Frame {
    let mut deliver_sm = DeliverSm::new("12345", b"id:0123456789 sub:001 dlvrd:001".to_vec());
    deliver_sm.source_addr = "67890".to_string();
    deliver_sm.esm_class = 0x04;
    Frame::DeliverSm(Box::new(deliver_sm))
}

fn create_sample_bind_transceiver() -> Frame {
    BindCredentials::transceiver("test_system", "password").bind_frame()
}

fn create_frame_bytes(frame: &Frame) -> Vec<u8> {
    frame.to_bytes().unwrap().to_vec()
}

fn samples() -> Vec<(&'static str, Frame)> {
    vec![
        ("submit_sm", create_sample_submit_sm()),
        ("deliver_sm", create_sample_deliver_sm()),
        ("bind_transceiver", create_sample_bind_transceiver()),
        ("enquire_link", Frame::EnquireLink(EnquireLink::new(1))),
    ]
}

fn bench_header_decode(c: &mut Criterion) {
    let frame_bytes = create_frame_bytes(&create_sample_submit_sm());

    let mut group = c.benchmark_group("header_decode");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("submit_sm", |b| {
        b.iter(|| {
            let mut cursor = Cursor::new(black_box(frame_bytes.as_slice()));
            PduHeader::decode(&mut cursor).unwrap()
        })
    });

    group.finish();
}

fn bench_frame_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_decode");
    group.measurement_time(Duration::from_secs(10));

    for (name, frame) in samples() {
        let frame_bytes = create_frame_bytes(&frame);
        group.bench_function(name, |b| {
            b.iter(|| Frame::decode(black_box(frame_bytes.as_slice())).unwrap())
        });
    }

    group.finish();
}

fn bench_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialization");
    group.measurement_time(Duration::from_secs(10));

    for (name, frame) in samples() {
        group.bench_function(name, |b| b.iter(|| black_box(&frame).to_bytes().unwrap()));
    }

    group.finish();
}

fn bench_message_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("message_sizes");
    group.measurement_time(Duration::from_secs(10));

    let message_sizes = [10, 50, 100, 160, 254]; // Common SMS message sizes

    for &size in &message_sizes {
        let frame = Frame::SubmitSm(Box::new(SubmitSm::new("67890", vec![b'A'; size])));
        let frame_bytes = create_frame_bytes(&frame);

        group.bench_with_input(
            BenchmarkId::new("submit_sm_decode", size),
            &frame_bytes,
            |b, frame_bytes| b.iter(|| Frame::decode(black_box(frame_bytes.as_slice())).unwrap()),
        );
    }

    group.finish();
}

fn bench_correlation(c: &mut Criterion) {
    let mut group = c.benchmark_group("correlation");

    let table = CorrelationTable::new();
    let sequence = SequenceGenerator::new();
    group.bench_function("add_remove", |b| {
        b.iter(|| {
            let sequence_number = sequence.next_sequence();
            let pending = PendingRequest::new(Frame::EnquireLink(EnquireLink::new(sequence_number)));
            table.add(sequence_number, pending).unwrap();
            table.remove(black_box(sequence_number)).unwrap()
        })
    });

    // Lookups against a table holding a realistic number of in-flight requests
    let busy = CorrelationTable::new();
    for sequence_number in 1..=1000 {
        let pending = PendingRequest::new(Frame::EnquireLink(EnquireLink::new(sequence_number)));
        busy.add(sequence_number, pending).unwrap();
    }
    group.bench_function("remove_missing", |b| {
        b.iter(|| busy.remove(black_box(5000)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_header_decode,
    bench_frame_decode,
    bench_serialization,
    bench_message_sizes,
    bench_correlation
);
criterion_main!(benches);
