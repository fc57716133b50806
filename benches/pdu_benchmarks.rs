// ABOUTME: Benchmark suite for PDU decoding and AT line classification
// ABOUTME: Measures single-part, concatenated and UCS-2 decode paths plus listing parses

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use sms_bridge::Response;
use sms_bridge::datatypes::Sms;
use std::time::Duration;

const GSM7_SINGLE: &str =
    "07917283010010F5040BC87238880900F10000993092516195800AE8329BFD4697D9EC37";

const UCS2_CONCATENATED: &str =
    "00400B916407281990F600084260113254100012050003050201004800E9006C006C006F0021";

fn bench_sms_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("sms_decode");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("gsm7_single", |b| {
        b.iter(|| Sms::decode(black_box(GSM7_SINGLE)))
    });

    group.bench_function("ucs2_concatenated", |b| {
        b.iter(|| Sms::decode(black_box(UCS2_CONCATENATED)))
    });

    group.finish();
}

fn bench_line_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("line_parse");

    group.bench_function("listing_header", |b| {
        b.iter(|| Response::parse(black_box("+CMGL: 12,0,\"\",24")))
    });

    group.bench_function("notice", |b| {
        b.iter(|| Response::parse(black_box("+CMTI: \"SM\",3")))
    });

    group.bench_function("unrecognised", |b| {
        b.iter(|| Response::parse(black_box("RING")))
    });

    group.finish();
}

criterion_group!(benches, bench_sms_decode, bench_line_parse);
criterion_main!(benches);
