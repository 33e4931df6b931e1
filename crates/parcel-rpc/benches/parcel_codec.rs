// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Parcel Codec Benchmark
//!
//! Measures encode and decode cost of the typed parcel API:
//! - scalar write/read pairs
//! - primitive arrays at several lengths
//! - strings (UTF-16 conversion dominates)
//! - raw-data blocks versus packed byte arrays

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::cast_possible_truncation)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use parcel_rpc::parcel::MessageParcel;

fn bench_scalars(c: &mut Criterion) {
    c.bench_function("parcel_scalars_write_read", |b| {
        b.iter(|| {
            let mut parcel = MessageParcel::new();
            for i in 0..64 {
                parcel.write_int(black_box(i)).expect("int");
                parcel.write_long(black_box(i64::from(i) << 33)).expect("long");
                parcel.write_double(black_box(f64::from(i) * 0.5)).expect("double");
            }
            let mut sum = 0i64;
            for _ in 0..64 {
                sum += i64::from(parcel.read_int());
                sum += parcel.read_long();
                sum += parcel.read_double() as i64;
            }
            black_box(sum)
        });
    });
}

fn bench_arrays(c: &mut Criterion) {
    let mut group = c.benchmark_group("parcel_int_array");
    for len in [16usize, 1024, 16 * 1024] {
        let values: Vec<i32> = (0..len as i32).collect();
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &values, |b, values| {
            b.iter(|| {
                let mut parcel = MessageParcel::new();
                parcel.write_int_array(black_box(values)).expect("ints");
                black_box(parcel.read_int_array())
            });
        });
    }
    group.finish();
}

fn bench_strings(c: &mut Criterion) {
    let mut group = c.benchmark_group("parcel_string");
    for len in [8usize, 256, 8 * 1024] {
        let text = "é".repeat(len);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &text, |b, text| {
            b.iter(|| {
                let mut parcel = MessageParcel::new();
                parcel.write_string(black_box(text)).expect("string");
                black_box(parcel.read_string())
            });
        });
    }
    group.finish();
}

fn bench_bulk(c: &mut Criterion) {
    let bytes: Vec<u8> = (0..32 * 1024).map(|i| (i % 251) as u8).collect();
    let signed: Vec<i8> = bytes.iter().map(|b| *b as i8).collect();

    let mut group = c.benchmark_group("parcel_bulk_32k");
    group.throughput(Throughput::Bytes(bytes.len() as u64));
    group.bench_function("byte_array", |b| {
        b.iter(|| {
            let mut parcel = MessageParcel::new();
            parcel.write_byte_array(black_box(&signed)).expect("bytes");
            black_box(parcel.read_byte_array())
        });
    });
    group.bench_function("raw_data", |b| {
        b.iter(|| {
            let mut parcel = MessageParcel::new();
            parcel
                .write_raw_data(black_box(&bytes), bytes.len())
                .expect("raw");
            black_box(parcel.read_raw_data(bytes.len()))
        });
    });
    group.finish();
}

criterion_group!(benches, bench_scalars, bench_arrays, bench_strings, bench_bulk);
criterion_main!(benches);
