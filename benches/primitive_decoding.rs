use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::prelude::StdRng;
use rand::{distributions::Uniform, Rng, SeedableRng};

use ion_cursor::binary::flex_int::FlexInt;
use ion_cursor::binary::flex_uint::FlexUInt;
use ion_cursor::binary::var_uint::VarUInt;
use ion_cursor::{BinaryCursor, Event};

// Rather than store a set of test values, we hardcode a seed value and generate the same set
// on each run.
const RNG_SEED: u64 = 1024;

// The number of values that will be read in each benchmark.
const NUM_VALUES: usize = 10_000;

fn generate_unsigned_values(min: u64, max: u64) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(RNG_SEED);
    let range = Uniform::new(min, max);
    (0..NUM_VALUES).map(|_| rng.sample(range)).collect()
}

fn encode_var_uint(value: u64, output: &mut Vec<u8>) {
    let mut bytes = vec![(value & 0x7F) as u8 | 0x80];
    let mut rest = value >> 7;
    while rest > 0 {
        bytes.push((rest & 0x7F) as u8);
        rest >>= 7;
    }
    output.extend(bytes.iter().rev());
}

fn encode_flex_uint(value: u64, output: &mut Vec<u8>) {
    let bits = 64 - value.max(1).leading_zeros() as usize;
    let size = ((bits + 6) / 7).max(1);
    let encoded = ((value as u128) << size) | (1u128 << (size - 1));
    output.extend_from_slice(&encoded.to_le_bytes()[..size]);
}

// A stream of `NUM_VALUES` one-field structs, each holding a small list.
fn generate_struct_stream() -> Vec<u8> {
    let mut stream = vec![0xE0, 0x01, 0x00, 0xEA];
    for i in 0..NUM_VALUES {
        let n = (i % 100) as u8;
        stream.extend_from_slice(&[0xD7, 0x8A, 0xB5, 0x21, n, 0x31, n.max(1), 0x10]);
    }
    stream
}

pub fn criterion_benchmark(c: &mut Criterion) {
    println!("# Values: {NUM_VALUES}");

    let unsigned_values = generate_unsigned_values(u64::MIN, (2 << 49) - 1);
    let mut encoded_var_uints = Vec::new();
    let mut encoded_flex_uints = Vec::new();
    for value in &unsigned_values {
        encode_var_uint(*value, &mut encoded_var_uints);
        encode_flex_uint(*value, &mut encoded_flex_uints);
    }

    let mut primitives = c.benchmark_group("primitives");
    primitives.bench_function("read VarUInt", |b| {
        b.iter(|| {
            let mut position = 0;
            for _ in 0..unsigned_values.len() {
                let var_uint = VarUInt::read(&encoded_var_uints[position..], position).unwrap();
                position += black_box(var_uint).size_in_bytes();
            }
            assert_eq!(position, encoded_var_uints.len());
        })
    });
    primitives.bench_function("read FlexUInt", |b| {
        b.iter(|| {
            let mut position = 0;
            for _ in 0..unsigned_values.len() {
                let flex_uint = FlexUInt::read(&encoded_flex_uints[position..], position).unwrap();
                position += black_box(flex_uint).size_in_bytes();
            }
            assert_eq!(position, encoded_flex_uints.len());
        })
    });
    primitives.bench_function("read FlexInt", |b| {
        // Every FlexUInt encoding is also a valid FlexInt encoding of the same length.
        b.iter(|| {
            let mut position = 0;
            for _ in 0..unsigned_values.len() {
                let flex_int = FlexInt::read(&encoded_flex_uints[position..], position).unwrap();
                position += black_box(flex_int).size_in_bytes();
            }
            assert_eq!(position, encoded_flex_uints.len());
        })
    });
    primitives.finish();

    let stream = generate_struct_stream();
    let mut cursor_group = c.benchmark_group("cursor");
    cursor_group.bench_function("skip top-level structs", |b| {
        b.iter(|| {
            let mut cursor = BinaryCursor::from_bytes(stream.as_slice());
            let mut count = 0;
            while cursor.next_value().unwrap() == Event::StartContainer {
                count += 1;
            }
            assert_eq!(count, NUM_VALUES);
        })
    });
    cursor_group.bench_function("visit every scalar", |b| {
        b.iter(|| {
            let mut cursor = BinaryCursor::from_bytes(stream.as_slice());
            let mut scalars = 0;
            loop {
                match cursor.next_value().unwrap() {
                    Event::StartContainer => {
                        cursor.step_into_container().unwrap();
                    }
                    Event::StartScalar => {
                        cursor.fill_value().unwrap();
                        black_box(cursor.value_bytes());
                        scalars += 1;
                    }
                    Event::EndContainer => {
                        cursor.step_out_of_container().unwrap();
                    }
                    _ => break,
                }
            }
            assert_eq!(scalars, NUM_VALUES * 3);
        })
    });
    cursor_group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
