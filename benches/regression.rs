use criterion::{black_box, criterion_group, criterion_main, Criterion};

use evmemcached::buffer::Buffer;
use evmemcached::protocol;
use evmemcached::reader::StreamReader;

fn response(values: usize) -> Vec<u8> {
    let mut response = Vec::new();
    for i in 0..values {
        let data = format!("{{\"name\":\"data_n{}\",\"age\":{},\"registered\":true}}", i, i % 100);
        response.extend_from_slice(format!("VALUE data_n{} 4 {}\r\n", i, data.len()).as_bytes());
        response.extend_from_slice(data.as_bytes());
        response.extend_from_slice(b"\r\n");
    }
    response.extend_from_slice(b"END\r\n");
    response
}

fn accumulate(c: &mut Criterion) {
    let data = response(100);
    c.bench_function("accumulate 100 values", |b| {
        b.iter(|| {
            let mut input = Buffer::new();
            input.add(black_box(&data));
            let mut reader = StreamReader::default();
            reader.read(&mut input).unwrap()
        })
    });
}

fn parse(c: &mut Criterion) {
    let data = response(100);
    let transcript = &data[..data.len() - b"END\r\n".len()];
    c.bench_function("parse 100 values", |b| {
        b.iter(|| protocol::parse(black_box(transcript)).filter(|r| r.is_ok()).count())
    });
}

criterion_group!(benches, accumulate, parse);
criterion_main!(benches);
