use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use stepexpr::{Engine, Record, Value};

const WHITELIST: &str = "
    $'KEYS' filter ('key' => {
        if 'ifStartsWith' then (
            *'ifStartsWith' map ('start' => {
                'StartsWith' bind v'start' apply v'key'
            }) reduce 'any'
        ) else (
            'StartsWith' bind 'name' apply v'key'
        )
    }) map ('x' => {
        *v'x' in *'whiteList'
    }) reduce 'all'
";

/// Build a host with `n` `name*` keys, all of them whitelisted.
fn build_host(n: usize) -> Record {
    let names: Vec<String> = (0..n).map(|i| format!("user{i}")).collect();
    let mut record = Record::new()
        .set("ifStartsWith", vec!["name", "surname"])
        .set("whiteList", names.iter().map(String::as_str).collect::<Vec<_>>());
    for (i, name) in names.iter().enumerate() {
        record.insert(&format!("name{i}"), Value::from(name.as_str()));
    }
    record
}

/// A left-leaning `^` chain over `n` literals.
fn xor_chain(n: usize) -> String {
    std::iter::repeat("'a'").take(n).collect::<Vec<_>>().join(" ^ ")
}

fn bench_compile(c: &mut Criterion) {
    let engine = Engine::standard();
    let mut group = c.benchmark_group("compile");

    group.bench_function("whitelist", |b| {
        b.iter(|| engine.compile(black_box(WHITELIST)));
    });
    for &n in &[10, 100, 1_000] {
        let text = xor_chain(n);
        group.bench_with_input(BenchmarkId::new("xor_chain", n), &text, |b, text| {
            b.iter(|| engine.compile(black_box(text)));
        });
    }

    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let engine = Engine::standard();
    let mut group = c.benchmark_group("evaluate");

    let expr = engine.compile(WHITELIST).unwrap();
    for &n in &[5, 50, 500] {
        let host = build_host(n);
        group.bench_with_input(BenchmarkId::new("whitelist", n), &host, |b, host| {
            b.iter(|| expr.evaluate(black_box(host)));
        });
    }

    for &n in &[10, 100, 1_000] {
        let expr = engine.compile(&xor_chain(n)).unwrap();
        let host = Record::new();
        group.bench_function(BenchmarkId::new("xor_chain", n), |b| {
            b.iter(|| expr.evaluate(black_box(&host)));
        });
    }

    group.finish();
}

fn bench_batch_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_size");
    let text = xor_chain(1_000);
    let host = Record::new();

    for &batch in &[2, 4, 16] {
        let engine = Engine::builder().batch_size(batch).build().unwrap();
        let expr = engine.compile(&text).unwrap();
        group.bench_function(BenchmarkId::from_parameter(batch), |b| {
            b.iter(|| expr.evaluate(black_box(&host)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compile, bench_evaluate, bench_batch_size);
criterion_main!(benches);
