//! Benchmarks du moteur de patch (Criterion).
//!
//! Suites :
//!   1) rule    — `PatchRule::apply` seul sur un module
//!   2) engine  — `apply` sur tout un bundle, regex sans injection
//!   3) inject  — `apply` avec `moduleImport` (chaque module modifié importe le module 0)
//!
//! Le store est recloné à chaque itération (`iter_batched`) : le moteur patche en place.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use jsbundle_benches::{literal_rule, module_source, rename_set, synthetic_store};

const MODULE_COUNTS: &[u32] = &[64, 1_024, 4_096];

fn bench_rule(c: &mut Criterion) {
    let rule = literal_rule();
    let mut group = c.benchmark_group("patch/rule");
    for body in [256usize, 4_096, 65_536] {
        let module = module_source(7, body);
        group.throughput(Throughput::Bytes(module.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(body), module.as_bytes(), |b, m| {
            b.iter(|| rule.apply(black_box(m)).len());
        });
    }
    group.finish();
}

fn bench_engine(c: &mut Criterion, name: &str, inject: bool) {
    let sets = [rename_set(inject)];
    let mut group = c.benchmark_group(name);
    group.sample_size(20);
    for &modules in MODULE_COUNTS {
        let store = synthetic_store(modules, 512);
        group.throughput(Throughput::Bytes(store.total_bytes() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(modules), &store, |b, s| {
            b.iter_batched(
                || s.clone(),
                |mut store| jsbundle_patch::apply(&mut store, black_box(&sets)).unwrap(),
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_regex_engine(c: &mut Criterion) { bench_engine(c, "patch/engine", false); }

fn bench_inject_engine(c: &mut Criterion) { bench_engine(c, "patch/inject", true); }

criterion_group!(benches, bench_rule, bench_regex_engine, bench_inject_engine);
criterion_main!(benches);
