//! Benchmarks for dependency-path resolution
//!
//! Run with: cargo bench -p reqpath-runtime

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use reqpath_runtime::{
    BootstrapPaths, CollectingSink, HostConfig, PathResolver, ScriptHost, bootstrap,
};
use std::hint::black_box;
use std::path::PathBuf;
use tempfile::TempDir;

const MINI_REQUIRE: &str = include_str!("../tests/fixtures/mini-require.js");

const CONFIG: &str = r#"
require.config({
    baseUrl: 'public',
    paths: { 'jquery': 'lib/jquery.min', 'blocks': 'app/blocks' }
});
"#;

const NAMES: &[&str] = &["jquery", "blocks/block", "./relative/module", "app/main"];

fn bootstrapped_host(dir: &TempDir) -> ScriptHost {
    let lib = dir.path().join("require.js");
    let main = dir.path().join("main.js");
    std::fs::write(&lib, MINI_REQUIRE).unwrap();
    std::fs::write(&main, CONFIG).unwrap();

    let host = ScriptHost::new(&HostConfig::default()).unwrap();
    let report = bootstrap(&host, &BootstrapPaths::new(lib, main), &CollectingSink::new());
    assert!(report.is_complete());
    host
}

fn bench_resolve(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let host = bootstrapped_host(&dir);
    let sink = CollectingSink::new();
    let mut group = c.benchmark_group("resolve");

    group.bench_function("cache_miss", |b| {
        b.iter_batched(
            || PathResolver::new(PathBuf::from("/project/public")),
            |resolver| {
                for name in NAMES {
                    black_box(resolver.resolve(&host, &sink, name));
                }
            },
            BatchSize::SmallInput,
        );
    });

    let warm = PathResolver::new(PathBuf::from("/project/public"));
    for name in NAMES {
        warm.resolve(&host, &sink, name);
    }
    group.bench_function("cache_hit", |b| {
        b.iter(|| {
            for name in NAMES {
                black_box(warm.resolve(&host, &sink, name));
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_resolve);
criterion_main!(benches);
