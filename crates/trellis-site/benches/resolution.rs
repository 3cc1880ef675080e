//! Benchmarks for path resolution.

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use trellis_site::{RequestContext, ResolveMode, Site};
use trellis_storage::{MemoryStorage, PageRecord, PartRecord, Storage};

/// Create a page tree with specified depth and breadth.
fn create_tree(depth: usize, breadth: usize) -> Arc<MemoryStorage> {
    fn create_level(
        storage: &MemoryStorage,
        parent: &PageRecord,
        current_depth: usize,
        max_depth: usize,
        breadth: usize,
    ) {
        if current_depth > max_depth {
            return;
        }

        for i in 0..breadth {
            let slug = format!("section-{i}");
            let page = PageRecord::new(format!("Level {current_depth}"), slug).with_parent(parent.key);
            let parts = vec![PartRecord::new(
                "body",
                format!("Content at depth {current_depth}."),
            )];
            let page = storage.insert(&page, &parts).unwrap();
            create_level(storage, &page, current_depth + 1, max_depth, breadth);
        }
    }

    let storage = MemoryStorage::new();
    let root = storage.insert(&PageRecord::new("Home", "/"), &[]).unwrap();
    create_level(&storage, &root, 1, depth, breadth);
    Arc::new(storage)
}

fn deep_path(depth: usize, index: usize) -> String {
    let mut path = String::from("/");
    for _ in 0..depth {
        path.push_str(&format!("section-{index}/"));
    }
    path
}

fn bench_resolve_depth(c: &mut Criterion) {
    let site = Site::new(create_tree(5, 3));

    let mut group = c.benchmark_group("resolve_depth");

    for depth in [1, 3, 5] {
        let path = deep_path(depth, 2);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &path, |b, path| {
            b.iter(|| site.resolve_path(path, ResolveMode::Live).unwrap());
        });
    }

    group.finish();
}

fn bench_resolve_miss(c: &mut Criterion) {
    let site = Site::new(create_tree(3, 5));

    let mut group = c.benchmark_group("resolve_miss");

    group.bench_function("live", |b| {
        b.iter(|| site.resolve_path("/nonexistent/path/", ResolveMode::Live).is_err())
    });

    group.bench_function("preview", |b| {
        b.iter(|| site.resolve_path("/nonexistent/path/", ResolveMode::Preview).is_ok())
    });

    group.finish();
}

fn bench_serve(c: &mut Criterion) {
    let site = Site::new(create_tree(3, 5));
    let request = RequestContext::new(deep_path(3, 4));

    c.bench_function("serve", |b| b.iter(|| site.serve(&request).unwrap()));
}

criterion_group!(
    benches,
    bench_resolve_depth,
    bench_resolve_miss,
    bench_serve
);
criterion_main!(benches);
