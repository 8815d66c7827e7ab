//! Compile and predicate benchmarks.
//!
//! Run with: cargo bench -p sv-compiler

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sv_compiler::{parse_filter_list, FilterRegistry};
use sv_core::{ContentType, Filter, FilterMatcher, RequestContext};

/// Mix of blocking, exception and element hiding lines.
fn generate_list(count: usize) -> String {
    let mut lines = Vec::with_capacity(count);
    for i in 0..count {
        let line = match i % 5 {
            0 => format!("||ads{i}.example.com^"),
            1 => format!("/banner/{i}/*$image,third-party"),
            2 => format!("@@||cdn{i}.example.org^$script"),
            3 => format!("example{i}.com##.sponsor-{i}"),
            _ => format!("*tracker{i}*$domain=site{i}.com|~www.site{i}.com"),
        };
        lines.push(line);
    }
    lines.join("\n")
}

fn build_matcher(filters: &[Arc<Filter>]) -> FilterMatcher {
    let mut matcher = FilterMatcher::new();
    for filter in filters {
        matcher.add(Arc::clone(filter));
    }
    matcher
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");

    for size in [100, 1_000, 5_000] {
        let list = generate_list(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &list, |b, list| {
            b.iter(|| {
                let registry = FilterRegistry::new();
                black_box(parse_filter_list(&registry, list))
            })
        });
    }

    group.finish();
}

fn bench_interned_lookup(c: &mut Criterion) {
    let registry = FilterRegistry::new();
    let list = generate_list(1_000);
    parse_filter_list(&registry, &list);

    c.bench_function("from_text_interned", |b| {
        b.iter(|| black_box(registry.from_text(black_box("||ads500.example.com^"))))
    });
}

fn bench_match_request(c: &mut Criterion) {
    let mut group = c.benchmark_group("match_request");

    for size in [100, 1_000] {
        let registry = FilterRegistry::new();
        let filters = parse_filter_list(&registry, &generate_list(size));
        let matcher = build_matcher(&filters);

        let hit = RequestContext::from_urls(
            "http://ads0.example.com/pixel.gif",
            ContentType::IMAGE,
            Some("http://news.example.net/"),
        );
        let miss = RequestContext::from_urls(
            "http://static.example.net/app.js",
            ContentType::SCRIPT,
            Some("http://news.example.net/"),
        );

        group.bench_with_input(BenchmarkId::new("hit", size), &hit, |b, ctx| {
            b.iter(|| black_box(matcher.match_request(ctx)))
        });
        group.bench_with_input(BenchmarkId::new("miss", size), &miss, |b, ctx| {
            b.iter(|| black_box(matcher.match_request(ctx)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compile, bench_interned_lookup, bench_match_request);
criterion_main!(benches);
