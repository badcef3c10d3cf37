//! Benchmarks comparing wiki markup tokenizing, parsing and rendering
//! against pulldown-cmark on equivalent Markdown.
//!
//! Run with: cargo bench -p wikimark-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pulldown_cmark::{html, Options, Parser as MdParser};
use wikimark_core::{tokenize, Parser, Renderer};

/// Sample wiki markup
const WIKI_SAMPLE: &str = r#"[목차]
= Introduction =
This is a paragraph with ''emphasis'', '''strong text''' and a [[Link|link]].
It demonstrates the basic capabilities of the format.[* A footnote.]

== Lists ==
 * First item with some content
 * Second item with more content
  * Nested item
 1.#1 Step one of the process
 1. Step two continues

== Code Example ==
{{{#!syntax rust
fn fibonacci(n: u64) -> u64 {
    match n {
        0 => 0,
        1 => 1,
        _ => fibonacci(n - 1) + fibonacci(n - 2),
    }
}
}}}

== Table ==
||<tablewidth=100%> Name || Speed || Memory ||
|| Fast || 100ms || 10MB ||
|| Medium || 500ms || 50MB ||
||<bgcolor=#eee> Slow || 1000ms || 100MB ||

== Quote ==
> The best code is no code at all.
> Every line of code you write is a liability.
----
End of document.[[분류:Benchmark]]
"#;

/// Equivalent Markdown content (as close as possible)
const MARKDOWN_SAMPLE: &str = r#"# Introduction

This is a paragraph with *emphasis*, **strong text** and a [link](Link).
It demonstrates the basic capabilities of the format.[^1]

## Lists

- First item with some content
- Second item with more content
  - Nested item

1. Step one of the process
2. Step two continues

## Code Example

```rust
fn fibonacci(n: u64) -> u64 {
    match n {
        0 => 0,
        1 => 1,
        _ => fibonacci(n - 1) + fibonacci(n - 2),
    }
}
```

## Table

| Name    | Speed   | Memory |
| ------- | ------- | ------ |
| Fast    | 100ms   | 10MB   |
| Medium  | 500ms   | 50MB   |
| Slow    | 1000ms  | 100MB  |

## Quote

> The best code is no code at all.
> Every line of code you write is a liability.

---

End of document.

[^1]: A footnote.
"#;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("current-thread runtime")
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    group.throughput(Throughput::Bytes(WIKI_SAMPLE.len() as u64));

    group.bench_function("tokenize", |b| {
        b.iter(|| black_box(tokenize(black_box(WIKI_SAMPLE)).len()))
    });

    group.bench_function("wikimark", |b| {
        b.iter(|| {
            let tokens = tokenize(black_box(WIKI_SAMPLE));
            let nodes = Parser::new().parse(&tokens);
            black_box(nodes.len())
        })
    });

    group.throughput(Throughput::Bytes(MARKDOWN_SAMPLE.len() as u64));

    group.bench_function("markdown_pulldown", |b| {
        b.iter(|| {
            let parser = MdParser::new_ext(black_box(MARKDOWN_SAMPLE), Options::all());
            let events: Vec<_> = parser.collect();
            black_box(events.len())
        })
    });

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    let rt = runtime();
    let renderer = Renderer::default();

    group.throughput(Throughput::Bytes(WIKI_SAMPLE.len() as u64));

    group.bench_function("wikimark", |b| {
        b.iter(|| {
            let out = rt.block_on(renderer.render_markup(black_box(WIKI_SAMPLE)));
            black_box(out.html.len())
        })
    });

    group.throughput(Throughput::Bytes(MARKDOWN_SAMPLE.len() as u64));

    group.bench_function("markdown_pulldown", |b| {
        b.iter(|| {
            let parser = MdParser::new_ext(black_box(MARKDOWN_SAMPLE), Options::all());
            let mut out = String::new();
            html::push_html(&mut out, parser);
            black_box(out.len())
        })
    });

    group.finish();
}

fn bench_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("scaling");
    let rt = runtime();
    let renderer = Renderer::default();

    for size in [1, 5, 10, 20].iter() {
        let content: String = WIKI_SAMPLE.repeat(*size);

        group.throughput(Throughput::Bytes(content.len() as u64));

        group.bench_with_input(BenchmarkId::new("parse", size), &content, |b, content| {
            b.iter(|| {
                let tokens = tokenize(black_box(content));
                black_box(Parser::new().parse(&tokens).len())
            })
        });

        group.bench_with_input(BenchmarkId::new("render", size), &content, |b, content| {
            b.iter(|| {
                let out = rt.block_on(renderer.render_markup(black_box(content)));
                black_box(out.html.len())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse, bench_render, bench_scaling);
criterion_main!(benches);
