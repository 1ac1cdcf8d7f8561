//! Benchmarks for URL expansion, query flattening and message templates
//!
//! These cover the per-call string work done on every request and on
//! every routed error.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::{json, Value};

use apiwire_core::http::{Headers, HttpResponse, TemplateValue};
use apiwire_core::params::{append_query, flatten_pairs, ArraySerialization};
use apiwire_core::request::template::expand;
use apiwire_core::response::{render, ExceptionContext};
use apiwire_core::{GlobalConfiguration, Method, Parameter, RequestBuilder};

fn template_values(count: usize) -> Vec<(String, TemplateValue)> {
    (0..count)
        .map(|i| {
            (
                format!("p{}", i),
                TemplateValue {
                    value: json!(format!("value {}", i)),
                    encode: true,
                },
            )
        })
        .collect()
}

fn url_template(count: usize) -> String {
    let mut template = "https://api.example.com/v1".to_string();
    for i in 0..count {
        template.push_str(&format!("/segment{}/{{p{}}}", i, i));
    }
    template
}

fn bench_expand(c: &mut Criterion) {
    let mut group = c.benchmark_group("expand");

    for count in [1, 4, 16] {
        let template = url_template(count);
        let values = template_values(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| expand(black_box(&template), black_box(&values)))
        });
    }

    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");
    let values = vec![
        ("ids".to_string(), json!((0..20).collect::<Vec<_>>())),
        ("filter".to_string(), json!({"status": "open", "owner": {"team": "core"}})),
        ("q".to_string(), json!("tea & biscuits")),
    ];

    for mode in [
        ArraySerialization::Indexed,
        ArraySerialization::Plain,
        ArraySerialization::Csv,
    ] {
        group.bench_function(format!("{:?}", mode), |b| {
            b.iter(|| {
                let pairs = flatten_pairs(black_box(&values), mode);
                append_query("https://api.example.com/v1/items", &pairs)
            })
        });
    }

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let config = GlobalConfiguration::builder()
        .base_url("https://api.example.com")
        .build()
        .expect("configuration");
    let request = RequestBuilder::setup(Method::GET, "/orders/{id}")
        .parameter(Parameter::template("id", 7))
        .parameter(Parameter::header("X-Trace", "t-1"))
        .build(&config)
        .expect("request");

    let mut headers = Headers::new();
    headers.insert("Content-Type", "application/json");
    let body: Value = json!({"error": {"code": "nf", "detail": "order is gone"}, "trace": [1, 2, 3]});
    let response = HttpResponse::new(404, headers, body.to_string());
    let context = ExceptionContext::new(&request, &response);

    let mut group = c.benchmark_group("render");
    group.bench_function("plain", |b| {
        b.iter(|| render(black_box("Order not found"), &context))
    });
    group.bench_function("placeholders", |b| {
        b.iter(|| {
            render(
                black_box("{$statusCode} {$request.method} {$request.url}: {$response.body#/error/detail} ({$request.header.x-trace})"),
                &context,
            )
        })
    });
    group.bench_function("whole_body", |b| {
        b.iter(|| render(black_box("{$response.body}"), &context))
    });
    group.finish();
}

fn bench_build(c: &mut Criterion) {
    let config = GlobalConfiguration::builder()
        .server("default", "https://{region}.example.com/v1")
        .template_parameter("region", "eu")
        .header("X-Sdk", "apiwire")
        .build()
        .expect("configuration");

    c.bench_function("build_request", |b| {
        b.iter(|| {
            RequestBuilder::setup(Method::POST, "/stores/{store}/orders")
                .parameter(Parameter::template("store", "north side"))
                .parameter(Parameter::query("expand", json!(["items", "customer"])))
                .parameter(Parameter::header("Idempotency-Key", "k-1"))
                .parameter(Parameter::body_value(json!({"item": "tea", "qty": 2})))
                .build(black_box(&config))
        })
    });
}

criterion_group!(benches, bench_expand, bench_query, bench_render, bench_build);
criterion_main!(benches);
