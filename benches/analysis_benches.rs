use RustedFunAn::Utils::config::AnalysisConfig;
use RustedFunAn::analysis::analyzer::analyze;
use RustedFunAn::analysis::budget::Budget;
use RustedFunAn::analysis::range::range;
use RustedFunAn::symbolic::parse_expr::parse;
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse rational function", |b| {
        b.iter(|| parse(black_box("(x^3 - 2*x + 1)/(x^2 - 4) + sqrt(x + 5)")))
    });
}

fn bench_range(c: &mut Criterion) {
    let f = parse("x/(x^2 + 1)").unwrap();
    c.bench_function("range of x/(x^2+1)", |b| {
        b.iter(|| range(black_box(&f), &mut Budget::default()))
    });
}

fn bench_full_request(c: &mut Criterion) {
    let mut group = c.benchmark_group("full request");
    let config = AnalysisConfig::default();
    for text in ["(x-1)/(x+2)", "sqrt(x+1)", "sin(x) - x/2"] {
        group.bench_function(text, |b| {
            b.iter(|| analyze(black_box(text), Some("2"), &config))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_range, bench_full_request);
criterion_main!(benches);
