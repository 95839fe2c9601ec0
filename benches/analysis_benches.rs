use RustedFunAnalyzer::Utils::plots::FunctionPlotter;
use RustedFunAnalyzer::analysis::analyzer::FunctionAnalyzer;
use RustedFunAnalyzer::symbolic::parse_expr::FunctionParser;
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

const FUNCTIONS: [&str; 5] = [
    "x^2 - 4",
    "sin(x) + 1/x",
    "sqrt(4 - x^2)",
    "(x^2 - 4)/(x - 2)",
    "atan(x) + exp(-x^2)",
];

fn bench_parse(c: &mut Criterion) {
    let parser = FunctionParser::new();
    c.bench_function("parse", |b| {
        b.iter(|| {
            for text in FUNCTIONS {
                let _ = parser.parse(black_box(text));
            }
        })
    });
}

fn bench_analyze(c: &mut Criterion) {
    let mut group = c.benchmark_group("analyze");
    for text in FUNCTIONS {
        let Ok(parsed) = FunctionParser::new().parse(text) else {
            continue;
        };
        group.bench_function(text, |b| {
            b.iter(|| FunctionAnalyzer::new(black_box(&parsed)).analyze(Some(1.0)))
        });
    }
    group.finish();
}

fn bench_sampling(c: &mut Criterion) {
    let Ok(parsed) = FunctionParser::new().parse("sin(x) + 1/x") else {
        return;
    };
    let Ok(plotter) = FunctionPlotter::new(&parsed.expr) else {
        return;
    };
    c.bench_function("make_figure 1000 samples", |b| {
        b.iter(|| plotter.make_figure(black_box(Some(15.0)), None))
    });
}

criterion_group!(benches, bench_parse, bench_analyze, bench_sampling);
criterion_main!(benches);
