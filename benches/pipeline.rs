/// Benchmarks for the analysis pipeline.
use chemviz::config::AnalysisConfig;
use chemviz::pipeline;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::fmt::Write;

const TYPES: [&str; 5] = ["Pump", "Compressor", "Valve", "Reactor", "Heat Exchanger"];

/// Returns the type, flowrate, pressure and temperature of generated row `i`.
fn row(i: usize) -> (&'static str, f64, f64, f64) {
    (
        TYPES[i % TYPES.len()],
        50.0 + (i * 37 % 200) as f64 * 0.5,
        2.0 + (i * 13 % 80) as f64 * 0.1,
        60.0 + (i * 29 % 150) as f64 * 0.7,
    )
}

/// Generate a CSV upload with `rows` rows, some of them duplicated or incomplete.
fn generate_csv(rows: usize) -> Vec<u8> {
    let mut csv = String::from("Equipment Name,Type,Flowrate,Pressure,Temperature\n");
    for i in 0..rows {
        let (kind, flowrate, pressure, temperature) = row(i);
        match i % 50 {
            // Missing flowrate, imputed with the column mean.
            7 => writeln!(csv, "{kind}-{i},{kind},,{pressure},{temperature}"),
            // Duplicate of the previous row.
            13 => {
                let (kind, flowrate, pressure, temperature) = row(i - 1);
                let i = i - 1;
                writeln!(csv, "{kind}-{i},{kind},{flowrate},{pressure},{temperature}")
            }
            _ => writeln!(csv, "{kind}-{i},{kind},{flowrate},{pressure},{temperature}"),
        }
        .unwrap();
    }
    csv.into_bytes()
}

fn criterion_benchmark(c: &mut Criterion) {
    let config = AnalysisConfig::default();
    for rows in [100, 1_000, 10_000, 100_000] {
        let data = generate_csv(rows);
        let name = format!("analyze({})", rows);
        c.bench_function(&name, |b| {
            b.iter(|| pipeline::analyze(black_box(&data), &config).unwrap())
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
