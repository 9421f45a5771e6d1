use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use wc_reconcile::config::{PipelineConfig, ReferenceTables};
use wc_reconcile::enrich_dates::{DateLookup, enrich_historical_dates};
use wc_reconcile::pipeline::{self, PipelineInputs};
use wc_reconcile::raw::RawTable;
use wc_reconcile::transform::{Normalizers, RawSource, transform_source};

const TEAMS: [&str; 16] = [
    "Brazil",
    "West Germany",
    "Italy",
    "Argentina",
    "Uruguay",
    "France",
    "England",
    "Spain",
    "Netherlands",
    "Sweden",
    "Soviet Union",
    "Hungary",
    "Czechoslovakia",
    "Mexico",
    "Belgium",
    "Yugoslavia",
];

const EDITIONS: [u16; 19] = [
    1930, 1934, 1938, 1950, 1954, 1958, 1962, 1966, 1970, 1974, 1978, 1982, 1986, 1990, 1994,
    1998, 2002, 2006, 2010,
];

const STAGES: [&str; 5] = ["Group 1", "Quarter-finals", "Semi-finals", "Match for third place", "Final"];

fn table(headers: &[&str], rows: Vec<Vec<String>>) -> RawTable {
    RawTable::new(headers.iter().map(|h| h.to_string()).collect(), rows)
}

// Every pair of teams meets once per edition; one date row per meeting.
fn historical_tables() -> (RawTable, RawTable) {
    let mut matches = Vec::new();
    let mut dates = Vec::new();
    for (e, edition) in EDITIONS.iter().enumerate() {
        let mut n = 0usize;
        for (i, home) in TEAMS.iter().enumerate() {
            for away in TEAMS.iter().skip(i + 1).step_by(3) {
                let stage = STAGES[n % STAGES.len()];
                matches.push(vec![
                    stage.to_string(),
                    edition.to_string(),
                    home.to_string(),
                    away.to_string(),
                    format!("{}-{}", (n + e) % 5, n % 3),
                    "Estadio Centenario, Montevideo".to_string(),
                ]);
                let day = 1 + (n % 28);
                let month = if n < 28 { 6 } else { 7 };
                dates.push(vec![
                    format!("{day:02}/{month:02}/{edition}"),
                    home.to_string(),
                    away.to_string(),
                ]);
                n += 1;
            }
        }
    }
    (
        table(&["round", "year", "team1", "team2", "score", "venue"], matches),
        table(&["date_exacte", "home_team", "away_team"], dates),
    )
}

fn bench_historical_transform(c: &mut Criterion) {
    let norm = Normalizers::from_tables(&ReferenceTables::builtin());
    let (matches, _) = historical_tables();
    let raw = RawSource::Historical(matches);
    c.bench_function("historical_transform", |b| {
        b.iter(|| {
            let batch = transform_source(black_box(&raw), &norm, 2018);
            black_box(batch.records.len());
        })
    });
}

fn bench_date_enrichment(c: &mut Criterion) {
    let norm = Normalizers::from_tables(&ReferenceTables::builtin());
    let (matches, dates) = historical_tables();
    let records = transform_source(&RawSource::Historical(matches), &norm, 2018).records;
    let lookup = DateLookup::from_table(&dates, &norm);
    c.bench_function("historical_date_enrichment", |b| {
        b.iter(|| {
            let mut batch = records.clone();
            let report = enrich_historical_dates(black_box(&mut batch), &lookup);
            black_box(report.resolved);
        })
    });
}

fn bench_full_pipeline(c: &mut Criterion) {
    let tables = ReferenceTables::builtin();
    let config = PipelineConfig::default();
    let (matches, dates) = historical_tables();
    let inputs = PipelineInputs {
        sources: vec![RawSource::Historical(matches)],
        historical_dates: Some(dates),
        cities_2022: None,
    };
    c.bench_function("full_pipeline", |b| {
        b.iter(|| {
            let output = pipeline::run(black_box(&inputs), &tables, &config).unwrap();
            black_box(output.set.len());
        })
    });
}

criterion_group!(
    benches,
    bench_historical_transform,
    bench_date_enrichment,
    bench_full_pipeline
);
criterion_main!(benches);
