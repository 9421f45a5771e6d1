use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing_subscriber::EnvFilter;

use wc_reconcile::config::{PipelineConfig, ReferenceTables};
use wc_reconcile::export;
use wc_reconcile::pipeline::{self, PipelineError, PipelineInputs};
use wc_reconcile::raw::{RawTable, read_delimited};
use wc_reconcile::record::Source;
use wc_reconcile::transform::RawSource;

const HISTORICAL_FILE: &str = "matches_1930-2010.csv";
const MATCHES_2014_FILE: &str = "WorldCupMatches2014.csv";
const BRACKET_2018_FILE: &str = "data_2018.json";
const MATCHES_2022_FILE: &str = "Fifa_world_cup_matches.csv";
const HISTORICAL_DATES_FILE: &str = "historical_dates.csv";
const CITIES_2022_FILE: &str = "cities_2022.csv";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = PipelineConfig::from_env();
    if let Some(dir) = path_arg("--data-dir") {
        config.data_dir = dir;
    }
    if let Some(out) = path_arg("--out") {
        config.output = out;
    }
    if let Some(tables) = path_arg("--tables") {
        config.tables_path = Some(tables);
    }

    let tables = ReferenceTables::load(config.tables_path.as_deref())?;
    let inputs = read_inputs(&config.data_dir)?;

    let output = match pipeline::run(&inputs, &tables, &config) {
        Ok(output) => output,
        Err(PipelineError::Validation { report, .. }) => {
            for finding in report.fatal() {
                eprintln!("[FATAL] {finding}");
            }
            return Err(anyhow!("validation failed; nothing written"));
        }
        Err(err) => return Err(err.into()),
    };

    export::write_canonical_file(&config.output, output.set.records())?;

    println!("Consolidation complete");
    println!("Output: {}", config.output.display());
    println!("Records: {}", output.set.len());
    println!(
        "Duplicates resolved: {}",
        output.consolidation.duplicates.len()
    );
    if let Some(dates) = &output.dates {
        println!(
            "Historical dates: {}/{} resolved, {} ambiguous, {} unmatched",
            dates.resolved, dates.eligible, dates.ambiguous, dates.no_match
        );
    }
    if let Some(cities) = &output.cities {
        println!(
            "2022 cities: {}/{} resolved, {} ambiguous, {} unmatched",
            cities.resolved, cities.eligible, cities.ambiguous, cities.no_match
        );
    }

    for (source, q) in &output.validation.per_source {
        println!(
            "{}: in={} dropped={} kept={} home/draw/away={}/{}/{} no_score={} no_date={} no_city={} no_round={} unmapped={} review={}",
            source,
            q.input_records,
            q.dropped,
            q.records,
            q.home_wins,
            q.draws,
            q.away_wins,
            q.absent_scores,
            q.absent_dates,
            q.absent_cities,
            q.absent_rounds,
            q.unmapped_rounds,
            q.needs_review
        );
    }
    let warnings = output.validation.warning_count();
    if warnings > 0 {
        println!("Warnings: {warnings}");
        for finding in output.validation.warnings().take(12) {
            println!("   - {finding}");
        }
    }
    Ok(())
}

fn read_inputs(dir: &Path) -> Result<PipelineInputs> {
    let mut inputs = PipelineInputs::default();
    for source in Source::ALL {
        let path = dir.join(source_file(source));
        if !path.exists() {
            tracing::warn!(source = %source, path = %path.display(), "source file missing; skipped");
            continue;
        }
        let raw = match source {
            Source::Historical => RawSource::Historical(read_delimited(&path)?),
            Source::Matches2014 => RawSource::Matches2014(read_delimited(&path)?),
            Source::Bracket2018 => RawSource::Bracket2018(read_json(&path)?),
            Source::Matches2022 => RawSource::Matches2022(read_delimited(&path)?),
        };
        inputs.sources.push(raw);
    }
    if inputs.sources.is_empty() {
        return Err(anyhow!("no source files found in {}", dir.display()));
    }

    let dates = path_arg("--dates").unwrap_or_else(|| dir.join(HISTORICAL_DATES_FILE));
    inputs.historical_dates = read_optional_table(&dates)?;
    let cities = path_arg("--cities").unwrap_or_else(|| dir.join(CITIES_2022_FILE));
    inputs.cities_2022 = read_optional_table(&cities)?;
    Ok(inputs)
}

fn source_file(source: Source) -> &'static str {
    match source {
        Source::Historical => HISTORICAL_FILE,
        Source::Matches2014 => MATCHES_2014_FILE,
        Source::Bracket2018 => BRACKET_2018_FILE,
        Source::Matches2022 => MATCHES_2022_FILE,
    }
}

fn read_optional_table(path: &Path) -> Result<Option<RawTable>> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "no lookup table; enrichment skipped");
        return Ok(None);
    }
    read_delimited(path).map(Some)
}

fn read_json(path: &Path) -> Result<serde_json::Value> {
    let raw = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("parse {}", path.display()))
}

fn path_arg(flag: &str) -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix(&prefix) {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(PathBuf::from(next));
        }
    }
    None
}
