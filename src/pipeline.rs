use thiserror::Error;

use crate::config::{PipelineConfig, ReferenceTables};
use crate::consolidate::{ConsolidatedSet, ConsolidationReport, UnresolvedDuplicate, consolidate};
use crate::enrich_cities::{CityEnrichmentReport, CityLookup, enrich_cities};
use crate::enrich_dates::{DateEnrichmentReport, DateLookup, enrich_historical_dates};
use crate::raw::RawTable;
use crate::record::Source;
use crate::transform::{DroppedRecord, Normalizers, RawSource, transform_source};
use crate::validate::{SourceIntake, ValidationReport, validate};

const CITY_LOOKUP_EDITION: u16 = 2022;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid pipeline input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    UnresolvedDuplicate(#[from] UnresolvedDuplicate),
    #[error("validation failed with {fatal} fatal finding(s); first: {first}")]
    Validation {
        fatal: usize,
        first: String,
        report: Box<ValidationReport>,
    },
}

/// Everything the core consumes: one raw structure per source plus the
/// optional auxiliary lookup tables.
#[derive(Debug, Clone, Default)]
pub struct PipelineInputs {
    pub sources: Vec<RawSource>,
    pub historical_dates: Option<RawTable>,
    pub cities_2022: Option<RawTable>,
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub set: ConsolidatedSet,
    pub intake: Vec<SourceIntake>,
    pub dropped: Vec<(Source, DroppedRecord)>,
    pub notes: Vec<(Source, String)>,
    pub dates: Option<DateEnrichmentReport>,
    pub cities: Option<CityEnrichmentReport>,
    pub consolidation: ConsolidationReport,
    pub validation: ValidationReport,
}

/// transform → enrich → consolidate → validate. Inputs are never mutated.
pub fn run(
    inputs: &PipelineInputs,
    tables: &ReferenceTables,
    config: &PipelineConfig,
) -> Result<PipelineOutput, PipelineError> {
    if inputs.sources.is_empty() {
        return Err(PipelineError::InvalidInput("no source supplied".to_string()));
    }
    let mut ordered = inputs.sources.iter().collect::<Vec<_>>();
    ordered.sort_by_key(|raw| raw.source());
    if let Some(pair) = ordered.windows(2).find(|w| w[0].source() == w[1].source()) {
        return Err(PipelineError::InvalidInput(format!(
            "source {} supplied more than once",
            pair[0].source()
        )));
    }

    let norm = Normalizers::from_tables(tables);

    let mut records = Vec::new();
    let mut intake = Vec::new();
    let mut dropped = Vec::new();
    let mut notes = Vec::new();
    for raw in ordered {
        let batch = transform_source(raw, &norm, config.bracket_edition);
        intake.push(SourceIntake {
            source: batch.source,
            input_records: batch.input_records,
            dropped: batch.dropped.len(),
        });
        dropped.extend(batch.dropped.into_iter().map(|d| (batch.source, d)));
        notes.extend(batch.notes.into_iter().map(|n| (batch.source, n)));
        records.extend(batch.records);
    }

    let dates = inputs.historical_dates.as_ref().map(|table| {
        let lookup = DateLookup::from_table(table, &norm);
        enrich_historical_dates(&mut records, &lookup)
    });
    let cities = inputs.cities_2022.as_ref().map(|table| {
        let lookup = CityLookup::from_table(table, &norm, CITY_LOOKUP_EDITION);
        enrich_cities(&mut records, &lookup)
    });

    let (set, consolidation) = consolidate(records, &config.authority)?;

    let validation = validate(set.records(), &intake, config.max_drop_rate);
    if validation.is_fatal() {
        let fatal = validation.fatal().count();
        let first = validation
            .fatal()
            .next()
            .map(ToString::to_string)
            .unwrap_or_default();
        return Err(PipelineError::Validation {
            fatal,
            first,
            report: Box::new(validation),
        });
    }

    Ok(PipelineOutput {
        set,
        intake,
        dropped,
        notes,
        dates,
        cities,
        consolidation,
        validation,
    })
}
