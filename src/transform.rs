use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

use crate::config::{ReferenceTables, Venue};
use crate::names::{AliasTable, NameKind, NameNormalizer};
use crate::raw::RawTable;
use crate::record::{MatchRecord, Source, UNKNOWN_NAME};
use crate::rounds::RoundNormalizer;
use crate::source_2014::Matches2014Transformer;
use crate::source_2018::Bracket2018Transformer;
use crate::source_2022::Matches2022Transformer;
use crate::source_historical::HistoricalTransformer;

/// Raw input of one source, tagged with the source it came from.
#[derive(Debug, Clone)]
pub enum RawSource {
    Historical(RawTable),
    Matches2014(RawTable),
    Bracket2018(Value),
    Matches2022(RawTable),
}

impl RawSource {
    pub fn source(&self) -> Source {
        match self {
            RawSource::Historical(_) => Source::Historical,
            RawSource::Matches2014(_) => Source::Matches2014,
            RawSource::Bracket2018(_) => Source::Bracket2018,
            RawSource::Matches2022(_) => Source::Matches2022,
        }
    }
}

/// Immutable lookup state shared by every transformer and enricher.
#[derive(Debug, Clone)]
pub struct Normalizers {
    pub teams: NameNormalizer,
    pub cities: NameNormalizer,
    pub stadiums: NameNormalizer,
    pub rounds: RoundNormalizer,
    pub bracket_teams: HashMap<u64, String>,
    pub bracket_stadiums: HashMap<u64, Venue>,
}

impl Normalizers {
    pub fn from_tables(tables: &ReferenceTables) -> Self {
        let mut teams = AliasTable::from_pairs(
            tables.teams.iter().map(|(a, t)| (a.as_str(), t.as_str())),
        );
        for rule in &tables.team_fragments {
            let frags = rule.fragments.iter().map(String::as_str).collect::<Vec<_>>();
            teams.add_fragment_rule(&frags, &rule.target);
        }
        let cities =
            AliasTable::from_pairs(tables.cities.iter().map(|(a, t)| (a.as_str(), t.as_str())));
        let stadiums = AliasTable::from_pairs(
            tables.stadiums.iter().map(|(a, t)| (a.as_str(), t.as_str())),
        );
        let rounds =
            RoundNormalizer::from_pairs(tables.rounds.iter().map(|(label, r)| (label.as_str(), *r)));

        Self {
            teams: NameNormalizer::new(NameKind::Team, teams),
            cities: NameNormalizer::new(NameKind::City, cities),
            stadiums: NameNormalizer::new(NameKind::Stadium, stadiums),
            rounds,
            bracket_teams: tables.bracket_teams.clone(),
            bracket_stadiums: tables.bracket_stadiums.clone(),
        }
    }

    /// Both team names, or the reason the record cannot be kept.
    pub fn team_pair(
        &self,
        home: Option<&str>,
        away: Option<&str>,
    ) -> Result<(String, String), DropReason> {
        let home_team = self.teams.normalize(home);
        if home_team == UNKNOWN_NAME {
            return Err(DropReason::MissingTeam {
                side: "home",
                raw: home.map(str::to_string),
            });
        }
        let away_team = self.teams.normalize(away);
        if away_team == UNKNOWN_NAME {
            return Err(DropReason::MissingTeam {
                side: "away",
                raw: away.map(str::to_string),
            });
        }
        Ok((home_team, away_team))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    MissingTeam {
        side: &'static str,
        raw: Option<String>,
    },
    UnresolvedTeamId(String),
    MissingEdition(Option<String>),
    MalformedNode(String),
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::MissingTeam { side, raw } => match raw {
                Some(raw) => write!(f, "unusable {side} team {raw:?}"),
                None => write!(f, "missing {side} team"),
            },
            DropReason::UnresolvedTeamId(id) => write!(f, "team id {id} not in any team table"),
            DropReason::MissingEdition(Some(raw)) => write!(f, "unknown edition {raw:?}"),
            DropReason::MissingEdition(None) => write!(f, "missing edition"),
            DropReason::MalformedNode(what) => write!(f, "malformed match node: {what}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedRecord {
    /// Row index, or node index in flattening order for the bracket source.
    pub position: usize,
    pub reason: DropReason,
}

#[derive(Debug, Clone)]
pub struct SourceBatch {
    pub source: Source,
    pub input_records: usize,
    pub records: Vec<MatchRecord>,
    pub dropped: Vec<DroppedRecord>,
    /// Structural remarks, e.g. columns found only by position.
    pub notes: Vec<String>,
}

impl SourceBatch {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            input_records: 0,
            records: Vec::new(),
            dropped: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn push(&mut self, position: usize, outcome: Result<MatchRecord, DropReason>) {
        self.input_records += 1;
        match outcome {
            Ok(record) => self.records.push(record),
            Err(reason) => {
                tracing::debug!(source = %self.source, position, %reason, "dropping record");
                self.dropped.push(DroppedRecord { position, reason });
            }
        }
    }

    pub fn drop_rate(&self) -> f64 {
        if self.input_records == 0 {
            return 0.0;
        }
        self.dropped.len() as f64 / self.input_records as f64
    }
}

/// One raw shape → canonical records. Each variant borrows its raw input.
pub trait SourceTransformer {
    fn source(&self) -> Source;
    fn transform(&self, norm: &Normalizers) -> SourceBatch;
}

pub fn transformer_for<'a>(
    raw: &'a RawSource,
    bracket_edition: u16,
) -> Box<dyn SourceTransformer + 'a> {
    match raw {
        RawSource::Historical(table) => Box::new(HistoricalTransformer::new(table)),
        RawSource::Matches2014(table) => Box::new(Matches2014Transformer::new(table)),
        RawSource::Bracket2018(tree) => Box::new(Bracket2018Transformer::new(tree, bracket_edition)),
        RawSource::Matches2022(table) => Box::new(Matches2022Transformer::new(table)),
    }
}

pub fn transform_source(raw: &RawSource, norm: &Normalizers, bracket_edition: u16) -> SourceBatch {
    let transformer = transformer_for(raw, bracket_edition);
    let batch = transformer.transform(norm);
    tracing::info!(
        source = %batch.source,
        input = batch.input_records,
        kept = batch.records.len(),
        dropped = batch.dropped.len(),
        "transformed source"
    );
    for note in &batch.notes {
        tracing::warn!(source = %batch.source, "{note}");
    }
    batch
}

/// Column notes for fields that were located by position only.
pub(crate) fn positional_notes(positional: &[&'static str]) -> Vec<String> {
    positional
        .iter()
        .map(|field| format!("column for {field} found by position only"))
        .collect()
}
