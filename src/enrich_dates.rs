//! Fills absent dates on historical records from an auxiliary
//! `(edition, date, team pair)` table.
//!
//! Candidates are matched by edition and by team pair in either order. When a
//! pair met more than once in an edition, rounds decide; failing that, records
//! (in round order, then input order) are paired with candidates in date
//! order, but only when the counts agree and every pairing is round-compatible.
//! Anything else is left absent and flagged for review.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};

use crate::dates::DateParser;
use crate::raw::{ColumnMap, ColumnSpec, RawTable};
use crate::record::{IdentityKey, MatchRecord, Round, Source, is_known_edition, parse_edition};
use crate::transform::Normalizers;

const COLUMNS: &[ColumnSpec] = &[
    ColumnSpec {
        field: "date",
        exact: &["date_exacte", "date", "match_date"],
        contains: &["date"],
        position: None,
    },
    ColumnSpec {
        field: "home_team",
        exact: &["home_team", "team1", "home team"],
        contains: &["home", "team1"],
        position: None,
    },
    ColumnSpec {
        field: "away_team",
        exact: &["away_team", "team2", "away team"],
        contains: &["away", "team2"],
        position: None,
    },
    ColumnSpec {
        field: "year",
        exact: &["year", "edition"],
        contains: &["year", "edition"],
        position: None,
    },
    ColumnSpec {
        field: "round",
        exact: &["round", "stage"],
        contains: &["round", "stage"],
        position: None,
    },
];

/// Outcome of resolving one missing field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T> {
    Resolved(T),
    /// Several candidates and no rule to pick one.
    Ambiguous { candidates: usize },
    NoMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateCandidate {
    pub date: NaiveDate,
    pub round: Option<Round>,
    /// Row index in the auxiliary table.
    pub position: usize,
}

type PairKey = (u16, String, String);

fn pair_key(edition: u16, a: &str, b: &str) -> PairKey {
    if a <= b {
        (edition, a.to_string(), b.to_string())
    } else {
        (edition, b.to_string(), a.to_string())
    }
}

#[derive(Debug, Clone, Default)]
pub struct DateLookup {
    index: HashMap<PairKey, Vec<DateCandidate>>,
    pub rows: usize,
    pub skipped: usize,
}

impl DateLookup {
    pub fn from_table(table: &RawTable, norm: &Normalizers) -> Self {
        let cols = ColumnMap::detect(&table.headers, COLUMNS);
        let dates = DateParser::for_source(Source::Historical);
        let mut out = DateLookup {
            rows: table.len(),
            ..Default::default()
        };
        if !cols.has("date") || !cols.has("home_team") || !cols.has("away_team") {
            tracing::warn!(
                headers = ?table.headers,
                "date lookup lacks date or team columns; ignoring it"
            );
            out.skipped = table.len();
            return out;
        }

        for (position, row) in table.iter().enumerate() {
            let year = row.get(cols.get("year")).and_then(parse_edition);
            let Some(date) = dates.parse_opt(row.get(cols.get("date")), year) else {
                out.skipped += 1;
                continue;
            };
            let edition = year.or_else(|| {
                u16::try_from(date.year())
                    .ok()
                    .filter(|y| is_known_edition(*y))
            });
            let home = norm.teams.normalize_optional(row.get(cols.get("home_team")));
            let away = norm.teams.normalize_optional(row.get(cols.get("away_team")));
            let (Some(edition), Some(home), Some(away)) = (edition, home, away) else {
                out.skipped += 1;
                continue;
            };
            let round = row
                .get(cols.get("round"))
                .and_then(|label| norm.rounds.normalize(label).ok());

            let entry = out.index.entry(pair_key(edition, &home, &away)).or_default();
            // One candidate per distinct date, first occurrence wins.
            if !entry.iter().any(|c| c.date == date) {
                entry.push(DateCandidate {
                    date,
                    round,
                    position,
                });
            }
        }
        tracing::debug!(
            rows = out.rows,
            skipped = out.skipped,
            pairs = out.index.len(),
            "built historical date lookup"
        );
        out
    }

    pub fn candidates(&self, edition: u16, a: &str, b: &str) -> &[DateCandidate] {
        self.index
            .get(&pair_key(edition, a, b))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

fn round_compatible(record: Option<Round>, candidate: Option<Round>) -> bool {
    match (record, candidate) {
        (Some(r), Some(c)) => r == c,
        _ => true,
    }
}

/// One record awaiting a date: its round and its input position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pending {
    pub round: Option<Round>,
    pub position: usize,
}

/// Resolves every record of one `(edition, team pair)` group at once.
/// Output is aligned with `pending`.
pub fn resolve_group(
    pending: &[Pending],
    candidates: &[DateCandidate],
) -> Vec<Resolution<NaiveDate>> {
    if candidates.is_empty() {
        return vec![Resolution::NoMatch; pending.len()];
    }
    let ambiguous = || {
        vec![
            Resolution::Ambiguous {
                candidates: candidates.len()
            };
            pending.len()
        ]
    };

    let compatible = pending
        .iter()
        .map(|p| {
            candidates
                .iter()
                .filter(|c| round_compatible(p.round, c.round))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    // Each record has exactly one compatible candidate, none shared.
    if compatible.iter().all(|c| c.len() == 1) {
        let mut picked = compatible.iter().map(|c| c[0].position).collect::<Vec<_>>();
        picked.sort_unstable();
        picked.dedup();
        if picked.len() == pending.len() {
            return compatible
                .iter()
                .map(|c| Resolution::Resolved(c[0].date))
                .collect();
        }
    }

    // Equal counts: later rounds take later dates.
    if pending.len() > 1 && candidates.len() == pending.len() {
        let mut order = (0..pending.len()).collect::<Vec<_>>();
        order.sort_by_key(|&i| {
            (
                pending[i].round.map_or(Round::ALL.len(), |r| r as usize),
                pending[i].position,
            )
        });
        let mut by_date = candidates.to_vec();
        by_date.sort_by_key(|c| (c.date, c.position));

        let pairs_fit = order
            .iter()
            .zip(&by_date)
            .all(|(&i, c)| round_compatible(pending[i].round, c.round));
        if pairs_fit {
            let mut out = vec![Resolution::NoMatch; pending.len()];
            for (&i, c) in order.iter().zip(&by_date) {
                out[i] = Resolution::Resolved(c.date);
            }
            return out;
        }
    }

    ambiguous()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateEnrichmentReport {
    pub eligible: usize,
    pub resolved: usize,
    pub ambiguous: usize,
    pub no_match: usize,
    /// Records left undated and marked `needs_review`.
    pub flagged: Vec<IdentityKey>,
}

/// Fills `date` on historical records that lack one. Other records are untouched.
pub fn enrich_historical_dates(
    records: &mut [MatchRecord],
    lookup: &DateLookup,
) -> DateEnrichmentReport {
    let mut report = DateEnrichmentReport::default();

    let mut groups: BTreeMap<PairKey, Vec<usize>> = BTreeMap::new();
    for (idx, rec) in records.iter().enumerate() {
        if rec.source == Source::Historical && rec.date.is_none() {
            groups
                .entry(pair_key(rec.edition, &rec.home_team, &rec.away_team))
                .or_default()
                .push(idx);
        }
    }

    for ((edition, a, b), members) in &groups {
        let pending = members
            .iter()
            .map(|&idx| Pending {
                round: records[idx].round,
                position: idx,
            })
            .collect::<Vec<_>>();
        let candidates = lookup.candidates(*edition, a, b);
        let outcomes = resolve_group(&pending, candidates);

        for (&idx, outcome) in members.iter().zip(outcomes) {
            report.eligible += 1;
            let rec = &mut records[idx];
            match outcome {
                Resolution::Resolved(date) => {
                    rec.date = Some(date);
                    report.resolved += 1;
                }
                Resolution::Ambiguous { candidates } => {
                    rec.needs_review = true;
                    report.ambiguous += 1;
                    report.flagged.push(rec.identity_key());
                    tracing::warn!(
                        edition,
                        home = %rec.home_team,
                        away = %rec.away_team,
                        candidates,
                        "ambiguous historical date; left for review"
                    );
                }
                Resolution::NoMatch => report.no_match += 1,
            }
        }
    }

    tracing::info!(
        eligible = report.eligible,
        resolved = report.resolved,
        ambiguous = report.ambiguous,
        no_match = report.no_match,
        "historical date enrichment"
    );
    report
}
