use std::collections::HashMap;

use chrono::NaiveDate;

use crate::dates::DateParser;
use crate::enrich_dates::Resolution;
use crate::raw::{ColumnMap, ColumnSpec, RawTable};
use crate::record::{IdentityKey, MatchRecord, Source};
use crate::transform::Normalizers;

const COLUMNS: &[ColumnSpec] = &[
    ColumnSpec {
        field: "city",
        exact: &["city", "ville", "host city"],
        contains: &["city"],
        position: None,
    },
    ColumnSpec {
        field: "date",
        exact: &["date", "match_date"],
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
];

/// City lookup for the 2022 source, keyed by `(date, home, away)`, by teams
/// alone when the table has no dates, or by date alone when it has no teams.
#[derive(Debug, Clone, Default)]
pub struct CityLookup {
    by_match: HashMap<(NaiveDate, String, String), Vec<String>>,
    by_teams: HashMap<(String, String), Vec<String>>,
    by_date: HashMap<NaiveDate, Vec<String>>,
    has_dates: bool,
    has_teams: bool,
    pub rows: usize,
    pub skipped: usize,
}

impl CityLookup {
    pub fn from_table(table: &RawTable, norm: &Normalizers, edition: u16) -> Self {
        let cols = ColumnMap::detect(&table.headers, COLUMNS);
        let dates = DateParser::for_source(Source::Matches2022);
        let mut out = CityLookup {
            has_dates: cols.has("date"),
            has_teams: cols.has("home_team") && cols.has("away_team"),
            rows: table.len(),
            ..Default::default()
        };
        if !cols.has("city") || !(out.has_dates || out.has_teams) {
            tracing::warn!(headers = ?table.headers, "city lookup lacks usable columns; ignoring it");
            out.skipped = table.len();
            return out;
        }

        for row in table.iter() {
            let Some(city) = norm.cities.normalize_optional(row.get(cols.get("city"))) else {
                out.skipped += 1;
                continue;
            };
            let date = dates.parse_opt(row.get(cols.get("date")), Some(edition));
            let home = norm.teams.normalize_optional(row.get(cols.get("home_team")));
            let away = norm.teams.normalize_optional(row.get(cols.get("away_team")));

            let mut indexed = false;
            if let (Some(home), Some(away)) = (home, away) {
                if let Some(date) = date {
                    push_distinct(
                        out.by_match.entry((date, home.clone(), away.clone())).or_default(),
                        &city,
                    );
                }
                push_distinct(out.by_teams.entry((home, away)).or_default(), &city);
                indexed = true;
            }
            if let Some(date) = date {
                push_distinct(out.by_date.entry(date).or_default(), &city);
                indexed = true;
            }
            if !indexed {
                out.skipped += 1;
            }
        }
        out
    }

    // Exact team order first, then reversed.
    fn cities_for(&self, rec: &MatchRecord) -> &[String] {
        let home = rec.home_team.clone();
        let away = rec.away_team.clone();
        if self.has_teams {
            let hit = match rec.date {
                Some(date) if self.has_dates => self
                    .by_match
                    .get(&(date, home.clone(), away.clone()))
                    .or_else(|| self.by_match.get(&(date, away, home))),
                _ => self
                    .by_teams
                    .get(&(home.clone(), away.clone()))
                    .or_else(|| self.by_teams.get(&(away, home))),
            };
            return hit.map(Vec::as_slice).unwrap_or_default();
        }
        match rec.date {
            Some(date) => self.by_date.get(&date).map(Vec::as_slice).unwrap_or_default(),
            None => &[],
        }
    }

    pub fn resolve(&self, rec: &MatchRecord) -> Resolution<String> {
        match self.cities_for(rec) {
            [] => Resolution::NoMatch,
            [city] => Resolution::Resolved(city.clone()),
            many => Resolution::Ambiguous {
                candidates: many.len(),
            },
        }
    }
}

fn push_distinct(cities: &mut Vec<String>, city: &str) {
    if !cities.iter().any(|c| c == city) {
        cities.push(city.to_string());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CityEnrichmentReport {
    pub eligible: usize,
    pub resolved: usize,
    pub ambiguous: usize,
    pub no_match: usize,
    pub unresolved: Vec<IdentityKey>,
}

/// Fills `city` on 2022 records that lack one; never guesses between candidates.
pub fn enrich_cities(records: &mut [MatchRecord], lookup: &CityLookup) -> CityEnrichmentReport {
    let mut report = CityEnrichmentReport::default();
    for rec in records
        .iter_mut()
        .filter(|r| r.source == Source::Matches2022 && r.city.is_none())
    {
        report.eligible += 1;
        match lookup.resolve(rec) {
            Resolution::Resolved(city) => {
                rec.city = Some(city);
                report.resolved += 1;
            }
            Resolution::Ambiguous { candidates } => {
                report.ambiguous += 1;
                report.unresolved.push(rec.identity_key());
                tracing::warn!(
                    home = %rec.home_team,
                    away = %rec.away_team,
                    candidates,
                    "several cities match; left absent"
                );
            }
            Resolution::NoMatch => {
                report.no_match += 1;
                report.unresolved.push(rec.identity_key());
            }
        }
    }
    tracing::info!(
        eligible = report.eligible,
        resolved = report.resolved,
        ambiguous = report.ambiguous,
        no_match = report.no_match,
        "2022 city enrichment"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReferenceTables;

    fn norm() -> Normalizers {
        Normalizers::from_tables(&ReferenceTables::builtin())
    }

    fn record(home: &str, away: &str, date: Option<NaiveDate>) -> MatchRecord {
        let mut rec = MatchRecord::new(
            Source::Matches2022,
            2022,
            home.to_string(),
            away.to_string(),
            Some(1),
            Some(0),
        );
        rec.date = date;
        rec
    }

    fn ymd(m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2022, m, d)
    }

    #[test]
    fn dated_lookup_separates_repeat_meetings() {
        let table = RawTable::from_rows(
            &["date", "home_team", "away_team", "city"],
            &[
                &["23 NOV 2022", "Morocco", "Croatia", "Al Khor"],
                &["17 DEC 2022", "Croatia", "Morocco", "Al Rayyan"],
            ],
        );
        let lookup = CityLookup::from_table(&table, &norm(), 2022);
        let mut records = vec![
            record("Croatia", "Morocco", ymd(12, 17)),
            record("Croatia", "Morocco", ymd(11, 23)),
            record("Croatia", "Morocco", None),
        ];
        let report = enrich_cities(&mut records, &lookup);
        assert_eq!(records[0].city.as_deref(), Some("Al Rayyan"));
        assert_eq!(records[1].city.as_deref(), Some("Al Khor"));
        // Undated record falls back to the exact team order.
        assert_eq!(records[2].city.as_deref(), Some("Al Rayyan"));
        assert_eq!(report.resolved, 3);
    }

    #[test]
    fn several_cities_are_never_guessed() {
        let table = RawTable::from_rows(
            &["home_team", "away_team", "city"],
            &[
                &["Qatar", "Ecuador", "Al Khor"],
                &["Qatar", "Ecuador", "Doha"],
                &["England", "IR Iran", "Al Rayyan"],
            ],
        );
        let lookup = CityLookup::from_table(&table, &norm(), 2022);
        let mut records = vec![
            record("Qatar", "Ecuador", ymd(11, 20)),
            record("Iran", "England", ymd(11, 21)),
            record("Wales", "USA", ymd(11, 21)),
        ];
        let report = enrich_cities(&mut records, &lookup);
        assert_eq!(records[0].city, None);
        assert_eq!(records[1].city.as_deref(), Some("Al Rayyan"));
        assert_eq!(records[2].city, None);
        assert_eq!(report.ambiguous, 1);
        assert_eq!(report.no_match, 1);
        assert_eq!(report.unresolved.len(), 2);
    }

    #[test]
    fn date_only_lookup() {
        let table = RawTable::from_rows(
            &["date", "city"],
            &[&["20 NOV 2022", "Al Khor"], &["21 NOV 2022", "Doha"], &["21 NOV 2022", "Al Rayyan"]],
        );
        let lookup = CityLookup::from_table(&table, &norm(), 2022);
        assert_eq!(
            lookup.resolve(&record("Qatar", "Ecuador", ymd(11, 20))),
            Resolution::Resolved("Al Khor".to_string())
        );
        assert_eq!(
            lookup.resolve(&record("England", "Iran", ymd(11, 21))),
            Resolution::Ambiguous { candidates: 2 }
        );
        assert_eq!(lookup.resolve(&record("England", "Iran", None)), Resolution::NoMatch);
    }

    #[test]
    fn other_sources_and_known_cities_are_untouched() {
        let table = RawTable::from_rows(
            &["home_team", "away_team", "city"],
            &[&["Qatar", "Ecuador", "Al Khor"]],
        );
        let lookup = CityLookup::from_table(&table, &norm(), 2022);
        let mut known = record("Qatar", "Ecuador", None);
        known.city = Some("Doha".to_string());
        let mut other = record("Qatar", "Ecuador", None);
        other.source = Source::Matches2014;
        let mut records = vec![known, other];
        let report = enrich_cities(&mut records, &lookup);
        assert_eq!(report.eligible, 0);
        assert_eq!(records[0].city.as_deref(), Some("Doha"));
        assert_eq!(records[1].city, None);
    }
}
