use crate::dates::DateParser;
use crate::raw::{ColumnMap, ColumnSpec, RawRow, RawTable};
use crate::record::{MatchRecord, Source, parse_edition};
use crate::score::parse_score_text;
use crate::transform::{DropReason, Normalizers, SourceBatch, SourceTransformer, positional_notes};

// Layout of matches_1930-2010.csv: round, date?, year, team1, team2, score, venue.
const COLUMNS: &[ColumnSpec] = &[
    ColumnSpec {
        field: "score",
        exact: &["score", "result", "ft"],
        contains: &["score"],
        position: None,
    },
    ColumnSpec {
        field: "home_team",
        exact: &["team1", "home_team", "home team"],
        contains: &["team1", "home"],
        position: Some(3),
    },
    ColumnSpec {
        field: "away_team",
        exact: &["team2", "away_team", "away team"],
        contains: &["team2", "away"],
        position: Some(4),
    },
    ColumnSpec {
        field: "year",
        exact: &["year", "edition"],
        contains: &["year"],
        position: None,
    },
    ColumnSpec {
        field: "date",
        exact: &["date"],
        contains: &["date"],
        position: None,
    },
    ColumnSpec {
        field: "round",
        exact: &["round", "stage"],
        contains: &["round", "stage"],
        position: Some(1),
    },
    ColumnSpec {
        field: "venue",
        exact: &["venue", "city"],
        contains: &["venue", "city"],
        position: Some(6),
    },
];

pub struct HistoricalTransformer<'a> {
    table: &'a RawTable,
}

impl<'a> HistoricalTransformer<'a> {
    pub fn new(table: &'a RawTable) -> Self {
        Self { table }
    }

    fn transform_row(
        &self,
        row: RawRow<'_>,
        cols: &ColumnMap,
        dates: &DateParser,
        norm: &Normalizers,
    ) -> Result<MatchRecord, DropReason> {
        let (home_team, away_team) =
            norm.team_pair(row.get(cols.get("home_team")), row.get(cols.get("away_team")))?;

        let raw_year = row.get(cols.get("year"));
        let edition = raw_year
            .and_then(parse_edition)
            .ok_or_else(|| DropReason::MissingEdition(raw_year.map(str::to_string)))?;

        let (home_score, away_score) = match row.get(cols.get("score")) {
            Some(raw) => {
                let pair = parse_score_text(raw);
                if pair.0.is_none() {
                    tracing::debug!(score = raw, "unparseable historical score");
                }
                pair
            }
            None => (None, None),
        };

        let mut rec = MatchRecord::new(
            Source::Historical,
            edition,
            home_team,
            away_team,
            home_score,
            away_score,
        );
        rec.date = dates.parse_opt(row.get(cols.get("date")), Some(edition));
        (rec.round, rec.unmapped_round) = norm.rounds.classify(row.get(cols.get("round")));

        // "Estadio Centenario, Montevideo" carries both stadium and city.
        if let Some(venue) = row.get(cols.get("venue")) {
            match venue.rsplit_once(',') {
                Some((stadium, city)) => {
                    rec.stadium = norm.stadiums.normalize_optional(Some(stadium));
                    rec.city = norm.cities.normalize_optional(Some(city));
                }
                None => rec.city = norm.cities.normalize_optional(Some(venue)),
            }
        }
        Ok(rec)
    }
}

impl SourceTransformer for HistoricalTransformer<'_> {
    fn source(&self) -> Source {
        Source::Historical
    }

    fn transform(&self, norm: &Normalizers) -> SourceBatch {
        let cols = ColumnMap::detect(&self.table.headers, COLUMNS);
        let dates = DateParser::for_source(Source::Historical);
        let mut batch = SourceBatch::new(self.source());
        batch.notes = positional_notes(&cols.positional);
        if !cols.has("year") {
            batch.notes.push("no year column; every row lacks an edition".to_string());
        }

        for (idx, row) in self.table.iter().enumerate() {
            batch.push(idx, self.transform_row(row, &cols, &dates, norm));
        }
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReferenceTables;
    use crate::record::{MatchResult, Round};

    fn norm() -> Normalizers {
        Normalizers::from_tables(&ReferenceTables::builtin())
    }

    #[test]
    fn maps_rows_and_defers_dates() {
        let table = RawTable::from_rows(
            &["round", "year", "team1", "team2", "score", "venue"],
            &[
                &["Group 1", "1930", "France", "Mexico", "4-1", "Montevideo"],
                &["Final", "1954", "West Germany", "Hungary", "3–2", "Wankdorf Stadium, BERNE"],
                &["Round of 16", "1938", "Cuba", "Romania", "invalid", ""],
            ],
        );
        let batch = HistoricalTransformer::new(&table).transform(&norm());
        assert_eq!(batch.records.len(), 3);
        assert!(batch.dropped.is_empty());

        let first = &batch.records[0];
        assert_eq!(first.edition, 1930);
        assert_eq!(first.round, Some(Round::GroupStage));
        assert_eq!(first.result, MatchResult::HomeWin);
        assert_eq!(first.city.as_deref(), Some("Montevideo"));
        assert_eq!(first.date, None);

        let final_ = &batch.records[1];
        assert_eq!(final_.home_team, "Germany");
        assert_eq!((final_.home_score, final_.away_score), (Some(3), Some(2)));
        assert_eq!(final_.city.as_deref(), Some("Berne"));
        assert_eq!(final_.stadium.as_deref(), Some("Wankdorf Stadium"));

        let third = &batch.records[2];
        assert_eq!(third.result, MatchResult::Unknown);
        assert_eq!(third.city, None);
    }

    #[test]
    fn drops_rows_without_teams_or_edition() {
        let table = RawTable::from_rows(
            &["round", "year", "team1", "team2", "score"],
            &[
                &["Final", "1930", "", "Argentina", "4-2"],
                &["Final", "1931", "Uruguay", "Argentina", "4-2"],
                &["Final", "1930", "Uruguay", "12", "4-2"],
            ],
        );
        let batch = HistoricalTransformer::new(&table).transform(&norm());
        assert!(batch.records.is_empty());
        assert_eq!(batch.dropped.len(), 3);
        assert_eq!(batch.dropped[1].position, 1);
        assert_eq!(
            batch.dropped[1].reason,
            DropReason::MissingEdition(Some("1931".to_string()))
        );
        assert!((batch.drop_rate() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unmapped_rounds_are_kept_raw() {
        let table = RawTable::from_rows(
            &["round", "year", "team1", "team2", "score"],
            &[&["Second round", "1974", "Brazil", "Argentina", "2-1"]],
        );
        let batch = HistoricalTransformer::new(&table).transform(&norm());
        let rec = &batch.records[0];
        assert_eq!(rec.round, None);
        assert_eq!(rec.unmapped_round.as_deref(), Some("Second round"));
    }
}
