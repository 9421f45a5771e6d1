use crate::dates::DateParser;
use crate::raw::{ColumnMap, ColumnSpec, RawRow, RawTable};
use crate::record::{MatchRecord, Source, parse_edition};
use crate::score::parse_goals;
use crate::transform::{DropReason, Normalizers, SourceBatch, SourceTransformer, positional_notes};

const DEFAULT_EDITION: u16 = 2014;

// WorldCupMatches2014.csv: Year, Datetime, Stage, Stadium, City, Home Team Name,
// Home Team Goals, Away Team Goals, Away Team Name, ...
const COLUMNS: &[ColumnSpec] = &[
    ColumnSpec {
        field: "home_goals",
        exact: &["home team goals", "home_goals", "home_score"],
        contains: &["home team goals", "home goals"],
        position: Some(6),
    },
    ColumnSpec {
        field: "away_goals",
        exact: &["away team goals", "away_goals", "away_score"],
        contains: &["away team goals", "away goals"],
        position: Some(7),
    },
    ColumnSpec {
        field: "home_team",
        exact: &["home team name", "home_team", "home team"],
        contains: &["home team", "home"],
        position: Some(5),
    },
    ColumnSpec {
        field: "away_team",
        exact: &["away team name", "away_team", "away team"],
        contains: &["away team", "away"],
        position: Some(8),
    },
    ColumnSpec {
        field: "year",
        exact: &["year"],
        contains: &["year"],
        position: Some(0),
    },
    ColumnSpec {
        field: "datetime",
        exact: &["datetime", "date"],
        contains: &["date"],
        position: Some(1),
    },
    ColumnSpec {
        field: "stage",
        exact: &["stage", "round"],
        contains: &["stage", "round"],
        position: Some(2),
    },
    ColumnSpec {
        field: "stadium",
        exact: &["stadium"],
        contains: &["stadium"],
        position: Some(3),
    },
    ColumnSpec {
        field: "city",
        exact: &["city"],
        contains: &["city"],
        position: Some(4),
    },
];

pub struct Matches2014Transformer<'a> {
    table: &'a RawTable,
}

impl<'a> Matches2014Transformer<'a> {
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

        let edition = if cols.has("year") {
            let raw_year = row.get(cols.get("year"));
            raw_year
                .and_then(parse_edition)
                .ok_or_else(|| DropReason::MissingEdition(raw_year.map(str::to_string)))?
        } else {
            DEFAULT_EDITION
        };

        let home_score = row.get(cols.get("home_goals")).and_then(parse_goals);
        let away_score = row.get(cols.get("away_goals")).and_then(parse_goals);

        let mut rec = MatchRecord::new(
            Source::Matches2014,
            edition,
            home_team,
            away_team,
            home_score,
            away_score,
        );
        let raw_date = row.get(cols.get("datetime"));
        rec.date = dates.parse_opt(raw_date, Some(edition));
        if rec.date.is_none()
            && let Some(raw) = raw_date
        {
            tracing::debug!(date = raw, "unparseable 2014 kickoff timestamp");
        }
        (rec.round, rec.unmapped_round) = norm.rounds.classify(row.get(cols.get("stage")));
        rec.city = norm.cities.normalize_optional(row.get(cols.get("city")));
        rec.stadium = norm.stadiums.normalize_optional(row.get(cols.get("stadium")));
        Ok(rec)
    }
}

impl SourceTransformer for Matches2014Transformer<'_> {
    fn source(&self) -> Source {
        Source::Matches2014
    }

    fn transform(&self, norm: &Normalizers) -> SourceBatch {
        let cols = ColumnMap::detect(&self.table.headers, COLUMNS);
        let dates = DateParser::for_source(Source::Matches2014);
        let mut batch = SourceBatch::new(self.source());
        batch.notes = positional_notes(&cols.positional);

        for (idx, row) in self.table.iter().enumerate() {
            batch.push(idx, self.transform_row(row, &cols, &dates, norm));
        }
        batch
    }
}
