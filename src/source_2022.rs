use crate::dates::DateParser;
use crate::raw::{ColumnMap, ColumnSpec, RawRow, RawTable};
use crate::record::{MatchRecord, Source, parse_edition};
use crate::score::{parse_goals, parse_score_text};
use crate::transform::{DropReason, Normalizers, SourceBatch, SourceTransformer, positional_notes};

const DEFAULT_EDITION: u16 = 2022;

// Column names drift between revisions of this file ("number of goals team1"
// vs "home_score", "category" vs "stage", or one "score" column). Goal columns
// are listed first so their substring search runs before the combined score
// and the broader team searches.
const COLUMNS: &[ColumnSpec] = &[
    ColumnSpec {
        field: "home_goals",
        exact: &["number of goals team1", "home_score", "home_goals", "team1_score"],
        contains: &["goals team1", "score team1", "home score", "home goal"],
        position: None,
    },
    ColumnSpec {
        field: "away_goals",
        exact: &["number of goals team2", "away_score", "away_goals", "team2_score"],
        contains: &["goals team2", "score team2", "away score", "away goal"],
        position: None,
    },
    ColumnSpec {
        field: "score",
        exact: &["score", "result", "ft"],
        contains: &["score"],
        position: None,
    },
    ColumnSpec {
        field: "home_team",
        exact: &["team1", "home_team", "home team", "home"],
        contains: &["home team", "team1"],
        position: None,
    },
    ColumnSpec {
        field: "away_team",
        exact: &["team2", "away_team", "away team", "away"],
        contains: &["away team", "team2"],
        position: None,
    },
    ColumnSpec {
        field: "date",
        exact: &["date", "match_date"],
        contains: &["date"],
        position: None,
    },
    ColumnSpec {
        field: "year",
        exact: &["year", "edition"],
        contains: &["year"],
        position: None,
    },
    ColumnSpec {
        field: "round",
        exact: &["category", "round", "stage"],
        contains: &["round", "stage", "category", "phase"],
        position: None,
    },
    ColumnSpec {
        field: "city",
        exact: &["city"],
        contains: &["city"],
        position: None,
    },
    ColumnSpec {
        field: "stadium",
        exact: &["venue", "stadium"],
        contains: &["venue", "stadium"],
        position: None,
    },
];

pub struct Matches2022Transformer<'a> {
    table: &'a RawTable,
}

impl<'a> Matches2022Transformer<'a> {
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

        // A blank edition cell falls back to the default; garbage does not.
        let edition = match row.get(cols.get("year")) {
            Some(raw) => parse_edition(raw)
                .ok_or_else(|| DropReason::MissingEdition(Some(raw.to_string())))?,
            None => DEFAULT_EDITION,
        };

        let mut home_score = row.get(cols.get("home_goals")).and_then(parse_goals);
        let mut away_score = row.get(cols.get("away_goals")).and_then(parse_goals);
        if (home_score.is_none() || away_score.is_none())
            && let Some(score) = row.get(cols.get("score"))
        {
            (home_score, away_score) = parse_score_text(score);
        }

        let mut rec = MatchRecord::new(
            Source::Matches2022,
            edition,
            home_team,
            away_team,
            home_score,
            away_score,
        );
        rec.date = dates.parse_opt(row.get(cols.get("date")), Some(edition));
        (rec.round, rec.unmapped_round) = norm.rounds.classify(row.get(cols.get("round")));
        rec.city = norm.cities.normalize_optional(row.get(cols.get("city")));
        rec.stadium = norm.stadiums.normalize_optional(row.get(cols.get("stadium")));
        Ok(rec)
    }
}

impl SourceTransformer for Matches2022Transformer<'_> {
    fn source(&self) -> Source {
        Source::Matches2022
    }

    fn transform(&self, norm: &Normalizers) -> SourceBatch {
        let cols = ColumnMap::detect(&self.table.headers, COLUMNS);
        let dates = DateParser::for_source(Source::Matches2022);
        let mut batch = SourceBatch::new(self.source());
        batch.notes = positional_notes(&cols.positional);
        for field in ["home_team", "away_team", "date"] {
            if !cols.has(field) {
                batch.notes.push(format!("no column detected for {field}"));
            }
        }
        let per_side = cols.has("home_goals") && cols.has("away_goals");
        if !per_side && !cols.has("score") {
            batch.notes.push("no column detected for scores".to_string());
        }

        for (idx, row) in self.table.iter().enumerate() {
            batch.push(idx, self.transform_row(row, &cols, &dates, norm));
        }
        batch
    }
}
