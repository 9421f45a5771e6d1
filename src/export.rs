use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::record::MatchRecord;

pub const CANONICAL_COLUMNS: [&str; 11] = [
    "edition",
    "date",
    "round",
    "home_team",
    "away_team",
    "home_score",
    "away_score",
    "result",
    "city",
    "stadium",
    "source",
];

// Field order is the column order.
#[derive(Debug, Serialize)]
struct CanonicalRow<'a> {
    edition: u16,
    date: Option<String>,
    round: Option<&'static str>,
    home_team: &'a str,
    away_team: &'a str,
    home_score: Option<u32>,
    away_score: Option<u32>,
    result: &'static str,
    city: Option<&'a str>,
    stadium: Option<&'a str>,
    source: &'static str,
}

impl<'a> From<&'a MatchRecord> for CanonicalRow<'a> {
    fn from(rec: &'a MatchRecord) -> Self {
        Self {
            edition: rec.edition,
            date: rec.date.map(|d| d.format("%Y-%m-%d").to_string()),
            // Unmapped labels stay out of the round column.
            round: rec.round.map(|r| r.label()),
            home_team: &rec.home_team,
            away_team: &rec.away_team,
            home_score: rec.home_score,
            away_score: rec.away_score,
            result: rec.result.as_str(),
            city: rec.city.as_deref(),
            stadium: rec.stadium.as_deref(),
            source: rec.source.tag(),
        }
    }
}

pub fn write_canonical<W: io::Write>(writer: W, records: &[MatchRecord]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    if records.is_empty() {
        wtr.write_record(CANONICAL_COLUMNS)?;
    }
    for rec in records {
        wtr.serialize(CanonicalRow::from(rec))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn to_canonical_string(records: &[MatchRecord]) -> Result<String> {
    let mut buf = Vec::new();
    write_canonical(&mut buf, records)?;
    String::from_utf8(buf).context("canonical csv is not utf-8")
}

pub fn write_canonical_file(path: &Path, records: &[MatchRecord]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let file = fs::File::create(path).with_context(|| format!("create {}", path.display()))?;
    write_canonical(io::BufWriter::new(file), records)
        .with_context(|| format!("write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::record::{Round, Source};

    #[test]
    fn writes_fixed_columns() {
        let mut rec = MatchRecord::new(
            Source::Matches2014,
            2014,
            "Germany".to_string(),
            "Argentina".to_string(),
            Some(1),
            Some(0),
        );
        rec.date = NaiveDate::from_ymd_opt(2014, 7, 13);
        rec.round = Some(Round::Final);
        rec.city = Some("Rio de Janeiro".to_string());

        let mut undated = MatchRecord::new(
            Source::Historical,
            1930,
            "Uruguay".to_string(),
            "Argentina".to_string(),
            None,
            None,
        );
        undated.unmapped_round = Some("Replay".to_string());

        let out = to_canonical_string(&[undated, rec]).expect("csv");
        let lines = out.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], CANONICAL_COLUMNS.join(","));
        assert_eq!(lines[1], "1930,,,Uruguay,Argentina,,,unknown,,,csv_1930_2010");
        assert_eq!(
            lines[2],
            "2014,2014-07-13,Final,Germany,Argentina,1,0,home_win,Rio de Janeiro,,csv_2014"
        );
    }

    #[test]
    fn empty_output_still_has_a_header() {
        let out = to_canonical_string(&[]).expect("csv");
        assert_eq!(out.trim_end(), CANONICAL_COLUMNS.join(","));
    }
}
