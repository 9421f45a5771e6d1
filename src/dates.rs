use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::record::Source;

static COMPACT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})\s*([A-Za-z]{3,9})\s*(\d{2})$").expect("compact date pattern is valid")
});

/// One recognised date shape. Candidates are tried in the order a source lists them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    /// "13 Jun 2014 - 17:00"
    KickoffTimestamp,
    /// "2018-06-14T18:00:00+03:00" or "2018-06-14 18:00:00"
    IsoDateTime,
    /// "2018-06-14"
    IsoDate,
    /// "14 Jun 2014", "14 June 2014"
    DayMonthYear,
    /// "14/06/2014"
    SlashDayMonthYear,
    /// "20 Nov", "20 November"; year borrowed from the edition
    DayMonth,
    /// "20NOV22"; century borrowed from the edition
    CompactDayMonthYear,
}

const HISTORICAL_FORMATS: &[DateFormat] = &[
    DateFormat::IsoDate,
    DateFormat::SlashDayMonthYear,
    DateFormat::DayMonthYear,
    DateFormat::IsoDateTime,
];

const MATCHES_2014_FORMATS: &[DateFormat] = &[
    DateFormat::KickoffTimestamp,
    DateFormat::DayMonthYear,
    DateFormat::IsoDateTime,
    DateFormat::IsoDate,
];

const BRACKET_2018_FORMATS: &[DateFormat] = &[DateFormat::IsoDateTime, DateFormat::IsoDate];

const MATCHES_2022_FORMATS: &[DateFormat] = &[
    DateFormat::CompactDayMonthYear,
    DateFormat::DayMonthYear,
    DateFormat::DayMonth,
    DateFormat::IsoDate,
    DateFormat::SlashDayMonthYear,
    DateFormat::IsoDateTime,
];

#[derive(Debug, Clone, Copy)]
pub struct DateParser {
    candidates: &'static [DateFormat],
}

impl DateParser {
    pub fn for_source(source: Source) -> Self {
        let candidates = match source {
            Source::Historical => HISTORICAL_FORMATS,
            Source::Matches2014 => MATCHES_2014_FORMATS,
            Source::Bracket2018 => BRACKET_2018_FORMATS,
            Source::Matches2022 => MATCHES_2022_FORMATS,
        };
        Self { candidates }
    }

    pub fn parse(&self, raw: &str, edition: Option<u16>) -> Option<NaiveDate> {
        let text = raw.trim().trim_matches('"').trim();
        if text.is_empty() {
            return None;
        }
        self.candidates
            .iter()
            .find_map(|format| parse_as(*format, text, edition))
    }

    pub fn parse_opt(&self, raw: Option<&str>, edition: Option<u16>) -> Option<NaiveDate> {
        self.parse(raw?, edition)
    }
}

pub fn parse_as(format: DateFormat, text: &str, edition: Option<u16>) -> Option<NaiveDate> {
    match format {
        DateFormat::KickoffTimestamp => {
            let (date_part, _) = text.split_once(" - ")?;
            parse_day_month_year(date_part.trim())
        }
        DateFormat::IsoDateTime => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
                // Local calendar day as written, not shifted to UTC.
                return Some(dt.naive_local().date());
            }
            for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
                if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
                    return Some(dt.date());
                }
            }
            None
        }
        DateFormat::IsoDate => NaiveDate::parse_from_str(text, "%Y-%m-%d").ok(),
        DateFormat::DayMonthYear => parse_day_month_year(text),
        DateFormat::SlashDayMonthYear => NaiveDate::parse_from_str(text, "%d/%m/%Y").ok(),
        DateFormat::DayMonth => {
            let year = edition?;
            if text.split_whitespace().count() != 2 {
                return None;
            }
            parse_day_month_year(&format!("{text} {year}"))
        }
        DateFormat::CompactDayMonthYear => {
            let caps = COMPACT_RE.captures(text)?;
            let yy = caps[3].parse::<u16>().ok()?;
            let century = edition.map(|e| e - e % 100).unwrap_or(2000);
            let year = century + yy;
            parse_day_month_year(&format!("{} {} {year}", &caps[1], &caps[2]))
        }
    }
}

fn parse_day_month_year(text: &str) -> Option<NaiveDate> {
    ["%d %b %Y", "%d %B %Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}
