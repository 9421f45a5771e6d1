use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const KNOWN_EDITIONS: &[u16] = &[
    1930, 1934, 1938, 1950, 1954, 1958, 1962, 1966, 1970, 1974, 1978, 1982, 1986, 1990, 1994,
    1998, 2002, 2006, 2010, 2014, 2018, 2022,
];

pub const UNKNOWN_NAME: &str = "Unknown";

pub fn is_known_edition(year: u16) -> bool {
    KNOWN_EDITIONS.binary_search(&year).is_ok()
}

/// Parses "1930", " 1930 " or "1930.0" into a known tournament year.
pub fn parse_edition(raw: &str) -> Option<u16> {
    let trimmed = raw.trim().trim_matches('"');
    let digits = trimmed.strip_suffix(".0").unwrap_or(trimmed);
    let year = digits.parse::<u16>().ok()?;
    is_known_edition(year).then_some(year)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Source {
    Historical,
    Matches2014,
    Bracket2018,
    Matches2022,
}

impl Source {
    pub const ALL: [Source; 4] = [
        Source::Historical,
        Source::Matches2014,
        Source::Bracket2018,
        Source::Matches2022,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Source::Historical => "csv_1930_2010",
            Source::Matches2014 => "csv_2014",
            Source::Bracket2018 => "json_2018",
            Source::Matches2022 => "csv_2022",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Source> {
        Source::ALL.into_iter().find(|s| s.tag() == tag.trim())
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Tournament phase. Variant order is the canonical round order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Round {
    GroupStage,
    RoundOf16,
    QuarterFinal,
    SemiFinal,
    ThirdPlace,
    Final,
}

impl Round {
    pub const ALL: [Round; 6] = [
        Round::GroupStage,
        Round::RoundOf16,
        Round::QuarterFinal,
        Round::SemiFinal,
        Round::ThirdPlace,
        Round::Final,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Round::GroupStage => "Group Stage",
            Round::RoundOf16 => "Round of 16",
            Round::QuarterFinal => "Quarter-finals",
            Round::SemiFinal => "Semi-finals",
            Round::ThirdPlace => "Third Place",
            Round::Final => "Final",
        }
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchResult {
    HomeWin,
    AwayWin,
    Draw,
    Unknown,
}

impl MatchResult {
    pub fn from_scores(home: Option<u32>, away: Option<u32>) -> Self {
        let (Some(home), Some(away)) = (home, away) else {
            return MatchResult::Unknown;
        };
        match home.cmp(&away) {
            Ordering::Greater => MatchResult::HomeWin,
            Ordering::Less => MatchResult::AwayWin,
            Ordering::Equal => MatchResult::Draw,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MatchResult::HomeWin => "home_win",
            MatchResult::AwayWin => "away_win",
            MatchResult::Draw => "draw",
            MatchResult::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub edition: u16,
    pub date: Option<NaiveDate>,
    pub round: Option<Round>,
    /// Raw label kept when the round could not be mapped.
    pub unmapped_round: Option<String>,
    pub home_team: String,
    pub away_team: String,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    pub result: MatchResult,
    pub city: Option<String>,
    pub stadium: Option<String>,
    pub source: Source,
    pub needs_review: bool,
}

impl MatchRecord {
    pub fn new(
        source: Source,
        edition: u16,
        home_team: String,
        away_team: String,
        home_score: Option<u32>,
        away_score: Option<u32>,
    ) -> Self {
        // A half-known score is no score.
        let (home_score, away_score) = match (home_score, away_score) {
            (Some(h), Some(a)) => (Some(h), Some(a)),
            _ => (None, None),
        };
        Self {
            edition,
            date: None,
            round: None,
            unmapped_round: None,
            home_team,
            away_team,
            home_score,
            away_score,
            result: MatchResult::from_scores(home_score, away_score),
            city: None,
            stadium: None,
            source,
            needs_review: false,
        }
    }

    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey {
            edition: self.edition,
            date: self.date,
            home_team: self.home_team.clone(),
            away_team: self.away_team.clone(),
        }
    }

    pub fn has_consistent_result(&self) -> bool {
        self.result == MatchResult::from_scores(self.home_score, self.away_score)
    }

    /// Canonical sort: edition, dated rows before undated, round order
    /// (unmapped last), home team, then away team and source.
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.edition
            .cmp(&other.edition)
            .then_with(|| cmp_date_absent_last(self.date, other.date))
            .then_with(|| cmp_round_unmapped_last(self.round, other.round))
            .then_with(|| self.home_team.cmp(&other.home_team))
            .then_with(|| self.away_team.cmp(&other.away_team))
            .then_with(|| self.source.cmp(&other.source))
    }
}

/// `(edition, date, home_team, away_team)`; with `date == None` this is the
/// degraded `(edition, home_team, away_team)` key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey {
    pub edition: u16,
    pub date: Option<NaiveDate>,
    pub home_team: String,
    pub away_team: String,
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.date {
            Some(date) => write!(
                f,
                "{} {} {} vs {}",
                self.edition, date, self.home_team, self.away_team
            ),
            None => write!(
                f,
                "{} (no date) {} vs {}",
                self.edition, self.home_team, self.away_team
            ),
        }
    }
}

fn cmp_date_absent_last(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn cmp_round_unmapped_last(a: Option<Round>, b: Option<Round>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_follows_scores() {
        assert_eq!(MatchResult::from_scores(Some(2), Some(1)), MatchResult::HomeWin);
        assert_eq!(MatchResult::from_scores(Some(0), Some(3)), MatchResult::AwayWin);
        assert_eq!(MatchResult::from_scores(Some(1), Some(1)), MatchResult::Draw);
        assert_eq!(MatchResult::from_scores(None, Some(1)), MatchResult::Unknown);
        assert_eq!(MatchResult::from_scores(Some(4), None), MatchResult::Unknown);
    }

    #[test]
    fn half_known_score_is_dropped() {
        let rec = MatchRecord::new(
            Source::Historical,
            1930,
            "Uruguay".to_string(),
            "Argentina".to_string(),
            Some(4),
            None,
        );
        assert_eq!(rec.home_score, None);
        assert_eq!(rec.result, MatchResult::Unknown);
    }

    #[test]
    fn editions_parse_only_when_known() {
        assert_eq!(parse_edition("1930"), Some(1930));
        assert_eq!(parse_edition("1954.0"), Some(1954));
        assert_eq!(parse_edition("1931"), None);
        assert_eq!(parse_edition("0"), None);
        assert_eq!(parse_edition("abc"), None);
    }

    #[test]
    fn round_order_is_canonical() {
        let mut rounds = vec![Round::Final, Round::GroupStage, Round::ThirdPlace, Round::RoundOf16];
        rounds.sort();
        assert_eq!(
            rounds,
            vec![Round::GroupStage, Round::RoundOf16, Round::ThirdPlace, Round::Final]
        );
    }
}
