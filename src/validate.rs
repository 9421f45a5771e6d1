use std::collections::BTreeMap;
use std::fmt;

use crate::record::{IdentityKey, MatchRecord, MatchResult, Source, UNKNOWN_NAME, is_known_edition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Fatal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Finding {
    MissingRequiredField {
        key: IdentityKey,
        source: Source,
        field: &'static str,
    },
    DropRateExceeded {
        source: Source,
        dropped: usize,
        input: usize,
        threshold: f64,
    },
    ResultMismatch {
        key: IdentityKey,
        recorded: MatchResult,
        expected: MatchResult,
    },
    UnmappedRound {
        key: IdentityKey,
        label: String,
    },
    NeedsReview {
        key: IdentityKey,
    },
    AbsentFields {
        source: Source,
        dates: usize,
        cities: usize,
        rounds: usize,
    },
}

impl Finding {
    pub fn severity(&self) -> Severity {
        match self {
            Finding::MissingRequiredField { .. } | Finding::DropRateExceeded { .. } => {
                Severity::Fatal
            }
            _ => Severity::Warning,
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::MissingRequiredField { key, source, field } => {
                write!(f, "{source}: {key} has no usable {field}")
            }
            Finding::DropRateExceeded {
                source,
                dropped,
                input,
                threshold,
            } => write!(
                f,
                "{source}: dropped {dropped} of {input} records, above the {:.1}% limit",
                threshold * 100.0
            ),
            Finding::ResultMismatch {
                key,
                recorded,
                expected,
            } => write!(f, "{key}: result {recorded} but scores say {expected}"),
            Finding::UnmappedRound { key, label } => write!(f, "{key}: unmapped round {label:?}"),
            Finding::NeedsReview { key } => write!(f, "{key}: date left for manual review"),
            Finding::AbsentFields {
                source,
                dates,
                cities,
                rounds,
            } => write!(
                f,
                "{source}: {dates} without date, {cities} without city, {rounds} without round"
            ),
        }
    }
}

/// Per-source intake counts from the transform stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceIntake {
    pub source: Source,
    pub input_records: usize,
    pub dropped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceQuality {
    pub input_records: usize,
    pub dropped: usize,
    pub records: usize,
    pub absent_dates: usize,
    pub absent_cities: usize,
    pub absent_rounds: usize,
    pub unmapped_rounds: usize,
    pub absent_scores: usize,
    pub needs_review: usize,
    pub home_wins: usize,
    pub away_wins: usize,
    pub draws: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub findings: Vec<Finding>,
    pub per_source: BTreeMap<Source, SourceQuality>,
}

impl ValidationReport {
    pub fn is_fatal(&self) -> bool {
        self.findings.iter().any(|f| f.severity() == Severity::Fatal)
    }

    pub fn fatal(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| f.severity() == Severity::Fatal)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| f.severity() == Severity::Warning)
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }
}

pub fn validate(
    records: &[MatchRecord],
    intake: &[SourceIntake],
    max_drop_rate: f64,
) -> ValidationReport {
    let mut report = ValidationReport::default();

    for stats in intake {
        let quality = report.per_source.entry(stats.source).or_default();
        quality.input_records += stats.input_records;
        quality.dropped += stats.dropped;
    }
    for (source, quality) in &report.per_source {
        if quality.input_records == 0 {
            continue;
        }
        let rate = quality.dropped as f64 / quality.input_records as f64;
        if rate > max_drop_rate {
            report.findings.push(Finding::DropRateExceeded {
                source: *source,
                dropped: quality.dropped,
                input: quality.input_records,
                threshold: max_drop_rate,
            });
        }
    }

    for rec in records {
        for (field, missing) in [
            ("home_team", is_blank_team(&rec.home_team)),
            ("away_team", is_blank_team(&rec.away_team)),
            ("edition", !is_known_edition(rec.edition)),
        ] {
            if missing {
                report.findings.push(Finding::MissingRequiredField {
                    key: rec.identity_key(),
                    source: rec.source,
                    field,
                });
            }
        }

        let expected = MatchResult::from_scores(rec.home_score, rec.away_score);
        if rec.result != expected {
            report.findings.push(Finding::ResultMismatch {
                key: rec.identity_key(),
                recorded: rec.result,
                expected,
            });
        }
        if let Some(label) = &rec.unmapped_round {
            report.findings.push(Finding::UnmappedRound {
                key: rec.identity_key(),
                label: label.clone(),
            });
        }
        if rec.needs_review {
            report.findings.push(Finding::NeedsReview {
                key: rec.identity_key(),
            });
        }

        let quality = report.per_source.entry(rec.source).or_default();
        quality.records += 1;
        quality.absent_dates += usize::from(rec.date.is_none());
        quality.absent_cities += usize::from(rec.city.is_none());
        quality.absent_rounds += usize::from(rec.round.is_none() && rec.unmapped_round.is_none());
        quality.unmapped_rounds += usize::from(rec.unmapped_round.is_some());
        quality.needs_review += usize::from(rec.needs_review);
        match rec.result {
            MatchResult::HomeWin => quality.home_wins += 1,
            MatchResult::AwayWin => quality.away_wins += 1,
            MatchResult::Draw => quality.draws += 1,
            MatchResult::Unknown => quality.absent_scores += 1,
        }
    }

    for (source, quality) in &report.per_source {
        if quality.absent_dates + quality.absent_cities + quality.absent_rounds > 0 {
            report.findings.push(Finding::AbsentFields {
                source: *source,
                dates: quality.absent_dates,
                cities: quality.absent_cities,
                rounds: quality.absent_rounds,
            });
        }
    }

    let fatal = report.fatal().count();
    if fatal > 0 {
        tracing::warn!(fatal, warnings = report.warning_count(), "validation failed");
    } else {
        tracing::info!(
            records = records.len(),
            warnings = report.warning_count(),
            "validation passed"
        );
    }
    report
}

fn is_blank_team(name: &str) -> bool {
    let name = name.trim();
    name.is_empty() || name == UNKNOWN_NAME || name.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::record::Round;

    fn rec(home: &str, away: &str) -> MatchRecord {
        let mut r = MatchRecord::new(
            Source::Matches2014,
            2014,
            home.to_string(),
            away.to_string(),
            Some(2),
            Some(2),
        );
        r.date = NaiveDate::from_ymd_opt(2014, 6, 20);
        r.round = Some(Round::GroupStage);
        r.city = Some("Recife".to_string());
        r
    }

    #[test]
    fn clean_records_pass() {
        let report = validate(&[rec("Italy", "Costa Rica")], &[], 0.05);
        assert!(!report.is_fatal());
        assert_eq!(report.warning_count(), 0);
        let quality = &report.per_source[&Source::Matches2014];
        assert_eq!(quality.records, 1);
        assert_eq!(quality.draws, 1);
    }

    #[test]
    fn missing_identity_fields_are_fatal() {
        let mut bad = rec("Unknown", "Chile");
        bad.edition = 2015;
        let report = validate(&[bad], &[], 0.05);
        assert!(report.is_fatal());
        assert_eq!(report.fatal().count(), 2);
    }

    #[test]
    fn result_mismatch_and_unmapped_round_warn() {
        let mut mismatched = rec("Spain", "Chile");
        mismatched.result = MatchResult::HomeWin;
        let mut unmapped = rec("Australia", "Chile");
        unmapped.round = None;
        unmapped.unmapped_round = Some("Second round".to_string());
        unmapped.city = None;

        let report = validate(&[mismatched, unmapped], &[], 0.05);
        assert!(!report.is_fatal());
        assert!(
            report
                .warnings()
                .any(|f| matches!(f, Finding::ResultMismatch { .. }))
        );
        assert!(
            report
                .warnings()
                .any(|f| matches!(f, Finding::UnmappedRound { label, .. } if label == "Second round"))
        );
        let quality = &report.per_source[&Source::Matches2014];
        assert_eq!(quality.unmapped_rounds, 1);
        assert_eq!(quality.absent_rounds, 0);
        assert_eq!(quality.absent_cities, 1);
    }

    #[test]
    fn drop_rate_threshold_is_per_source() {
        let intake = [
            SourceIntake {
                source: Source::Historical,
                input_records: 100,
                dropped: 5,
            },
            SourceIntake {
                source: Source::Matches2022,
                input_records: 64,
                dropped: 4,
            },
        ];
        let report = validate(&[], &intake, 0.05);
        let fatal = report.fatal().collect::<Vec<_>>();
        assert_eq!(fatal.len(), 1);
        assert!(matches!(
            fatal[0],
            Finding::DropRateExceeded {
                source: Source::Matches2022,
                ..
            }
        ));
    }
}
