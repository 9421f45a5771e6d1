use std::collections::HashMap;
use std::fmt;

use crate::names::fold_key;
use crate::record::Round;

/// A round label that no synonym or pattern rule recognises.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmappedRound {
    pub label: String,
}

impl fmt::Display for UnmappedRound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no round mapping for {:?}", self.label)
    }
}

impl std::error::Error for UnmappedRound {}

#[derive(Debug, Clone, Default)]
pub struct RoundNormalizer {
    synonyms: HashMap<String, Round>,
}

impl RoundNormalizer {
    pub fn new() -> Self {
        let mut out = Self::default();
        for round in Round::ALL {
            out.insert(round.label(), round);
        }
        out
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, Round)>) -> Self {
        let mut out = Self::new();
        for (label, round) in pairs {
            out.insert(label, round);
        }
        out
    }

    pub fn insert(&mut self, label: &str, round: Round) {
        self.synonyms.insert(round_key(label), round);
    }

    pub fn normalize(&self, label: &str) -> Result<Round, UnmappedRound> {
        let key = round_key(label);
        if let Some(round) = self.synonyms.get(&key) {
            return Ok(*round);
        }
        // "Group A", "Group 3", "Poule B", "Preliminary group 1", ...
        if key.split(' ').any(|w| w == "group" || w == "groups" || w == "poule") {
            return Ok(Round::GroupStage);
        }
        Err(UnmappedRound {
            label: label.trim().to_string(),
        })
    }

    /// Splits a raw label into the record's `(round, unmapped_round)` pair.
    pub fn classify(&self, label: Option<&str>) -> (Option<Round>, Option<String>) {
        let Some(label) = label.map(str::trim).filter(|l| !l.is_empty()) else {
            return (None, None);
        };
        match self.normalize(label) {
            Ok(round) => (Some(round), None),
            Err(unmapped) => {
                tracing::warn!(label = %unmapped.label, "unmapped round label");
                (None, Some(unmapped.label))
            }
        }
    }
}

// Folds case, accents, quotes and the usual punctuation variants so that
// "Quarter-finals", "quarter finals" and "QUARTER_FINALS" share a key.
fn round_key(label: &str) -> String {
    let cleaned = label
        .replace('"', "")
        .chars()
        .map(|c| if c == '_' || c == '-' { ' ' } else { c })
        .collect::<String>();
    fold_key(&cleaned)
}
