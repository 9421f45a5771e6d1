use std::collections::{BTreeMap, HashMap};
use std::ops::RangeInclusive;

use thiserror::Error;

use crate::record::{IdentityKey, MatchRecord, Round, Source};

/// Which source's record survives when two describe the same match.
///
/// The edition owner wins outright. Between two non-owners the lower rank wins;
/// a source missing from the rank list cannot win or lose, and such a clash is
/// reported as unresolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorityPolicy {
    owners: Vec<(RangeInclusive<u16>, Source)>,
    rank: Vec<Source>,
}

impl Default for AuthorityPolicy {
    fn default() -> Self {
        Self::with_rank(vec![
            Source::Matches2014,
            Source::Bracket2018,
            Source::Matches2022,
            Source::Historical,
        ])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    Existing,
    Incoming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorityRule {
    SameSource,
    EditionOwner,
    Rank,
}

impl AuthorityPolicy {
    pub fn with_rank(rank: Vec<Source>) -> Self {
        Self {
            owners: vec![
                (1930..=2010, Source::Historical),
                (2014..=2014, Source::Matches2014),
                (2018..=2018, Source::Bracket2018),
                (2022..=2022, Source::Matches2022),
            ],
            rank,
        }
    }

    pub fn owner(&self, edition: u16) -> Option<Source> {
        self.owners
            .iter()
            .find(|(range, _)| range.contains(&edition))
            .map(|(_, source)| *source)
    }

    pub fn rank(&self) -> &[Source] {
        &self.rank
    }

    fn rank_of(&self, source: Source) -> Option<usize> {
        self.rank.iter().position(|s| *s == source)
    }

    /// `None` when neither record is from the owner and one side is unranked.
    pub fn decide(
        &self,
        edition: u16,
        existing: Source,
        incoming: Source,
    ) -> Option<(Winner, AuthorityRule)> {
        if existing == incoming {
            return Some((Winner::Existing, AuthorityRule::SameSource));
        }
        match self.owner(edition) {
            Some(owner) if owner == existing => {
                return Some((Winner::Existing, AuthorityRule::EditionOwner));
            }
            Some(owner) if owner == incoming => {
                return Some((Winner::Incoming, AuthorityRule::EditionOwner));
            }
            _ => {}
        }
        let existing_rank = self.rank_of(existing)?;
        let incoming_rank = self.rank_of(incoming)?;
        let winner = if incoming_rank < existing_rank {
            Winner::Incoming
        } else {
            Winner::Existing
        };
        Some((winner, AuthorityRule::Rank))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("duplicate {key} between {existing} and {incoming} has no declared authority")]
pub struct UnresolvedDuplicate {
    pub key: IdentityKey,
    pub existing: Source,
    pub incoming: Source,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateResolution {
    pub key: IdentityKey,
    pub kept: Source,
    pub discarded: Source,
    pub rule: AuthorityRule,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsolidationReport {
    pub input_records: usize,
    pub duplicates: Vec<DuplicateResolution>,
}

/// Deduplicated records in canonical order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsolidatedSet {
    records: Vec<MatchRecord>,
}

impl ConsolidatedSet {
    pub fn records(&self) -> &[MatchRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records per round in round order. Unmapped rounds are left out.
    pub fn by_round(&self) -> BTreeMap<Round, Vec<&MatchRecord>> {
        let mut out: BTreeMap<Round, Vec<&MatchRecord>> = BTreeMap::new();
        for rec in &self.records {
            if let Some(round) = rec.round {
                out.entry(round).or_default().push(rec);
            }
        }
        out
    }

    pub fn unmapped_rounds(&self) -> impl Iterator<Item = &MatchRecord> {
        self.records.iter().filter(|r| r.unmapped_round.is_some())
    }

    pub fn count_by_source(&self) -> BTreeMap<Source, usize> {
        let mut out = BTreeMap::new();
        for rec in &self.records {
            *out.entry(rec.source).or_insert(0) += 1;
        }
        out
    }
}

/// Merges all sources, resolves duplicates by `policy`, and sorts canonically.
pub fn consolidate(
    records: impl IntoIterator<Item = MatchRecord>,
    policy: &AuthorityPolicy,
) -> Result<(ConsolidatedSet, ConsolidationReport), UnresolvedDuplicate> {
    let mut report = ConsolidationReport::default();
    let mut kept: Vec<MatchRecord> = Vec::new();
    let mut index: HashMap<IdentityKey, usize> = HashMap::new();

    for rec in records {
        report.input_records += 1;
        let key = rec.identity_key();
        let Some(&slot) = index.get(&key) else {
            index.insert(key, kept.len());
            kept.push(rec);
            continue;
        };
        let existing = kept[slot].source;
        let (winner, rule) = policy
            .decide(rec.edition, existing, rec.source)
            .ok_or_else(|| UnresolvedDuplicate {
                key: key.clone(),
                existing,
                incoming: rec.source,
            })?;
        let (kept_source, discarded) = match winner {
            Winner::Existing => (existing, rec.source),
            Winner::Incoming => (rec.source, existing),
        };
        if rule == AuthorityRule::SameSource {
            tracing::warn!(%key, source = %existing, "same-source duplicate; keeping the first row");
        } else {
            tracing::debug!(%key, kept = %kept_source, %discarded, ?rule, "resolved duplicate");
        }
        if winner == Winner::Incoming {
            kept[slot] = rec;
        }
        report.duplicates.push(DuplicateResolution {
            key,
            kept: kept_source,
            discarded,
            rule,
        });
    }

    let removed = resolve_undated_shadows(&kept, policy, &mut report)?;
    let mut records = kept
        .into_iter()
        .zip(removed)
        .filter_map(|(rec, gone)| (!gone).then_some(rec))
        .collect::<Vec<_>>();
    records.sort_by(MatchRecord::canonical_cmp);

    tracing::info!(
        input = report.input_records,
        output = records.len(),
        duplicates = report.duplicates.len(),
        "consolidated sources"
    );
    Ok((ConsolidatedSet { records }, report))
}

// An undated record whose degraded key matches exactly one dated record from
// another source is the same match seen twice; the policy picks one.
fn resolve_undated_shadows(
    kept: &[MatchRecord],
    policy: &AuthorityPolicy,
    report: &mut ConsolidationReport,
) -> Result<Vec<bool>, UnresolvedDuplicate> {
    let mut removed = vec![false; kept.len()];
    let mut dated: HashMap<(u16, &str, &str), Vec<usize>> = HashMap::new();
    for (idx, rec) in kept.iter().enumerate() {
        if rec.date.is_some() {
            dated
                .entry((rec.edition, rec.home_team.as_str(), rec.away_team.as_str()))
                .or_default()
                .push(idx);
        }
    }

    for (idx, rec) in kept.iter().enumerate() {
        if rec.date.is_some() || removed[idx] {
            continue;
        }
        let degraded = (rec.edition, rec.home_team.as_str(), rec.away_team.as_str());
        let Some(others) = dated.get(&degraded) else {
            continue;
        };
        let others = others
            .iter()
            .copied()
            .filter(|&j| !removed[j] && kept[j].source != rec.source)
            .collect::<Vec<_>>();
        let &[other] = others.as_slice() else {
            continue;
        };
        let existing = kept[other].source;
        let (winner, rule) = policy
            .decide(rec.edition, existing, rec.source)
            .ok_or_else(|| UnresolvedDuplicate {
                key: rec.identity_key(),
                existing,
                incoming: rec.source,
            })?;
        let (loser, kept_source, discarded) = match winner {
            Winner::Existing => (idx, existing, rec.source),
            Winner::Incoming => (other, rec.source, existing),
        };
        removed[loser] = true;
        tracing::debug!(
            key = %rec.identity_key(),
            kept = %kept_source,
            %discarded,
            "resolved undated duplicate"
        );
        report.duplicates.push(DuplicateResolution {
            key: kept[loser].identity_key(),
            kept: kept_source,
            discarded,
            rule,
        });
    }
    Ok(removed)
}
