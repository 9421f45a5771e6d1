use std::collections::HashMap;

use serde_json::Value;

use crate::config::Venue;
use crate::dates::DateParser;
use crate::record::{MatchRecord, Round, Source, UNKNOWN_NAME, parse_edition};
use crate::score::{goals_from_value, score_from_value};
use crate::transform::{DropReason, Normalizers, SourceBatch, SourceTransformer};

/// Where a match node sits in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bracket<'v> {
    Group,
    Knockout {
        key: Option<&'v str>,
        name: Option<&'v str>,
    },
}

pub struct Bracket2018Transformer<'a> {
    tree: &'a Value,
    edition: u16,
}

impl<'a> Bracket2018Transformer<'a> {
    pub fn new(tree: &'a Value, default_edition: u16) -> Self {
        let edition = tree
            .get("edition")
            .or_else(|| tree.get("year"))
            .and_then(|v| match v {
                Value::Number(n) => n.as_u64().and_then(|y| parse_edition(&y.to_string())),
                Value::String(s) => parse_edition(s),
                _ => None,
            })
            .unwrap_or(default_edition);
        Self { tree, edition }
    }

    /// Group nodes first (in key order), then knockout levels.
    fn flatten(&self) -> Vec<(Bracket<'a>, &'a Value)> {
        let mut out = Vec::new();
        for group in children(self.tree.get("groups")) {
            for node in matches_of(group) {
                out.push((Bracket::Group, node));
            }
        }
        match self.tree.get("knockout") {
            Some(Value::Object(levels)) => {
                for (key, level) in levels {
                    let name = level.get("name").and_then(Value::as_str);
                    for node in matches_of(level) {
                        out.push((
                            Bracket::Knockout {
                                key: Some(key.as_str()),
                                name,
                            },
                            node,
                        ));
                    }
                }
            }
            Some(Value::Array(levels)) => {
                for level in levels {
                    let name = level.get("name").and_then(Value::as_str);
                    for node in matches_of(level) {
                        out.push((Bracket::Knockout { key: None, name }, node));
                    }
                }
            }
            _ => {}
        }
        out
    }

    fn round_for(
        &self,
        bracket: Bracket<'_>,
        norm: &Normalizers,
    ) -> (Option<Round>, Option<String>) {
        let Bracket::Knockout { key, name } = bracket else {
            return (Some(Round::GroupStage), None);
        };
        // The bracket key is authoritative; the display name is the fallback.
        if let Some(round) = key.and_then(|k| norm.rounds.normalize(k).ok()) {
            return (Some(round), None);
        }
        norm.rounds.classify(name.or(key))
    }

    fn transform_node(
        &self,
        bracket: Bracket<'_>,
        node: &Value,
        lookups: &Lookups,
        dates: &DateParser,
        norm: &Normalizers,
    ) -> Result<MatchRecord, DropReason> {
        if !node.is_object() {
            return Err(DropReason::MalformedNode("match node is not an object".to_string()));
        }
        let home_team = lookups.team(node.get("home_team"), "home", norm)?;
        let away_team = lookups.team(node.get("away_team"), "away", norm)?;

        let mut home_score = node.get("home_result").and_then(goals_from_value);
        let mut away_score = node.get("away_result").and_then(goals_from_value);
        if (home_score.is_none() || away_score.is_none())
            && let Some(score) = node.get("score")
        {
            (home_score, away_score) = score_from_value(score);
        }

        let mut rec = MatchRecord::new(
            Source::Bracket2018,
            self.edition,
            home_team,
            away_team,
            home_score,
            away_score,
        );
        rec.date = dates.parse_opt(node.get("date").and_then(Value::as_str), Some(self.edition));
        (rec.round, rec.unmapped_round) = self.round_for(bracket, norm);

        if let Some(venue) = lookups.venue(node.get("stadium"), norm) {
            rec.stadium = norm.stadiums.normalize_optional(Some(&venue.name));
            rec.city = norm.cities.normalize_optional(venue.city.as_deref());
        }
        Ok(rec)
    }
}

impl SourceTransformer for Bracket2018Transformer<'_> {
    fn source(&self) -> Source {
        Source::Bracket2018
    }

    fn transform(&self, norm: &Normalizers) -> SourceBatch {
        let mut batch = SourceBatch::new(self.source());
        if !self.tree.is_object() {
            batch
                .notes
                .push("bracket input is not an object; nothing to flatten".to_string());
            return batch;
        }
        let lookups = Lookups::embedded(self.tree);
        if lookups.teams.is_empty() {
            batch
                .notes
                .push("no embedded team table; using built-in team ids".to_string());
        }
        let dates = DateParser::for_source(Source::Bracket2018);

        let nodes = self.flatten();
        let groups = nodes.iter().filter(|(b, _)| *b == Bracket::Group).count();
        tracing::debug!(
            groups,
            knockout = nodes.len() - groups,
            edition = self.edition,
            "flattened bracket"
        );
        for (idx, (bracket, node)) in nodes.into_iter().enumerate() {
            batch.push(idx, self.transform_node(bracket, node, &lookups, &dates, norm));
        }
        batch
    }
}

// Embedded id tables from the document itself.
struct Lookups {
    teams: HashMap<u64, String>,
    venues: HashMap<u64, Venue>,
}

impl Lookups {
    fn embedded(tree: &Value) -> Self {
        let mut teams = HashMap::new();
        for entry in children(tree.get("teams")) {
            let id = entry.get("id").and_then(value_id);
            let name = entry.get("name").and_then(Value::as_str);
            if let (Some(id), Some(name)) = (id, name) {
                teams.insert(id, name.to_string());
            }
        }
        let mut venues = HashMap::new();
        for entry in children(tree.get("stadiums")) {
            let id = entry.get("id").and_then(value_id);
            let name = entry.get("name").and_then(Value::as_str);
            if let (Some(id), Some(name)) = (id, name) {
                let city = entry.get("city").and_then(Value::as_str).map(str::to_string);
                venues.insert(
                    id,
                    Venue {
                        name: name.to_string(),
                        city,
                    },
                );
            }
        }
        Self { teams, venues }
    }

    fn team(
        &self,
        raw: Option<&Value>,
        side: &'static str,
        norm: &Normalizers,
    ) -> Result<String, DropReason> {
        let raw = raw.filter(|v| !v.is_null()).ok_or(DropReason::MissingTeam { side, raw: None })?;
        let Some(id) = value_id(raw) else {
            // Unplayed knockout slots carry placeholders such as "winner_a".
            return Err(DropReason::UnresolvedTeamId(raw_text(raw)));
        };
        let name = self
            .teams
            .get(&id)
            .or_else(|| norm.bracket_teams.get(&id))
            .ok_or_else(|| DropReason::UnresolvedTeamId(id.to_string()))?;
        let team = norm.teams.normalize(Some(name));
        if team == UNKNOWN_NAME {
            return Err(DropReason::MissingTeam {
                side,
                raw: Some(name.clone()),
            });
        }
        Ok(team)
    }

    fn venue(&self, raw: Option<&Value>, norm: &Normalizers) -> Option<Venue> {
        let raw = raw.filter(|v| !v.is_null())?;
        match value_id(raw) {
            Some(id) => self
                .venues
                .get(&id)
                .or_else(|| norm.bracket_stadiums.get(&id))
                .cloned(),
            None => raw.as_str().map(|name| Venue {
                name: name.to_string(),
                city: None,
            }),
        }
    }
}

fn value_id(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

fn raw_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Values of an object or elements of an array.
fn children(v: Option<&Value>) -> Vec<&Value> {
    match v {
        Some(Value::Object(map)) => map.values().collect(),
        Some(Value::Array(items)) => items.iter().collect(),
        _ => Vec::new(),
    }
}

fn matches_of(level: &Value) -> impl Iterator<Item = &Value> {
    level
        .get("matches")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;
    use crate::config::ReferenceTables;
    use crate::record::MatchResult;

    fn norm() -> Normalizers {
        Normalizers::from_tables(&ReferenceTables::builtin())
    }

    fn tree() -> Value {
        json!({
            "stadiums": [
                {"id": 1, "name": "Luzhniki Stadium", "city": "Moscow"}
            ],
            "teams": [
                {"id": 1, "name": "Russia"},
                {"id": 2, "name": "Saudi Arabia"},
                {"id": 9, "name": "France"},
                {"id": 15, "name": "Croatia"}
            ],
            "groups": {
                "a": {"name": "Group A", "matches": [
                    {"name": 1, "home_team": 1, "away_team": 2, "home_result": 5,
                     "away_result": 0, "date": "2018-06-14T18:00:00+03:00", "stadium": 1}
                ]}
            },
            "knockout": {
                "round_2": {"name": "Final", "matches": [
                    {"name": 64, "home_team": 9, "away_team": 15, "home_result": 4,
                     "away_result": 2, "date": "2018-07-15T18:00:00+03:00", "stadium": 1}
                ]},
                "round_2_loser": {"name": "Third place play-off", "matches": [
                    {"name": 63, "home_team": "winner_x", "away_team": 25,
                     "home_result": null, "away_result": null, "stadium": 3}
                ]}
            }
        })
    }

    #[test]
    fn flattens_groups_and_knockouts() {
        let tree = tree();
        let batch = Bracket2018Transformer::new(&tree, 2018).transform(&norm());
        assert_eq!(batch.input_records, 3);
        assert_eq!(batch.records.len(), 2);

        let opener = &batch.records[0];
        assert_eq!(opener.home_team, "Russia");
        assert_eq!(opener.away_team, "Saudi Arabia");
        assert_eq!(opener.round, Some(Round::GroupStage));
        assert_eq!(opener.date, NaiveDate::from_ymd_opt(2018, 6, 14));
        assert_eq!(opener.city.as_deref(), Some("Moscow"));
        assert_eq!(opener.stadium.as_deref(), Some("Luzhniki Stadium"));
        assert_eq!(opener.result, MatchResult::HomeWin);

        let final_ = &batch.records[1];
        assert_eq!(final_.round, Some(Round::Final));
        assert_eq!(final_.edition, 2018);
    }

    #[test]
    fn placeholder_team_ids_are_dropped() {
        let tree = tree();
        let batch = Bracket2018Transformer::new(&tree, 2018).transform(&norm());
        assert_eq!(batch.dropped.len(), 1);
        assert_eq!(
            batch.dropped[0].reason,
            DropReason::UnresolvedTeamId("winner_x".to_string())
        );
    }

    #[test]
    fn falls_back_to_builtin_id_tables() {
        let tree = json!({
            "groups": [{"matches": [
                {"home_team": "24", "away_team": 23, "score": "0-1", "stadium": 12}
            ]}],
            "knockout": [{"name": "Quarter-finals", "matches": [
                {"home_team": 99, "away_team": 23}
            ]}]
        });
        let batch = Bracket2018Transformer::new(&tree, 2018).transform(&norm());
        assert_eq!(batch.records.len(), 1);
        let rec = &batch.records[0];
        assert_eq!(rec.home_team, "South Korea");
        assert_eq!(rec.away_team, "Sweden");
        assert_eq!(rec.result, MatchResult::AwayWin);
        assert_eq!(rec.city.as_deref(), Some("Yekaterinburg"));
        assert_eq!(rec.date, None);
        assert_eq!(
            batch.dropped[0].reason,
            DropReason::UnresolvedTeamId("99".to_string())
        );
        assert!(batch.notes.iter().any(|n| n.contains("built-in team ids")));
    }
}
