use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use crate::consolidate::AuthorityPolicy;
use crate::record::{Round, Source, parse_edition};
use crate::rounds::RoundNormalizer;

const DEFAULT_MAX_DROP_RATE: f64 = 0.05;
const DEFAULT_BRACKET_EDITION: u16 = 2018;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Per-source share of dropped records above which the run fails.
    pub max_drop_rate: f64,
    pub tables_path: Option<PathBuf>,
    pub data_dir: PathBuf,
    pub output: PathBuf,
    pub bracket_edition: u16,
    pub authority: AuthorityPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_drop_rate: DEFAULT_MAX_DROP_RATE,
            tables_path: None,
            data_dir: PathBuf::from("data/raw"),
            output: PathBuf::from("data/worldcup_matches.csv"),
            bracket_edition: DEFAULT_BRACKET_EDITION,
            authority: AuthorityPolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// Reads `WC_*` variables; `.env.local` and `.env` are loaded first when present.
    pub fn from_env() -> Self {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");

        let defaults = Self::default();
        let max_drop_rate = env::var("WC_MAX_DROP_RATE")
            .ok()
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .map(|v| v.clamp(0.0, 1.0))
            .unwrap_or(defaults.max_drop_rate);
        let tables_path = env_path("WC_TABLES_PATH");
        let data_dir = env_path("WC_DATA_DIR").unwrap_or(defaults.data_dir);
        let output = env_path("WC_OUTPUT").unwrap_or(defaults.output);
        let bracket_edition = env::var("WC_BRACKET_EDITION")
            .ok()
            .and_then(|v| parse_edition(&v))
            .unwrap_or(defaults.bracket_edition);
        let authority = match env::var("WC_SOURCE_RANK") {
            Ok(raw) if !raw.trim().is_empty() => {
                let rank = parse_source_list(&raw);
                AuthorityPolicy::with_rank(rank)
            }
            _ => defaults.authority,
        };

        Self {
            max_drop_rate,
            tables_path,
            data_dir,
            output,
            bracket_edition,
            authority,
        }
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
}

/// "csv_2014, json_2018" → sources in that order; unknown tags are skipped.
pub fn parse_source_list(raw: &str) -> Vec<Source> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .filter_map(|tag| {
            let source = Source::from_tag(tag);
            if source.is_none() {
                tracing::warn!(tag, "ignoring unknown source tag in WC_SOURCE_RANK");
            }
            source
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FragmentRule {
    /// All fragments must occur in the folded name.
    pub fragments: Vec<String>,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Venue {
    pub name: String,
    #[serde(default)]
    pub city: Option<String>,
}

/// Alias, synonym and id tables. Built once and passed to every stage.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    pub teams: Vec<(String, String)>,
    pub cities: Vec<(String, String)>,
    pub stadiums: Vec<(String, String)>,
    pub rounds: Vec<(String, Round)>,
    pub team_fragments: Vec<FragmentRule>,
    pub bracket_teams: HashMap<u64, String>,
    pub bracket_stadiums: HashMap<u64, Venue>,
}

// Override file layout: every section optional, merged over the built-ins.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TablesFile {
    teams: BTreeMap<String, String>,
    cities: BTreeMap<String, String>,
    stadiums: BTreeMap<String, String>,
    rounds: BTreeMap<String, String>,
    team_fragments: Vec<FragmentRule>,
    bracket_teams: BTreeMap<String, String>,
    bracket_stadiums: BTreeMap<String, Venue>,
}

impl ReferenceTables {
    pub fn builtin() -> Self {
        Self {
            teams: owned_pairs(TEAM_ALIASES),
            cities: owned_pairs(CITY_ALIASES),
            stadiums: Vec::new(),
            rounds: ROUND_SYNONYMS
                .iter()
                .map(|(label, round)| (label.to_string(), *round))
                .collect(),
            team_fragments: vec![
                FragmentRule {
                    fragments: vec!["Ivoire".to_string()],
                    target: "Cote d'Ivoire".to_string(),
                },
                FragmentRule {
                    fragments: vec!["Trinidad".to_string(), "Tobago".to_string()],
                    target: "Trinidad and Tobago".to_string(),
                },
            ],
            bracket_teams: BRACKET_TEAMS
                .iter()
                .map(|(id, name)| (*id, name.to_string()))
                .collect(),
            bracket_stadiums: BRACKET_STADIUMS
                .iter()
                .map(|(id, name, city)| {
                    (
                        *id,
                        Venue {
                            name: name.to_string(),
                            city: Some(city.to_string()),
                        },
                    )
                })
                .collect(),
        }
    }

    /// Built-in tables, with the override file merged on top when given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut tables = Self::builtin();
        if let Some(path) = path {
            tables.merge_file(path)?;
        }
        Ok(tables)
    }

    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read reference tables {}", path.display()))?;
        self.merge_json(&raw)
            .with_context(|| format!("parse reference tables {}", path.display()))
    }

    pub fn merge_json(&mut self, raw: &str) -> Result<()> {
        let file: TablesFile = serde_json::from_str(raw)?;

        // Round targets may be a canonical label or any label the built-ins know.
        let known = RoundNormalizer::from_pairs(
            self.rounds.iter().map(|(label, round)| (label.as_str(), *round)),
        );
        for (label, target) in &file.rounds {
            let round = known
                .normalize(target)
                .map_err(|e| anyhow!("round synonym {label:?}: {e}"))?;
            self.rounds.push((label.clone(), round));
        }

        self.teams.extend(file.teams);
        self.cities.extend(file.cities);
        self.stadiums.extend(file.stadiums);
        self.team_fragments.extend(file.team_fragments);
        for (id, name) in file.bracket_teams {
            self.bracket_teams.insert(parse_id(&id)?, name);
        }
        for (id, venue) in file.bracket_stadiums {
            self.bracket_stadiums.insert(parse_id(&id)?, venue);
        }

        tracing::debug!(
            teams = self.teams.len(),
            cities = self.cities.len(),
            rounds = self.rounds.len(),
            "merged reference table overrides"
        );
        Ok(())
    }
}

fn parse_id(raw: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| anyhow!("id {raw:?} is not a non-negative integer"))
}

fn owned_pairs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(a, t)| (a.to_string(), t.to_string()))
        .collect()
}

const TEAM_ALIASES: &[(&str, &str)] = &[
    ("West Germany", "Germany"),
    ("FR Germany", "Germany"),
    ("Germany FR", "Germany"),
    ("FRG", "Germany"),
    ("German DR", "East Germany"),
    ("Soviet Union", "Russia"),
    ("USSR", "Russia"),
    ("Yugoslavia", "Serbia"),
    ("Czechoslovakia", "Czech Republic"),
    ("Korea Republic", "South Korea"),
    ("Korea DPR", "North Korea"),
    ("United States", "USA"),
    ("US", "USA"),
    ("Ivory Coast", "Cote d'Ivoire"),
    ("Côte d'Ivoire", "Cote d'Ivoire"),
    ("Bosnia-Herzegovina", "Bosnia and Herzegovina"),
    ("IR Iran", "Iran"),
    ("Irish Republic", "Republic of Ireland"),
    ("Northern Ireland", "Northern Ireland"),
];

const CITY_ALIASES: &[(&str, &str)] = &[
    ("Mexico", "Mexico City"),
    ("México", "Mexico City"),
    ("Mexico City", "Mexico City"),
    ("Sao Paulo", "São Paulo"),
    ("Saint-Denis", "Paris"),
    ("Saint Denis", "Paris"),
    ("Brasilia", "Brasília"),
    ("Cuiaba", "Cuiabá"),
    ("Buenos Aires", "Buenos Aires"),
    ("Rio de Janeiro", "Rio de Janeiro"),
    ("Belo Horizonte", "Belo Horizonte"),
    ("Porto Alegre", "Porto Alegre"),
];

const ROUND_SYNONYMS: &[(&str, Round)] = &[
    ("Poules", Round::GroupStage),
    ("First round", Round::GroupStage),
    ("Preliminary round", Round::GroupStage),
    ("8e de finale", Round::RoundOf16),
    ("Eighth-finals", Round::RoundOf16),
    ("R16", Round::RoundOf16),
    ("Round 16", Round::RoundOf16),
    ("round_16", Round::RoundOf16),
    ("1/4 finale", Round::QuarterFinal),
    ("Quarterfinals", Round::QuarterFinal),
    ("Quarterfinal", Round::QuarterFinal),
    ("Quarter-final", Round::QuarterFinal),
    ("round_8", Round::QuarterFinal),
    ("1/2 finale", Round::SemiFinal),
    ("Semifinals", Round::SemiFinal),
    ("Semifinal", Round::SemiFinal),
    ("Semi-final", Round::SemiFinal),
    ("round_4", Round::SemiFinal),
    ("3rd place", Round::ThirdPlace),
    ("Third place", Round::ThirdPlace),
    ("Match pour la 3e place", Round::ThirdPlace),
    ("Play-off for third place", Round::ThirdPlace),
    ("Match for third place", Round::ThirdPlace),
    ("round_2_loser", Round::ThirdPlace),
    ("Finale", Round::Final),
    ("round_2", Round::Final),
];

const BRACKET_TEAMS: &[(u64, &str)] = &[
    (1, "Russia"),
    (2, "Saudi Arabia"),
    (3, "Egypt"),
    (4, "Uruguay"),
    (5, "Portugal"),
    (6, "Spain"),
    (7, "Morocco"),
    (8, "Iran"),
    (9, "France"),
    (10, "Australia"),
    (11, "Peru"),
    (12, "Denmark"),
    (13, "Argentina"),
    (14, "Iceland"),
    (15, "Croatia"),
    (16, "Nigeria"),
    (17, "Brazil"),
    (18, "Switzerland"),
    (19, "Costa Rica"),
    (20, "Serbia"),
    (21, "Germany"),
    (22, "Mexico"),
    (23, "Sweden"),
    (24, "South Korea"),
    (25, "Belgium"),
    (26, "Panama"),
    (27, "Tunisia"),
    (28, "England"),
    (29, "Poland"),
    (30, "Senegal"),
    (31, "Colombia"),
    (32, "Japan"),
];

const BRACKET_STADIUMS: &[(u64, &str, &str)] = &[
    (1, "Luzhniki Stadium", "Moscow"),
    (2, "Otkrytiye Arena", "Moscow"),
    (3, "Krestovsky Stadium", "Saint Petersburg"),
    (4, "Kaliningrad Stadium", "Kaliningrad"),
    (5, "Kazan Arena", "Kazan"),
    (6, "Nizhny Novgorod Stadium", "Nizhny Novgorod"),
    (7, "Cosmos Arena", "Samara"),
    (8, "Volgograd Arena", "Volgograd"),
    (9, "Mordovia Arena", "Saransk"),
    (10, "Rostov Arena", "Rostov-on-Don"),
    (11, "Fisht Olympic Stadium", "Sochi"),
    (12, "Central Stadium", "Yekaterinburg"),
];
