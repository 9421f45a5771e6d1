use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::record::UNKNOWN_NAME;

static PARENTHETICAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\([^)]*\)?").expect("parenthetical pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Team,
    City,
    Stadium,
}

impl NameKind {
    fn strips_parentheticals(self) -> bool {
        matches!(self, NameKind::Team | NameKind::City)
    }
}

/// Case- and accent-insensitive alias lookup. Every alias target is also a
/// key for itself, which keeps normalization idempotent.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: HashMap<String, String>,
    // (all fragments must appear, canonical name)
    fragments: Vec<(Vec<String>, String)>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut table = Self::new();
        for (alias, target) in pairs {
            table.insert(alias, target);
        }
        table
    }

    pub fn insert(&mut self, alias: &str, target: &str) {
        let target = collapse_whitespace(target);
        if target.is_empty() {
            return;
        }
        self.entries.insert(fold_key(alias), target.clone());
        self.entries.entry(fold_key(&target)).or_insert(target);
    }

    pub fn add_fragment_rule(&mut self, fragments: &[&str], target: &str) {
        let folded = fragments
            .iter()
            .map(|f| fold_key(f))
            .filter(|f| !f.is_empty())
            .collect::<Vec<_>>();
        if folded.is_empty() {
            return;
        }
        self.insert(target, target);
        self.fragments.push((folded, collapse_whitespace(target)));
    }

    pub fn lookup(&self, name: &str) -> Option<&str> {
        let key = fold_key(name);
        let hit = match self.entries.get(&key) {
            Some(hit) => hit.as_str(),
            None => self
                .fragments
                .iter()
                .find(|(frags, _)| frags.iter().all(|f| key.contains(f.as_str())))
                .map(|(_, target)| target.as_str())?,
        };
        Some(self.follow_chain(hit))
    }

    // A target that is itself re-aliased ("A" -> "B", later "B" -> "C")
    // resolves to the end of the chain. Cycles stop after one pass.
    fn follow_chain<'a>(&'a self, mut current: &'a str) -> &'a str {
        for _ in 0..self.entries.len() {
            match self.entries.get(&fold_key(current)) {
                Some(next) if next != current => current = next.as_str(),
                _ => break,
            }
        }
        current
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct NameNormalizer {
    kind: NameKind,
    aliases: AliasTable,
}

impl NameNormalizer {
    pub fn new(kind: NameKind, aliases: AliasTable) -> Self {
        Self { kind, aliases }
    }

    /// Always returns a non-empty name; unusable input becomes `"Unknown"`.
    pub fn normalize(&self, raw: Option<&str>) -> String {
        let Some(raw) = raw else {
            return UNKNOWN_NAME.to_string();
        };
        let mut name = raw.replace('"', "");
        if self.kind.strips_parentheticals() {
            name = PARENTHETICAL_RE.replace_all(&name, " ").into_owned();
        }
        let name = collapse_whitespace(&name);
        if name.is_empty() || name.chars().all(|c| c.is_ascii_digit()) {
            return UNKNOWN_NAME.to_string();
        }
        if let Some(alias) = self.aliases.lookup(&name) {
            return alias.to_string();
        }
        present_case(&name)
    }

    /// `None` for blank or placeholder input, so callers can keep the field absent.
    pub fn normalize_optional(&self, raw: Option<&str>) -> Option<String> {
        let name = self.normalize(raw);
        (name != UNKNOWN_NAME).then_some(name)
    }
}

pub fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// ASCII-folded lowercase form used for alias matching.
pub fn fold_key(raw: &str) -> String {
    let collapsed = collapse_whitespace(raw);
    collapsed
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

// Single-case input (e.g. "PARIS", "montevideo") is title-cased; mixed case
// is assumed deliberate and kept.
fn present_case(name: &str) -> String {
    let has_upper = name.chars().any(char::is_uppercase);
    let has_lower = name.chars().any(char::is_lowercase);
    if has_upper && has_lower {
        return name.to_string();
    }
    title_case(name)
}

fn title_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut at_word_start = true;
    for c in name.chars() {
        if c.is_alphabetic() {
            let mapped = if at_word_start {
                single_char(c.to_uppercase())
            } else {
                single_char(c.to_lowercase())
            };
            out.push(mapped.unwrap_or(c));
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = c.is_whitespace() || c == '-';
        }
    }
    out
}

// Case mappings that expand ("ß" -> "SS") would change the alias key on the
// next pass; those characters keep their original form.
fn single_char(mut mapped: impl Iterator<Item = char>) -> Option<char> {
    let first = mapped.next()?;
    mapped.next().is_none().then_some(first)
}
