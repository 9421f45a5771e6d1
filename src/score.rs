use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

// "<int> <sep> <int>", any single non-digit separator or bare whitespace,
// optionally followed by a parenthetical such as "(a.e.t.)".
static SCORE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d+)(?:\s*[^\d\s]\s*|\s+)(\d+)\s*(?:\([^)]*\)\s*)?$")
        .expect("score pattern is valid")
});

/// A score as it reaches the transform stage.
#[derive(Debug, Clone, Copy)]
pub enum ScoreInput<'a> {
    Text(&'a str),
    Pair(i64, i64),
    Absent,
}

pub type ScorePair = (Option<u32>, Option<u32>);

pub fn parse_score(input: ScoreInput<'_>) -> ScorePair {
    match input {
        ScoreInput::Text(raw) => parse_score_text(raw),
        ScoreInput::Pair(home, away) => {
            match (u32::try_from(home).ok(), u32::try_from(away).ok()) {
                (Some(h), Some(a)) => (Some(h), Some(a)),
                _ => (None, None),
            }
        }
        ScoreInput::Absent => (None, None),
    }
}

pub fn parse_score_text(raw: &str) -> ScorePair {
    let Some(caps) = SCORE_RE.captures(raw) else {
        return (None, None);
    };
    let home = caps[1].parse::<u32>().ok();
    let away = caps[2].parse::<u32>().ok();
    match (home, away) {
        (Some(h), Some(a)) => (Some(h), Some(a)),
        _ => (None, None),
    }
}

/// Single goal-count field: "2", "2.0", " 3 ". Blank, "nan", negatives and
/// fractions are absent.
pub fn parse_goals(raw: &str) -> Option<u32> {
    let trimmed = raw.trim().trim_matches('"');
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(n) = trimmed.parse::<u32>() {
        return Some(n);
    }
    let f = trimmed.parse::<f64>().ok()?;
    if !f.is_finite() || f < 0.0 || f.fract() != 0.0 || f > u32::MAX as f64 {
        return None;
    }
    Some(f as u32)
}

pub fn goals_from_value(v: &Value) -> Option<u32> {
    if let Some(n) = v.as_u64() {
        return u32::try_from(n).ok();
    }
    if let Some(f) = v.as_f64() {
        return parse_goals(&f.to_string());
    }
    parse_goals(v.as_str()?)
}

/// Accepts a score string or a two-element numeric array.
pub fn score_from_value(v: &Value) -> ScorePair {
    if let Some(arr) = v.as_array() {
        if arr.len() != 2 {
            return (None, None);
        }
        return match (arr[0].as_i64(), arr[1].as_i64()) {
            (Some(h), Some(a)) => parse_score(ScoreInput::Pair(h, a)),
            _ => (None, None),
        };
    }
    match v.as_str() {
        Some(raw) => parse_score_text(raw),
        None => (None, None),
    }
}
