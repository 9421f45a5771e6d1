use std::path::Path;

use anyhow::{Context, Result, anyhow};

/// One source's rows in their native column layout, as handed over by extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn from_rows(headers: &[&str], rows: &[&[&str]]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, idx: usize) -> Option<RawRow<'_>> {
        self.rows.get(idx).map(|cells| RawRow { cells })
    }

    pub fn iter(&self) -> impl Iterator<Item = RawRow<'_>> {
        self.rows.iter().map(|cells| RawRow { cells })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RawRow<'a> {
    cells: &'a [String],
}

impl<'a> RawRow<'a> {
    /// Cell text, `None` for missing or blank cells and "nan"/"null" placeholders.
    pub fn get(&self, col: Option<usize>) -> Option<&'a str> {
        let cell = self.cells.get(col?)?.trim();
        if cell.is_empty() || is_placeholder(cell) {
            return None;
        }
        Some(cell)
    }
}

fn is_placeholder(cell: &str) -> bool {
    matches!(
        cell.to_ascii_lowercase().as_str(),
        "nan" | "null" | "none" | "n/a" | "na" | "<na>"
    )
}

fn header_key(h: &str) -> String {
    h.trim().trim_matches('"').trim().to_ascii_lowercase()
}

/// How to find one logical field among a table's headers.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub field: &'static str,
    /// Exact header names, tried first.
    pub exact: &'static [&'static str],
    /// Substrings, tried against headers not already claimed.
    pub contains: &'static [&'static str],
    /// Positional fallback when nothing matches.
    pub position: Option<usize>,
}

/// Result of resolving a list of `ColumnSpec` against a header row.
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    found: Vec<(&'static str, usize)>,
    pub positional: Vec<&'static str>,
}

impl ColumnMap {
    /// Exact matches for all fields win over substring matches, so that a
    /// "team1" header is not claimed by a "number of goals team1" search.
    pub fn detect(headers: &[String], specs: &[ColumnSpec]) -> Self {
        let keys = headers.iter().map(|h| header_key(h)).collect::<Vec<_>>();
        let mut claimed = vec![false; keys.len()];
        let mut slots: Vec<Option<usize>> = vec![None; specs.len()];

        for (slot, spec) in slots.iter_mut().zip(specs) {
            let hit = spec.exact.iter().find_map(|name| {
                let name = name.to_ascii_lowercase();
                (0..keys.len()).find(|&i| !claimed[i] && keys[i] == name)
            });
            if let Some(idx) = hit {
                claimed[idx] = true;
                *slot = Some(idx);
            }
        }

        for (slot, spec) in slots.iter_mut().zip(specs) {
            if slot.is_some() {
                continue;
            }
            let hit = spec.contains.iter().find_map(|needle| {
                let needle = needle.to_ascii_lowercase();
                (0..keys.len()).find(|&i| !claimed[i] && keys[i].contains(&needle))
            });
            if let Some(idx) = hit {
                claimed[idx] = true;
                *slot = Some(idx);
            }
        }

        let mut out = ColumnMap::default();
        for (slot, spec) in slots.into_iter().zip(specs) {
            if let Some(idx) = slot {
                out.found.push((spec.field, idx));
                continue;
            }
            let Some(pos) = spec.position else {
                continue;
            };
            if pos < keys.len() && !claimed[pos] {
                claimed[pos] = true;
                out.found.push((spec.field, pos));
                out.positional.push(spec.field);
            }
        }
        out
    }

    pub fn get(&self, field: &str) -> Option<usize> {
        self.found
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, idx)| *idx)
    }

    pub fn has(&self, field: &str) -> bool {
        self.get(field).is_some()
    }
}

/// Minimal delimited-file reader for the command-line driver. Sniffs `,` vs `;`
/// from the header line; everything else about extraction stays outside this crate.
pub fn read_delimited(path: &Path) -> Result<RawTable> {
    let raw = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let text = String::from_utf8_lossy(&raw);
    let text = text.trim_start_matches('\u{feff}');
    let header_line = text.lines().next().unwrap_or_default();
    let delimiter = if header_line.matches(';').count() > header_line.matches(',').count() {
        b';'
    } else {
        b','
    };

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers = rdr
        .headers()
        .with_context(|| format!("read header of {}", path.display()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect::<Vec<_>>();
    if headers.is_empty() {
        return Err(anyhow!("{} has no header row", path.display()));
    }

    let mut rows = Vec::new();
    for (idx, record) in rdr.records().enumerate() {
        match record {
            Ok(record) => rows.push(record.iter().map(|c| c.to_string()).collect()),
            Err(err) => tracing::warn!(file = %path.display(), row = idx + 1, "skipping malformed row: {err}"),
        }
    }
    Ok(RawTable { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPECS: &[ColumnSpec] = &[
        ColumnSpec {
            field: "home_team",
            exact: &["team1"],
            contains: &["home"],
            position: None,
        },
        ColumnSpec {
            field: "home_goals",
            exact: &["number of goals team1"],
            contains: &["goals team1"],
            position: None,
        },
        ColumnSpec {
            field: "city",
            exact: &["city"],
            contains: &["venue"],
            position: Some(5),
        },
    ];

    #[test]
    fn exact_headers_win_over_substrings() {
        let headers = ["number of goals team1", "Team1", "date"]
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>();
        let map = ColumnMap::detect(&headers, SPECS);
        assert_eq!(map.get("home_team"), Some(1));
        assert_eq!(map.get("home_goals"), Some(0));
        assert_eq!(map.get("city"), None);
    }

    #[test]
    fn substring_and_positional_fallbacks() {
        let headers = ["home side", "x", "y", "z", "w", "somewhere"]
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>();
        let map = ColumnMap::detect(&headers, SPECS);
        assert_eq!(map.get("home_team"), Some(0));
        assert_eq!(map.get("city"), Some(5));
        assert_eq!(map.positional, vec!["city"]);
    }

    #[test]
    fn placeholders_read_as_absent() {
        let table = RawTable::from_rows(&["a", "b"], &[&["nan", " 2 "]]);
        let row = table.row(0).expect("row exists");
        assert_eq!(row.get(Some(0)), None);
        assert_eq!(row.get(Some(1)), Some("2"));
        assert_eq!(row.get(Some(7)), None);
        assert_eq!(row.get(None), None);
    }
}
