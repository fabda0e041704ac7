//! Acronym expansion for search queries
//!
//! Regulatory text spells terms out as often as it abbreviates them, so a
//! query for "ZEV" should also reach documents that only say "zero-emission
//! vehicle". Expansion appends the long form right after the acronym and
//! keeps the acronym itself.

use crate::config::AcronymEntry;
use crate::{ConfigError, ConfigResult};
use regex::{Captures, Regex};
use std::collections::HashMap;

/// Acronyms common across air quality regulations
const BUILTIN: &[(&str, &str)] = &[
    ("CARB", "California Air Resources Board"),
    ("ARB", "Air Resources Board"),
    ("CCR", "California Code of Regulations"),
    ("CFR", "Code of Federal Regulations"),
    ("EPA", "Environmental Protection Agency"),
    ("SIP", "State Implementation Plan"),
    ("ZEV", "zero-emission vehicle"),
    ("PZEV", "partial zero-emission vehicle"),
    ("LEV", "low-emission vehicle"),
    ("ULEV", "ultra-low-emission vehicle"),
    ("SULEV", "super ultra-low-emission vehicle"),
    ("GHG", "greenhouse gas"),
    ("PM", "particulate matter"),
    ("NOx", "oxides of nitrogen"),
    ("VOC", "volatile organic compound"),
    ("ROG", "reactive organic gases"),
    ("TAC", "toxic air contaminant"),
    ("OBD", "on-board diagnostic"),
    ("DPF", "diesel particulate filter"),
    ("GVWR", "gross vehicle weight rating"),
    ("LCFS", "Low Carbon Fuel Standard"),
    ("TRU", "transport refrigeration unit"),
    ("ATCM", "airborne toxic control measure"),
    ("ACC", "Advanced Clean Cars"),
    ("ACF", "Advanced Clean Fleets"),
    ("ACT", "Advanced Clean Trucks"),
];

/// Whole-word, case-sensitive acronym lookup
#[derive(Debug, Clone)]
pub struct AcronymTable {
    pattern: Option<Regex>,
    expansions: HashMap<String, String>,
}

impl AcronymTable {
    /// Builds the table from the built-in acronyms plus `extra`
    ///
    /// An extra entry with the same short form replaces the built-in one.
    pub fn new(extra: &[AcronymEntry]) -> ConfigResult<Self> {
        let mut expansions: HashMap<String, String> = BUILTIN
            .iter()
            .map(|(short, long)| (short.to_string(), long.to_string()))
            .collect();
        for entry in extra {
            expansions.insert(entry.short.clone(), entry.expansion.clone());
        }

        Self::compile(expansions)
    }

    /// Builds a table holding only `entries`
    pub fn from_entries(entries: &[AcronymEntry]) -> ConfigResult<Self> {
        Self::compile(
            entries
                .iter()
                .map(|e| (e.short.clone(), e.expansion.clone()))
                .collect(),
        )
    }

    fn compile(expansions: HashMap<String, String>) -> ConfigResult<Self> {
        if expansions.is_empty() {
            return Ok(Self {
                pattern: None,
                expansions,
            });
        }

        // Longest first so "SULEV" is never read as "LEV" inside a longer alternative
        let mut shorts: Vec<&String> = expansions.keys().collect();
        shorts.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let alternation = shorts
            .iter()
            .map(|s| regex::escape(s))
            .collect::<Vec<_>>()
            .join("|");

        let pattern = Regex::new(&format!(r"\b(?:{})\b", alternation))
            .map_err(|e| ConfigError::InvalidPattern(e.to_string()))?;

        Ok(Self {
            pattern: Some(pattern),
            expansions,
        })
    }

    /// Appends " (expansion)" after every known acronym in `query`
    ///
    /// # Example
    ///
    /// ```
    /// use regatlas::retrieval::AcronymTable;
    ///
    /// let table = AcronymTable::new(&[]).unwrap();
    /// assert_eq!(
    ///     table.expand("ZEV sales requirements"),
    ///     "ZEV (zero-emission vehicle) sales requirements"
    /// );
    /// ```
    pub fn expand(&self, query: &str) -> String {
        let Some(pattern) = &self.pattern else {
            return query.to_string();
        };

        pattern
            .replace_all(query, |caps: &Captures| {
                let short = &caps[0];
                match self.expansions.get(short) {
                    Some(long) => format!("{} ({})", short, long),
                    None => short.to_string(),
                }
            })
            .into_owned()
    }

    /// Number of known acronyms
    pub fn len(&self) -> usize {
        self.expansions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expansions.is_empty()
    }
}
