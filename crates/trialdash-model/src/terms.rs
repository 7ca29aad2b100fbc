//! Display terms: coded values and their human-readable labels.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use trialdash_common::parse_integral;

/// Normalized key of a coded value.
///
/// Values that round-trip as whole numbers (`"1"`, `"1.0"`, `1`) become
/// `Int`, everything else is kept as trimmed text. Both the reference
/// dictionary and the source records go through the same normalization, so
/// a code read as text on one side still matches a numeric code on the other.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TermKey {
    Int(i64),
    Text(String),
}

impl TermKey {
    /// Parses a raw cell, returning `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(match parse_integral(trimmed) {
            Some(value) => TermKey::Int(value),
            None => TermKey::Text(trimmed.to_string()),
        })
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            TermKey::Int(value) => Some(*value),
            TermKey::Text(_) => None,
        }
    }
}

impl From<i64> for TermKey {
    fn from(value: i64) -> Self {
        TermKey::Int(value)
    }
}

impl From<i32> for TermKey {
    fn from(value: i32) -> Self {
        TermKey::Int(i64::from(value))
    }
}

impl From<&str> for TermKey {
    fn from(value: &str) -> Self {
        TermKey::parse(value).unwrap_or_else(|| TermKey::Text(String::new()))
    }
}

impl fmt::Display for TermKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermKey::Int(value) => write!(f, "{value}"),
            TermKey::Text(value) => f.write_str(value),
        }
    }
}

/// One row of the display-term reference table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayTerm {
    pub field: String,
    pub value: TermKey,
    pub label: String,
    /// The field holds a `|`-joined list of codes rather than a single code.
    pub multi: bool,
}

/// Code → label table for one coded field, in reference-file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermLookup {
    entries: Vec<(TermKey, String)>,
    index: BTreeMap<TermKey, usize>,
}

impl TermLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a term. The first label seen for a code wins.
    pub fn insert(&mut self, key: TermKey, label: impl Into<String>) {
        if self.index.contains_key(&key) {
            return;
        }
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, label.into()));
    }

    pub fn label(&self, key: &TermKey) -> Option<&str> {
        self.index
            .get(key)
            .map(|&idx| self.entries[idx].1.as_str())
    }

    /// Labels in reference order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, label)| label.as_str())
    }

    pub fn entries(&self) -> &[(TermKey, String)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<TermKey>, L: Into<String>> FromIterator<(K, L)> for TermLookup {
    fn from_iter<I: IntoIterator<Item = (K, L)>>(iter: I) -> Self {
        let mut lookup = TermLookup::new();
        for (key, label) in iter {
            lookup.insert(key.into(), label);
        }
        lookup
    }
}

/// Per-field lookup tables, split by whether the field is multi-valued.
///
/// Built once per reporting cycle and passed by reference into loaders and
/// table builders; never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayDictionary {
    pub single: BTreeMap<String, TermLookup>,
    pub multi: BTreeMap<String, TermLookup>,
}

impl DisplayDictionary {
    pub fn from_terms<I>(terms: I) -> Self
    where
        I: IntoIterator<Item = DisplayTerm>,
    {
        let mut dictionary = DisplayDictionary::default();
        for term in terms {
            let target = if term.multi {
                &mut dictionary.multi
            } else {
                &mut dictionary.single
            };
            target
                .entry(term.field)
                .or_default()
                .insert(term.value, term.label);
        }
        dictionary
    }

    pub fn is_empty(&self) -> bool {
        self.single.is_empty() && self.multi.is_empty()
    }

    /// Single-valued lookup, falling back to the multi-valued table.
    pub fn lookup(&self, field: &str) -> Option<&TermLookup> {
        self.single.get(field).or_else(|| self.multi.get(field))
    }

    /// Multi-valued lookup, falling back to the single-valued table.
    pub fn lookup_multi(&self, field: &str) -> Option<&TermLookup> {
        self.multi.get(field).or_else(|| self.single.get(field))
    }

    pub fn label(&self, field: &str, key: &TermKey) -> Option<&str> {
        self.single.get(field).and_then(|lookup| lookup.label(key))
    }

    pub fn label_multi(&self, field: &str, key: &TermKey) -> Option<&str> {
        self.multi.get(field).and_then(|lookup| lookup.label(key))
    }
}
