//! Person directory: who each reference photo is, and what to tell the user.
//!
//! The table is TOML configuration, validated once at load time. A built-in
//! table is embedded at compile time from `contrib/people.toml`; deployments
//! can point at their own file instead.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

const BUILTIN_PEOPLE: &str = include_str!("../../../contrib/people.toml");

/// Relation reported for a matched photo with no table entry.
pub const FALLBACK_RELATION: &str = "FRIEND";
/// Note reported for a matched photo with no table entry.
pub const FALLBACK_NOTE: &str = "Known Associate";

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("cannot read person table {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid person table: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("person entry #{index}: `{field}` must not be empty")]
    EmptyField { index: usize, field: &'static str },
    #[error("duplicate person `{name}` (names are compared case-insensitively)")]
    Duplicate { name: String },
}

/// What the service knows about one person.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonRecord {
    pub relation: String,
    pub note: String,
}

impl PersonRecord {
    /// The record used for a recognised face that has no table entry.
    pub fn fallback() -> Self {
        Self {
            relation: FALLBACK_RELATION.to_string(),
            note: FALLBACK_NOTE.to_string(),
        }
    }
}

/// On-disk layout: a list of `[[person]]` tables.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PeopleFile {
    #[serde(default)]
    person: Vec<PersonEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PersonEntry {
    name: String,
    relation: String,
    note: String,
}

/// Immutable mapping from uppercased name to [`PersonRecord`].
#[derive(Debug, Clone, Default)]
pub struct PersonDirectory {
    records: BTreeMap<String, PersonRecord>,
}

/// Directory key for a photo stem. The stem is uppercased as-is, so
/// surrounding whitespace is part of the key.
pub fn person_key(name: &str) -> String {
    name.to_uppercase()
}

impl PersonDirectory {
    /// The table shipped with the binary.
    pub fn builtin() -> Result<Self, DirectoryError> {
        Self::from_toml_str(BUILTIN_PEOPLE)
    }

    /// Load and validate a table from a TOML file.
    pub fn load(path: &Path) -> Result<Self, DirectoryError> {
        let src = std::fs::read_to_string(path).map_err(|source| DirectoryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let dir = Self::from_toml_str(&src)?;
        tracing::info!(path = %path.display(), people = dir.len(), "person table loaded");
        Ok(dir)
    }

    /// Parse and validate a table from TOML text.
    ///
    /// Every field must be non-empty and names must be unique ignoring case.
    pub fn from_toml_str(src: &str) -> Result<Self, DirectoryError> {
        let file: PeopleFile = toml::from_str(src)?;
        let mut records = BTreeMap::new();

        for (index, entry) in file.person.into_iter().enumerate() {
            for (field, value) in [
                ("name", &entry.name),
                ("relation", &entry.relation),
                ("note", &entry.note),
            ] {
                if value.trim().is_empty() {
                    return Err(DirectoryError::EmptyField { index, field });
                }
            }

            let key = person_key(entry.name.trim());
            if records.contains_key(&key) {
                return Err(DirectoryError::Duplicate { name: entry.name });
            }
            records.insert(
                key,
                PersonRecord {
                    relation: entry.relation,
                    note: entry.note,
                },
            );
        }

        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Exact lookup by name, case-insensitive.
    pub fn get(&self, name: &str) -> Option<&PersonRecord> {
        self.records.get(&person_key(name))
    }

    /// Record for a matched photo stem, falling back to "FRIEND".
    pub fn resolve(&self, stem: &str) -> PersonRecord {
        self.get(stem).cloned().unwrap_or_else(PersonRecord::fallback)
    }

    /// Records in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PersonRecord)> {
        self.records.iter().map(|(k, v)| (k.as_str(), v))
    }
}
