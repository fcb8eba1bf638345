//! Shared primitives for the PostPilot selector pipeline.
//!
//! Everything here is wire-visible: the selector definition shape matches
//! the remote service's JSON surface, so serde stays always-on.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Placeholder substituted into indexed selector patterns.
pub const INDEX_PLACEHOLDER: &str = "{index}";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("invalid version string: {0}")]
    Invalid(String),
}

/// Identifier for one end-to-end automation run.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for one user-level action within a run.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ActionId(pub String);

impl ActionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ActionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Three-part semantic version of a selector set.
///
/// Serialized as the plain `"major.minor.patch"` string the remote store
/// and the healing protocol exchange.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Baseline version used when a store has never been seeded.
    pub fn initial() -> Self {
        Self::new(1, 0, 0)
    }

    /// Next version produced by a successful heal.
    pub fn bump_patch(self) -> Self {
        Self {
            patch: self.patch + 1,
            ..self
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || VersionError::Invalid(s.to_string());
        let mut parts = s.split('.');
        let mut next = || -> Result<u32, VersionError> {
            parts
                .next()
                .ok_or_else(invalid)?
                .parse::<u32>()
                .map_err(|_| invalid())
        };
        let major = next()?;
        let minor = next()?;
        let patch = next()?;
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self::new(major, minor, patch))
    }
}

impl TryFrom<String> for Version {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Version> for String {
    fn from(value: Version) -> Self {
        value.to_string()
    }
}

/// Named recipe for finding one element.
///
/// `primary` is always attempted before any `fallback` entry; the fallback
/// order is the retry priority order. `pattern` carries an `{index}`
/// placeholder for repeated, enumerated elements (thread entries, poll
/// choices).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorDef {
    pub primary: String,
    #[serde(default)]
    pub fallback: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl SelectorDef {
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            fallback: Vec::new(),
            pattern: None,
        }
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback.push(fallback.into());
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Substitute `index` into the pattern, if one is defined.
    pub fn indexed(&self, index: usize) -> Option<String> {
        self.pattern
            .as_ref()
            .map(|p| p.replace(INDEX_PLACEHOLDER, &index.to_string()))
    }
}

/// Category name -> element name -> selector definition.
pub type SelectorMap = BTreeMap<String, BTreeMap<String, SelectorDef>>;

/// One append-only entry of a set's healing history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealingRecord {
    pub timestamp: DateTime<Utc>,
    pub healed: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_version: Option<Version>,
}

/// The versioned selector set: the unit the registry owns in-process and
/// the store retains durably, one immutable copy per published version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorSet {
    pub version: Version,
    pub updated_at: DateTime<Utc>,
    pub selectors: SelectorMap,
    #[serde(default)]
    pub healing_history: Vec<HealingRecord>,
}

impl SelectorSet {
    pub fn new(version: Version) -> Self {
        Self {
            version,
            updated_at: Utc::now(),
            selectors: SelectorMap::new(),
            healing_history: Vec::new(),
        }
    }

    pub fn with_selectors(mut self, selectors: SelectorMap) -> Self {
        self.selectors = selectors;
        self
    }

    pub fn get(&self, category: &str, name: &str) -> Option<&SelectorDef> {
        self.selectors.get(category).and_then(|c| c.get(name))
    }

    /// Flat lookup by bare element name across all categories.
    pub fn find(&self, name: &str) -> Option<&SelectorDef> {
        self.selectors.values().find_map(|c| c.get(name))
    }

    /// Category currently holding `name`, if any.
    pub fn category_of(&self, name: &str) -> Option<&str> {
        self.selectors
            .iter()
            .find(|(_, entries)| entries.contains_key(name))
            .map(|(category, _)| category.as_str())
    }

    /// Produce the successor set for a heal: patch bump, per-name merge of
    /// the healed entries into their existing categories (unknown names
    /// land in `composer`), healing record appended. Untouched names are
    /// preserved unchanged.
    pub fn healed(&self, entries: &BTreeMap<String, SelectorDef>, at: DateTime<Utc>) -> SelectorSet {
        let mut next = self.clone();
        next.version = self.version.bump_patch();
        next.updated_at = at;
        for (name, def) in entries {
            let category = self
                .category_of(name)
                .unwrap_or("composer")
                .to_string();
            next.selectors
                .entry(category)
                .or_default()
                .insert(name.clone(), def.clone());
        }
        next.healing_history.push(HealingRecord {
            timestamp: at,
            healed: entries.keys().cloned().collect(),
            previous_version: Some(self.version),
        });
        next
    }
}

/// Per-attempt record of a failed resolution.
///
/// Created by the resolver, aggregated by the executor into a failed-name
/// list, discarded after being reported or healed. A failure is either a
/// timeout (every strategy tried for the full window) or a missing
/// definition (nothing to poll for).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionFailure {
    pub name: String,
    pub tried: Vec<String>,
    pub timed_out: bool,
    pub missing_definition: bool,
}

impl ResolutionFailure {
    pub fn timeout(name: impl Into<String>, tried: Vec<String>) -> Self {
        Self {
            name: name.into(),
            tried,
            timed_out: true,
            missing_definition: false,
        }
    }

    pub fn missing(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tried: Vec::new(),
            timed_out: false,
            missing_definition: true,
        }
    }
}

impl fmt::Display for ResolutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.missing_definition {
            write!(f, "no selector definition for '{}'", self.name)
        } else {
            write!(
                f,
                "'{}' not found after trying {} strategies",
                self.name,
                self.tried.len()
            )
        }
    }
}

/// Truncate to at most `max_chars` characters on a char boundary.
///
/// Snapshot and prompt budgets are counted in characters, matching how the
/// remote service meters its input.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &s[..byte_index],
        None => s,
    }
}
