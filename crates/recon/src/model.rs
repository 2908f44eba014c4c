use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Identifier scheme. Classification always comes from the declaring
/// column, never from the shape of the value — a bare number can be a
/// VIAF cluster ID or a Trismegistos author ID.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum IdScheme {
    /// Knowledge-graph entity key (the canonical space).
    Qid,
    Viaf,
    Trismegistos,
    /// Catalog-native row identifier.
    Native,
}

impl fmt::Display for IdScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Qid => write!(f, "qid"),
            Self::Viaf => write!(f, "viaf"),
            Self::Trismegistos => write!(f, "trismegistos"),
            Self::Native => write!(f, "native"),
        }
    }
}

impl std::str::FromStr for IdScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "qid" => Ok(Self::Qid),
            "viaf" => Ok(Self::Viaf),
            "trismegistos" => Ok(Self::Trismegistos),
            "native" => Ok(Self::Native),
            other => Err(format!("unknown identifier scheme '{other}'")),
        }
    }
}

/// A typed identifier. Two identifiers are equal only when both scheme
/// and value agree. Serializes as `scheme:value` so it can key JSON
/// maps (populations, entity data).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identifier {
    pub scheme: IdScheme,
    pub value: String,
}

impl Serialize for Identifier {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl std::str::FromStr for Identifier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scheme, value) = s
            .split_once(':')
            .ok_or_else(|| format!("invalid identifier '{s}': expected scheme:value"))?;
        if value.is_empty() {
            return Err(format!("invalid identifier '{s}': empty value"));
        }
        Ok(Self::new(scheme.parse::<IdScheme>()?, value))
    }
}

impl Identifier {
    pub fn new(scheme: IdScheme, value: impl Into<String>) -> Self {
        Self { scheme, value: value.into() }
    }

    /// Shorthand for the canonical (knowledge-graph) key space.
    pub fn qid(value: impl Into<String>) -> Self {
        Self::new(IdScheme::Qid, value)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scheme, self.value)
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One row as read from a source catalog. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogRecord {
    pub catalog: String,
    pub native_id: String,
    pub display_name: String,
    /// (lang, text) pairs as read, un-normalized.
    pub labels: Vec<(String, String)>,
    pub aliases: Vec<(String, String)>,
    pub attributes: BTreeMap<String, i64>,
    pub identifiers: BTreeSet<Identifier>,
}

impl CatalogRecord {
    /// The record's identifier value in one scheme, if it carries one.
    pub fn identifier(&self, scheme: IdScheme) -> Option<&str> {
        self.identifiers
            .iter()
            .find(|id| id.scheme == scheme)
            .map(|id| id.value.as_str())
    }
}

/// Pre-loaded records grouped by catalog name, plus rows already
/// quarantined at load time (malformed input).
#[derive(Debug, Default)]
pub struct CatalogInput {
    pub records: BTreeMap<String, Vec<CatalogRecord>>,
    pub quarantined: Vec<Quarantined>,
}

// ---------------------------------------------------------------------------
// Canonical entities
// ---------------------------------------------------------------------------

/// A reconciled author, keyed by its knowledge-graph identifier.
///
/// Created by the matcher on first successful resolution, merged by the
/// set combiner, alias-scrubbed by the aggregator, frozen by the registry
/// builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalAuthor {
    pub key: Identifier,
    /// One label per language; the merge policy decides the writer.
    pub labels: BTreeMap<String, String>,
    /// Normalized, case-folded alias sets per language.
    pub aliases: BTreeMap<String, BTreeSet<String>>,
    pub identifiers: BTreeSet<Identifier>,
    /// Source catalogs that contributed to this entity. Never lossy.
    pub provenance: BTreeSet<String>,
    pub attributes: BTreeMap<String, i64>,
    /// Writing languages reported by the knowledge graph.
    pub languages: BTreeSet<String>,
}

impl CanonicalAuthor {
    pub fn new(key: Identifier) -> Self {
        let mut identifiers = BTreeSet::new();
        identifiers.insert(key.clone());
        Self {
            key,
            labels: BTreeMap::new(),
            aliases: BTreeMap::new(),
            identifiers,
            provenance: BTreeSet::new(),
            attributes: BTreeMap::new(),
            languages: BTreeSet::new(),
        }
    }

    /// Numeric attribute value, treating a missing name as 0 (the ranking
    /// convention inherited from the source catalogs).
    pub fn attribute_or_zero(&self, name: &str) -> i64 {
        self.attributes.get(name).copied().unwrap_or(0)
    }
}

/// Deduplicated population keyed by canonical identifier.
pub type Population = BTreeMap<Identifier, CanonicalAuthor>;

// ---------------------------------------------------------------------------
// Match outcomes
// ---------------------------------------------------------------------------

/// How one catalog record resolved against the canonical key space.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "keys")]
pub enum MatchStatus {
    Matched(Identifier),
    /// More than one candidate key. Never auto-picked: silently taking
    /// the first candidate has produced cross-author alias bleed before.
    Ambiguous(Vec<Identifier>),
    Unmatched,
}

/// Exactly one outcome per input record.
#[derive(Debug, Clone, Serialize)]
pub struct MatchOutcome {
    pub record: CatalogRecord,
    pub status: MatchStatus,
}

// ---------------------------------------------------------------------------
// Quarantine
// ---------------------------------------------------------------------------

/// Why a record was set aside instead of entering the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuarantineReason {
    Ambiguous,
    Unmatched,
    DuplicateKey,
    LookupFailed,
    Malformed,
}

impl fmt::Display for QuarantineReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ambiguous => write!(f, "ambiguous"),
            Self::Unmatched => write!(f, "unmatched"),
            Self::DuplicateKey => write!(f, "duplicate_key"),
            Self::LookupFailed => write!(f, "lookup_failed"),
            Self::Malformed => write!(f, "malformed"),
        }
    }
}

/// A quarantined record: the untouched source row plus the reason it was
/// set aside. Quarantine is a side-channel, never a discard.
#[derive(Debug, Clone, Serialize)]
pub struct Quarantined {
    pub reason: QuarantineReason,
    pub record: CatalogRecord,
    /// Candidate or offending canonical keys, when the reason has any.
    pub candidates: Vec<Identifier>,
    pub note: String,
}

// ---------------------------------------------------------------------------
// Alias collisions
// ---------------------------------------------------------------------------

/// One normalized alias claimed by several entities in the same language.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AliasCollision {
    pub lang: String,
    pub alias: String,
    pub keys: Vec<Identifier>,
    /// Entity that kept the alias; `None` means priority was undecidable
    /// and the collision is left to curation.
    pub resolved: Option<Identifier>,
}

// ---------------------------------------------------------------------------
// Run output
// ---------------------------------------------------------------------------

/// Set-algebra views over the two reconciled populations. The union is
/// what flows on to the registry; the other views are emitted as
/// artifacts.
#[derive(Debug, Default, Serialize)]
pub struct SetViews {
    pub exclusive_primary: Population,
    pub exclusive_secondary: Population,
    pub intersection: Population,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CatalogSummary {
    pub records: usize,
    pub matched: usize,
    pub ambiguous: usize,
    pub unmatched: usize,
    pub duplicates: usize,
    pub lookup_failures: usize,
    pub malformed: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub catalogs: BTreeMap<String, CatalogSummary>,
    pub union_size: usize,
    pub intersection_size: usize,
    pub exclusive_primary: usize,
    pub exclusive_secondary: usize,
    pub alias_collisions: usize,
    pub unresolved_collisions: usize,
    pub overrides_applied: usize,
    pub overrides_rejected: usize,
    pub quarantined: usize,
    pub registry_rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Serialize)]
pub struct RunResult {
    pub meta: RunMeta,
    pub summary: RunSummary,
    pub views: SetViews,
    /// Final population, duplicate-free, in ranking order.
    pub registry: Vec<CanonicalAuthor>,
    pub quarantine: Vec<Quarantined>,
    pub collisions: Vec<AliasCollision>,
    pub curation: crate::curation::CurationReport,
}
