use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::alias::normalize_alias;
use crate::error::ReconError;
use crate::model::{CanonicalAuthor, IdScheme, Identifier, Population};

// ---------------------------------------------------------------------------
// Override records
// ---------------------------------------------------------------------------

/// A fully-specified entity supplied by a curator, in the flat form used
/// by the override file. Keys and identifier values are plain strings;
/// the canonical key lives in the knowledge-graph scheme.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorSpec {
    pub key: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub aliases: BTreeMap<String, BTreeSet<String>>,
    /// scheme -> identifier values.
    #[serde(default)]
    pub identifiers: BTreeMap<IdScheme, Vec<String>>,
    #[serde(default)]
    pub provenance: BTreeSet<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, i64>,
    #[serde(default)]
    pub languages: BTreeSet<String>,
}

impl AuthorSpec {
    /// Build the entity, normalizing aliases so the population's alias
    /// invariants keep holding for curated entries too.
    fn materialize(&self) -> CanonicalAuthor {
        let mut author = CanonicalAuthor::new(Identifier::qid(&self.key));
        author.labels = self.labels.clone();
        for (lang, aliases) in &self.aliases {
            let folded: BTreeSet<String> = aliases
                .iter()
                .map(|a| normalize_alias(a))
                .filter(|a| !a.is_empty())
                .collect();
            if !folded.is_empty() {
                author.aliases.insert(lang.clone(), folded);
            }
        }
        for (scheme, values) in &self.identifiers {
            for value in values {
                author.identifiers.insert(Identifier::new(*scheme, value));
            }
        }
        author.provenance = self.provenance.clone();
        author.attributes = self.attributes.clone();
        author.languages = self.languages.clone();
        author
    }
}

/// One human-authored correction, applied after automated reconciliation.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum CurationOverride {
    /// Insert an entity automated matching never found. Rejected when the
    /// key already exists — never a silent duplicate.
    Add { entity: AuthorSpec },
    /// Replace the target entity's identifiers of one scheme.
    CorrectIdentifier { key: String, scheme: IdScheme, value: String },
    /// Remove one alias from one entity and language. Fixes known
    /// cross-person false positives (conventionally shared nicknames).
    ExcludeAlias { key: String, lang: String, alias: String },
}

#[derive(Debug, Deserialize)]
struct OverrideFile {
    #[serde(default, rename = "override")]
    overrides: Vec<CurationOverride>,
}

/// Parse an override batch file (TOML, a list of `[[override]]` tables).
pub fn parse_overrides(input: &str) -> Result<Vec<CurationOverride>, ReconError> {
    let file: OverrideFile =
        toml::from_str(input).map_err(|e| ReconError::OverrideParse(e.to_string()))?;
    Ok(file.overrides)
}

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct RejectedOverride {
    /// Position in the override list.
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CurationReport {
    pub applied: usize,
    pub rejected: Vec<RejectedOverride>,
}

/// Apply an ordered override list to the population.
///
/// Pure state transition: rejections are recorded, never fatal, and
/// re-applying the same list leaves the population unchanged.
pub fn apply_overrides(
    population: &mut Population,
    overrides: &[CurationOverride],
) -> CurationReport {
    let mut report = CurationReport::default();

    for (index, op) in overrides.iter().enumerate() {
        let rejection = match op {
            CurationOverride::Add { entity } => {
                let key = Identifier::qid(&entity.key);
                if population.contains_key(&key) {
                    Some(format!("entity '{key}' already present"))
                } else {
                    population.insert(key, entity.materialize());
                    None
                }
            }
            CurationOverride::CorrectIdentifier { key, scheme, value } => {
                let key = Identifier::qid(key);
                match population.get_mut(&key) {
                    None => Some(format!("no entity '{key}'")),
                    Some(author) => {
                        // The canonical key itself is never displaced.
                        author
                            .identifiers
                            .retain(|id| id.scheme != *scheme || *id == author.key);
                        author.identifiers.insert(Identifier::new(*scheme, value));
                        None
                    }
                }
            }
            CurationOverride::ExcludeAlias { key, lang, alias } => {
                let key = Identifier::qid(key);
                match population.get_mut(&key) {
                    None => Some(format!("no entity '{key}'")),
                    Some(author) => {
                        let folded = normalize_alias(alias);
                        if let Some(set) = author.aliases.get_mut(lang) {
                            set.remove(&folded);
                            if set.is_empty() {
                                author.aliases.remove(lang);
                            }
                        }
                        None
                    }
                }
            }
        };

        match rejection {
            Some(reason) => report.rejected.push(RejectedOverride { index, reason }),
            None => report.applied += 1,
        }
    }

    report
}
