use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{IdScheme, Identifier};

// ---------------------------------------------------------------------------
// Reply types
// ---------------------------------------------------------------------------

/// Entity data returned by the knowledge graph for one canonical key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// lang -> main display label.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// lang -> alternative labels, as published (not yet normalized).
    #[serde(default)]
    pub aliases: BTreeMap<String, BTreeSet<String>>,
    /// Every identifier the graph knows for this entity. A single entity
    /// may carry several cluster IDs of the same scheme.
    #[serde(default)]
    pub identifiers: BTreeSet<Identifier>,
    /// Writing languages.
    #[serde(default)]
    pub languages: BTreeSet<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, i64>,
}

/// Answer to one batch lookup.
///
/// A queried value absent from `resolutions` (or mapped to an empty list)
/// was not found; that is distinct from the call itself failing, which is
/// an `Err` at the trait boundary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LookupReply {
    /// queried value -> canonical keys carrying that identifier.
    #[serde(default)]
    pub resolutions: BTreeMap<String, Vec<Identifier>>,
    /// canonical key -> entity data.
    #[serde(default)]
    pub entities: BTreeMap<Identifier, EntityRecord>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for gateway lookups. Implementations own retry/backoff; an
/// error at this boundary means retries are already exhausted.
#[derive(Debug)]
pub enum GatewayError {
    /// Network error
    Network(String),
    /// HTTP error with status code
    Http(u16, String),
    /// Response parsing error
    Parse(String),
    /// Request timed out
    Timeout(String),
    /// Retries exhausted; carries the last underlying error
    Exhausted { attempts: u32, last: String },
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Network(msg) => write!(f, "network error: {msg}"),
            GatewayError::Http(code, msg) => write!(f, "HTTP {code}: {msg}"),
            GatewayError::Parse(msg) => write!(f, "parse error: {msg}"),
            GatewayError::Timeout(msg) => write!(f, "timeout: {msg}"),
            GatewayError::Exhausted { attempts, last } => {
                write!(f, "gave up after {attempts} attempts: {last}")
            }
        }
    }
}

impl std::error::Error for GatewayError {}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Lookup capability over the knowledge graph. Passed into the engine as
/// an explicit handle; there is no process-wide endpoint state.
pub trait Gateway {
    /// Resolve one batch of identifier values of a single scheme, and
    /// return entity data (labels/aliases in `langs`) for every resolved
    /// canonical key. Partial results are normal.
    fn lookup(
        &self,
        scheme: IdScheme,
        batch: &[String],
        langs: &[String],
    ) -> Result<LookupReply, GatewayError>;
}

// ---------------------------------------------------------------------------
// In-memory gateway
// ---------------------------------------------------------------------------

/// Gateway backed by an in-memory snapshot, keyed per scheme.
///
/// Serves two purposes: deterministic test fixture, and offline replay of
/// a previously captured lookup set (the CLI's `--snapshot` mode). Values
/// listed in `poisoned` make any batch containing them fail, which is how
/// tests exercise the batch-scoped failure path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryGateway {
    #[serde(default)]
    pub replies: BTreeMap<IdScheme, LookupReply>,
    #[serde(default)]
    pub poisoned: BTreeSet<String>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(data: &str) -> Result<Self, GatewayError> {
        serde_json::from_str(data).map_err(|e| GatewayError::Parse(e.to_string()))
    }

    /// Register a resolution from `value` (in `scheme`) to `keys`.
    pub fn resolve(&mut self, scheme: IdScheme, value: &str, keys: &[Identifier]) {
        self.replies
            .entry(scheme)
            .or_default()
            .resolutions
            .insert(value.to_string(), keys.to_vec());
    }

    /// Register entity data for one canonical key.
    pub fn entity(&mut self, scheme: IdScheme, key: Identifier, record: EntityRecord) {
        self.replies.entry(scheme).or_default().entities.insert(key, record);
    }

    /// Make every batch containing `value` fail, simulating an outage.
    pub fn poison(&mut self, value: &str) {
        self.poisoned.insert(value.to_string());
    }
}

impl Gateway for MemoryGateway {
    fn lookup(
        &self,
        scheme: IdScheme,
        batch: &[String],
        _langs: &[String],
    ) -> Result<LookupReply, GatewayError> {
        if let Some(bad) = batch.iter().find(|v| self.poisoned.contains(*v)) {
            return Err(GatewayError::Exhausted {
                attempts: 1,
                last: format!("simulated outage on '{bad}'"),
            });
        }

        let mut reply = LookupReply::default();
        let Some(known) = self.replies.get(&scheme) else {
            return Ok(reply);
        };

        for value in batch {
            let Some(keys) = known.resolutions.get(value) else {
                continue;
            };
            reply.resolutions.insert(value.clone(), keys.clone());
            for key in keys {
                if let Some(entity) = known.entities.get(key) {
                    reply.entities.insert(key.clone(), entity.clone());
                }
            }
        }

        Ok(reply)
    }
}
