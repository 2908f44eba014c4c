use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::ReconError;
use crate::model::IdScheme;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub catalogs: BTreeMap<String, CatalogConfig>,
    pub combine: CombineConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub aliases: AliasConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Catalogs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// Input file, resolved relative to the config file by the caller.
    pub file: String,
    /// Which identifier scheme this catalog is matched through.
    pub lookup_scheme: IdScheme,
    pub columns: ColumnMapping,
}

/// Column declarations for one catalog. Typed identifier and attribute
/// columns are declared here, never inferred from the data.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnMapping {
    pub native_id: String,
    pub display_name: String,
    /// scheme -> column holding that scheme's identifier.
    #[serde(default)]
    pub identifiers: BTreeMap<IdScheme, String>,
    /// attribute name -> column holding a numeric value.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// Combine
// ---------------------------------------------------------------------------

/// Which two reconciled populations feed the set combiner. `primary`
/// wins field conflicts.
#[derive(Debug, Clone, Deserialize)]
pub struct CombineConfig {
    pub primary: String,
    pub secondary: String,
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

/// Knowledge-graph lookup tuning. Defaults mirror what the public
/// endpoint tolerates: 200-id batches, 60s timeout, 5 retries starting
/// at a 5s backoff that doubles per attempt.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff_initial_secs")]
    pub backoff_initial_secs: u64,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_agent")]
    pub agent: String,
}

fn default_batch_size() -> usize {
    200
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_max_retries() -> u32 {
    5
}
fn default_backoff_initial_secs() -> u64 {
    5
}
fn default_endpoint() -> String {
    "https://query.wikidata.org/sparql".into()
}
fn default_agent() -> String {
    format!("prosopon/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            backoff_initial_secs: default_backoff_initial_secs(),
            endpoint: default_endpoint(),
            agent: default_agent(),
        }
    }
}

// ---------------------------------------------------------------------------
// Aliases + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct AliasConfig {
    /// Languages requested from the knowledge graph and aggregated.
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    /// Numeric attribute deciding which entity keeps a colliding alias.
    #[serde(default = "default_priority_attribute")]
    pub priority_attribute: String,
}

fn default_languages() -> Vec<String> {
    vec!["en".into(), "fr".into(), "la".into()]
}
fn default_priority_attribute() -> String {
    "collections".into()
}

impl Default for AliasConfig {
    fn default() -> Self {
        Self {
            languages: default_languages(),
            priority_attribute: default_priority_attribute(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Ranking attribute for the final registry order.
    #[serde(default = "default_priority_attribute")]
    pub sort_by: String,
    #[serde(default = "default_true")]
    pub descending: bool,
}

fn default_true() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { sort_by: default_priority_attribute(), descending: true }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl PipelineConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: PipelineConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.catalogs.len() < 2 {
            return Err(ReconError::ConfigValidation(
                "at least 2 catalogs are required".into(),
            ));
        }

        for role in [&self.combine.primary, &self.combine.secondary] {
            if !self.catalogs.contains_key(role) {
                return Err(ReconError::UnknownCatalog(format!(
                    "combine references catalog '{role}' which is not declared"
                )));
            }
        }
        if self.combine.primary == self.combine.secondary {
            return Err(ReconError::ConfigValidation(
                "combine.primary and combine.secondary must differ".into(),
            ));
        }

        // Each catalog must declare a column for its lookup scheme.
        for (name, catalog) in &self.catalogs {
            if !catalog.columns.identifiers.contains_key(&catalog.lookup_scheme) {
                return Err(ReconError::ConfigValidation(format!(
                    "catalog '{name}': no identifier column declared for lookup scheme '{}'",
                    catalog.lookup_scheme
                )));
            }
        }

        if self.gateway.batch_size == 0 {
            return Err(ReconError::ConfigValidation(
                "gateway.batch_size must be at least 1".into(),
            ));
        }
        if self.aliases.languages.is_empty() {
            return Err(ReconError::ConfigValidation(
                "aliases.languages must not be empty".into(),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
