use std::collections::{BTreeMap, BTreeSet};

use crate::config::{CatalogConfig, PipelineConfig};
use crate::curation::CurationOverride;
use crate::error::ReconError;
use crate::gateway::Gateway;
use crate::model::{
    CatalogInput, CatalogRecord, CatalogSummary, Population, Quarantined, QuarantineReason,
    RunMeta, RunResult, SetViews,
};
use crate::normalize::normalize_identifier;
use crate::{alias, combine, curation, dedup, matcher, registry, report};

/// Run the full reconciliation per config. Stages execute strictly in
/// order: per catalog match → dedup, then combine → alias aggregation →
/// curation → registry. Dirty data lands in quarantine; only a gateway
/// outage is batch-fatal and only an invariant breach is run-fatal.
pub fn run(
    config: &PipelineConfig,
    input: &CatalogInput,
    gateway: &dyn Gateway,
    overrides: &[CurationOverride],
) -> Result<RunResult, ReconError> {
    let mut quarantine = input.quarantined.clone();
    let mut catalog_summaries: BTreeMap<String, CatalogSummary> = BTreeMap::new();
    let mut populations: BTreeMap<String, Population> = BTreeMap::new();

    for role in [&config.combine.primary, &config.combine.secondary] {
        let catalog = config
            .catalogs
            .get(role)
            .ok_or_else(|| ReconError::UnknownCatalog(role.clone()))?;
        let records = input
            .records
            .get(role)
            .ok_or_else(|| ReconError::UnknownCatalog(format!("catalog '{role}' has no data")))?;

        let match_report = matcher::match_catalog(
            records,
            catalog.lookup_scheme,
            gateway,
            config.gateway.batch_size,
            &config.aliases.languages,
        );
        let (resolutions, match_quarantine) = matcher::settle(match_report);
        let deduped = dedup::dedup_catalog(resolutions);

        let mut role_quarantine = match_quarantine;
        role_quarantine.extend(deduped.quarantined);

        let malformed = input
            .quarantined
            .iter()
            .filter(|q| q.record.catalog == *role)
            .count();
        let summary = report::catalog_summary(
            role,
            records.len() + malformed,
            deduped.population.len(),
            &role_quarantine,
        );
        let summary = CatalogSummary { malformed, ..summary };

        quarantine.extend(role_quarantine);
        catalog_summaries.insert(role.clone(), summary);
        populations.insert(role.clone(), deduped.population);
    }

    let primary = populations.remove(&config.combine.primary).unwrap_or_default();
    let secondary = populations.remove(&config.combine.secondary).unwrap_or_default();

    let views = SetViews {
        exclusive_primary: combine::exclusive(&primary, &secondary),
        exclusive_secondary: combine::exclusive(&secondary, &primary),
        intersection: combine::intersection(&primary, &secondary),
    };
    let mut population = combine::union(&primary, &secondary);
    let union_size = population.len();

    let collisions = alias::aggregate_aliases(&mut population, &config.aliases.priority_attribute);
    let curation = curation::apply_overrides(&mut population, overrides);

    let registry = registry::build_registry(
        population.into_values().collect(),
        &config.output.sort_by,
        config.output.descending,
    )?;

    let summary = report::build_summary(
        catalog_summaries,
        &views,
        union_size,
        &collisions,
        &curation,
        quarantine.len(),
        registry.len(),
    );

    Ok(RunResult {
        meta: RunMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        views,
        registry,
        quarantine,
        collisions,
        curation,
    })
}

/// Parsed rows plus the rows quarantined during loading.
#[derive(Debug, Default)]
pub struct LoadedCatalog {
    pub records: Vec<CatalogRecord>,
    pub malformed: Vec<Quarantined>,
}

/// Load one catalog's CSV against its declared column mapping.
///
/// Rows with a missing display name or an unparseable attribute value are
/// quarantined individually and loading continues. Empty attribute cells
/// mean "absent", not zero. Identifier cells run through the normalizer;
/// placeholder values simply leave the scheme unset.
pub fn load_catalog_rows(
    catalog: &str,
    csv_data: &str,
    config: &CatalogConfig,
) -> Result<LoadedCatalog, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ReconError::Io(e.to_string()))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let col = &config.columns;
    let idx = |name: &str| -> Result<usize, ReconError> {
        headers.iter().position(|h| h == name).ok_or_else(|| ReconError::MissingColumn {
            catalog: catalog.into(),
            column: name.into(),
        })
    };

    let native_id_idx = idx(&col.native_id)?;
    let display_name_idx = idx(&col.display_name)?;

    let mut identifier_idx: Vec<(crate::model::IdScheme, usize)> = Vec::new();
    for (scheme, column) in &col.identifiers {
        identifier_idx.push((*scheme, idx(column)?));
    }
    let mut attribute_idx: Vec<(String, usize)> = Vec::new();
    for (name, column) in &col.attributes {
        attribute_idx.push((name.clone(), idx(column)?));
    }

    let mut loaded = LoadedCatalog::default();

    for row in reader.records() {
        let row = row.map_err(|e| ReconError::Io(e.to_string()))?;

        let native_id = row.get(native_id_idx).unwrap_or("").trim().to_string();
        let display_name = row.get(display_name_idx).unwrap_or("").trim().to_string();

        let mut record = CatalogRecord {
            catalog: catalog.into(),
            native_id,
            display_name,
            labels: vec![],
            aliases: vec![],
            attributes: BTreeMap::new(),
            identifiers: BTreeSet::new(),
        };

        if record.display_name.is_empty() {
            loaded.malformed.push(Quarantined {
                reason: QuarantineReason::Malformed,
                record,
                candidates: vec![],
                note: format!("empty '{}' column", col.display_name),
            });
            continue;
        }

        let mut bad_attribute = None;
        for (name, i) in &attribute_idx {
            let cell = row.get(*i).unwrap_or("").trim();
            if cell.is_empty() || cell.eq_ignore_ascii_case("none") {
                continue;
            }
            match cell.parse::<i64>() {
                Ok(value) => {
                    record.attributes.insert(name.clone(), value);
                }
                Err(_) => {
                    bad_attribute = Some(format!("cannot parse {name} value '{cell}'"));
                    break;
                }
            }
        }
        if let Some(note) = bad_attribute {
            loaded.malformed.push(Quarantined {
                reason: QuarantineReason::Malformed,
                record,
                candidates: vec![],
                note,
            });
            continue;
        }

        for (scheme, i) in &identifier_idx {
            if let Some(id) = normalize_identifier(*scheme, row.get(*i).unwrap_or("")) {
                record.identifiers.insert(id);
            }
        }

        loaded.records.push(record);
    }

    Ok(loaded)
}
