//! `prosopon run` / `prosopon validate` — config-driven reconciliation.

use std::path::{Path, PathBuf};

use prosopon_gateway::GraphClient;
use prosopon_recon::curation::parse_overrides;
use prosopon_recon::gateway::{Gateway, MemoryGateway};
use prosopon_recon::model::{CatalogInput, RunResult};
use prosopon_recon::{load_catalog_rows, run, CurationOverride, PipelineConfig, ReconError};

use crate::artifacts;
use crate::CliError;

pub fn cmd_run(
    config_path: PathBuf,
    out_dir: Option<PathBuf>,
    json_output: bool,
    overrides_path: Option<PathBuf>,
    snapshot_path: Option<PathBuf>,
) -> Result<(), CliError> {
    let config_str = std::fs::read_to_string(&config_path)
        .map_err(|e| CliError::runtime(format!("cannot read config: {e}")))?;
    let config = PipelineConfig::from_toml(&config_str)
        .map_err(|e| CliError::config(e.to_string()))?;

    // Catalog files resolve relative to the config file's directory.
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    let mut input = CatalogInput::default();
    for (name, catalog) in &config.catalogs {
        let csv_path = base_dir.join(&catalog.file);
        let csv_data = std::fs::read_to_string(&csv_path).map_err(|e| {
            CliError::runtime(format!("cannot read {}: {e}", csv_path.display()))
        })?;
        let loaded = load_catalog_rows(name, &csv_data, catalog)
            .map_err(|e| CliError::runtime(e.to_string()))?;
        input.records.insert(name.clone(), loaded.records);
        input.quarantined.extend(loaded.malformed);
    }

    let overrides: Vec<CurationOverride> = match overrides_path {
        Some(path) => {
            let data = std::fs::read_to_string(&path).map_err(|e| {
                CliError::runtime(format!("cannot read {}: {e}", path.display()))
            })?;
            parse_overrides(&data).map_err(|e| CliError::config(e.to_string()))?
        }
        None => Vec::new(),
    };

    let gateway: Box<dyn Gateway> = match snapshot_path {
        Some(path) => {
            let data = std::fs::read_to_string(&path).map_err(|e| {
                CliError::runtime(format!("cannot read {}: {e}", path.display()))
            })?;
            Box::new(MemoryGateway::from_json(&data).map_err(|e| {
                CliError::runtime(format!("snapshot {}: {e}", path.display()))
            })?)
        }
        None => Box::new(
            GraphClient::new(&config.gateway).map_err(|e| CliError::runtime(e.to_string()))?,
        ),
    };

    let result = run(&config, &input, gateway.as_ref(), &overrides).map_err(|e| match e {
        ReconError::DuplicateKey(_) => CliError::invariant(e.to_string()),
        other => CliError::runtime(other.to_string()),
    })?;

    let out_dir = out_dir.unwrap_or_else(|| base_dir.join("out"));
    let written = artifacts::write_all(&out_dir, &config, &result)?;

    if json_output {
        let json_str = serde_json::to_string_pretty(&result)
            .map_err(|e| CliError::runtime(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    print_summary(&result);
    eprintln!("{} artifact(s) in {}", written.len(), out_dir.display());

    Ok(())
}

/// Human summary to stderr; machine output stays on stdout/files.
fn print_summary(result: &RunResult) {
    let s = &result.summary;
    for (name, c) in &s.catalogs {
        eprintln!(
            "catalog '{name}': {} records — {} matched, {} ambiguous, {} unmatched, \
             {} duplicates, {} lookup failures, {} malformed",
            c.records, c.matched, c.ambiguous, c.unmatched, c.duplicates, c.lookup_failures,
            c.malformed,
        );
    }
    eprintln!(
        "combined: {} union, {} intersection, {} + {} exclusive",
        s.union_size, s.intersection_size, s.exclusive_primary, s.exclusive_secondary,
    );
    eprintln!(
        "aliases: {} collision(s), {} unresolved; curation: {} applied, {} rejected",
        s.alias_collisions, s.unresolved_collisions, s.overrides_applied, s.overrides_rejected,
    );
    eprintln!(
        "registry: {} row(s), {} quarantined",
        s.registry_rows, s.quarantined,
    );
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config_str = std::fs::read_to_string(&config_path)
        .map_err(|e| CliError::runtime(format!("cannot read config: {e}")))?;

    match PipelineConfig::from_toml(&config_str) {
        Ok(config) => {
            eprintln!(
                "valid: '{}' with {} catalog(s), primary '{}', secondary '{}'",
                config.name,
                config.catalogs.len(),
                config.combine.primary,
                config.combine.secondary,
            );
            Ok(())
        }
        Err(e) => Err(CliError::config(e.to_string())),
    }
}
