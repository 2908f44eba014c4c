//! Artifact writers — registry, set views, quarantine and collision CSVs.
//!
//! List-valued cells are JSON arrays over sorted sets, so a cell
//! round-trips through re-parsing without loss and compares equal
//! regardless of source ordering. Mapping-valued cells are JSON objects
//! with sorted keys for the same reason.

use std::path::{Path, PathBuf};

use prosopon_recon::model::{
    AliasCollision, CanonicalAuthor, IdScheme, Population, Quarantined, QuarantineReason,
    RunResult,
};
use prosopon_recon::PipelineConfig;

use crate::CliError;

const SCHEMES: [IdScheme; 4] = [
    IdScheme::Qid,
    IdScheme::Viaf,
    IdScheme::Trismegistos,
    IdScheme::Native,
];

const QUARANTINE_REASONS: [QuarantineReason; 5] = [
    QuarantineReason::Ambiguous,
    QuarantineReason::Unmatched,
    QuarantineReason::DuplicateKey,
    QuarantineReason::LookupFailed,
    QuarantineReason::Malformed,
];

/// Write every artifact of a finished run under `out_dir`. Returns the
/// paths written. Quarantine and collision files are only produced when
/// they would be non-empty; registry and set views are always written.
pub fn write_all(
    out_dir: &Path,
    config: &PipelineConfig,
    result: &RunResult,
) -> Result<Vec<PathBuf>, CliError> {
    std::fs::create_dir_all(out_dir)
        .map_err(|e| CliError::runtime(format!("cannot create {}: {e}", out_dir.display())))?;

    let langs = &config.aliases.languages;
    let mut written = Vec::new();

    let registry_path = out_dir.join("authors_registry.csv");
    let authors: Vec<&CanonicalAuthor> = result.registry.iter().collect();
    write_author_rows(&registry_path, langs, &authors)?;
    written.push(registry_path);

    for (name, view) in [
        (format!("exclusive_{}.csv", config.combine.primary), &result.views.exclusive_primary),
        (format!("exclusive_{}.csv", config.combine.secondary), &result.views.exclusive_secondary),
        ("intersection.csv".to_string(), &result.views.intersection),
    ] {
        let path = out_dir.join(name);
        write_population(&path, langs, view)?;
        written.push(path);
    }

    for reason in QUARANTINE_REASONS {
        let rows: Vec<&Quarantined> =
            result.quarantine.iter().filter(|q| q.reason == reason).collect();
        if rows.is_empty() {
            continue;
        }
        let path = out_dir.join(format!("quarantine_{reason}.csv"));
        write_quarantine(&path, &rows)?;
        written.push(path);
    }

    if !result.collisions.is_empty() {
        let path = out_dir.join("alias_collisions.csv");
        write_collisions(&path, &result.collisions)?;
        written.push(path);
    }

    Ok(written)
}

fn json_cell<T: serde::Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string(value).map_err(|e| CliError::runtime(format!("serialization error: {e}")))
}

fn open_writer(path: &Path) -> Result<csv::Writer<std::fs::File>, CliError> {
    csv::Writer::from_path(path)
        .map_err(|e| CliError::runtime(format!("cannot write {}: {e}", path.display())))
}

fn finish(mut writer: csv::Writer<std::fs::File>, path: &Path) -> Result<(), CliError> {
    writer
        .flush()
        .map_err(|e| CliError::runtime(format!("cannot write {}: {e}", path.display())))
}

fn write_record(
    writer: &mut csv::Writer<std::fs::File>,
    path: &Path,
    record: &[String],
) -> Result<(), CliError> {
    writer
        .write_record(record)
        .map_err(|e| CliError::runtime(format!("cannot write {}: {e}", path.display())))
}

fn write_population(path: &Path, langs: &[String], view: &Population) -> Result<(), CliError> {
    let authors: Vec<&CanonicalAuthor> = view.values().collect();
    write_author_rows(path, langs, &authors)
}

/// One row per canonical entity: key, per-language label and alias
/// columns, per-scheme identifier columns, provenance, writing
/// languages, numeric attributes.
fn write_author_rows(
    path: &Path,
    langs: &[String],
    authors: &[&CanonicalAuthor],
) -> Result<(), CliError> {
    let mut writer = open_writer(path)?;

    let mut header: Vec<String> = vec!["key".into()];
    for lang in langs {
        header.push(format!("label_{lang}"));
        header.push(format!("aliases_{lang}"));
    }
    for scheme in SCHEMES {
        header.push(format!("ids_{scheme}"));
    }
    header.extend(["provenance".into(), "writing_languages".into(), "attributes".into()]);
    write_record(&mut writer, path, &header)?;

    for author in authors {
        let mut row: Vec<String> = vec![author.key.value.clone()];
        for lang in langs {
            row.push(author.labels.get(lang).cloned().unwrap_or_default());
            let aliases: Vec<&String> =
                author.aliases.get(lang).map(|s| s.iter().collect()).unwrap_or_default();
            row.push(json_cell(&aliases)?);
        }
        for scheme in SCHEMES {
            let values: Vec<&str> = author
                .identifiers
                .iter()
                .filter(|id| id.scheme == scheme)
                .map(|id| id.value.as_str())
                .collect();
            row.push(json_cell(&values)?);
        }
        row.push(json_cell(&author.provenance)?);
        row.push(json_cell(&author.languages)?);
        row.push(json_cell(&author.attributes)?);
        write_record(&mut writer, path, &row)?;
    }

    finish(writer, path)
}

/// Source row shape plus the reason code and note, so a quarantined row
/// stays traceable to its originating catalog record.
fn write_quarantine(path: &Path, rows: &[&Quarantined]) -> Result<(), CliError> {
    let mut writer = open_writer(path)?;
    let header: Vec<String> = [
        "reason", "catalog", "native_id", "display_name", "identifiers", "attributes",
        "candidates", "note",
    ]
    .map(String::from)
    .to_vec();
    write_record(&mut writer, path, &header)?;

    for q in rows {
        let identifiers: Vec<String> =
            q.record.identifiers.iter().map(|id| id.to_string()).collect();
        let candidates: Vec<String> = q.candidates.iter().map(|id| id.to_string()).collect();
        let row = vec![
            q.reason.to_string(),
            q.record.catalog.clone(),
            q.record.native_id.clone(),
            q.record.display_name.clone(),
            json_cell(&identifiers)?,
            json_cell(&q.record.attributes)?,
            json_cell(&candidates)?,
            q.note.clone(),
        ];
        write_record(&mut writer, path, &row)?;
    }

    finish(writer, path)
}

fn write_collisions(path: &Path, collisions: &[AliasCollision]) -> Result<(), CliError> {
    let mut writer = open_writer(path)?;
    write_record(
        &mut writer,
        path,
        &["lang".into(), "alias".into(), "keys".into(), "resolved".into()],
    )?;

    for c in collisions {
        let keys: Vec<String> = c.keys.iter().map(|k| k.to_string()).collect();
        let row = vec![
            c.lang.clone(),
            c.alias.clone(),
            json_cell(&keys)?,
            c.resolved.as_ref().map(|k| k.value.clone()).unwrap_or_default(),
        ];
        write_record(&mut writer, path, &row)?;
    }

    finish(writer, path)
}
