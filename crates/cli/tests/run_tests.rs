use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use prosopon_cli::exit_codes::{EXIT_INVALID_CONFIG, EXIT_RUNTIME};
use prosopon_cli::run::{cmd_run, cmd_validate};
use prosopon_recon::gateway::{EntityRecord, MemoryGateway};
use prosopon_recon::model::{IdScheme, Identifier};

const CONFIG: &str = r#"
name = "ancient authors"

[catalogs.mediate]
file = "mediate.csv"
lookup_scheme = "viaf"

[catalogs.mediate.columns]
native_id    = "short_name"
display_name = "short_name"

[catalogs.mediate.columns.identifiers]
viaf = "viaf_id"

[catalogs.mediate.columns.attributes]
items       = "nb_items"
collections = "nb_collections"

[catalogs.trismegistos]
file = "trismegistos.csv"
lookup_scheme = "trismegistos"

[catalogs.trismegistos.columns]
native_id    = "ID"
display_name = "name"

[catalogs.trismegistos.columns.identifiers]
trismegistos = "ID"

[combine]
primary   = "mediate"
secondary = "trismegistos"
"#;

const MEDIATE_CSV: &str = "\
short_name,viaf_id,nb_items,nb_collections
Homerus,100,1043,394
Vergilius,200,905,380
";

const TM_CSV: &str = "\
ID,name
937,Homerus
938,Herodotus
";

const OVERRIDES: &str = r#"
[[override]]
op = "add"

[override.entity]
key = "Q999"
provenance = ["curation"]

[override.entity.labels]
en = "Anonymus Ravennas"
"#;

fn snapshot() -> MemoryGateway {
    let mut gw = MemoryGateway::new();

    let mut homer = EntityRecord::default();
    homer.labels.insert("en".into(), "Homer".into());
    homer
        .aliases
        .entry("en".into())
        .or_default()
        .insert("Homerus".into());
    gw.resolve(IdScheme::Viaf, "100", &[Identifier::qid("Q100")]);
    gw.entity(IdScheme::Viaf, Identifier::qid("Q100"), homer);

    gw.resolve(IdScheme::Viaf, "200", &[Identifier::qid("Q200")]);
    gw.entity(IdScheme::Viaf, Identifier::qid("Q200"), EntityRecord::default());

    // Same entity reached from the other catalog, carrying a French
    // alias the primary catalog lacks.
    let mut homer_tm = EntityRecord::default();
    homer_tm.aliases.entry("fr".into()).or_default().insert("Homère".into());
    gw.resolve(IdScheme::Trismegistos, "937", &[Identifier::qid("Q100")]);
    gw.entity(IdScheme::Trismegistos, Identifier::qid("Q100"), homer_tm);

    gw.resolve(IdScheme::Trismegistos, "938", &[Identifier::qid("Q300")]);
    gw.entity(IdScheme::Trismegistos, Identifier::qid("Q300"), EntityRecord::default());

    gw
}

/// Write config, catalogs and snapshot into `dir`; returns the config
/// and snapshot paths.
fn setup(dir: &Path) -> (PathBuf, PathBuf) {
    let config_path = dir.join("authors.toml");
    fs::write(&config_path, CONFIG).unwrap();
    fs::write(dir.join("mediate.csv"), MEDIATE_CSV).unwrap();
    fs::write(dir.join("trismegistos.csv"), TM_CSV).unwrap();

    let snapshot_path = dir.join("lookups.json");
    fs::write(&snapshot_path, serde_json::to_string(&snapshot()).unwrap()).unwrap();

    (config_path, snapshot_path)
}

fn read_rows(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect();
    (headers, rows)
}

fn cell<'a>(headers: &[String], row: &'a [String], column: &str) -> &'a str {
    let idx = headers.iter().position(|h| h == column).unwrap();
    &row[idx]
}

#[test]
fn run_writes_registry_and_view_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let (config_path, snapshot_path) = setup(dir.path());
    let out = dir.path().join("results");

    cmd_run(config_path, Some(out.clone()), false, None, Some(snapshot_path)).unwrap();

    let (headers, rows) = read_rows(&out.join("authors_registry.csv"));
    assert_eq!(rows.len(), 3); // Q100, Q200, Q300

    // Ranked by collections descending: Homer (394) first.
    assert_eq!(cell(&headers, &rows[0], "key"), "Q100");
    assert_eq!(cell(&headers, &rows[0], "label_en"), "Homer");

    for name in ["exclusive_mediate.csv", "exclusive_trismegistos.csv", "intersection.csv"] {
        assert!(out.join(name).exists(), "missing {name}");
    }
    let (_, intersection) = read_rows(&out.join("intersection.csv"));
    assert_eq!(intersection.len(), 1);
}

#[test]
fn list_cells_are_json_and_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let (config_path, snapshot_path) = setup(dir.path());
    let out = dir.path().join("results");

    cmd_run(config_path, Some(out.clone()), false, None, Some(snapshot_path)).unwrap();

    let (headers, rows) = read_rows(&out.join("authors_registry.csv"));
    let homer = rows.iter().find(|r| cell(&headers, r, "key") == "Q100").unwrap();

    // French alias contributed by the secondary catalog, normalized.
    let aliases_fr: Vec<String> =
        serde_json::from_str(cell(&headers, homer, "aliases_fr")).unwrap();
    assert_eq!(aliases_fr, vec!["homère"]);

    // Numeric attributes serialize as one JSON object per row.
    let attributes: BTreeMap<String, i64> =
        serde_json::from_str(cell(&headers, homer, "attributes")).unwrap();
    assert_eq!(attributes["items"], 1043);
    assert_eq!(attributes["collections"], 394);

    // Re-serializing the parsed cell reproduces it byte for byte: the
    // encoding is order-independent because the sets are sorted.
    let reparsed = serde_json::to_string(&aliases_fr).unwrap();
    assert_eq!(reparsed, cell(&headers, homer, "aliases_fr"));
}

#[test]
fn overrides_file_feeds_the_curation_overlay() {
    let dir = tempfile::tempdir().unwrap();
    let (config_path, snapshot_path) = setup(dir.path());
    let overrides_path = dir.path().join("curation.toml");
    fs::write(&overrides_path, OVERRIDES).unwrap();
    let out = dir.path().join("results");

    cmd_run(
        config_path,
        Some(out.clone()),
        false,
        Some(overrides_path),
        Some(snapshot_path),
    )
    .unwrap();

    let (headers, rows) = read_rows(&out.join("authors_registry.csv"));
    let added = rows.iter().find(|r| cell(&headers, r, "key") == "Q999").unwrap();
    assert_eq!(cell(&headers, added, "label_en"), "Anonymus Ravennas");
}

#[test]
fn validate_accepts_good_and_rejects_bad_configs() {
    let dir = tempfile::tempdir().unwrap();
    let (config_path, _) = setup(dir.path());
    cmd_validate(config_path).unwrap();

    let bad = dir.path().join("bad.toml");
    fs::write(&bad, "name = \"broken\"\n").unwrap();
    let err = cmd_validate(bad).unwrap_err();
    assert_eq!(err.code, EXIT_INVALID_CONFIG);
}

#[test]
fn missing_catalog_file_is_a_runtime_error() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("authors.toml");
    fs::write(&config_path, CONFIG).unwrap();
    // No CSVs on disk.
    let err = cmd_run(config_path, None, false, None, None).unwrap_err();
    assert_eq!(err.code, EXIT_RUNTIME);
    assert!(err.message.contains("mediate.csv"));
}

#[test]
fn quarantine_artifacts_written_only_when_non_empty() {
    let dir = tempfile::tempdir().unwrap();
    let (config_path, snapshot_path) = setup(dir.path());

    // An extra row whose identifier the snapshot cannot resolve.
    let mediate = format!("{MEDIATE_CSV}Ignotus,555,1,1\n");
    fs::write(dir.path().join("mediate.csv"), mediate).unwrap();

    let out = dir.path().join("results");
    cmd_run(config_path, Some(out.clone()), false, None, Some(snapshot_path)).unwrap();

    let (headers, rows) = read_rows(&out.join("quarantine_unmatched.csv"));
    assert_eq!(rows.len(), 1);
    assert_eq!(cell(&headers, &rows[0], "display_name"), "Ignotus");
    assert_eq!(cell(&headers, &rows[0], "reason"), "unmatched");

    // Nothing was ambiguous, so that artifact does not exist.
    assert!(!out.join("quarantine_ambiguous.csv").exists());
}
