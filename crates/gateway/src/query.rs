//! SPARQL query construction and result parsing.
//!
//! One query per batch: a `VALUES` block over the batch, resolution
//! through the scheme's direct property (P214 for VIAF cluster IDs,
//! P11252 for Trismegistos author IDs, direct `wd:` entity values for
//! canonical keys), per-language label/alias retrieval with
//! `GROUP_CONCAT` alias packing, and writing languages via P6886.

use std::collections::BTreeMap;

use prosopon_recon::gateway::{EntityRecord, GatewayError, LookupReply};
use prosopon_recon::model::{IdScheme, Identifier};

const PREFIXES: &str = "\
PREFIX wd:   <http://www.wikidata.org/entity/>
PREFIX wdt:  <http://www.wikidata.org/prop/direct/>
PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>
PREFIX skos: <http://www.w3.org/2004/02/skos/core#>
";

/// Alias/identifier packing separator inside one result cell. Pipe
/// rather than comma: names routinely contain commas.
const SEP: &str = "|";

/// The knowledge graph's direct property holding this scheme's
/// identifier. Canonical keys need no property (queried as `wd:`
/// values); native catalog IDs have no graph presence at all.
fn scheme_property(scheme: IdScheme) -> Result<Option<&'static str>, GatewayError> {
    match scheme {
        IdScheme::Viaf => Ok(Some("P214")),
        IdScheme::Trismegistos => Ok(Some("P11252")),
        IdScheme::Qid => Ok(None),
        IdScheme::Native => Err(GatewayError::Parse(
            "native catalog identifiers cannot be resolved through the knowledge graph".into(),
        )),
    }
}

/// SPARQL variable suffix for a language tag (`pt-br` → `pt_br`).
fn lang_var(lang: &str) -> String {
    lang.replace('-', "_")
}

fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Build the batch query for one scheme.
pub fn build_query(
    scheme: IdScheme,
    batch: &[String],
    langs: &[String],
) -> Result<String, GatewayError> {
    let property = scheme_property(scheme)?;

    let mut select = String::from("SELECT ?value ?item");
    let mut aggregates = String::new();
    let mut body = String::new();

    match property {
        Some(prop) => {
            let values: Vec<String> = batch.iter().map(|v| quoted(v)).collect();
            body.push_str(&format!("  VALUES ?value {{ {} }}\n", values.join(" ")));
            body.push_str(&format!("  ?item wdt:{prop} ?value.\n"));
            // Every same-scheme identifier the entity carries, not just
            // the queried one.
            body.push_str(&format!("  OPTIONAL {{ ?item wdt:{prop} ?cluster. }}\n"));
            aggregates.push_str(&format!(
                "  (GROUP_CONCAT(DISTINCT ?cluster; SEPARATOR={sep}) AS ?clusters)\n",
                sep = quoted(SEP)
            ));
        }
        None => {
            let values: Vec<String> = batch.iter().map(|v| format!("wd:{v}")).collect();
            body.push_str(&format!("  VALUES ?item {{ {} }}\n", values.join(" ")));
            body.push_str("  BIND(STRAFTER(STR(?item), \"entity/\") AS ?value)\n");
        }
    }

    for lang in langs {
        let var = lang_var(lang);
        select.push_str(&format!(" ?label_{var}"));
        body.push_str(&format!(
            "  OPTIONAL {{ ?item rdfs:label ?label_{var}. FILTER(LANG(?label_{var}) = {lit}) }}\n",
            lit = quoted(lang)
        ));
        body.push_str(&format!(
            "  OPTIONAL {{ ?item skos:altLabel ?alias_{var}. FILTER(LANG(?alias_{var}) = {lit}) }}\n",
            lit = quoted(lang)
        ));
        aggregates.push_str(&format!(
            "  (GROUP_CONCAT(DISTINCT ?alias_{var}; SEPARATOR={sep}) AS ?aliases_{var})\n",
            sep = quoted(SEP)
        ));
    }

    body.push_str(
        "  OPTIONAL { ?item wdt:P6886 ?writingLang. ?writingLang rdfs:label ?writingLabel. \
         FILTER(LANG(?writingLabel) = \"en\") }\n",
    );
    aggregates.push_str(&format!(
        "  (GROUP_CONCAT(DISTINCT ?writingLabel; SEPARATOR={sep}) AS ?writing)\n",
        sep = quoted(SEP)
    ));

    let group_by: Vec<String> = std::iter::once("?value".to_string())
        .chain(std::iter::once("?item".to_string()))
        .chain(langs.iter().map(|l| format!("?label_{}", lang_var(l))))
        .collect();

    Ok(format!(
        "{PREFIXES}\n{select}\n{aggregates}WHERE {{\n{body}}}\nGROUP BY {group}\n",
        group = group_by.join(" ")
    ))
}

/// One bound variable from a result row, skipping empty strings (an
/// empty `GROUP_CONCAT` means nothing matched).
fn bound<'a>(row: &'a serde_json::Value, var: &str) -> Option<&'a str> {
    row.get(var)
        .and_then(|b| b.get("value"))
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
}

/// Parse a `sparql-results+json` document into a lookup reply.
pub fn parse_reply(
    scheme: IdScheme,
    langs: &[String],
    json: &serde_json::Value,
) -> Result<LookupReply, GatewayError> {
    let bindings = json
        .get("results")
        .and_then(|r| r.get("bindings"))
        .and_then(|b| b.as_array())
        .ok_or_else(|| GatewayError::Parse("missing results.bindings".into()))?;

    let mut resolutions: BTreeMap<String, Vec<Identifier>> = BTreeMap::new();
    let mut entities: BTreeMap<Identifier, EntityRecord> = BTreeMap::new();

    for row in bindings {
        let Some(value) = bound(row, "value") else {
            continue;
        };
        let Some(item) = bound(row, "item") else {
            continue;
        };
        let qid = item.trim_end_matches('/').rsplit('/').next().unwrap_or(item);
        let key = Identifier::qid(qid);

        let keys = resolutions.entry(value.to_string()).or_default();
        if !keys.contains(&key) {
            keys.push(key.clone());
        }

        let entity = entities.entry(key.clone()).or_default();
        entity.identifiers.insert(key.clone());

        for lang in langs {
            let var = lang_var(lang);
            if let Some(label) = bound(row, &format!("label_{var}")) {
                entity.labels.insert(lang.clone(), label.to_string());
            }
            if let Some(packed) = bound(row, &format!("aliases_{var}")) {
                entity
                    .aliases
                    .entry(lang.clone())
                    .or_default()
                    .extend(unpack(packed));
            }
        }

        if let Some(packed) = bound(row, "clusters") {
            for cluster in unpack(packed) {
                entity.identifiers.insert(Identifier::new(scheme, cluster));
            }
        }
        if let Some(packed) = bound(row, "writing") {
            entity.languages.extend(unpack(packed));
        }
    }

    Ok(LookupReply { resolutions, entities })
}

fn unpack(packed: &str) -> impl Iterator<Item = String> + '_ {
    packed
        .split(SEP)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
