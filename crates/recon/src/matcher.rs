use std::collections::BTreeMap;

use crate::gateway::{EntityRecord, Gateway};
use crate::model::{
    CanonicalAuthor, CatalogRecord, IdScheme, Identifier, MatchOutcome, MatchStatus, Quarantined,
    QuarantineReason,
};

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// One record successfully resolved to a canonical entity.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub record: CatalogRecord,
    pub author: CanonicalAuthor,
}

/// Result of matching one catalog against the canonical key space.
#[derive(Debug, Default)]
pub struct MatchReport {
    /// Exactly one outcome per record that reached classification.
    pub outcomes: Vec<MatchOutcome>,
    /// Entity data for every canonical key seen in the outcomes.
    pub entities: BTreeMap<Identifier, EntityRecord>,
    /// Records whose batch failed after the gateway exhausted retries.
    pub lookup_failures: Vec<Quarantined>,
    pub failed_batches: usize,
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// Resolve a catalog's records through the gateway, one bounded batch per
/// call, batches processed sequentially.
///
/// Classification per record: zero candidate keys → unmatched, exactly
/// one → matched, several → ambiguous. Records without an identifier of
/// the lookup scheme are unmatched without a round-trip. A failed batch
/// quarantines only its own records; later batches still run.
pub fn match_catalog(
    records: &[CatalogRecord],
    scheme: IdScheme,
    gateway: &dyn Gateway,
    batch_size: usize,
    langs: &[String],
) -> MatchReport {
    let mut report = MatchReport::default();

    // Records that can be queried, in input order.
    let mut queryable: Vec<(usize, String)> = Vec::new();
    for (idx, record) in records.iter().enumerate() {
        match record.identifier(scheme) {
            Some(value) => queryable.push((idx, value.to_string())),
            None => report.outcomes.push(MatchOutcome {
                record: record.clone(),
                status: MatchStatus::Unmatched,
            }),
        }
    }

    for chunk in queryable.chunks(batch_size.max(1)) {
        let values: Vec<String> = chunk.iter().map(|(_, v)| v.clone()).collect();
        match gateway.lookup(scheme, &values, langs) {
            Ok(reply) => {
                for (idx, value) in chunk {
                    let mut keys = reply.resolutions.get(value).cloned().unwrap_or_default();
                    keys.dedup();
                    let status = match keys.len() {
                        0 => MatchStatus::Unmatched,
                        1 => MatchStatus::Matched(keys.remove(0)),
                        _ => MatchStatus::Ambiguous(keys),
                    };
                    report.outcomes.push(MatchOutcome {
                        record: records[*idx].clone(),
                        status,
                    });
                }
                for (key, entity) in reply.entities {
                    report.entities.insert(key, entity);
                }
            }
            Err(err) => {
                // Fatal for this batch only.
                report.failed_batches += 1;
                for (idx, _) in chunk {
                    report.lookup_failures.push(Quarantined {
                        reason: QuarantineReason::LookupFailed,
                        record: records[*idx].clone(),
                        candidates: Vec::new(),
                        note: err.to_string(),
                    });
                }
            }
        }
    }

    report
}

/// Split classified outcomes into materialized resolutions and quarantine
/// entries, consuming the report.
pub fn settle(report: MatchReport) -> (Vec<Resolution>, Vec<Quarantined>) {
    let mut resolutions = Vec::new();
    let mut quarantined = report.lookup_failures;

    for outcome in report.outcomes {
        match outcome.status {
            MatchStatus::Matched(key) => {
                let author = build_author(&outcome.record, &key, report.entities.get(&key));
                resolutions.push(Resolution { record: outcome.record, author });
            }
            MatchStatus::Ambiguous(keys) => {
                let note = format!(
                    "{} resolves to {} canonical keys",
                    outcome.record.display_name,
                    keys.len()
                );
                quarantined.push(Quarantined {
                    reason: QuarantineReason::Ambiguous,
                    record: outcome.record,
                    candidates: keys,
                    note,
                });
            }
            MatchStatus::Unmatched => quarantined.push(Quarantined {
                reason: QuarantineReason::Unmatched,
                record: outcome.record,
                candidates: Vec::new(),
                note: String::new(),
            }),
        }
    }

    (resolutions, quarantined)
}

/// Seed a canonical author from a matched record plus the gateway's
/// entity data. Graph labels win over raw catalog labels; everything else
/// accumulates.
fn build_author(
    record: &CatalogRecord,
    key: &Identifier,
    entity: Option<&EntityRecord>,
) -> CanonicalAuthor {
    let mut author = CanonicalAuthor::new(key.clone());
    author.provenance.insert(record.catalog.clone());
    author.identifiers.extend(record.identifiers.iter().cloned());
    author.identifiers.insert(Identifier::new(
        IdScheme::Native,
        format!("{}/{}", record.catalog, record.native_id),
    ));
    author.attributes = record.attributes.clone();

    if let Some(entity) = entity {
        author.labels.extend(entity.labels.clone());
        for (lang, aliases) in &entity.aliases {
            author
                .aliases
                .entry(lang.clone())
                .or_default()
                .extend(aliases.iter().cloned());
        }
        author.identifiers.extend(entity.identifiers.iter().cloned());
        author.languages.extend(entity.languages.iter().cloned());
        for (name, value) in &entity.attributes {
            author.attributes.entry(name.clone()).or_insert(*value);
        }
    }

    for (lang, text) in &record.labels {
        author.labels.entry(lang.clone()).or_insert_with(|| text.clone());
    }
    for (lang, text) in &record.aliases {
        author
            .aliases
            .entry(lang.clone())
            .or_default()
            .insert(text.clone());
    }

    author
}
