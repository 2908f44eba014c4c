use std::collections::BTreeMap;

use crate::curation::CurationReport;
use crate::model::{
    AliasCollision, CatalogSummary, Quarantined, QuarantineReason, RunSummary, SetViews,
};

/// Count one catalog's outcomes. `records` is every row considered for
/// the catalog, including rows quarantined at load time.
pub fn catalog_summary(
    catalog: &str,
    records: usize,
    matched: usize,
    quarantined: &[Quarantined],
) -> CatalogSummary {
    let mut summary = CatalogSummary { records, matched, ..CatalogSummary::default() };

    for q in quarantined.iter().filter(|q| q.record.catalog == catalog) {
        match q.reason {
            QuarantineReason::Ambiguous => summary.ambiguous += 1,
            QuarantineReason::Unmatched => summary.unmatched += 1,
            QuarantineReason::DuplicateKey => summary.duplicates += 1,
            QuarantineReason::LookupFailed => summary.lookup_failures += 1,
            QuarantineReason::Malformed => summary.malformed += 1,
        }
    }

    summary
}

/// Assemble the run-level summary from the finished stages.
pub fn build_summary(
    catalogs: BTreeMap<String, CatalogSummary>,
    views: &SetViews,
    union_size: usize,
    collisions: &[AliasCollision],
    curation: &CurationReport,
    quarantined: usize,
    registry_rows: usize,
) -> RunSummary {
    RunSummary {
        catalogs,
        union_size,
        intersection_size: views.intersection.len(),
        exclusive_primary: views.exclusive_primary.len(),
        exclusive_secondary: views.exclusive_secondary.len(),
        alias_collisions: collisions.len(),
        unresolved_collisions: collisions.iter().filter(|c| c.resolved.is_none()).count(),
        overrides_applied: curation.applied,
        overrides_rejected: curation.rejected.len(),
        quarantined,
        registry_rows,
    }
}
