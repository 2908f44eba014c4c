use std::collections::BTreeMap;

use crate::matcher::Resolution;
use crate::model::{Identifier, Population, Quarantined, QuarantineReason};

/// Result of the within-catalog duplicate scan.
#[derive(Debug, Default)]
pub struct DedupOutcome {
    pub population: Population,
    pub quarantined: Vec<Quarantined>,
}

/// Quarantine every group of resolutions sharing a canonical key.
///
/// Whole groups are set aside, not just the "extra" members: a catalog
/// that mapped two rows onto one entity is untrustworthy for that entity,
/// and the policy never guesses which duplicate is authoritative. Given
/// the same input order the quarantined groups are identical across runs.
pub fn dedup_catalog(resolutions: Vec<Resolution>) -> DedupOutcome {
    let mut groups: BTreeMap<Identifier, Vec<Resolution>> = BTreeMap::new();
    for resolution in resolutions {
        groups
            .entry(resolution.author.key.clone())
            .or_default()
            .push(resolution);
    }

    let mut outcome = DedupOutcome::default();
    for (key, group) in groups {
        if group.len() == 1 {
            let resolution = group.into_iter().next().unwrap();
            outcome.population.insert(key, resolution.author);
        } else {
            let note = format!("{} records share canonical key {key}", group.len());
            for resolution in group {
                outcome.quarantined.push(Quarantined {
                    reason: QuarantineReason::DuplicateKey,
                    record: resolution.record,
                    candidates: vec![key.clone()],
                    note: note.clone(),
                });
            }
        }
    }

    outcome
}
