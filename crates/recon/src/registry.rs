use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::error::ReconError;
use crate::model::{CanonicalAuthor, Identifier};

/// Freeze the final population into the registry order.
///
/// Verifies the canonical-key uniqueness invariant first; a violation
/// here means an upstream stage has a logic defect (dirty input can no
/// longer reach this point) and aborts the run. Ordering is by the
/// ranking attribute, then stable ascending tie-break on the key, so the
/// output is identical across runs.
pub fn build_registry(
    mut authors: Vec<CanonicalAuthor>,
    sort_by: &str,
    descending: bool,
) -> Result<Vec<CanonicalAuthor>, ReconError> {
    let mut seen: BTreeSet<&Identifier> = BTreeSet::new();
    for author in &authors {
        if !seen.insert(&author.key) {
            return Err(ReconError::DuplicateKey(author.key.clone()));
        }
    }

    authors.sort_by(|a, b| {
        let left = a.attribute_or_zero(sort_by);
        let right = b.attribute_or_zero(sort_by);
        let primary = if descending { right.cmp(&left) } else { left.cmp(&right) };
        match primary {
            Ordering::Equal => a.key.cmp(&b.key),
            other => other,
        }
    });

    Ok(authors)
}
