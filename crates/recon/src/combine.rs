use crate::model::{CanonicalAuthor, Population};

/// Entities of `a` whose key does not occur in `b`.
pub fn exclusive(a: &Population, b: &Population) -> Population {
    a.iter()
        .filter(|(key, _)| !b.contains_key(*key))
        .map(|(key, author)| (key.clone(), author.clone()))
        .collect()
}

/// One entry per key present in both populations.
///
/// Non-identifier, non-provenance fields come from the higher-priority
/// `a`; fields only `b` has are dropped. Priority here is a deliberate
/// simplification, not a completeness claim — except for provenance and
/// identifiers, which are never lossy.
pub fn intersection(a: &Population, b: &Population) -> Population {
    a.iter()
        .filter_map(|(key, left)| {
            b.get(key).map(|right| (key.clone(), merge_priority(left, right)))
        })
        .collect()
}

/// One entry per key present in either population.
///
/// Per field the value is coalesced — taken from `a` when non-empty,
/// otherwise from `b` — so the two sources fill each other's gaps while
/// `a` still wins genuine conflicts. Granularity is per language for
/// labels and alias sets, per name for numeric attributes.
pub fn union(a: &Population, b: &Population) -> Population {
    let mut out = Population::new();
    for (key, left) in a {
        match b.get(key) {
            Some(right) => out.insert(key.clone(), merge_coalesce(left, right)),
            None => out.insert(key.clone(), left.clone()),
        };
    }
    for (key, right) in b {
        if !a.contains_key(key) {
            out.insert(key.clone(), right.clone());
        }
    }
    out
}

/// Intersection merge: `a`'s fields, both sides' identifiers and
/// provenance.
fn merge_priority(a: &CanonicalAuthor, b: &CanonicalAuthor) -> CanonicalAuthor {
    let mut merged = a.clone();
    merged.identifiers.extend(b.identifiers.iter().cloned());
    merged.provenance.extend(b.provenance.iter().cloned());
    merged
}

/// Union merge: per-field coalesce with `a` first, identifiers and
/// provenance always unioned.
fn merge_coalesce(a: &CanonicalAuthor, b: &CanonicalAuthor) -> CanonicalAuthor {
    let mut merged = a.clone();

    for (lang, label) in &b.labels {
        if !label.is_empty() {
            merged.labels.entry(lang.clone()).or_insert_with(|| label.clone());
        }
    }
    for (lang, aliases) in &b.aliases {
        if aliases.is_empty() {
            continue;
        }
        let slot = merged.aliases.entry(lang.clone()).or_default();
        if slot.is_empty() {
            *slot = aliases.clone();
        }
    }
    for (name, value) in &b.attributes {
        merged.attributes.entry(name.clone()).or_insert(*value);
    }
    if merged.languages.is_empty() {
        merged.languages = b.languages.clone();
    }

    merged.identifiers.extend(b.identifiers.iter().cloned());
    merged.provenance.extend(b.provenance.iter().cloned());
    merged
}
