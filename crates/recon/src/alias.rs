use std::collections::BTreeMap;

use crate::model::{AliasCollision, Identifier, Population};

/// Normalize an alias for comparison and storage: trim, collapse case.
/// Original casing is not preserved — the alias set is a lookup surface,
/// not a display surface.
pub fn normalize_alias(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Merge labels and aliases per entity, normalize, deduplicate, and
/// resolve cross-entity collisions.
///
/// Main display labels are folded into the alias sets first (they are
/// implicit aliases). When the same normalized alias lands, for the same
/// language, on several entities, the entity with the highest
/// `priority_attribute` value keeps it and the rest lose it; a tie is
/// recorded with `resolved: None` and left to curation — nothing is
/// settled silently. Returns every collision observed, resolved or not.
pub fn aggregate_aliases(
    population: &mut Population,
    priority_attribute: &str,
) -> Vec<AliasCollision> {
    // Fold labels in, normalize, dedup within each entity.
    for author in population.values_mut() {
        for (lang, label) in author.labels.clone() {
            let folded = normalize_alias(&label);
            if !folded.is_empty() {
                author.aliases.entry(lang).or_default().insert(folded);
            }
        }
        for aliases in author.aliases.values_mut() {
            *aliases = aliases
                .iter()
                .map(|a| normalize_alias(a))
                .filter(|a| !a.is_empty())
                .collect();
        }
        author.aliases.retain(|_, set| !set.is_empty());
    }

    // Claim map: (lang, alias) -> claiming keys, in key order.
    let mut claims: BTreeMap<(String, String), Vec<Identifier>> = BTreeMap::new();
    for (key, author) in population.iter() {
        for (lang, aliases) in &author.aliases {
            for alias in aliases {
                claims
                    .entry((lang.clone(), alias.clone()))
                    .or_default()
                    .push(key.clone());
            }
        }
    }

    let mut collisions = Vec::new();
    for ((lang, alias), keys) in claims {
        if keys.len() < 2 {
            continue;
        }

        let winner = pick_winner(population, &keys, priority_attribute);
        if let Some(ref winner) = winner {
            for key in &keys {
                if key != winner {
                    if let Some(author) = population.get_mut(key) {
                        if let Some(set) = author.aliases.get_mut(&lang) {
                            set.remove(&alias);
                            if set.is_empty() {
                                author.aliases.remove(&lang);
                            }
                        }
                    }
                }
            }
        }

        collisions.push(AliasCollision { lang, alias, keys, resolved: winner });
    }

    collisions
}

/// The unique claimant with the strictly highest priority value, if any.
fn pick_winner(
    population: &Population,
    keys: &[Identifier],
    priority_attribute: &str,
) -> Option<Identifier> {
    let best = keys
        .iter()
        .map(|k| {
            population
                .get(k)
                .map(|a| a.attribute_or_zero(priority_attribute))
                .unwrap_or(0)
        })
        .max()?;
    let mut at_best = keys.iter().filter(|k| {
        population
            .get(*k)
            .map(|a| a.attribute_or_zero(priority_attribute))
            .unwrap_or(0)
            == best
    });
    let winner = at_best.next()?.clone();
    if at_best.next().is_some() {
        None
    } else {
        Some(winner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CanonicalAuthor;

    fn author(key: &str, collections: i64) -> CanonicalAuthor {
        let mut a = CanonicalAuthor::new(Identifier::qid(key));
        a.attributes.insert("collections".into(), collections);
        a
    }

    fn with_alias(mut a: CanonicalAuthor, lang: &str, alias: &str) -> CanonicalAuthor {
        a.aliases.entry(lang.into()).or_default().insert(alias.into());
        a
    }

    fn pop(authors: Vec<CanonicalAuthor>) -> Population {
        authors.into_iter().map(|a| (a.key.clone(), a)).collect()
    }

    #[test]
    fn normalization_trims_and_case_folds() {
        assert_eq!(normalize_alias("  Seneca the Younger "), "seneca the younger");
        assert_eq!(normalize_alias("SÉNÈQUE"), "sénèque");
    }

    #[test]
    fn labels_fold_in_as_implicit_aliases() {
        let mut a = author("Q2054", 387);
        a.labels.insert("en".into(), "Seneca".into());
        let mut population = pop(vec![a]);

        aggregate_aliases(&mut population, "collections");
        let merged = &population[&Identifier::qid("Q2054")];
        assert!(merged.aliases["en"].contains("seneca"));
    }

    #[test]
    fn case_variants_dedupe_within_one_entity() {
        let a = with_alias(
            with_alias(author("Q1", 1), "en", "Trismegistus"),
            "en",
            "trismegistus ",
        );
        let mut population = pop(vec![a]);
        aggregate_aliases(&mut population, "collections");
        assert_eq!(population[&Identifier::qid("Q1")].aliases["en"].len(), 1);
    }

    #[test]
    fn collision_goes_to_higher_priority_entity() {
        // Two authors conventionally sharing a nickname; the one with more
        // holdings keeps it.
        let big = with_alias(author("Q2054", 387), "en", "Seneca");
        let small = with_alias(author("Q319578", 12), "en", "seneca");
        let mut population = pop(vec![big, small]);

        let collisions = aggregate_aliases(&mut population, "collections");

        assert_eq!(collisions.len(), 1);
        assert_eq!(collisions[0].resolved, Some(Identifier::qid("Q2054")));
        assert!(population[&Identifier::qid("Q2054")].aliases["en"].contains("seneca"));
        assert!(!population[&Identifier::qid("Q319578")]
            .aliases
            .get("en")
            .map(|s| s.contains("seneca"))
            .unwrap_or(false));
    }

    #[test]
    fn tied_priority_is_reported_not_guessed() {
        let one = with_alias(author("Q1", 10), "en", "homer");
        let two = with_alias(author("Q2", 10), "en", "homer");
        let mut population = pop(vec![one, two]);

        let collisions = aggregate_aliases(&mut population, "collections");

        assert_eq!(collisions.len(), 1);
        assert_eq!(collisions[0].resolved, None);
        // Both entities keep the alias until curation decides.
        assert!(population[&Identifier::qid("Q1")].aliases["en"].contains("homer"));
        assert!(population[&Identifier::qid("Q2")].aliases["en"].contains("homer"));
    }

    #[test]
    fn same_alias_in_different_languages_is_no_collision() {
        let one = with_alias(author("Q1", 5), "en", "Hermes");
        let two = with_alias(author("Q2", 3), "fr", "Hermes");
        let mut population = pop(vec![one, two]);
        let collisions = aggregate_aliases(&mut population, "collections");
        assert!(collisions.is_empty());
    }

    #[test]
    fn resolved_sets_are_disjoint_per_language() {
        let a = with_alias(with_alias(author("Q1", 100), "en", "alpha"), "en", "shared");
        let b = with_alias(with_alias(author("Q2", 50), "en", "beta"), "en", "Shared");
        let mut population = pop(vec![a, b]);

        aggregate_aliases(&mut population, "collections");

        let left = &population[&Identifier::qid("Q1")].aliases["en"];
        let right = &population[&Identifier::qid("Q2")].aliases["en"];
        assert!(left.is_disjoint(right));
    }
}
