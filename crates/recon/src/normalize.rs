use crate::model::{IdScheme, Identifier};

/// Placeholder strings that mean "no identifier". Catalog exports write
/// these literally into otherwise-empty cells.
const PLACEHOLDERS: [&str; 4] = ["none", "null", "nan", "n/a"];

/// Canonicalize one identifier cell into a typed identifier.
///
/// Accepts bare values (`"803890"`), full URIs
/// (`"https://viaf.org/viaf/803890/"`), and quoted or padded variants of
/// either. Returns `None` for empty or placeholder cells — a missing
/// identifier is an expected case, not a fault. The scheme is taken from
/// the declaring column, never guessed from the value.
pub fn normalize_identifier(scheme: IdScheme, raw: &str) -> Option<Identifier> {
    let mut value = raw.trim();
    value = value.trim_matches(|c| c == '"' || c == '\'').trim();

    if value.contains("://") {
        value = value
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or("");
    }

    if value.is_empty() || PLACEHOLDERS.contains(&value.to_ascii_lowercase().as_str()) {
        return None;
    }

    Some(Identifier::new(scheme, value))
}
