//! The table schema contract.

use crate::collection::FieldCollection;
use crate::types::TableStyle;

/// Opaque data-source scoping request.
///
/// The resolution core never builds or executes queries; this type
/// only flows through [`Table::index_query`] so schemas can push
/// filtering or sorting down to their row source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query(pub serde_json::Value);

/// Schema for one entity type: the ordered field declarations plus
/// table-level presentation configuration.
///
/// `fields` must be pure with respect to row data: it declares
/// descriptors, not resolved values. It may consult ambient context
/// (for example the current viewer) to decide which fields exist at
/// all.
pub trait Table {
    /// Entity type name the listing is derived from (for example
    /// `"UserProfile"`).
    fn name(&self) -> &str;

    /// The ordered field declarations.
    fn fields(&self) -> FieldCollection;

    /// Extension point for storage-level scoping. Identity by
    /// default; the core never interprets the query.
    fn index_query(&self, query: Query) -> Query {
        query
    }

    /// Table-level presentation configuration. Rendering only.
    fn style(&self) -> TableStyle {
        TableStyle::default()
    }

    /// Displayable label for the listing, derived from the entity
    /// type name.
    fn label(&self) -> String {
        default_label(self.name())
    }
}

/// Derive a listing label from an entity type name: word-split,
/// title-cased, last word pluralized. `"UserProfile"` becomes
/// `"User Profiles"`, `"order_item"` becomes `"Order Items"`.
pub fn default_label(name: &str) -> String {
    let words = split_words(name);
    let count = words.len();
    words
        .into_iter()
        .enumerate()
        .map(|(i, word)| {
            let word = title_case(&word);
            if i + 1 == count {
                pluralize(&word)
            } else {
                word
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split a type name on underscores, spaces, hyphens, and lower-to-upper
/// camel-case boundaries.
fn split_words(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();

    for ch in name.chars() {
        if ch == '_' || ch == ' ' || ch == '-' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        } else if ch.is_uppercase() && current.chars().last().is_some_and(char::is_lowercase) {
            words.push(std::mem::take(&mut current));
            current.push(ch);
        } else {
            current.push(ch);
        }
    }

    if !current.is_empty() {
        words.push(current);
    }

    words
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
    }
}

/// English pluralization covering the common regular cases.
fn pluralize(word: &str) -> String {
    let lower = word.to_lowercase();

    if let Some(stem) = word.strip_suffix('y') {
        let penultimate = stem.chars().last();
        if penultimate.is_some_and(|c| !"aeiou".contains(c.to_ascii_lowercase())) {
            return format!("{stem}ies");
        }
    }

    if lower.ends_with('s')
        || lower.ends_with('x')
        || lower.ends_with('z')
        || lower.ends_with("ch")
        || lower.ends_with("sh")
    {
        return format!("{word}es");
    }

    format!("{word}s")
}
