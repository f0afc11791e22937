//! Nested attribute lookup over JSON rows.
//!
//! Attribute paths address values inside a row. Two delimiter
//! spellings are accepted for backward schema compatibility, the dot
//! form (`contact.email`) and the relation-arrow form
//! (`contact->email`); both normalize to dot segments before
//! traversal. Numeric segments index into arrays.

use serde_json::Value;

/// Normalize an attribute path to dot-delimited segments.
pub fn normalize(attribute: &str) -> String {
    attribute.replace("->", ".")
}

/// Look up a nested value by attribute path.
///
/// Returns `None` when any segment is missing or traverses a
/// non-container. A missing path is not an error; callers substitute
/// the field's configured default.
pub fn lookup<'a>(row: &'a Value, attribute: &str) -> Option<&'a Value> {
    let normalized = normalize(attribute);
    let mut current = row;

    for segment in normalized.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => {
                let index: usize = segment.parse().ok()?;
                items.get(index)?
            }
            _ => return None,
        };
    }

    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_top_level() {
        let row = json!({"name": "Ada"});
        assert_eq!(lookup(&row, "name"), Some(&json!("Ada")));
    }

    #[test]
    fn lookup_nested_dot() {
        let row = json!({"contact": {"email": "ada@example.com"}});
        assert_eq!(lookup(&row, "contact.email"), Some(&json!("ada@example.com")));
    }

    #[test]
    fn lookup_arrow_spelling() {
        let row = json!({"contact": {"email": "ada@example.com"}});
        assert_eq!(
            lookup(&row, "contact->email"),
            Some(&json!("ada@example.com"))
        );
    }

    #[test]
    fn lookup_mixed_delimiters() {
        let row = json!({"a": {"b": {"c": 1}}});
        assert_eq!(lookup(&row, "a->b.c"), Some(&json!(1)));
    }

    #[test]
    fn lookup_array_index() {
        let row = json!({"tags": ["admin", "staff"]});
        assert_eq!(lookup(&row, "tags.1"), Some(&json!("staff")));
    }

    #[test]
    fn lookup_missing_segment() {
        let row = json!({"contact": {"email": "x"}});
        assert_eq!(lookup(&row, "contact.phone"), None);
        assert_eq!(lookup(&row, "address.city"), None);
    }

    #[test]
    fn lookup_through_scalar() {
        let row = json!({"name": "Ada"});
        assert_eq!(lookup(&row, "name.first"), None);
    }

    #[test]
    fn lookup_bad_array_index() {
        let row = json!({"tags": ["admin"]});
        assert_eq!(lookup(&row, "tags.5"), None);
        assert_eq!(lookup(&row, "tags.first"), None);
    }

    #[test]
    fn normalize_arrow() {
        assert_eq!(normalize("contact->email"), "contact.email");
        assert_eq!(normalize("plain"), "plain");
    }
}
