//! Core types shared across field resolution.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Horizontal alignment hint for a field's cell content.
///
/// A styling hint only; it never affects resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl TextAlign {
    /// Parse an alignment from its declaration-file spelling.
    ///
    /// Returns `None` for unknown values (caller should error).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "left" => Some(TextAlign::Left),
            "center" => Some(TextAlign::Center),
            "right" => Some(TextAlign::Right),
            _ => None,
        }
    }

    /// CSS utility class the renderer pairs with this alignment.
    pub fn css_class(&self) -> &'static str {
        match self {
            TextAlign::Left => "text-left",
            TextAlign::Center => "text-center",
            TextAlign::Right => "text-right",
        }
    }
}

/// Direction of an active column sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Externally tracked sort state for a listing.
///
/// The resolution core does not sort rows; it only reports, per field,
/// whether that field is the current sort column so the renderer can
/// draw the indicator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortState {
    /// Attribute of the column the listing is sorted by, if any.
    pub column: Option<String>,
    /// Direction of the active sort. Ignored when `column` is `None`.
    pub direction: Option<SortDirection>,
}

impl SortState {
    /// An unsorted listing.
    pub fn unsorted() -> Self {
        Self::default()
    }

    /// A listing sorted ascending by the given column attribute.
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: Some(column.into()),
            direction: Some(SortDirection::Asc),
        }
    }

    /// A listing sorted descending by the given column attribute.
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: Some(column.into()),
            direction: Some(SortDirection::Desc),
        }
    }

    /// Whether this state sorts by `attribute` in `direction`.
    pub fn is(&self, attribute: &str, direction: SortDirection) -> bool {
        self.column.as_deref() == Some(attribute) && self.direction == Some(direction)
    }
}

/// Visual style for the rendered table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableStyleKind {
    #[default]
    Default,
    Tight,
}

impl TableStyleKind {
    /// Parse a style kind from its declaration-file spelling.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "default" => Some(TableStyleKind::Default),
            "tight" => Some(TableStyleKind::Tight),
            _ => None,
        }
    }

    /// CSS class the renderer pairs with this style.
    pub fn css_class(&self) -> &'static str {
        match self {
            TableStyleKind::Default => "table-default",
            TableStyleKind::Tight => "table-tight",
        }
    }
}

/// Table-level presentation configuration.
///
/// Consumed by the renderer only; resolution never reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableStyle {
    pub kind: TableStyleKind,
    /// Whether to draw borders between columns.
    pub column_borders: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_type_names() {
        assert_eq!(json_type_name(&json!(null)), "null");
        assert_eq!(json_type_name(&json!(true)), "boolean");
        assert_eq!(json_type_name(&json!(1)), "number");
        assert_eq!(json_type_name(&json!("x")), "string");
        assert_eq!(json_type_name(&json!([])), "array");
        assert_eq!(json_type_name(&json!({})), "object");
    }

    #[test]
    fn text_align_parse_valid() {
        assert_eq!(TextAlign::parse("left"), Some(TextAlign::Left));
        assert_eq!(TextAlign::parse("center"), Some(TextAlign::Center));
        assert_eq!(TextAlign::parse("right"), Some(TextAlign::Right));
    }

    #[test]
    fn text_align_parse_invalid() {
        assert_eq!(TextAlign::parse("middle"), None);
        assert_eq!(TextAlign::parse(""), None);
    }

    #[test]
    fn text_align_css_class() {
        assert_eq!(TextAlign::Left.css_class(), "text-left");
        assert_eq!(TextAlign::Right.css_class(), "text-right");
    }

    #[test]
    fn sort_state_matching() {
        let state = SortState::asc("email");
        assert!(state.is("email", SortDirection::Asc));
        assert!(!state.is("email", SortDirection::Desc));
        assert!(!state.is("name", SortDirection::Asc));
    }

    #[test]
    fn sort_state_unsorted_matches_nothing() {
        let state = SortState::unsorted();
        assert!(!state.is("email", SortDirection::Asc));
        assert!(!state.is("email", SortDirection::Desc));
    }

    #[test]
    fn table_style_kind_parse() {
        assert_eq!(TableStyleKind::parse("tight"), Some(TableStyleKind::Tight));
        assert_eq!(
            TableStyleKind::parse("default"),
            Some(TableStyleKind::Default)
        );
        assert_eq!(TableStyleKind::parse("loose"), None);
    }

    #[test]
    fn table_style_kind_css_class() {
        assert_eq!(TableStyleKind::Default.css_class(), "table-default");
        assert_eq!(TableStyleKind::Tight.css_class(), "table-tight");
    }
}
