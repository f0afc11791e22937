//! Declarative table loading.
//!
//! Tables can be declared in JSON files so a listing's columns are
//! configurable without code. Declarations cover direct and relation
//! fields; computed fields and predicates stay code-level constructs.
//!
//! A declaration is checked against an embedded JSON Schema before any
//! field is constructed, so a malformed document is an invalid-schema
//! error up front, never a deferred resolution failure.

use std::path::Path;

use serde_json::{json, Value};

use crate::collection::FieldCollection;
use crate::error::{SchemaError, Violation};
use crate::field::{Field, Relation};
use crate::table::Table;
use crate::types::{json_type_name, TableStyle, TableStyleKind, TextAlign};

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// A table built from a JSON declaration.
#[derive(Debug, Clone)]
pub struct DeclaredTable {
    name: String,
    style: TableStyle,
    fields: Vec<Field>,
}

impl Table for DeclaredTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn fields(&self) -> FieldCollection {
        FieldCollection::new(self.fields.clone())
    }

    fn style(&self) -> TableStyle {
        self.style
    }
}

/// Load a table declaration from a file.
///
/// # Errors
///
/// Returns `SchemaError::FileNotFound` if the file doesn't exist,
/// `SchemaError::InvalidJson` for malformed JSON, or
/// `SchemaError::InvalidDeclaration` when the document violates the
/// declaration schema.
pub fn load_table(path: &Path) -> Result<DeclaredTable, SchemaError> {
    if !path.exists() {
        return Err(SchemaError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| SchemaError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    load_table_str(&content)
}

/// Load a table declaration from a JSON string.
///
/// # Errors
///
/// Returns `SchemaError::InvalidJson` or
/// `SchemaError::InvalidDeclaration`.
pub fn load_table_str(content: &str) -> Result<DeclaredTable, SchemaError> {
    let document: Value =
        serde_json::from_str(content).map_err(|source| SchemaError::InvalidJson { source })?;
    build_table(&document)
}

/// Load a table declaration from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `SchemaError::NetworkError` if the request fails, plus the
/// same validation errors as [`load_table_str`].
#[cfg(feature = "remote")]
pub fn load_table_url(url: &str) -> Result<DeclaredTable, SchemaError> {
    let network_error = |source| SchemaError::NetworkError {
        url: url.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(network_error)?;

    let response = client
        .get(url)
        .send()
        .map_err(network_error)?
        .error_for_status()
        .map_err(network_error)?;

    let document: Value = response.json().map_err(network_error)?;
    build_table(&document)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load a table declaration from a file path or URL.
///
/// Automatically detects whether the source is a URL or file path.
/// URL loading requires the `remote` feature.
pub fn load_table_auto(source: &str) -> Result<DeclaredTable, SchemaError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_table_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(SchemaError::FileNotFound {
                path: std::path::PathBuf::from(source),
            })
        }
    } else {
        load_table(Path::new(source))
    }
}

/// JSON Schema the declaration document must satisfy.
fn declaration_schema() -> Value {
    let field_properties = json!({
        "name": { "type": "string", "minLength": 1 },
        "attribute": { "type": "string", "minLength": 1 },
        "sortable": { "type": "boolean" },
        "align": { "enum": ["left", "center", "right"] },
        "visible": { "type": "boolean" },
        "as_html": { "type": "boolean" },
        "default": {},
        "meta": { "type": "object" }
    });

    let mut relation_field = json!({
        "type": "object",
        "required": ["name"],
        "additionalProperties": false
    });
    relation_field["properties"] = field_properties.clone();

    let mut field = relation_field.clone();
    field["properties"]["relation"] = json!({
        "type": "object",
        "required": ["resource"],
        "properties": {
            "resource": { "type": "string", "minLength": 1 },
            "listable": { "type": "boolean" },
            "fields": {
                "type": "array",
                "items": { "$ref": "#/$defs/pivot_field" }
            }
        },
        "additionalProperties": false
    });

    json!({
        "type": "object",
        "required": ["name", "fields"],
        "properties": {
            "name": { "type": "string", "minLength": 1 },
            "style": { "enum": ["default", "tight"] },
            "column_borders": { "type": "boolean" },
            "fields": {
                "type": "array",
                "items": { "$ref": "#/$defs/field" }
            }
        },
        "additionalProperties": false,
        "$defs": {
            "field": field,
            "pivot_field": relation_field
        }
    })
}

/// Validate a declaration document against the embedded schema.
///
/// # Errors
///
/// Returns `SchemaError::InvalidDeclaration` carrying one violation
/// per schema failure.
pub fn validate_declaration(document: &Value) -> Result<(), SchemaError> {
    let schema = declaration_schema();
    let validator = jsonschema::validator_for(&schema).map_err(|e| SchemaError::InvalidField {
        path: "/".to_string(),
        message: e.to_string(),
    })?;

    let violations: Vec<Violation> = validator
        .iter_errors(document)
        .map(|e| Violation {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::InvalidDeclaration { violations })
    }
}

fn build_table(document: &Value) -> Result<DeclaredTable, SchemaError> {
    validate_declaration(document)?;

    // Structure is schema-checked above; the lookups here only guard
    // against it drifting out of sync with the schema.
    let name = require_str(document, "name", "/name")?.to_string();

    let style = TableStyle {
        kind: document
            .get("style")
            .and_then(Value::as_str)
            .and_then(TableStyleKind::parse)
            .unwrap_or_default(),
        column_borders: document
            .get("column_borders")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    };

    let declared = document
        .get("fields")
        .and_then(Value::as_array)
        .ok_or_else(|| SchemaError::InvalidField {
            path: "/fields".to_string(),
            message: "expected an array of field declarations".to_string(),
        })?;

    let mut fields = Vec::with_capacity(declared.len());
    for (index, decl) in declared.iter().enumerate() {
        let path = format!("/fields/{}", index);
        fields.push(build_field(decl, &path, true)?);
    }

    Ok(DeclaredTable { name, style, fields })
}

fn build_field(decl: &Value, path: &str, allow_relation: bool) -> Result<Field, SchemaError> {
    let name = require_str(decl, "name", path)?;

    let mut field = match decl.get("attribute").and_then(Value::as_str) {
        Some(attribute) => Field::from_path(name, attribute),
        None => Field::new(name),
    };

    if let Some(relation) = decl.get("relation") {
        if !allow_relation {
            return Err(SchemaError::InvalidField {
                path: path.to_string(),
                message: "pivot fields cannot declare a nested relation".to_string(),
            });
        }
        field.relation = Some(build_relation(relation, path)?);
    }

    if decl.get("sortable").and_then(Value::as_bool) == Some(true) {
        field = field.sortable();
    }

    if let Some(align) = decl.get("align").and_then(Value::as_str) {
        let align = TextAlign::parse(align).ok_or_else(|| SchemaError::InvalidField {
            path: format!("{}/align", path),
            message: format!("unknown alignment \"{}\"", align),
        })?;
        field = field.align(align);
    }

    if let Some(visible) = decl.get("visible").and_then(Value::as_bool) {
        field = field.show_on_index(visible);
    }

    if decl.get("as_html").and_then(Value::as_bool) == Some(true) {
        field = field.as_html();
    }

    if let Some(default) = decl.get("default") {
        field = field.default_to(default.clone());
    }

    if let Some(meta) = decl.get("meta").and_then(Value::as_object) {
        for (key, value) in meta {
            field = field.with_meta(key.clone(), value.clone());
        }
    }

    Ok(field)
}

fn build_relation(decl: &Value, path: &str) -> Result<Relation, SchemaError> {
    let resource = require_str(decl, "resource", &format!("{}/relation", path))?.to_string();

    let listable = decl
        .get("listable")
        .and_then(Value::as_bool)
        .unwrap_or(true);

    let mut fields = Vec::new();
    if let Some(declared) = decl.get("fields").and_then(Value::as_array) {
        for (index, pivot) in declared.iter().enumerate() {
            let pivot_path = format!("{}/relation/fields/{}", path, index);
            fields.push(build_field(pivot, &pivot_path, false)?);
        }
    }

    Ok(Relation {
        resource,
        listable,
        fields,
    })
}

fn require_str<'a>(decl: &'a Value, key: &str, path: &str) -> Result<&'a str, SchemaError> {
    match decl.get(key) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(SchemaError::InvalidField {
            path: format!("{}/{}", path, key),
            message: format!("expected string, got {}", json_type_name(other)),
        }),
        None => Err(SchemaError::InvalidField {
            path: format!("{}/{}", path, key),
            message: format!("missing required string \"{}\"", key),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const USERS: &str = r#"{
        "name": "UserProfile",
        "style": "tight",
        "column_borders": true,
        "fields": [
            {"name": "ID", "attribute": "id", "sortable": true},
            {"name": "Email", "attribute": "contact->email", "align": "right"},
            {"name": "Bio", "attribute": "bio", "as_html": true, "visible": false},
            {"name": "Roles", "relation": {
                "resource": "roles",
                "fields": [{"name": "Granted At", "attribute": "granted_at"}]
            }}
        ]
    }"#;

    #[test]
    fn load_valid_declaration() {
        let table = load_table_str(USERS).unwrap();
        assert_eq!(table.name(), "UserProfile");
        assert_eq!(table.label(), "User Profiles");
        assert_eq!(table.style().kind, TableStyleKind::Tight);
        assert!(table.style().column_borders);
        assert_eq!(table.fields().len(), 4);
    }

    #[test]
    fn declared_fields_carry_settings() {
        let table = load_table_str(USERS).unwrap();
        let fields = table.fields();

        let id = fields.find_by_attribute("id").unwrap();
        assert!(id.sortable);

        let email = fields.find_by_attribute("contact.email").unwrap();
        assert_eq!(email.text_align, TextAlign::Right);

        let bio = fields.find_by_attribute("bio").unwrap();
        assert!(!bio.is_shown_on_index(&json!({})));
    }

    #[test]
    fn declared_relation_field() {
        let table = load_table_str(USERS).unwrap();
        let fields = table.fields();
        let roles = fields.find_by_attribute("roles").unwrap();
        let relation = roles.relation.as_ref().unwrap();
        assert_eq!(relation.resource, "roles");
        assert!(relation.listable);
        assert_eq!(relation.fields.len(), 1);
        assert_eq!(relation.fields[0].attribute, "granted_at");
    }

    #[test]
    fn missing_attribute_derives_from_name() {
        let table = load_table_str(
            r#"{"name": "User", "fields": [{"name": "Full Name"}]}"#,
        )
        .unwrap();
        assert!(table.fields().find_by_attribute("full_name").is_some());
    }

    #[test]
    fn default_value_from_declaration() {
        let table = load_table_str(
            r#"{"name": "User", "fields": [{"name": "Phone", "attribute": "phone", "default": "n/a"}]}"#,
        )
        .unwrap();
        let fields = table.fields();
        let phone = fields.find_by_attribute("phone").unwrap();
        assert_eq!(phone.resolve(&json!({})).unwrap(), json!("n/a"));
    }

    #[test]
    fn invalid_json_errors() {
        let result = load_table_str("not json");
        assert!(matches!(result, Err(SchemaError::InvalidJson { .. })));
    }

    #[test]
    fn missing_name_is_a_violation() {
        let result = load_table_str(r#"{"fields": []}"#);
        match result {
            Err(SchemaError::InvalidDeclaration { violations }) => {
                assert!(!violations.is_empty());
            }
            other => panic!("expected InvalidDeclaration, got {:?}", other.map(|t| t.name)),
        }
    }

    #[test]
    fn unknown_alignment_is_a_violation() {
        let result = load_table_str(
            r#"{"name": "User", "fields": [{"name": "X", "align": "middle"}]}"#,
        );
        match result {
            Err(SchemaError::InvalidDeclaration { violations }) => {
                assert!(violations.iter().any(|v| v.path.contains("/fields/0")));
            }
            _ => panic!("expected InvalidDeclaration"),
        }
    }

    #[test]
    fn unknown_key_is_a_violation() {
        let result = load_table_str(
            r#"{"name": "User", "fields": [{"name": "X", "computed": "nope"}]}"#,
        );
        assert!(matches!(
            result,
            Err(SchemaError::InvalidDeclaration { .. })
        ));
    }

    #[test]
    fn nested_relation_in_pivot_field_is_rejected() {
        let result = load_table_str(
            r#"{"name": "User", "fields": [{"name": "Roles", "relation": {
                "resource": "roles",
                "fields": [{"name": "Bad", "relation": {"resource": "x"}}]
            }}]}"#,
        );
        assert!(matches!(
            result,
            Err(SchemaError::InvalidDeclaration { .. })
        ));
    }

    #[test]
    fn duplicate_attributes_are_allowed() {
        // Attribute uniqueness is not enforced; lookup takes the first.
        let table = load_table_str(
            r#"{"name": "User", "fields": [
                {"name": "First", "attribute": "x"},
                {"name": "Second", "attribute": "x"}
            ]}"#,
        )
        .unwrap();
        let fields = table.fields();
        assert_eq!(fields.find_by_attribute("x").unwrap().name, "First");
    }

    #[test]
    fn load_table_file_not_found() {
        let result = load_table(Path::new("/nonexistent/table.json"));
        assert!(matches!(result, Err(SchemaError::FileNotFound { .. })));
    }

    #[test]
    fn is_url_detection() {
        assert!(is_url("https://example.com/users.json"));
        assert!(is_url("http://example.com/users.json"));
        assert!(!is_url("./users.json"));
        assert!(!is_url("/tables/users.json"));
    }

    #[cfg(feature = "remote")]
    mod remote {
        use super::*;

        #[test]
        fn load_table_url_from_local_server() {
            let mut server = mockito::Server::new();
            let mock = server
                .mock("GET", "/users.json")
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(USERS)
                .create();

            let url = format!("{}/users.json", server.url());
            let table = load_table_url(&url).unwrap();
            assert_eq!(table.name(), "UserProfile");
            mock.assert();
        }

        #[test]
        fn load_table_url_404() {
            let mut server = mockito::Server::new();
            server
                .mock("GET", "/missing.json")
                .with_status(404)
                .create();

            let url = format!("{}/missing.json", server.url());
            let result = load_table_url(&url);
            assert!(matches!(result, Err(SchemaError::NetworkError { .. })));
        }
    }
}
