//! Field descriptors and per-row resolution.
//!
//! A [`Field`] is an immutable, schema-level description of one column:
//! where its value comes from, how it is transformed for display, and
//! whether the current viewer may see it. Resolving a field against a
//! row never mutates the descriptor; it produces a [`ResolvedField`]
//! snapshot, so a single schema can be shared across every row of a
//! listing without one row's resolution leaking into the next.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{BoxError, ResolveError};
use crate::path;
use crate::types::{SortDirection, SortState, TextAlign};

/// Meta key marking a value as pre-formatted markup the renderer must
/// not escape. Opt-in per field via [`Field::as_html`], never default.
pub const META_AS_HTML: &str = "as_html";

/// Callback producing a computed field's value from the whole row.
pub type ComputedFn = Arc<dyn Fn(&Value) -> Result<Value, BoxError> + Send + Sync>;

/// Callback transforming a value during resolution.
///
/// Receives the raw (or computed) value, the row, and the attribute
/// path.
pub type TransformFn = Arc<dyn Fn(Value, &Value, &str) -> Result<Value, BoxError> + Send + Sync>;

/// Callback producing a field's fallback default value.
pub type DefaultFn = Arc<dyn Fn() -> Value + Send + Sync>;

/// Per-row visibility predicate.
pub type VisibilityFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Field-level authorization predicate. No row context: authorization
/// here is static per field, not per row.
pub type AuthorizeFn = Arc<dyn Fn() -> Result<bool, BoxError> + Send + Sync>;

/// How a field obtains its value. Fixed at construction; never
/// re-derived later.
#[derive(Clone)]
pub enum FieldKind {
    /// Extract the value at an attribute path in the row.
    Direct(String),
    /// Compute the value from the whole row.
    Computed(ComputedFn),
}

impl fmt::Debug for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Direct(path) => f.debug_tuple("Direct").field(path).finish(),
            FieldKind::Computed(_) => f.debug_tuple("Computed").field(&"<fn>").finish(),
        }
    }
}

/// Whether a field appears in index listings.
///
/// The predicate form is evaluated fresh for every row; its result is
/// never written back onto the descriptor, so a shared schema cannot
/// carry one row's answer into the next.
#[derive(Clone, Default)]
pub enum Visibility {
    #[default]
    Always,
    Never,
    When(VisibilityFn),
}

impl fmt::Debug for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Always => write!(f, "Always"),
            Visibility::Never => write!(f, "Never"),
            Visibility::When(_) => write!(f, "When(<fn>)"),
        }
    }
}

/// Through-relation info carried by a relation field.
#[derive(Debug, Clone)]
pub struct Relation {
    /// Identifier of the related resource (the "via" side).
    pub resource: String,
    /// Listable relations render their own nested listing and are
    /// excluded from scalar index columns.
    pub listable: bool,
    /// Fields resolved against the junction (pivot) record.
    pub fields: Vec<Field>,
}

/// Capability: a field-level authorization gate.
pub trait Authorizable {
    /// Evaluate the authorization predicate. Default permits.
    ///
    /// # Errors
    ///
    /// A failing predicate propagates as
    /// [`ResolveError::Authorization`]; treating it as allow or deny
    /// would be a silent security decision.
    fn authorize(&self) -> Result<bool, ResolveError>;
}

/// Capability: an open bag of display metadata.
pub trait MetaBearing {
    fn meta(&self) -> &Map<String, Value>;
    fn meta_mut(&mut self) -> &mut Map<String, Value>;
}

/// A named, schema-level descriptor of how to extract and display one
/// value from a row.
#[derive(Clone)]
pub struct Field {
    /// Displayable label.
    pub name: String,
    /// Attribute path into the row (normalized to dot delimiters), or
    /// [`COMPUTED_ATTRIBUTE`] for computed fields.
    pub attribute: String,
    kind: FieldKind,
    resolve_transform: Option<TransformFn>,
    display_transform: Option<TransformFn>,
    default_value: DefaultFn,
    /// Whether the data source can order by this field. Always false
    /// for computed fields: they have no backing column.
    pub sortable: bool,
    pub text_align: TextAlign,
    visibility: Visibility,
    authorize_with: Option<AuthorizeFn>,
    /// Set when the field was sourced from a through-relation and is
    /// resolved against the junction record.
    pub is_pivot: bool,
    /// Present on relation fields.
    pub relation: Option<Relation>,
    meta: Map<String, Value>,
}

/// Attribute marker for computed fields.
pub const COMPUTED_ATTRIBUTE: &str = "__computed__";

impl Field {
    fn with_kind(name: impl Into<String>, attribute: String, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            attribute,
            kind,
            resolve_transform: None,
            display_transform: None,
            default_value: Arc::new(|| Value::Null),
            sortable: false,
            text_align: TextAlign::default(),
            visibility: Visibility::Always,
            authorize_with: None,
            is_pivot: false,
            relation: None,
            meta: Map::new(),
        }
    }

    /// Create a field whose attribute is derived from its name
    /// (lowercased, spaces replaced with underscores).
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let attribute = name.to_lowercase().replace(' ', "_");
        Self::with_kind(name, attribute.clone(), FieldKind::Direct(attribute))
    }

    /// Create a field backed by an explicit attribute path.
    ///
    /// Both dot (`contact.email`) and arrow (`contact->email`)
    /// delimiters are accepted; the path is normalized at
    /// construction.
    pub fn from_path(name: impl Into<String>, attribute: impl Into<String>) -> Self {
        let attribute = path::normalize(&attribute.into());
        Self::with_kind(name, attribute.clone(), FieldKind::Direct(attribute))
    }

    /// Create a computed field whose value comes from a callback over
    /// the whole row.
    ///
    /// Computed fields are never sortable: there is no backing column
    /// for the data source to order by.
    pub fn computed<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self::with_kind(
            name,
            COMPUTED_ATTRIBUTE.to_string(),
            FieldKind::Computed(Arc::new(f)),
        )
    }

    /// Create a many-to-many relation field targeting `resource`.
    ///
    /// Relation fields are listable by default: they render their own
    /// nested listing and are excluded from scalar index columns.
    /// Attach junction-record fields with [`Field::pivot_fields`].
    pub fn belongs_to_many(name: impl Into<String>, resource: impl Into<String>) -> Self {
        let mut field = Self::new(name);
        field.relation = Some(Relation {
            resource: resource.into(),
            listable: true,
            fields: Vec::new(),
        });
        field
    }

    // --- Builder methods ---

    /// Mark the field sortable. No-op for computed fields.
    pub fn sortable(self) -> Self {
        self.sortable_if(true)
    }

    /// Set the sortable flag explicitly. No-op for computed fields.
    pub fn sortable_if(mut self, sortable: bool) -> Self {
        if !self.is_computed() {
            self.sortable = sortable;
        }
        self
    }

    /// Set the text alignment hint.
    pub fn align(mut self, align: TextAlign) -> Self {
        self.text_align = align;
        self
    }

    /// Set a fixed default value for missing attribute paths.
    pub fn default_to(self, value: Value) -> Self {
        self.default_with(move || value.clone())
    }

    /// Set the callback producing the default value.
    pub fn default_with<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default_value = Arc::new(f);
        self
    }

    /// Set the transform applied during [`Field::resolve`].
    pub fn resolve_using<F>(mut self, f: F) -> Self
    where
        F: Fn(Value, &Value, &str) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.resolve_transform = Some(Arc::new(f));
        self
    }

    /// Set the transform applied during [`Field::resolve_for_display`].
    ///
    /// Distinct from the resolve transform: display resolution feeds
    /// the already-resolved or computed value into this callback.
    pub fn display_using<F>(mut self, f: F) -> Self
    where
        F: Fn(Value, &Value, &str) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.display_transform = Some(Arc::new(f));
        self
    }

    /// Show or hide the field on index listings unconditionally.
    pub fn show_on_index(mut self, show: bool) -> Self {
        self.visibility = if show {
            Visibility::Always
        } else {
            Visibility::Never
        };
        self
    }

    /// Decide index visibility per row.
    pub fn show_on_index_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.visibility = Visibility::When(Arc::new(predicate));
        self
    }

    /// Gate the field behind an authorization predicate.
    pub fn can_see<F>(mut self, predicate: F) -> Self
    where
        F: Fn() -> Result<bool, BoxError> + Send + Sync + 'static,
    {
        self.authorize_with = Some(Arc::new(predicate));
        self
    }

    /// Mark the resolved value as pre-formatted markup the renderer
    /// must not escape.
    pub fn as_html(self) -> Self {
        self.with_meta(META_AS_HTML, Value::Bool(true))
    }

    /// Attach an arbitrary meta entry.
    pub fn with_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }

    /// Declare the junction-record fields for a relation field.
    ///
    /// No-op on non-relation fields.
    pub fn pivot_fields(mut self, fields: Vec<Field>) -> Self {
        if let Some(relation) = self.relation.as_mut() {
            relation.fields = fields;
        }
        self
    }

    // --- Queries ---

    /// Whether the field's value comes from a callback rather than a
    /// stored attribute.
    pub fn is_computed(&self) -> bool {
        matches!(self.kind, FieldKind::Computed(_))
    }

    /// Whether this is a listable relation field (renders its own
    /// nested listing instead of a scalar cell).
    pub fn is_listable(&self) -> bool {
        self.relation.as_ref().is_some_and(|r| r.listable)
    }

    /// Whether the field is statically hidden from index listings,
    /// independent of any row. Predicate-visible fields report false:
    /// they may show for some rows.
    pub fn is_never_shown(&self) -> bool {
        matches!(self.visibility, Visibility::Never)
    }

    /// Whether the field appears on the index listing for `row`.
    ///
    /// Predicate visibility is evaluated fresh on every call; the
    /// result is not cached on the descriptor.
    pub fn is_shown_on_index(&self, row: &Value) -> bool {
        match &self.visibility {
            Visibility::Always => true,
            Visibility::Never => false,
            Visibility::When(predicate) => predicate(row),
        }
    }

    /// Whether the field is the active ascending sort column.
    pub fn asc_sorted(&self, sort: &SortState) -> bool {
        self.sortable && sort.is(&self.attribute, SortDirection::Asc)
    }

    /// Whether the field is the active descending sort column.
    pub fn desc_sorted(&self, sort: &SortState) -> bool {
        self.sortable && sort.is(&self.attribute, SortDirection::Desc)
    }

    // --- Resolution ---

    /// Raw attribute value for direct fields: nested lookup, with the
    /// configured default substituted for a missing path.
    fn raw_value(&self, row: &Value, attribute: &str) -> Value {
        path::lookup(row, attribute)
            .cloned()
            .unwrap_or_else(|| (self.default_value)())
    }

    /// Resolve the field's value against a row.
    ///
    /// Computed fields run their callback. Direct fields extract the
    /// attribute (missing path yields the configured default, not an
    /// error) and apply the resolve transform if one is set.
    ///
    /// # Errors
    ///
    /// Callback failures propagate as [`ResolveError`]; the value is
    /// never silently blanked.
    pub fn resolve(&self, row: &Value) -> Result<Value, ResolveError> {
        match &self.kind {
            FieldKind::Computed(f) => f(row).map_err(|source| ResolveError::Computed {
                field: self.name.clone(),
                source,
            }),
            FieldKind::Direct(attribute) => {
                let raw = self.raw_value(row, attribute);
                match &self.resolve_transform {
                    None => Ok(raw),
                    Some(transform) => transform(raw, row, attribute).map_err(|source| {
                        ResolveError::Transform {
                            field: self.name.clone(),
                            source,
                        }
                    }),
                }
            }
        }
    }

    /// Resolve the field's display value against a row.
    ///
    /// Without a display transform this is exactly [`Field::resolve`].
    /// With one, the computed value (for computed fields) or the raw
    /// attribute value (for direct fields) is fed through the display
    /// transform: display resolution is a superset of value
    /// resolution, never the transform applied to its own output.
    ///
    /// # Errors
    ///
    /// Callback failures propagate as [`ResolveError`].
    pub fn resolve_for_display(&self, row: &Value) -> Result<Value, ResolveError> {
        let Some(transform) = &self.display_transform else {
            return self.resolve(row);
        };

        let (base, attribute) = match &self.kind {
            FieldKind::Computed(f) => {
                let computed = f(row).map_err(|source| ResolveError::Computed {
                    field: self.name.clone(),
                    source,
                })?;
                (computed, self.attribute.as_str())
            }
            FieldKind::Direct(attribute) => (self.raw_value(row, attribute), attribute.as_str()),
        };

        transform(base, row, attribute).map_err(|source| ResolveError::Transform {
            field: self.name.clone(),
            source,
        })
    }

    /// Resolve into a per-row snapshot using [`Field::resolve`].
    pub fn resolved(&self, row: &Value) -> Result<ResolvedField, ResolveError> {
        Ok(self.snapshot(self.resolve(row)?))
    }

    /// Resolve into a per-row snapshot using
    /// [`Field::resolve_for_display`].
    pub fn resolved_for_display(&self, row: &Value) -> Result<ResolvedField, ResolveError> {
        Ok(self.snapshot(self.resolve_for_display(row)?))
    }

    fn snapshot(&self, value: Value) -> ResolvedField {
        ResolvedField {
            name: self.name.clone(),
            attribute: self.attribute.clone(),
            value,
            sortable: self.sortable,
            text_align: self.text_align,
            is_pivot: self.is_pivot,
            meta: self.meta.clone(),
        }
    }
}

impl Authorizable for Field {
    fn authorize(&self) -> Result<bool, ResolveError> {
        match &self.authorize_with {
            None => Ok(true),
            Some(predicate) => predicate().map_err(|source| ResolveError::Authorization {
                field: self.name.clone(),
                source,
            }),
        }
    }
}

impl MetaBearing for Field {
    fn meta(&self) -> &Map<String, Value> {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.meta
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("attribute", &self.attribute)
            .field("kind", &self.kind)
            .field("sortable", &self.sortable)
            .field("text_align", &self.text_align)
            .field("visibility", &self.visibility)
            .field("is_pivot", &self.is_pivot)
            .field("relation", &self.relation)
            .finish()
    }
}

/// Display-ready snapshot of one field resolved against one row.
///
/// This is the rendering contract: renderers read name, value,
/// sortable, alignment, and meta, and must honor the opt-in html flag
/// by skipping escaping only when it is set.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedField {
    pub name: String,
    pub attribute: String,
    pub value: Value,
    pub sortable: bool,
    pub text_align: TextAlign,
    pub is_pivot: bool,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
}

impl ResolvedField {
    /// Whether the value is pre-formatted markup the renderer must not
    /// escape.
    pub fn is_html(&self) -> bool {
        self.meta.get(META_AS_HTML).and_then(Value::as_bool) == Some(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn derived_attribute_from_name() {
        let field = Field::new("Full Name");
        assert_eq!(field.attribute, "full_name");
    }

    #[test]
    fn from_path_normalizes_arrow() {
        let field = Field::from_path("Email", "contact->email");
        assert_eq!(field.attribute, "contact.email");
    }

    #[test]
    fn resolve_direct() {
        let field = Field::from_path("Email", "contact.email");
        let row = json!({"contact": {"email": "ada@example.com"}});
        assert_eq!(field.resolve(&row).unwrap(), json!("ada@example.com"));
    }

    #[test]
    fn resolve_missing_path_yields_default() {
        let field = Field::from_path("Phone", "contact.phone");
        let row = json!({"contact": {}});
        assert_eq!(field.resolve(&row).unwrap(), Value::Null);

        let field = field.default_to(json!("n/a"));
        assert_eq!(field.resolve(&row).unwrap(), json!("n/a"));
    }

    #[test]
    fn resolve_applies_resolve_transform() {
        let field = Field::from_path("Name", "name")
            .resolve_using(|value, _row, _attr| Ok(json!(value.as_str().unwrap().to_uppercase())));
        let row = json!({"name": "ada"});
        assert_eq!(field.resolve(&row).unwrap(), json!("ADA"));
    }

    #[test]
    fn resolve_computed() {
        let field = Field::computed("Initials", |row| {
            let name = row["name"].as_str().unwrap_or_default();
            Ok(json!(name.chars().next().map(String::from).unwrap_or_default()))
        });
        let row = json!({"name": "Ada"});
        assert_eq!(field.resolve(&row).unwrap(), json!("A"));
    }

    #[test]
    fn computed_field_never_sortable() {
        let field = Field::computed("Initials", |_| Ok(Value::Null)).sortable();
        assert!(!field.sortable);

        let field = Field::computed("Initials", |_| Ok(Value::Null)).sortable_if(true);
        assert!(!field.sortable);
    }

    #[test]
    fn direct_field_sortable() {
        let field = Field::from_path("ID", "id").sortable();
        assert!(field.sortable);
    }

    #[test]
    fn display_without_transform_matches_resolve() {
        let field = Field::from_path("Name", "name");
        let row = json!({"name": "Ada"});
        assert_eq!(
            field.resolve_for_display(&row).unwrap(),
            field.resolve(&row).unwrap()
        );
    }

    #[test]
    fn display_transform_receives_computed_value() {
        let field = Field::computed("Score", |_| Ok(json!(42)))
            .display_using(|value, _row, _attr| Ok(json!(format!("{} pts", value))));
        let row = json!({});
        assert_eq!(field.resolve_for_display(&row).unwrap(), json!("42 pts"));
    }

    #[test]
    fn display_transform_receives_raw_not_resolve_transformed() {
        // The display path feeds the raw attribute value in, not the
        // resolve transform's output.
        let field = Field::from_path("Name", "name")
            .resolve_using(|_, _, _| Ok(json!("from-resolve")))
            .display_using(|value, _, _| Ok(value));
        let row = json!({"name": "raw"});
        assert_eq!(field.resolve_for_display(&row).unwrap(), json!("raw"));
    }

    #[test]
    fn display_transform_gets_attribute_path() {
        let field = Field::from_path("Email", "contact->email")
            .display_using(|_value, _row, attr| Ok(json!(attr)));
        let row = json!({});
        assert_eq!(
            field.resolve_for_display(&row).unwrap(),
            json!("contact.email")
        );
    }

    #[test]
    fn resolve_is_idempotent() {
        let field = Field::from_path("Name", "name");
        let row = json!({"name": "Ada"});
        let first = field.resolve(&row).unwrap();
        let second = field.resolve(&row).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn computed_error_propagates() {
        let field = Field::computed("Broken", |_| Err("boom".into()));
        let err = field.resolve(&json!({})).unwrap_err();
        assert!(matches!(err, ResolveError::Computed { .. }));
        assert_eq!(err.field(), "Broken");
    }

    #[test]
    fn transform_error_propagates() {
        let field = Field::from_path("Name", "name").display_using(|_, _, _| Err("bad rule".into()));
        let err = field.resolve_for_display(&json!({"name": "x"})).unwrap_err();
        assert!(matches!(err, ResolveError::Transform { .. }));
    }

    #[test]
    fn visibility_predicate_evaluated_fresh_per_row() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let field = Field::from_path("Secret", "secret").show_on_index_when(move |row| {
            counter.fetch_add(1, Ordering::SeqCst);
            row["admin"].as_bool().unwrap_or(false)
        });

        assert!(field.is_shown_on_index(&json!({"admin": true})));
        assert!(!field.is_shown_on_index(&json!({"admin": false})));
        // Re-checking the first row must re-run the predicate, not
        // reuse the second row's answer.
        assert!(field.is_shown_on_index(&json!({"admin": true})));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn never_shown_is_a_static_query() {
        assert!(Field::new("X").show_on_index(false).is_never_shown());
        assert!(!Field::new("X").is_never_shown());
        assert!(!Field::new("X").show_on_index(true).is_never_shown());
        // Predicate visibility depends on the row, so it is not
        // statically never-shown.
        assert!(!Field::new("X").show_on_index_when(|_| false).is_never_shown());
    }

    #[test]
    fn authorize_defaults_to_permit() {
        let field = Field::new("Name");
        assert!(field.authorize().unwrap());
    }

    #[test]
    fn authorize_predicate_error_propagates() {
        let field = Field::new("Name").can_see(|| Err("auth backend down".into()));
        let err = field.authorize().unwrap_err();
        assert!(matches!(err, ResolveError::Authorization { .. }));
    }

    #[test]
    fn sort_queries_read_sort_state() {
        let field = Field::from_path("Email", "email").sortable();
        assert!(field.asc_sorted(&SortState::asc("email")));
        assert!(!field.asc_sorted(&SortState::desc("email")));
        assert!(field.desc_sorted(&SortState::desc("email")));
        assert!(!field.asc_sorted(&SortState::asc("name")));
        assert!(!field.asc_sorted(&SortState::unsorted()));
    }

    #[test]
    fn unsortable_field_never_reports_sorted() {
        let field = Field::from_path("Email", "email");
        assert!(!field.asc_sorted(&SortState::asc("email")));
    }

    #[test]
    fn as_html_sets_meta_flag() {
        let field = Field::new("Name").as_html();
        let snapshot = field.resolved(&json!({"name": "x"})).unwrap();
        assert!(snapshot.is_html());

        let plain = Field::new("Name").resolved(&json!({"name": "x"})).unwrap();
        assert!(!plain.is_html());
    }

    #[test]
    fn relation_field_is_listable() {
        let field = Field::belongs_to_many("Roles", "roles");
        assert!(field.is_listable());
        assert!(!Field::new("Name").is_listable());
    }

    #[test]
    fn snapshot_carries_descriptor_metadata() {
        let field = Field::from_path("ID", "id")
            .sortable()
            .align(TextAlign::Right)
            .with_meta("badge", json!("primary"));
        let snapshot = field.resolved(&json!({"id": 7})).unwrap();
        assert_eq!(snapshot.value, json!(7));
        assert!(snapshot.sortable);
        assert_eq!(snapshot.text_align, TextAlign::Right);
        assert_eq!(snapshot.meta["badge"], json!("primary"));
        assert!(!snapshot.is_pivot);
    }
}
