//! fieldgrid
//!
//! Declarative field resolution for tabular data views.
//!
//! A [`Table`] declares an ordered set of named fields for an entity
//! type; each [`Field`] describes how to extract one value from a JSON
//! row and how to present it (alignment, sortability, escaping
//! policy). A [`Resource`] binds one row to its table and runs the
//! resolution pipeline (visibility filter, listable-relation
//! exclusion, authorization, then display resolution), producing
//! per-row [`ResolvedField`] snapshots for the renderer.
//!
//! # Example
//!
//! ```
//! use fieldgrid::{Field, FieldCollection, Resource, Table};
//! use serde_json::json;
//!
//! struct Users;
//!
//! impl Table for Users {
//!     fn name(&self) -> &str {
//!         "User"
//!     }
//!
//!     fn fields(&self) -> FieldCollection {
//!         FieldCollection::new(vec![
//!             Field::from_path("ID", "id").sortable(),
//!             Field::from_path("Email", "contact->email"),
//!             Field::computed("Greeting", |row| {
//!                 let name = row["name"].as_str().unwrap_or("stranger");
//!                 Ok(json!(format!("Hello, {name}!")))
//!             }),
//!         ])
//!     }
//! }
//!
//! let row = json!({"id": 7, "name": "Ada", "contact": {"email": "ada@example.com"}});
//! let resource = Resource::new(&row, &Users).unwrap();
//!
//! let values: Vec<_> = resource.fields().iter().map(|f| f.value.clone()).collect();
//! assert_eq!(values, [json!(7), json!("ada@example.com"), json!("Hello, Ada!")]);
//! ```
//!
//! # Pipeline Order
//!
//! The index pipeline order is a contract: visibility and
//! authorization gates run before any value is resolved, so
//! unauthorized data is never computed and a hidden field's resolver
//! is never invoked.
//!
//! | Step | Operation |
//! |------|-----------|
//! | 1 | `Table::fields()`: unresolved declarations |
//! | 2 | `filter_for_index(row)`: per-row visibility |
//! | 3 | `without_listable()`: drop nested-listing relations |
//! | 4 | `authorized()`: field-level authorization |
//! | 5 | `resolve_for_display(row)`: surviving non-pivot fields |
//!
//! Fields sourced from a many-to-many junction record ("pivot"
//! fields) are resolved separately against that record and spliced in
//! after their relation's column; see [`Resource::via`].

mod collection;
mod declare;
mod error;
mod field;
mod path;
mod resource;
mod table;
mod types;

pub use collection::FieldCollection;
pub use declare::{
    is_url, load_table, load_table_auto, load_table_str, validate_declaration, DeclaredTable,
};
pub use error::{BoxError, ResolveError, SchemaError, Violation};
pub use field::{
    Authorizable, AuthorizeFn, ComputedFn, DefaultFn, Field, FieldKind, MetaBearing, Relation,
    ResolvedField, TransformFn, Visibility, VisibilityFn, COMPUTED_ATTRIBUTE, META_AS_HTML,
};
pub use path::{lookup, normalize};
pub use resource::{resolve_pivot_fields, resources, RelationContext, Resource};
pub use table::{default_label, Query, Table};
pub use types::{
    json_type_name, SortDirection, SortState, TableStyle, TableStyleKind, TextAlign,
};

#[cfg(feature = "remote")]
pub use declare::load_table_url;
