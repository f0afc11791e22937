//! Ordered, attribute-addressable collections of fields.

use serde_json::Value;

use crate::error::ResolveError;
use crate::field::{Authorizable, Field, ResolvedField};
use crate::path;

/// An ordered sequence of [`Field`] descriptors.
///
/// Insertion order is the display column order and is semantically
/// significant: every operation either preserves order or repositions
/// entries explicitly (the pivot splice in the resource pipeline).
#[derive(Debug, Clone, Default)]
pub struct FieldCollection {
    fields: Vec<Field>,
}

impl FieldCollection {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.fields.iter()
    }

    /// Consume the collection, yielding the underlying fields.
    pub fn into_vec(self) -> Vec<Field> {
        self.fields
    }

    /// Find the first field whose attribute matches.
    ///
    /// Ties break to the earliest declaration. The query accepts
    /// either delimiter spelling.
    pub fn find_by_attribute(&self, attribute: &str) -> Option<&Field> {
        let attribute = path::normalize(attribute);
        self.fields.iter().find(|field| field.attribute == attribute)
    }

    /// Position of the first field whose relation targets `resource`.
    pub fn position_of_relation(&self, resource: &str) -> Option<usize> {
        self.fields.iter().position(|field| {
            field
                .relation
                .as_ref()
                .is_some_and(|relation| relation.resource == resource)
        })
    }

    /// Keep only fields shown on the index listing for `row`.
    ///
    /// Order preserved, gaps closed. Predicate visibility is evaluated
    /// against this row only.
    pub fn filter_for_index(self, row: &Value) -> Self {
        Self::new(
            self.fields
                .into_iter()
                .filter(|field| field.is_shown_on_index(row))
                .collect(),
        )
    }

    /// Drop relation fields that render their own nested listing.
    pub fn without_listable(self) -> Self {
        Self::new(
            self.fields
                .into_iter()
                .filter(|field| !field.is_listable())
                .collect(),
        )
    }

    /// Keep only fields the current viewer is authorized to see.
    ///
    /// # Errors
    ///
    /// A failing authorization predicate propagates; it is never
    /// treated as an implicit allow or deny.
    pub fn authorized(self) -> Result<Self, ResolveError> {
        let mut kept = Vec::with_capacity(self.fields.len());
        for field in self.fields {
            if field.authorize()? {
                kept.push(field);
            }
        }
        Ok(Self::new(kept))
    }

    /// Resolve every field's value against the same row, in order.
    ///
    /// # Errors
    ///
    /// The first callback failure aborts the pass and propagates.
    pub fn resolve(&self, row: &Value) -> Result<Vec<ResolvedField>, ResolveError> {
        self.fields.iter().map(|field| field.resolved(row)).collect()
    }

    /// Resolve every field's display value against the same row, in
    /// order.
    ///
    /// # Errors
    ///
    /// The first callback failure aborts the pass and propagates.
    pub fn resolve_for_display(&self, row: &Value) -> Result<Vec<ResolvedField>, ResolveError> {
        self.fields
            .iter()
            .map(|field| field.resolved_for_display(row))
            .collect()
    }
}

impl From<Vec<Field>> for FieldCollection {
    fn from(fields: Vec<Field>) -> Self {
        Self::new(fields)
    }
}

impl FromIterator<Field> for FieldCollection {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl IntoIterator for FieldCollection {
    type Item = Field;
    type IntoIter = std::vec::IntoIter<Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}
