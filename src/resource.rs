//! Per-row resolution: one row bound to its schema.
//!
//! The pipeline order is a contract, not an implementation accident.
//! Visibility and authorization gates run before any value is
//! resolved, so unauthorized data is never computed or transformed,
//! and a hidden field's resolver (which may assume invariants that
//! only hold when the field is meant to be shown) is never invoked.

use std::fmt;

use serde_json::Value;

use crate::collection::FieldCollection;
use crate::error::ResolveError;
use crate::field::{Field, ResolvedField};
use crate::table::Table;

/// Context for resolving a listing reached through a many-to-many
/// relation: which resource the listing is viewed via, and the
/// junction record pivot fields resolve against.
#[derive(Debug, Clone)]
pub struct RelationContext {
    /// Identifier of the "via" resource.
    pub via_resource: String,
    /// The junction record. Distinct from the main row.
    pub pivot_row: Value,
}

impl RelationContext {
    pub fn new(via_resource: impl Into<String>, pivot_row: Value) -> Self {
        Self {
            via_resource: via_resource.into(),
            pivot_row,
        }
    }
}

/// One data row bound to its schema, with its resolved field list.
///
/// The field list is computed once at construction and not recomputed.
/// Resources are created per row when a listing is rendered and
/// discarded once the listing is produced; they hold no other state.
pub struct Resource<'a> {
    row: &'a Value,
    table: &'a dyn Table,
    fields: Vec<ResolvedField>,
}

impl<'a> Resource<'a> {
    /// Bind a row to its schema and run the index pipeline.
    ///
    /// # Errors
    ///
    /// Propagates authorization and callback failures from the
    /// pipeline.
    pub fn new(row: &'a Value, table: &'a dyn Table) -> Result<Self, ResolveError> {
        let fields = index_fields(table, row)?;
        Ok(Self { row, table, fields })
    }

    /// Bind a row reached through a relation, splicing the relation's
    /// pivot fields into the resolved list.
    ///
    /// # Errors
    ///
    /// Propagates authorization and callback failures.
    pub fn via(
        row: &'a Value,
        table: &'a dyn Table,
        context: &RelationContext,
    ) -> Result<Self, ResolveError> {
        let fields = fields_via(table, row, context)?;
        Ok(Self { row, table, fields })
    }

    /// The resolved, display-ready fields in column order.
    pub fn fields(&self) -> &[ResolvedField] {
        &self.fields
    }

    pub fn row(&self) -> &Value {
        self.row
    }

    pub fn table(&self) -> &dyn Table {
        self.table
    }

    /// First resolved field whose attribute matches, earliest
    /// declaration winning.
    pub fn field_by_attribute(&self, attribute: &str) -> Option<&ResolvedField> {
        let attribute = crate::path::normalize(attribute);
        self.fields.iter().find(|field| field.attribute == attribute)
    }
}

impl fmt::Debug for Resource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("table", &self.table.name())
            .field("row", &self.row)
            .field("fields", &self.fields)
            .finish()
    }
}

/// Wrap every row of a listing as a [`Resource`].
///
/// # Errors
///
/// Fails on the first row whose pipeline fails.
pub fn resources<'a>(
    table: &'a dyn Table,
    rows: &'a [Value],
) -> Result<Vec<Resource<'a>>, ResolveError> {
    rows.iter().map(|row| Resource::new(row, table)).collect()
}

/// The index pipeline, in fixed order: declared fields, visibility
/// filter, listable-relation exclusion, authorization, then display
/// resolution of the surviving non-pivot fields.
fn index_fields(table: &dyn Table, row: &Value) -> Result<Vec<ResolvedField>, ResolveError> {
    let survivors = table
        .fields()
        .filter_for_index(row)
        .without_listable()
        .authorized()?;

    survivors
        .iter()
        .filter(|field| !field.is_pivot)
        .map(|field| field.resolved_for_display(row))
        .collect()
}

/// Resolve fields for a listing viewed through a relation and merge
/// the relation's pivot fields at the computed position.
///
/// Pivot fields are spliced immediately after the field whose relation
/// targets the via resource; when no such field survives, they are
/// appended. A relation field in the first column is a valid splice
/// anchor.
fn fields_via(
    table: &dyn Table,
    row: &Value,
    context: &RelationContext,
) -> Result<Vec<ResolvedField>, ResolveError> {
    // Pivot declarations come from the full field list; the splice
    // anchor is searched among the survivors. A hidden or
    // unauthorized relation field still contributes its pivot fields,
    // they just lose their anchor and land at the end.
    let declared = table.fields();
    let available = declared.clone().authorized()?;

    let main: Vec<&Field> = available.iter().filter(|field| !field.is_pivot).collect();

    let mut resolved = main
        .iter()
        .map(|field| field.resolved(row))
        .collect::<Result<Vec<_>, _>>()?;

    let pivots = resolve_pivot_fields(&declared, context)?;

    let anchor = main.iter().position(|field| {
        field
            .relation
            .as_ref()
            .is_some_and(|relation| relation.resource == context.via_resource)
    });

    match anchor {
        Some(index) => {
            resolved.splice(index + 1..index + 1, pivots);
        }
        None => resolved.extend(pivots),
    }

    Ok(resolved)
}

/// Resolve the pivot fields declared by the relation targeting the
/// via resource.
///
/// `fields` is the table's declared field list. Each pivot field is
/// tagged before authorization and resolved against the junction
/// record, never the main row. A relation with no declared pivot
/// fields yields an empty list, not an error.
///
/// # Errors
///
/// Propagates authorization and callback failures.
pub fn resolve_pivot_fields(
    fields: &FieldCollection,
    context: &RelationContext,
) -> Result<Vec<ResolvedField>, ResolveError> {
    let declared = fields
        .iter()
        .find_map(|field| {
            field
                .relation
                .as_ref()
                .filter(|relation| relation.resource == context.via_resource)
                .map(|relation| relation.fields.clone())
        })
        .unwrap_or_default();

    let tagged: Vec<Field> = declared
        .into_iter()
        .map(|mut field| {
            field.is_pivot = true;
            field
        })
        .collect();

    // Authorization gates resolution here too: a pivot field the
    // viewer cannot see is never resolved.
    FieldCollection::new(tagged)
        .authorized()?
        .resolve(&context.pivot_row)
}
