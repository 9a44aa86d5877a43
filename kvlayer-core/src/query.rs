//! Immutable query values.
//!
//! A [`Query`] describes which table to read, which documents to keep, how to order them and
//! which fields to return. It is a plain value: every chaining method takes `&self` and
//! returns a new query, so a query can be shared, branched and sent across threads freely.
//!
//! ```ignore
//! use kvlayer::query::{Query, SortDirection};
//!
//! let active = Query::new("users").eq("status", "active");
//! let newest = active.order_by("created_at", SortDirection::Desc);
//! let names = active.select("id, name");
//! // `active` is unchanged by either derivation.
//! ```

use serde_json::Value;

use crate::document::{Document, DocumentExt};
use crate::value::values_equal;

/// Sort direction for ordered reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order; missing values first.
    Asc,
    /// Descending order; missing values last.
    Desc,
}

/// Sort order for ordered reads.
#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    /// The field name to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

/// An equality constraint on one field.
///
/// A document satisfies the clause when it has the field and the field's value is
/// structurally equal to `value`. A missing field never matches.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// The field name to compare.
    pub field: String,
    /// The value the field must equal.
    pub value: Value,
}

impl Filter {
    /// Creates an equality clause.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter { field: field.into(), value: value.into() }
    }

    /// Returns whether the document satisfies this clause.
    pub fn matches(&self, document: &Document) -> bool {
        document
            .get(&self.field)
            .is_some_and(|value| values_equal(value, &self.value))
    }
}

/// Which fields a read returns.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Projection {
    /// Every field of the document.
    #[default]
    All,
    /// Only the listed fields, in this order; absent fields are dropped silently.
    Columns(Vec<String>),
}

impl Projection {
    /// Parses a comma-separated column list.
    ///
    /// A list that is exactly `"*"` selects every field. Names are trimmed and empty names
    /// are ignored, so an empty list also selects every field. A `*` next to other names
    /// is an ordinary column name.
    pub fn parse(columns: &str) -> Self {
        let columns = columns
            .split(',')
            .map(str::trim)
            .filter(|column| !column.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>();

        if columns.is_empty() || columns == ["*"] {
            Projection::All
        } else {
            Projection::Columns(columns)
        }
    }

    /// Applies this projection to a document.
    pub fn apply(&self, document: Document) -> Document {
        match self {
            Projection::All => document,
            Projection::Columns(columns) => document.project(columns),
        }
    }
}

/// A complete, storage-independent query.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// The logical table the query reads from.
    pub table: String,
    /// The fields returned for each document.
    pub projection: Projection,
    /// Equality clauses, all of which must hold. Empty means match everything.
    pub filters: Vec<Filter>,
    /// Ordering applied by `execute`. `None` leaves scan order.
    pub sort: Option<Sort>,
}

impl Query {
    /// Creates a query that matches every document of `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Query {
            table: table.into(),
            projection: Projection::All,
            filters: Vec::new(),
            sort: None,
        }
    }

    /// Returns a query that projects the given comma-separated columns.
    pub fn select(&self, columns: &str) -> Self {
        Query { projection: Projection::parse(columns), ..self.clone() }
    }

    /// Returns a query that projects the given columns.
    pub fn select_columns<I, S>(&self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Query {
            projection: Projection::Columns(columns.into_iter().map(Into::into).collect()),
            ..self.clone()
        }
    }

    /// Returns a query with an additional equality clause.
    pub fn eq(&self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut filters = self.filters.clone();
        filters.push(Filter::eq(field, value));

        Query { filters, ..self.clone() }
    }

    /// Returns a query ordered ascending by `field`.
    pub fn order(&self, field: impl Into<String>) -> Self {
        self.order_by(field, SortDirection::Asc)
    }

    /// Returns a query ordered by `field` in the given direction, replacing any previous
    /// ordering.
    pub fn order_by(&self, field: impl Into<String>, direction: SortDirection) -> Self {
        Query {
            sort: Some(Sort { field: field.into(), direction }),
            ..self.clone()
        }
    }

    /// Returns whether a document satisfies every filter clause.
    pub fn matches(&self, document: &Document) -> bool {
        self.filters
            .iter()
            .all(|filter| filter.matches(document))
    }
}
