//! Row filters, projections and ordering.
//!
//! # Responsibility
//! - Describe which rows a read/update/delete targets as a conjunction of
//!   column predicates.
//! - Render filters and ordering into the storage contract's
//!   `(selection, selection_args, order_by)` shape.
//!
//! # Invariants
//! - Values never get spliced into SQL text; every value is a bound `?`.
//! - `with_id` leaves exactly one predicate on `_id`.

use crate::model::pet::COLUMN_ID;
use crate::model::values::FieldValue;

/// Comparison applied by one predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    IsNull,
    IsNotNull,
}

impl Comparison {
    fn operator(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Like => "LIKE",
            Self::IsNull => "IS NULL",
            Self::IsNotNull => "IS NOT NULL",
        }
    }

    fn takes_value(self) -> bool {
        !matches!(self, Self::IsNull | Self::IsNotNull)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Predicate {
    column: String,
    op: Comparison,
    value: FieldValue,
}

/// Conjunction of predicates. Empty means "every row".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    predicates: Vec<Predicate>,
}

impl Selection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(column: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::all().and(column, Comparison::Eq, value)
    }

    /// Adds `column <op> value` to the conjunction.
    pub fn and(
        mut self,
        column: impl Into<String>,
        op: Comparison,
        value: impl Into<FieldValue>,
    ) -> Self {
        let value = if op.takes_value() {
            value.into()
        } else {
            FieldValue::Null
        };
        self.predicates.push(Predicate {
            column: column.into(),
            op,
            value,
        });
        self
    }

    pub fn and_null(self, column: impl Into<String>) -> Self {
        self.and(column, Comparison::IsNull, FieldValue::Null)
    }

    /// Replaces every caller predicate on `_id` with `_id = id`.
    pub fn with_id(mut self, id: i64) -> Self {
        self.predicates.retain(|predicate| predicate.column != COLUMN_ID);
        self.and(COLUMN_ID, Comparison::Eq, id)
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.predicates
            .iter()
            .map(|predicate| predicate.column.as_str())
    }

    /// Renders the `WHERE` body and its bound arguments.
    ///
    /// Returns `(None, [])` for an empty selection.
    pub fn to_sql(&self) -> (Option<String>, Vec<FieldValue>) {
        if self.predicates.is_empty() {
            return (None, Vec::new());
        }

        let mut clauses = Vec::with_capacity(self.predicates.len());
        let mut args = Vec::new();
        for predicate in &self.predicates {
            if predicate.op.takes_value() {
                clauses.push(format!("{} {} ?", predicate.column, predicate.op.operator()));
                args.push(predicate.value.clone());
            } else {
                clauses.push(format!("{} {}", predicate.column, predicate.op.operator()));
            }
        }
        (Some(clauses.join(" AND ")), args)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Ordering terms applied left to right.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortOrder {
    terms: Vec<(String, Direction)>,
}

impl SortOrder {
    pub fn unordered() -> Self {
        Self::default()
    }

    pub fn asc(column: impl Into<String>) -> Self {
        Self::unordered().then(column, Direction::Asc)
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self::unordered().then(column, Direction::Desc)
    }

    pub fn then(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.terms.push((column.into(), direction));
        self
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|(column, _)| column.as_str())
    }

    pub fn to_sql(&self) -> Option<String> {
        if self.terms.is_empty() {
            return None;
        }
        let terms = self
            .terms
            .iter()
            .map(|(column, direction)| match direction {
                Direction::Asc => format!("{column} ASC"),
                Direction::Desc => format!("{column} DESC"),
            })
            .collect::<Vec<_>>();
        Some(terms.join(", "))
    }
}

/// Columns a query returns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Projection {
    #[default]
    All,
    Columns(Vec<String>),
}

impl Projection {
    pub fn columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Columns(columns.into_iter().map(Into::into).collect())
    }

    /// Resolves to concrete column names; `All` and an empty list expand to
    /// `all_columns`.
    pub fn resolve<'a>(&'a self, all_columns: &[&'a str]) -> Vec<&'a str> {
        match self {
            Self::Columns(columns) if !columns.is_empty() => {
                columns.iter().map(String::as_str).collect()
            }
            _ => all_columns.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Comparison, Direction, Projection, Selection, SortOrder};
    use crate::model::values::FieldValue;

    #[test]
    fn empty_selection_renders_no_clause() {
        assert_eq!(Selection::all().to_sql(), (None, Vec::new()));
    }

    #[test]
    fn predicates_render_as_bound_conjunction() {
        let selection = Selection::eq("gender", 1)
            .and("weight", Comparison::Ge, 5)
            .and_null("breed");
        let (sql, args) = selection.to_sql();
        assert_eq!(
            sql.as_deref(),
            Some("gender = ? AND weight >= ? AND breed IS NULL")
        );
        assert_eq!(args, vec![FieldValue::Integer(1), FieldValue::Integer(5)]);
    }

    #[test]
    fn with_id_overrides_caller_id_predicates() {
        let selection = Selection::eq("_id", 3)
            .and("name", Comparison::Like, "T%")
            .and("_id", Comparison::Gt, 1)
            .with_id(5);
        let (sql, args) = selection.to_sql();
        assert_eq!(sql.as_deref(), Some("name LIKE ? AND _id = ?"));
        assert_eq!(args, vec![FieldValue::from("T%"), FieldValue::Integer(5)]);
    }

    #[test]
    fn sort_order_renders_terms_in_order() {
        let order = SortOrder::asc("name").then("_id", Direction::Desc);
        assert_eq!(order.to_sql().as_deref(), Some("name ASC, _id DESC"));
        assert_eq!(SortOrder::unordered().to_sql(), None);
    }

    #[test]
    fn empty_projection_expands_to_all_columns() {
        let all = ["_id", "name"];
        assert_eq!(Projection::All.resolve(&all), vec!["_id", "name"]);
        assert_eq!(
            Projection::columns(Vec::<String>::new()).resolve(&all),
            vec!["_id", "name"]
        );
        assert_eq!(Projection::columns(["name"]).resolve(&all), vec!["name"]);
    }
}
