//! Backend-neutral query description.
//!
//! A [`Filter`] is a conjunction of [`Constraint`]s. Access scoping and
//! caller-supplied filters both produce constraints, so two filters can be
//! compared for equality to check that two code paths select the same rows.

use std::ops::Bound;

use carenest_core::Timestamp;
use serde_json::Value;

/// A single predicate on a document field. Field paths may be dotted
/// (`labResults.testName`).
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Field equals the value.
    Eq { field: String, value: Value },
    /// Field equals one of the values.
    In { field: String, values: Vec<Value> },
    /// Timestamp field falls within the bounds.
    Within {
        field: String,
        lower: Bound<Timestamp>,
        upper: Bound<Timestamp>,
    },
    /// Any of the fields contains `needle`, ignoring case.
    Text { fields: Vec<String>, needle: String },
}

impl Constraint {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn any_of<V: Into<Value>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// `field >= start` and/or `field <= end`; both ends inclusive.
    pub fn between(
        field: impl Into<String>,
        start: Option<Timestamp>,
        end: Option<Timestamp>,
    ) -> Self {
        Self::Within {
            field: field.into(),
            lower: start.map_or(Bound::Unbounded, Bound::Included),
            upper: end.map_or(Bound::Unbounded, Bound::Included),
        }
    }

    /// `field < instant`.
    pub fn before(field: impl Into<String>, instant: Timestamp) -> Self {
        Self::Within {
            field: field.into(),
            lower: Bound::Unbounded,
            upper: Bound::Excluded(instant),
        }
    }

    /// `field >= instant`.
    pub fn since(field: impl Into<String>, instant: Timestamp) -> Self {
        Self::between(field, Some(instant), None)
    }

    pub fn text<F: Into<String>>(
        fields: impl IntoIterator<Item = F>,
        needle: impl Into<String>,
    ) -> Self {
        Self::Text {
            fields: fields.into_iter().map(Into::into).collect(),
            needle: needle.into(),
        }
    }
}

/// A conjunction of constraints. The empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    constraints: Vec<Constraint>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn and(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Adds `constraint` when present.
    #[must_use]
    pub fn and_maybe(self, constraint: Option<Constraint>) -> Self {
        match constraint {
            Some(c) => self.and(c),
            None => self,
        }
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}

impl From<Constraint> for Filter {
    fn from(constraint: Constraint) -> Self {
        Filter::new().and(constraint)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub order: SortOrder,
}

/// Filter plus ordering and an optional row cap.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filter: Filter,
    pub sort: Vec<SortKey>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn sort_asc(mut self, field: impl Into<String>) -> Self {
        self.sort.push(SortKey {
            field: field.into(),
            order: SortOrder::Ascending,
        });
        self
    }

    #[must_use]
    pub fn sort_desc(mut self, field: impl Into<String>) -> Self {
        self.sort.push(SortKey {
            field: field.into(),
            order: SortOrder::Descending,
        });
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn between_maps_missing_ends_to_unbounded() {
        let ts = Timestamp::now();
        let c = Constraint::between("date", Some(ts), None);
        assert_eq!(
            c,
            Constraint::Within {
                field: "date".into(),
                lower: Bound::Included(ts),
                upper: Bound::Unbounded,
            }
        );
    }

    #[test]
    fn filters_compare_structurally() {
        let a = Filter::new()
            .and(Constraint::eq("patient", "p1"))
            .and(Constraint::eq("status", "scheduled"));
        let b = Filter::from(Constraint::eq("patient", "p1"))
            .and(Constraint::eq("status", "scheduled"));
        assert_eq!(a, b);
        let reordered = Filter::from(Constraint::eq("status", "scheduled"))
            .and(Constraint::eq("patient", "p1"));
        assert_ne!(a, reordered);
    }

    #[test]
    fn and_maybe_skips_none() {
        let f = Filter::new().and_maybe(None).and_maybe(Some(Constraint::eq("a", 1)));
        assert_eq!(f.constraints().len(), 1);
    }

    #[test]
    fn query_builder() {
        let q = Query::new(Filter::new()).sort_desc("date").limit(10);
        assert_eq!(q.sort[0].order, SortOrder::Descending);
        assert_eq!(q.limit, Some(10));
    }
}
