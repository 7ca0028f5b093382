//! Constraint evaluation over JSON documents.

use std::cmp::Ordering;
use std::ops::RangeBounds;

use carenest_core::Timestamp;
use carenest_storage::{Constraint, Filter, SortKey, SortOrder, StorageError};
use regex::{Regex, RegexBuilder};
use serde_json::Value;

/// Resolves a dotted path (`labResults.testName`) inside a document.
pub(crate) fn lookup<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(document, |current, segment| current.get(segment))
}

enum Predicate<'a> {
    Constraint(&'a Constraint),
    Text { fields: &'a [String], pattern: Regex },
}

/// A filter prepared for repeated evaluation; text needles are compiled once.
pub(crate) struct Matcher<'a> {
    predicates: Vec<Predicate<'a>>,
}

impl<'a> Matcher<'a> {
    pub(crate) fn compile(filter: &'a Filter) -> Result<Self, StorageError> {
        let predicates = filter
            .constraints()
            .iter()
            .map(|constraint| match constraint {
                Constraint::Text { fields, needle } => {
                    let pattern = RegexBuilder::new(&regex::escape(needle))
                        .case_insensitive(true)
                        .build()
                        .map_err(|e| StorageError::internal(format!("text pattern: {e}")))?;
                    Ok(Predicate::Text { fields, pattern })
                }
                other => Ok(Predicate::Constraint(other)),
            })
            .collect::<Result<Vec<_>, StorageError>>()?;
        Ok(Self { predicates })
    }

    pub(crate) fn matches(&self, document: &Value) -> bool {
        self.predicates.iter().all(|predicate| match predicate {
            Predicate::Constraint(constraint) => matches_constraint(document, constraint),
            Predicate::Text { fields, pattern } => fields.iter().any(|field| {
                lookup(document, field)
                    .and_then(Value::as_str)
                    .is_some_and(|text| pattern.is_match(text))
            }),
        })
    }
}

fn matches_constraint(document: &Value, constraint: &Constraint) -> bool {
    match constraint {
        Constraint::Eq { field, value } => lookup(document, field) == Some(value),
        Constraint::In { field, values } => {
            lookup(document, field).is_some_and(|found| values.contains(found))
        }
        Constraint::Within {
            field,
            lower,
            upper,
        } => lookup(document, field)
            .and_then(Value::as_str)
            .and_then(|raw| Timestamp::parse(raw).ok())
            .is_some_and(|ts| (*lower, *upper).contains(&ts)),
        // Compiled separately; a bare text constraint never reaches here.
        Constraint::Text { .. } => false,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (Timestamp::parse(x), Timestamp::parse(y)) {
                (Ok(tx), Ok(ty)) => tx.cmp(&ty),
                _ => x.cmp(y),
            }
        }
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// Orders documents by the sort keys in priority order.
pub(crate) fn compare_by(keys: &[SortKey], a: &Value, b: &Value) -> Ordering {
    keys.iter()
        .map(|key| {
            let ord = compare_values(lookup(a, &key.field), lookup(b, &key.field));
            match key.order {
                SortOrder::Ascending => ord,
                SortOrder::Descending => ord.reverse(),
            }
        })
        .find(|ord| ord.is_ne())
        .unwrap_or(Ordering::Equal)
}
