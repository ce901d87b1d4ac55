//! Query criteria over untyped documents.

use keystone_cache::Describe;
use keystone_core::{KeystoneError, KeystoneResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// An untyped record keyed by field name.
pub type Document = serde_json::Map<String, Value>;

/// Field holding a document's identifier.
pub const ID_FIELD: &str = "id";

/// Condition on a single field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    /// Field equals the value.
    Eq(Value),
    /// Field equals any of the values.
    In(Vec<Value>),
}

impl Filter {
    /// True if `value` satisfies the filter. A missing field is compared as `null`.
    #[must_use]
    pub fn matches(&self, value: Option<&Value>) -> bool {
        let value = value.unwrap_or(&Value::Null);
        match self {
            Self::Eq(expected) => value == expected,
            Self::In(candidates) => candidates.iter().any(|c| c == value),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    /// SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Filter, order and paging for a document query.
///
/// Filters are kept in a sorted map so two structurally equal criteria
/// always describe, and therefore cache, identically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Criteria {
    #[serde(rename = "where", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub filters: BTreeMap<String, Filter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order: Vec<(String, Direction)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
}

impl Criteria {
    /// Criteria matching every document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Criteria matching the document with the given id.
    #[must_use]
    pub fn by_id(id: impl Into<Value>) -> Self {
        Self::new().where_eq(ID_FIELD, id)
    }

    #[must_use]
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.insert(field.into(), Filter::Eq(value.into()));
        self
    }

    #[must_use]
    pub fn where_in<V: Into<Value>>(
        mut self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.filters.insert(field.into(), Filter::In(values));
        self
    }

    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order.push((field.into(), direction));
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// True if the document satisfies every filter.
    #[must_use]
    pub fn matches(&self, document: &Document) -> bool {
        self.filters
            .iter()
            .all(|(field, filter)| filter.matches(lookup(document, field)))
    }

    /// Compares two documents by the order clauses, in sequence.
    #[must_use]
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        for (field, direction) in &self.order {
            let ordering = compare_values(lookup(a, field), lookup(b, field));
            let ordering = match direction {
                Direction::Asc => ordering,
                Direction::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Rejects field names that cannot be used as JSON paths.
    pub fn validate(&self) -> KeystoneResult<()> {
        self.filters
            .keys()
            .chain(self.order.iter().map(|(field, _)| field))
            .try_for_each(|field| validate_field(field))
    }
}

impl Describe for Criteria {
    fn describe(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self))
    }
}

/// Checks that a field name is a non-empty dotted path of `[A-Za-z0-9_]` segments.
pub fn validate_field(field: &str) -> KeystoneResult<()> {
    let valid = !field.is_empty()
        && field.split('.').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
        });

    if valid {
        Ok(())
    } else {
        Err(KeystoneError::InvalidCriteria(format!(
            "field name '{}' must match [A-Za-z0-9_.]",
            field
        )))
    }
}

/// Resolves a dotted path inside a document.
#[must_use]
pub fn lookup<'a>(document: &'a Document, field: &str) -> Option<&'a Value> {
    let mut segments = field.split('.');
    let mut current = document.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values: missing and `null` first, then by type, then by value.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.unwrap_or(&Value::Null);
    let b = b.unwrap_or(&Value::Null);

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}
