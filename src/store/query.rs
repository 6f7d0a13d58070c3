//! Filter and query types for `find`/`count`.
//!
//! A deliberately small subset of a document-database query language:
//! equality, membership and range comparisons on (optionally dotted) field
//! paths, conjunction, a single sort key, skip and limit. Backends collect
//! matching documents and hand them to [`Query::finish`] so ordering and
//! pagination behave identically everywhere.

use serde_json::Value;
use std::cmp::Ordering;

/// Predicate over a JSON document.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Filter {
    /// Matches every document.
    #[default]
    All,
    Eq(String, Value),
    In(String, Vec<Value>),
    Lt(String, Value),
    Lte(String, Value),
    Gt(String, Value),
    Gte(String, Value),
    And(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq(field.into(), value.into())
    }

    pub fn is_in<V: Into<Value>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::In(field.into(), values.into_iter().map(Into::into).collect())
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Lt(field.into(), value.into())
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Lte(field.into(), value.into())
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Gt(field.into(), value.into())
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Gte(field.into(), value.into())
    }

    /// Conjunction, flattening nested `And`s and dropping `All`.
    #[must_use]
    pub fn and(self, other: Filter) -> Filter {
        match (self, other) {
            (Filter::All, f) | (f, Filter::All) => f,
            (Filter::And(mut a), Filter::And(b)) => {
                a.extend(b);
                Filter::And(a)
            },
            (Filter::And(mut a), f) | (f, Filter::And(mut a)) => {
                a.push(f);
                Filter::And(a)
            },
            (f, g) => Filter::And(vec![f, g]),
        }
    }

    /// Evaluates the predicate. Missing fields read as `null`; range
    /// comparisons between incomparable types never match.
    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(field, value) => lookup(doc, field) == value,
            Filter::In(field, values) => {
                let actual = lookup(doc, field);
                values.iter().any(|v| v == actual)
            },
            Filter::Lt(field, value) => compare(lookup(doc, field), value) == Some(Ordering::Less),
            Filter::Lte(field, value) => matches!(
                compare(lookup(doc, field), value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Filter::Gt(field, value) => {
                compare(lookup(doc, field), value) == Some(Ordering::Greater)
            },
            Filter::Gte(field, value) => matches!(
                compare(lookup(doc, field), value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Filter::And(filters) => filters.iter().all(|f| f.matches(doc)),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

/// Filtered find with sort, skip and limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filter: Filter,
    pub sort: Option<(String, Order)>,
    pub skip: usize,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn sort(mut self, field: impl Into<String>, order: Order) -> Self {
        self.sort = Some((field.into(), order));
        self
    }

    #[must_use]
    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Orders, skips and truncates already-filtered `(id, document)` pairs.
    ///
    /// Ties on the sort key (and the unsorted case) are broken by id so
    /// pagination is stable across backends.
    pub(crate) fn finish(&self, mut matched: Vec<(String, Value)>) -> Vec<Value> {
        match &self.sort {
            Some((field, order)) => matched.sort_by(|(id_a, a), (id_b, b)| {
                let by_field = compare_for_sort(lookup(a, field), lookup(b, field));
                let by_field = match order {
                    Order::Asc => by_field,
                    Order::Desc => by_field.reverse(),
                };
                by_field.then_with(|| id_a.cmp(id_b))
            }),
            None => matched.sort_by(|(a, _), (b, _)| a.cmp(b)),
        }

        matched
            .into_iter()
            .skip(self.skip)
            .take(self.limit.unwrap_or(usize::MAX))
            .map(|(_, doc)| doc)
            .collect()
    }
}

static NULL: Value = Value::Null;

fn lookup<'a>(doc: &'a Value, field: &str) -> &'a Value {
    field
        .split('.')
        .try_fold(doc, |value, part| value.get(part))
        .unwrap_or(&NULL)
}

fn compare(actual: &Value, expected: &Value) -> Option<Ordering> {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
        },
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn compare_for_sort(a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => compare(a, b).unwrap_or(Ordering::Equal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn docs() -> Vec<(String, Value)> {
        vec![
            ("c".to_string(), json!({"owner": "alice", "at": 30, "meta": {"kind": "reel"}})),
            ("a".to_string(), json!({"owner": "bob", "at": 10})),
            ("b".to_string(), json!({"owner": "alice", "at": 20})),
            ("d".to_string(), json!({"owner": "alice", "at": 20})),
        ]
    }

    #[test]
    fn test_eq_and_range() {
        let filter = Filter::eq("owner", "alice").and(Filter::lte("at", 20));
        let ids: Vec<_> = docs()
            .into_iter()
            .filter(|(_, d)| filter.matches(d))
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec!["b", "d"]);
    }

    #[test]
    fn test_missing_field_never_matches_range() {
        let doc = json!({"owner": "alice"});
        assert!(!Filter::lt("at", 100).matches(&doc));
        assert!(!Filter::gte("at", 0).matches(&doc));
        assert!(Filter::eq("at", Value::Null).matches(&doc));
    }

    #[test]
    fn test_dotted_path_and_in() {
        let doc = json!({"meta": {"kind": "reel"}});
        assert!(Filter::eq("meta.kind", "reel").matches(&doc));
        assert!(Filter::is_in("meta.kind", ["post", "reel"]).matches(&doc));
        assert!(!Filter::is_in("meta.kind", ["post"]).matches(&doc));
    }

    #[test]
    fn test_and_flattens() {
        let f = Filter::All
            .and(Filter::eq("a", 1))
            .and(Filter::eq("b", 2))
            .and(Filter::eq("c", 3));
        match f {
            Filter::And(parts) => assert_eq!(parts.len(), 3),
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn test_finish_sorts_with_id_tiebreak() {
        let query = Query::all().sort("at", Order::Desc);
        let out = query.finish(docs());
        let ats: Vec<_> = out.iter().map(|d| d["at"].as_i64().unwrap()).collect();
        assert_eq!(ats, vec![30, 20, 20, 10]);
        // b before d on the tie
        assert_eq!(out[1]["owner"], "alice");
    }

    #[test]
    fn test_finish_skip_limit() {
        let query = Query::all().sort("at", Order::Asc).skip(1).limit(2);
        let out = query.finish(docs());
        let ats: Vec<_> = out.iter().map(|d| d["at"].as_i64().unwrap()).collect();
        assert_eq!(ats, vec![20, 20]);
    }

    #[test]
    fn test_finish_unsorted_orders_by_id() {
        let out = Query::all().finish(docs());
        let owners: Vec<_> = out.iter().map(|d| d["at"].as_i64().unwrap()).collect();
        assert_eq!(owners, vec![10, 20, 30, 20]);
    }
}
