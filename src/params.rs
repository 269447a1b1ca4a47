//! Thread-safe, monotonic parameter naming and value capture (spec §4.7).
//!
//! A single [`ParamCollection`] is shared by every recursive descent within one
//! compiled operation. It is never shared across operations.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use sea_query::Value;

/// One captured `(name, value, optional dbType)` triple, in append order.
#[derive(Debug, Clone)]
pub struct BoundParam {
    pub name: String,
    pub value: Value,
    pub db_type: Option<String>,
}

/// Monotonic counter plus the ordered list of values it has produced.
///
/// `Add` assigns the dialect's parameter prefix followed by the next counter value
/// (`@p0`, `@p1`, ...) and appends a record; iteration order equals insertion order,
/// which is also the order the executor must bind on the prepared statement.
pub struct ParamCollection {
    prefix: String,
    counter: AtomicUsize,
    params: Mutex<Vec<BoundParam>>,
}

impl ParamCollection {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::starting_at(prefix, 0)
    }

    /// Like [`Self::new`], but the first assigned reference uses `start` instead of
    /// `0` — needed for dialects (e.g. Postgres) whose positional placeholders are
    /// 1-indexed.
    pub fn starting_at(prefix: impl Into<String>, start: usize) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicUsize::new(start),
            params: Mutex::new(Vec::new()),
        }
    }

    /// Binds a single value, returning its parameter reference (e.g. `@p3`).
    pub fn add(&self, value: impl Into<Value>, db_type: Option<&str>) -> String {
        let idx = self.counter.fetch_add(1, Ordering::SeqCst);
        let name = format!("{}{idx}", self.prefix);
        self.params.lock().unwrap().push(BoundParam {
            name: name.clone(),
            value: value.into(),
            db_type: db_type.map(str::to_string),
        });
        name
    }

    /// Binds every value in `values`, returning a comma-joined list of references.
    pub fn add_all<I, V>(&self, values: I) -> String
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        values
            .into_iter()
            .map(|v| self.add(v, None))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Snapshot of every parameter bound so far, in insertion order.
    pub fn snapshot(&self) -> Vec<BoundParam> {
        self.params.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.params.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_monotonic_and_prefixed() {
        let params = ParamCollection::new("@p");
        assert_eq!(params.add(1i64, None), "@p0");
        assert_eq!(params.add("x", None), "@p1");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn add_all_joins_references_in_order() {
        let params = ParamCollection::new("@p");
        let refs = params.add_all([1i64, 2, 3]);
        assert_eq!(refs, "@p0, @p1, @p2");
    }
}
