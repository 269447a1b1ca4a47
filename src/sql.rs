//! The `(sql, params)` pair that every compilation step produces and composes
//! (spec §3 "Parameterized SQL").

use crate::params::BoundParam;

/// A SQL fragment paired with the parameters it references.
///
/// `params` only needs to be threaded through for callers that want to inspect the
/// final bind list independent of the shared [`crate::params::ParamCollection`];
/// during compilation, values are captured directly on the collection and `params`
/// here stays empty — composition is by string concatenation only.
#[derive(Debug, Clone, Default)]
pub struct ParameterizedSql {
    pub sql: String,
    pub params: Vec<BoundParam>,
}

impl ParameterizedSql {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// Appends `other`'s SQL text with a single space separator.
    pub fn append(&mut self, other: impl AsRef<str>) {
        if !self.sql.is_empty() && !other.as_ref().is_empty() {
            self.sql.push(' ');
        }
        self.sql.push_str(other.as_ref());
    }

    pub fn with_appended(mut self, other: impl AsRef<str>) -> Self {
        self.append(other);
        self
    }
}

impl From<String> for ParameterizedSql {
    fn from(sql: String) -> Self {
        Self::new(sql)
    }
}
