//! Per-backend identifier escaping, pagination, and operator mapping (spec §4.6).
//!
//! Implementations must be pure and stateless — no connection, no mutable state,
//! safe to share as a `&'static` singleton across every concurrently compiling
//! operation.

mod postgres;
mod sqlite;
mod sqlserver;

pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;
pub use sqlserver::SqlServerDialect;

use crate::operator::FilterOperator;

pub const DEFAULT_LIMIT: i64 = 100;
pub const UNLIMITED: i64 = -1;

/// A single sort token already split into its column and direction (spec §4.5
/// "Sort parsing" — the `_asc`/`_desc` suffix never reaches SQL, only this enum
/// does).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SortKey {
    pub escaped_column: String,
    pub direction: SortDirection,
}

/// The three LIKE-family shapes a dialect must be able to turn a bound parameter
/// reference into a pattern expression for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeShape {
    Contains,
    StartsWith,
    EndsWith,
    Exact,
}

pub trait Dialect: Send + Sync {
    fn name(&self) -> &'static str;

    /// Escapes a single identifier (table or column name), e.g. `name` -> `[name]`
    /// or `"name"`.
    fn escape_identifier(&self, name: &str) -> String;

    /// Builds a fully qualified table reference, applying schema prefixing only
    /// when `schema` is present.
    fn table_reference(&self, schema: Option<&str>, table: &str) -> String {
        match schema {
            Some(schema) if !schema.is_empty() => format!(
                "{}.{}",
                self.escape_identifier(schema),
                self.escape_identifier(table)
            ),
            _ => self.escape_identifier(table),
        }
    }

    /// The prefix used when naming bound parameters (e.g. `@p`, `$`).
    fn parameter_prefix(&self) -> &'static str;

    /// The first index used when a dialect's placeholders are positional and
    /// 1-indexed (Postgres). SQL Server/SQLite dialects leave this at `0`.
    fn parameter_start(&self) -> usize {
        0
    }

    /// The vendor expression that returns the identity of the last inserted row.
    fn last_inserted_identity(&self) -> &'static str;

    /// Builds the full `ORDER BY ... OFFSET ... FETCH`/`LIMIT` tail. `limit` of
    /// `None` defaults to [`DEFAULT_LIMIT`]; [`UNLIMITED`] disables the limit
    /// entirely. `offset` of `None` is `0`.
    fn pagination(&self, sorts: &[SortKey], offset: Option<i64>, limit: Option<i64>) -> String;

    /// Builds the pattern expression a LIKE/NOT LIKE comparison binds against,
    /// from an already-bound parameter reference.
    fn like_pattern(&self, param_ref: &str, shape: LikeShape) -> String;

    /// Maps a wire-level filter operator to its SQL text. Dialects that don't
    /// support an operator at all should still return the closest ordinary
    /// comparison per spec (unknown operators collapse to `=`); callers that need
    /// to refuse an operator entirely do so before calling this, via
    /// [`crate::error::UnsupportedFeatureError`].
    fn get_operator(&self, op: FilterOperator) -> &'static str {
        use FilterOperator::*;
        match op {
            Eq => "=",
            Neq => "<>",
            Lt => "<",
            Lte => "<=",
            Gt => ">",
            Gte => ">=",
            Contains | StartsWith | EndsWith | Like => "LIKE",
            NContains | NStartsWith | NEndsWith | NLike => "NOT LIKE",
            In => "IN",
            Nin => "NOT IN",
            Between => "BETWEEN",
            NBetween => "NOT BETWEEN",
        }
    }
}

pub(crate) fn effective_limit(limit: Option<i64>) -> Option<i64> {
    match limit {
        Some(UNLIMITED) => None,
        Some(n) => Some(n),
        None => Some(DEFAULT_LIMIT),
    }
}

pub(crate) fn effective_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0)
}
