//! Error taxonomy for catalog construction and query compilation.
//!
//! Compile-time failures always surface to callers as a single [`ExecutionError`]
//! naming the offending field and table (see spec §7). The three leaf kinds below
//! (`SchemaLookupError`, `QueryShapeError`, `UnsupportedFeatureError`) are folded
//! into `ExecutionError::Compile` by `?`; `ConfigurationError` is raised once, at
//! catalog construction, and is fatal for that database.

use thiserror::Error;

/// Raised while building a [`crate::catalog::Catalog`] from introspection output.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("unknown metadata directive '{key}' on '{target}'")]
    UnknownDirectiveValue { target: String, key: String },

    #[error("malformed many-to-many metadata '{value}' on '{table}': expected 'Target:Junction[, ...]'")]
    MalformedManyToMany { table: String, value: String },

    #[error("duplicate link name '{name}' on table '{table}' after normalization")]
    DuplicateLinkName { table: String, name: String },

    #[error("table '{schema}.{name}' has no primary key")]
    MissingPrimaryKey { schema: String, name: String },
}

/// Raised while resolving a name against the catalog during compilation.
#[derive(Debug, Error)]
pub enum SchemaLookupError {
    #[error("unknown table '{name}'")]
    UnknownTable { name: String },

    #[error("unknown column '{column}' on table '{table}'")]
    UnknownColumn { table: String, column: String },

    #[error("unknown link '{link}' on table '{table}'")]
    UnknownLink { table: String, link: String },

    #[error("aggregate chain on '{field}' could not be resolved to a column")]
    UnresolvedAggregateChain { field: String },

    #[error(
        "link name '{name}' on table '{table}' is ambiguous between a multi-link and a single-link"
    )]
    AmbiguousLinkName { table: String, name: String },
}

/// Raised when a query's arguments are shaped incorrectly.
#[derive(Debug, Error)]
pub enum QueryShapeError {
    #[error("sort token '{token}' is missing an '_asc'/'_desc' suffix")]
    SortMissingDirection { token: String },

    #[error("'on' argument for join '{field}' names more than one column")]
    MultiColumnOn { field: String },

    #[error("aggregate on '{field}' is missing 'operation' or 'value'")]
    MalformedAggregate { field: String },

    #[error("'{operator}' on '{field}' requires at least two values")]
    BetweenArity { field: String, operator: String },

    #[error("filter object for '{field}' is null")]
    NullFilterObject { field: String },

    #[error("'_primaryKey' on '{field}' does not match the table's key column count")]
    PrimaryKeyArity { field: String },

    #[error("operation '{name}' not found in document")]
    UnknownOperation { name: String },

    #[error("malformed GraphQL document: {message}")]
    MalformedDocument { message: String },
}

/// Raised when a filter operator or value shape cannot be expressed by a dialect.
#[derive(Debug, Error)]
pub enum UnsupportedFeatureError {
    #[error("operator '{operator}' is not supported by dialect '{dialect}'")]
    UnsupportedOperator { operator: String, dialect: String },

    #[error("value shape for '{field}' cannot be parameterized")]
    UnsupportedValueShape { field: String },
}

/// The single error type that crosses the compiler's public boundary.
///
/// Every compile-time failure collapses into this, carrying the field/table name
/// that caused it. Compilation stops at the first such error and no partial SQL is
/// returned (spec §7 propagation policy).
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("schema lookup error: {0}")]
    SchemaLookup(#[from] SchemaLookupError),

    #[error("query shape error: {0}")]
    QueryShape(#[from] QueryShapeError),

    #[error("unsupported feature: {0}")]
    UnsupportedFeature(#[from] UnsupportedFeatureError),

    /// Compilation was cancelled via the caller's cancellation signal.
    #[error("compilation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, ExecutionError>;
