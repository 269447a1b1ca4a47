//! A GraphQL-to-SQL query compiler: turns a parsed GraphQL document plus a
//! [`catalog::Catalog`] into a flat, keyed batch of parameterized SQL a
//! collaborator executor can run directly (spec §2 "System Overview").
//!
//! The pipeline is Catalog -> Query-Intent Tree ([`intent`]) -> Logical Query
//! ([`logical`]) -> Join Expander ([`join_expander`]) -> SQL Planner
//! ([`planner`]), with [`filter`] compiling the filter algebra shared by the
//! logical and planner stages and [`dialect`] supplying per-backend SQL
//! text. This crate does not execute SQL, hold a connection, or embed a
//! GraphQL server — those are collaborator concerns (spec §1).

pub mod cancel;
pub mod catalog;
pub mod dialect;
pub mod error;
pub mod filter;
pub mod intent;
pub mod join_expander;
pub mod logical;
pub mod operator;
pub mod params;
pub mod planner;
pub mod sql;

use async_graphql_value::{Name, Value as GqlValue};
use indexmap::IndexMap;
use tracing::instrument;

use crate::cancel::CancellationToken;
use crate::catalog::Catalog;
use crate::dialect::Dialect;
use crate::error::{QueryShapeError, Result};
use crate::params::ParamCollection;
use crate::sql::ParameterizedSql;

/// Compiles a GraphQL document against `catalog` into the keyed SQL batch
/// described by spec §4.5/§4.8.
///
/// `operation_name` selects among multiple named operations in `document`;
/// it's ignored (and may be `None`) when the document has exactly one.
/// `variables` resolves any `$variable` argument values the document
/// references. `cancellation` is checked at each recursive descent point
/// (spec §5); pass [`CancellationToken::new`] when the caller has no
/// cancellation source of its own.
#[instrument(skip_all, fields(operation_name))]
pub fn compile_operation(
    catalog: &Catalog,
    document: &str,
    operation_name: Option<&str>,
    variables: &IndexMap<Name, GqlValue>,
    dialect: &dyn Dialect,
    cancellation: &CancellationToken,
) -> Result<IndexMap<String, ParameterizedSql>> {
    let parsed = async_graphql_parser::parse_query(document).map_err(|e| QueryShapeError::MalformedDocument {
        message: e.to_string(),
    })?;

    let fields = intent::build_operation(&parsed, operation_name, variables)?;

    let params = ParamCollection::starting_at(dialect.parameter_prefix(), dialect.parameter_start());

    let mut expanded = Vec::with_capacity(fields.len());
    for field in &fields {
        cancellation.check()?;
        let table = catalog.require_table_by_gql_name(&field.name)?;
        let logical = logical::build_object_query(field, table.id, catalog, field.response_key().to_string())?;
        expanded.push(join_expander::expand_query(&logical, catalog)?);
    }

    let mut out = planner::plan(&expanded, catalog, dialect, &params, cancellation)?;

    let snapshot = params.snapshot();
    for sql in out.values_mut() {
        sql.params = snapshot.iter().filter(|p| references_param(&sql.sql, &p.name)).cloned().collect();
    }

    Ok(out)
}

/// Whether `sql` references the bound parameter `name`, guarding against a
/// shorter reference (`@p1`) matching as a substring of a longer one
/// (`@p10`).
fn references_param(sql: &str, name: &str) -> bool {
    let bytes = sql.as_bytes();
    let mut start = 0;
    while let Some(pos) = sql[start..].find(name) {
        let idx = start + pos;
        let end = idx + name.len();
        let boundary_ok = match bytes.get(end) {
            Some(c) => !c.is_ascii_digit(),
            None => true,
        };
        if boundary_ok {
            return true;
        }
        start = idx + 1;
    }
    false
}
