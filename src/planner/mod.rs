//! Turns an [`ExpandedQuery`] forest into the flat keyed SQL batch the
//! collaborator executor runs (spec §4.5, §4.8).

mod aggregate;
mod join_query;
mod keys;

use std::sync::atomic::AtomicUsize;

use indexmap::IndexMap;
use tracing::instrument;

use crate::cancel::CancellationToken;
use crate::catalog::{Catalog, Table};
use crate::dialect::{Dialect, SortKey};
use crate::error::Result;
use crate::filter::compile::{self, CompiledFilter};
use crate::filter::TableFilter;
use crate::join_expander::{ExpandedQuery, TableJoin};
use crate::params::ParamCollection;
use crate::sql::ParameterizedSql;

/// How a node's own row set is reached from `FROM`, threaded down the join
/// tree so each descendant can build its own restricted-parent-id-set
/// sub-query against the correct ancestor access path (spec §4.5 step 1,
/// "restricted parent id set").
#[derive(Debug, Clone)]
struct RowAccess {
    /// `FROM`-clause source text for this node's own row set (already
    /// includes this node's own filter joins, if any).
    from_sql: String,
    /// Prefix used to qualify a column on this node's own table. `None` at
    /// the root, where the lone table in scope needs no qualifier.
    qualifier: Option<String>,
    /// This node's own compiled filter predicate — used as the `WHERE` when
    /// a child builds its restricted-parent-id-set against this node.
    predicate: Option<String>,
}

/// Compiles every top-level selection into the keyed SQL batch.
#[instrument(skip_all)]
pub fn plan(
    queries: &[ExpandedQuery],
    catalog: &Catalog,
    dialect: &dyn Dialect,
    params: &ParamCollection,
    cancellation: &CancellationToken,
) -> Result<IndexMap<String, ParameterizedSql>> {
    let mut out = IndexMap::new();
    for query in queries {
        emit_root(query, catalog, dialect, params, cancellation, &mut out)?;
    }
    Ok(out)
}

fn emit_root(
    query: &ExpandedQuery,
    catalog: &Catalog,
    dialect: &dyn Dialect,
    params: &ParamCollection,
    cancellation: &CancellationToken,
    out: &mut IndexMap<String, ParameterizedSql>,
) -> Result<()> {
    cancellation.check()?;
    let table = catalog.table(query.table);
    // The main SELECT's own FROM is schema-qualified; every other reference to
    // this table — the filter predicate's qualifier, and the FROM a
    // descendant join or aggregate builds its restricted-parent-id-set
    // against — uses the bare table name (spec §8 S1 vs. S3 literal SQL).
    let display_ref = dialect.table_reference(Some(&table.schema), &table.db_name);
    let bare_ref = dialect.escape_identifier(&table.db_name);

    let filter = compile_query_filter(
        query.filter.as_ref(),
        table,
        &bare_ref,
        catalog,
        dialect,
        params,
        &AtomicUsize::new(0),
        cancellation,
    )?;

    let display_from_sql = if filter.joins.is_empty() {
        display_ref.clone()
    } else {
        format!("{display_ref} {}", filter.joins)
    };
    let internal_from_sql = if filter.joins.is_empty() {
        bare_ref.clone()
    } else {
        format!("{bare_ref} {}", filter.joins)
    };

    let full_columns = dedup_columns(&query.scalar_columns, &query.joins);
    let qualifier = if filter.joins.is_empty() { None } else { Some(display_ref.clone()) };
    let columns = column_list_bare(table, &full_columns, dialect, qualifier.as_deref());

    let mut parts = vec![format!("SELECT {columns} FROM {display_from_sql}")];
    if let Some(predicate) = &filter.predicate {
        parts.push(format!("WHERE {predicate}"));
    }
    let sorts: Vec<SortKey> = query
        .sorts
        .iter()
        .map(|s| SortKey {
            escaped_column: dialect.escape_identifier(&s.column),
            direction: s.direction,
        })
        .collect();
    parts.push(dialect.pagination(&sorts, query.offset, query.limit));

    let key = query.alias.clone();
    out.insert(key.clone(), ParameterizedSql::new(parts.join(" ")));

    if query.include_result {
        let mut count_parts = vec![format!("SELECT COUNT(*) FROM {display_from_sql}")];
        if let Some(predicate) = &filter.predicate {
            count_parts.push(format!("WHERE {predicate}"));
        }
        out.insert(keys::count_key(&key), ParameterizedSql::new(count_parts.join(" ")));
    }

    let internal_qualifier = if filter.joins.is_empty() { None } else { Some(bare_ref.clone()) };
    let access = RowAccess {
        from_sql: internal_from_sql,
        qualifier: internal_qualifier,
        predicate: filter.predicate,
    };

    for aggregate in &query.aggregates {
        cancellation.check()?;
        let agg_sql = aggregate::compile(aggregate, table, &access, catalog, dialect, cancellation)?;
        out.insert(keys::agg_key(&key, &aggregate.alias), ParameterizedSql::new(agg_sql));
    }

    for join in &query.joins {
        cancellation.check()?;
        join_query::emit(join, &access, &key, catalog, dialect, params, cancellation, out)?;
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn compile_query_filter(
    filter: Option<&TableFilter>,
    table: &Table,
    table_ref: &str,
    catalog: &Catalog,
    dialect: &dyn Dialect,
    params: &ParamCollection,
    join_alias: &AtomicUsize,
    cancellation: &CancellationToken,
) -> Result<CompiledFilter> {
    match filter {
        Some(f) => compile::compile(f, table, table_ref, catalog, dialect, params, join_alias, cancellation),
        None => Ok(CompiledFilter::default()),
    }
}

/// Unions `scalar_columns` with every direct join's `from_column` (needed as
/// the correlation key for that join), de-duplicated by database name,
/// preserving first-seen order (spec §4.5 step 1, `FullColumnNames`).
fn dedup_columns(scalar_columns: &[String], joins: &[TableJoin]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for col in scalar_columns.iter().chain(joins.iter().map(|j| &j.from_column)) {
        if seen.insert(col.clone()) {
            out.push(col.clone());
        }
    }
    out
}

/// Main-row-set column list style: `<col> <alias>` pairs joined without a
/// separating space after the comma (spec §8 S1 literal SQL).
fn column_list_bare(table: &Table, columns: &[String], dialect: &dyn Dialect, qualifier: Option<&str>) -> String {
    columns
        .iter()
        .map(|col| {
            let alias = table
                .column_by_db_name(col)
                .map(|c| c.gql_name.as_str())
                .unwrap_or(col);
            let escaped = dialect.escape_identifier(col);
            let lhs = match qualifier {
                Some(q) => format!("{q}.{escaped}"),
                None => escaped,
            };
            format!("{lhs} {}", dialect.escape_identifier(alias))
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Join-row-set column list style: `<alias>.<col> AS <gqlAlias>` pairs
/// joined with `", "` (spec §8 S3 literal SQL).
fn column_list_aliased(table: &Table, columns: &[String], dialect: &dyn Dialect, qualifier: &str) -> String {
    columns
        .iter()
        .map(|col| {
            let alias = table
                .column_by_db_name(col)
                .map(|c| c.gql_name.as_str())
                .unwrap_or(col);
            format!(
                "{qualifier}.{} AS {}",
                dialect.escape_identifier(col),
                dialect.escape_identifier(alias)
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}
