//! Join query compilation (spec §4.5 "Join query compilation").
//!
//! For a join J with connected sub-query C: build a restricted parent id set
//! R (`SELECT DISTINCT parent.<fromColumn> AS JoinId`, recursively inner-
//! joining any ancestor chain), wrap it against the child table under
//! aliases `a`/`b`, and — unless J is `Single` — append C's filter, sort,
//! and pagination.

use std::sync::atomic::AtomicUsize;

use indexmap::IndexMap;
use tracing::instrument;

use crate::cancel::CancellationToken;
use crate::catalog::Catalog;
use crate::dialect::{Dialect, SortKey};
use crate::error::Result;
use crate::join_expander::TableJoin;
use crate::logical::SelectionKind;
use crate::params::ParamCollection;
use crate::sql::ParameterizedSql;

use super::keys::join_key;
use super::{column_list_aliased, compile_query_filter, dedup_columns, RowAccess};

#[allow(clippy::too_many_arguments)]
#[instrument(skip_all, fields(join = %join.name))]
pub fn emit(
    join: &TableJoin,
    owner: &RowAccess,
    parent_key: &str,
    catalog: &Catalog,
    dialect: &dyn Dialect,
    params: &ParamCollection,
    cancellation: &CancellationToken,
    out: &mut IndexMap<String, ParameterizedSql>,
) -> Result<()> {
    cancellation.check()?;
    let a = dialect.escape_identifier("a");
    let b = dialect.escape_identifier("b");
    let join_id = dialect.escape_identifier("JoinId");
    let src_id = dialect.escape_identifier("src_id");

    let select_col = match &owner.qualifier {
        Some(q) => format!("{q}.{}", dialect.escape_identifier(&join.from_column)),
        None => dialect.escape_identifier(&join.from_column),
    };
    let mut r_sql = format!("SELECT DISTINCT {select_col} AS {join_id} FROM {}", owner.from_sql);
    if let Some(predicate) = &owner.predicate {
        r_sql.push_str(" WHERE ");
        r_sql.push_str(predicate);
    }

    let child_table = catalog.table(join.connected.table);
    let child_ref = dialect.escape_identifier(&child_table.db_name);

    let correlation = format!(
        "{a}.{join_id} {} {b}.{}",
        dialect.get_operator(join.operator),
        dialect.escape_identifier(&join.connected_column)
    );

    let wrap_from = format!("({r_sql}) {a} INNER JOIN {child_ref} {b} ON {correlation}");

    let connected_filter = compile_query_filter(
        join.connected.filter.as_ref(),
        child_table,
        &b,
        catalog,
        dialect,
        params,
        &AtomicUsize::new(0),
        cancellation,
    )?;

    let child_from_sql = if connected_filter.joins.is_empty() {
        wrap_from.clone()
    } else {
        format!("{wrap_from} {}", connected_filter.joins)
    };

    let own_name = join.alias.as_deref().unwrap_or(&join.name).to_string();
    let child_key = join_key(parent_key, &own_name);

    let full_columns = dedup_columns(&join.connected.scalar_columns, &join.connected.joins);
    let columns = column_list_aliased(child_table, &full_columns, dialect, &b);

    let mut parts = vec![format!(
        "SELECT {a}.{join_id} {src_id}, {columns} FROM {child_from_sql}"
    )];

    if join.kind != SelectionKind::Single {
        if let Some(predicate) = &connected_filter.predicate {
            parts.push(format!("WHERE {predicate}"));
        }
        let sorts: Vec<SortKey> = join
            .connected
            .sorts
            .iter()
            .map(|s| SortKey {
                escaped_column: dialect.escape_identifier(&s.column),
                direction: s.direction,
            })
            .collect();
        parts.push(dialect.pagination(&sorts, join.connected.offset, join.connected.limit));
    }

    out.insert(child_key.clone(), ParameterizedSql::new(parts.join(" ")));

    let child_access = RowAccess {
        from_sql: child_from_sql,
        qualifier: Some(b),
        predicate: connected_filter.predicate,
    };

    for nested in &join.connected.joins {
        cancellation.check()?;
        emit(nested, &child_access, &own_name, catalog, dialect, params, cancellation, out)?;
    }

    for aggregate in &join.connected.aggregates {
        cancellation.check()?;
        let agg_sql = super::aggregate::compile(aggregate, child_table, &child_access, catalog, dialect, cancellation)?;
        out.insert(
            super::keys::agg_key(&own_name, &aggregate.alias),
            ParameterizedSql::new(agg_sql),
        );
    }

    Ok(())
}
