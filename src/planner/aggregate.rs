//! Aggregate chain compilation (spec §4.5 "Aggregate compilation").
//!
//! An `_agg` selection walks a chain of link hops from the driving table,
//! ending in a column and an operator. The chain compiles to a series of
//! nested `src`/`next` wraps: stage 0 exposes `(srcId, joinId)` from the
//! driving table (restricted by the driving query's own filter); every hop
//! then re-projects `(srcId, joinId)` one table further out, `joinId`
//! becoming that hop's target's own key; a final stage re-joins the last
//! target on that key and aggregates the terminal column, grouped by
//! `srcId`.

use tracing::instrument;

use crate::cancel::CancellationToken;
use crate::catalog::{Catalog, ResolvedLink, Table};
use crate::dialect::Dialect;
use crate::error::{Result, SchemaLookupError};
use crate::logical::AggregateColumn;

use super::RowAccess;

#[instrument(skip_all, fields(alias = %aggregate.alias))]
pub fn compile(
    aggregate: &AggregateColumn,
    table: &Table,
    owner: &RowAccess,
    catalog: &Catalog,
    dialect: &dyn Dialect,
    cancellation: &CancellationToken,
) -> Result<String> {
    cancellation.check()?;
    let src_id = dialect.escape_identifier("srcId");
    let join_id = dialect.escape_identifier("joinId");
    let pk = dialect.escape_identifier(&table.key_columns[0]);

    // `joinId` starts out as the driving table's own pk for a Multi/M:N first
    // hop (the driving table is the "one" side), or its own FK column for a
    // Single first hop (the driving table is the "many" side).
    let first_joinid_column = match aggregate.hops.first() {
        Some(hop_name) => match table.resolve_link(hop_name) {
            Some(ResolvedLink::Single(sl)) => sl.child_fk_column.clone(),
            _ => table.key_columns[0].clone(),
        },
        None => table.key_columns[0].clone(),
    };
    let first_joinid = dialect.escape_identifier(&first_joinid_column);

    let mut stage = format!("SELECT DISTINCT {pk} AS {src_id}, {first_joinid} AS {join_id} FROM {}", owner.from_sql);
    if let Some(predicate) = &owner.predicate {
        stage.push_str(" WHERE ");
        stage.push_str(predicate);
    }

    let mut current_table = table;

    for hop_name in &aggregate.hops {
        cancellation.check()?;
        let resolved = current_table
            .resolve_link(hop_name)
            .ok_or_else(|| SchemaLookupError::UnknownLink {
                table: current_table.db_name.clone(),
                link: hop_name.clone(),
            })?;

        let (correlate_column, target_id) = match resolved {
            ResolvedLink::Single(sl) => (sl.parent_key_column.clone(), sl.parent_table),
            ResolvedLink::Multi(ml) => (ml.child_fk_column.clone(), ml.child_table),
            ResolvedLink::ManyToMany(m2m) => (m2m.junction_source_column.clone(), m2m.junction_table),
        };

        let target = catalog.table(target_id);
        let target_ref = dialect.escape_identifier(&target.db_name);
        let next_joinid = dialect.escape_identifier(&target.key_columns[0]);

        stage = format!(
            "SELECT src.{src_id} AS {src_id}, next.{next_joinid} AS {join_id} FROM ({stage}) src INNER JOIN {target_ref} next ON src.{join_id} = next.{}",
            dialect.escape_identifier(&correlate_column),
        );
        current_table = target;
    }

    let terminal_ref = dialect.escape_identifier(&current_table.db_name);
    let terminal_key = dialect.escape_identifier(&current_table.key_columns[0]);
    let column = dialect.escape_identifier(&aggregate.column);
    let alias = dialect.escape_identifier(&aggregate.alias);

    Ok(format!(
        "SELECT src.{src_id} AS {src_id}, {}(next.{column}) AS {alias} FROM ({stage}) src INNER JOIN {terminal_ref} next ON src.{join_id} = next.{terminal_key} GROUP BY src.{src_id}",
        aggregate.operator.sql_function(),
    ))
}
