//! Compiles a [`TableFilter`] tree into SQL text, binding every value through
//! a shared [`ParamCollection`] (spec §4.3).

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::instrument;

use crate::cancel::CancellationToken;
use crate::catalog::{Catalog, Table};
use crate::dialect::{Dialect, LikeShape};
use crate::error::{Result, SchemaLookupError};
use crate::operator::FilterOperator;
use crate::params::ParamCollection;

use super::{FilterScalar, FilterValue, TableFilter};

/// The result of compiling a filter: zero or more `INNER JOIN` clauses that
/// must be spliced into the driving query's `FROM`, plus an optional boolean
/// predicate for its `WHERE`.
///
/// A bare [`TableFilter::JoinWalk`] contributes only to `joins` — the INNER
/// JOIN's correlation already restricts the row set, so no separate `WHERE`
/// predicate is needed for it (spec §4.3). Combining a `JoinWalk` under `Or`
/// with an ordinary predicate is a known rough edge: the join still narrows
/// `FROM` unconditionally, so the result approximates rather than exactly
/// implements OR semantics in that mixed case (spec §9 leaves this
/// unresolved for the source implementation).
#[derive(Debug, Clone, Default)]
pub struct CompiledFilter {
    pub joins: String,
    pub predicate: Option<String>,
}

impl CompiledFilter {
    fn predicate_only(predicate: String) -> Self {
        CompiledFilter {
            joins: String::new(),
            predicate: Some(predicate),
        }
    }

    fn joins_only(joins: String) -> Self {
        CompiledFilter { joins, predicate: None }
    }
}

#[allow(clippy::too_many_arguments)]
#[instrument(skip_all, fields(table = %table.db_name))]
pub fn compile(
    filter: &TableFilter,
    table: &Table,
    table_ref: &str,
    catalog: &Catalog,
    dialect: &dyn Dialect,
    params: &ParamCollection,
    join_alias: &AtomicUsize,
    cancellation: &CancellationToken,
) -> Result<CompiledFilter> {
    cancellation.check()?;
    match filter {
        TableFilter::And(children) => {
            compile_combinator(children, table, table_ref, catalog, dialect, params, join_alias, cancellation, "AND")
        }
        TableFilter::Or(children) => {
            compile_combinator(children, table, table_ref, catalog, dialect, params, join_alias, cancellation, "OR")
        }
        TableFilter::Relation { column, operator, value } => {
            let predicate = compile_relation(column, *operator, value, table, table_ref, dialect, params)?;
            Ok(CompiledFilter::predicate_only(predicate))
        }
        TableFilter::JoinWalk { column, next } => {
            compile_join_walk(column, next, table, table_ref, catalog, dialect, params, join_alias, cancellation)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn compile_combinator(
    children: &[TableFilter],
    table: &Table,
    table_ref: &str,
    catalog: &Catalog,
    dialect: &dyn Dialect,
    params: &ParamCollection,
    join_alias: &AtomicUsize,
    cancellation: &CancellationToken,
    keyword: &str,
) -> Result<CompiledFilter> {
    let mut joins = Vec::new();
    let mut predicates = Vec::new();

    for child in children {
        let compiled = compile(child, table, table_ref, catalog, dialect, params, join_alias, cancellation)?;
        if !compiled.joins.is_empty() {
            joins.push(compiled.joins);
        }
        if let Some(p) = compiled.predicate {
            predicates.push(p);
        }
    }

    let predicate = match predicates.len() {
        0 => None,
        1 => Some(predicates.remove(0)),
        _ => Some(format!(
            "({})",
            predicates
                .iter()
                .map(|p| format!("({p})"))
                .collect::<Vec<_>>()
                .join(&format!(" {keyword} "))
        )),
    };

    Ok(CompiledFilter {
        joins: joins.join(" "),
        predicate,
    })
}

fn compile_relation(
    column: &str,
    operator: FilterOperator,
    value: &FilterValue,
    table: &Table,
    table_ref: &str,
    dialect: &dyn Dialect,
    params: &ParamCollection,
) -> Result<String> {
    let db_column = resolve_column_name(table, column)?;
    let lhs = format!("{table_ref}.{}", dialect.escape_identifier(&db_column));

    if matches!(value, FilterValue::Null) {
        return Ok(match operator {
            FilterOperator::Eq => format!("{lhs} IS NULL"),
            FilterOperator::Neq => format!("{lhs} IS NOT NULL"),
            _ => format!("{lhs} {} NULL", dialect.get_operator(operator)),
        });
    }

    if let FilterValue::FieldRef(name) = value {
        let ref_column = resolve_column_name(table, name)?;
        let rhs = format!("{table_ref}.{}", dialect.escape_identifier(&ref_column));
        return Ok(format!("{lhs} {} {rhs}", dialect.get_operator(operator)));
    }

    if operator.is_like_family() {
        let param_ref = bind_scalar(params, value_as_single_scalar(value));
        let shape = like_shape(operator);
        let expr = dialect.like_pattern(&param_ref, shape);
        return Ok(format!("{lhs} {} {expr}", dialect.get_operator(operator)));
    }

    match value {
        FilterValue::List(items) if operator.is_list_valued() => match operator {
            FilterOperator::In | FilterOperator::Nin => {
                let refs = bind_all(params, items);
                Ok(format!("{lhs} {} ({refs})", dialect.get_operator(operator)))
            }
            FilterOperator::Between | FilterOperator::NBetween => {
                let p1 = bind_scalar(params, items[0].clone());
                let p2 = bind_scalar(params, items[1].clone());
                Ok(format!("{lhs} {} {p1} AND {p2}", dialect.get_operator(operator)))
            }
            _ => unreachable!("is_list_valued implies one of the above"),
        },
        FilterValue::Scalar(scalar) => {
            let param_ref = bind_scalar(params, scalar.clone());
            Ok(format!("{lhs} {} {param_ref}", dialect.get_operator(operator)))
        }
        _ => Ok(format!("{lhs} {} NULL", dialect.get_operator(operator))),
    }
}

fn value_as_single_scalar(value: &FilterValue) -> FilterScalar {
    match value {
        FilterValue::Scalar(s) => s.clone(),
        FilterValue::List(items) => items.first().cloned().unwrap_or(FilterScalar::String(String::new())),
        _ => FilterScalar::String(String::new()),
    }
}

fn like_shape(operator: FilterOperator) -> LikeShape {
    use FilterOperator::*;
    match operator {
        Contains | NContains => LikeShape::Contains,
        StartsWith | NStartsWith => LikeShape::StartsWith,
        EndsWith | NEndsWith => LikeShape::EndsWith,
        Like | NLike => LikeShape::Exact,
        _ => LikeShape::Exact,
    }
}

fn bind_scalar(params: &ParamCollection, scalar: FilterScalar) -> String {
    match scalar {
        FilterScalar::Int(i) => params.add(i, None),
        FilterScalar::Float(f) => params.add(f, None),
        FilterScalar::String(s) => params.add(s, None),
        FilterScalar::Bool(b) => params.add(b, None),
    }
}

fn bind_all(params: &ParamCollection, items: &[FilterScalar]) -> String {
    items
        .iter()
        .cloned()
        .map(|s| bind_scalar(params, s))
        .collect::<Vec<_>>()
        .join(", ")
}

fn resolve_column_name(table: &Table, gql_or_db_name: &str) -> Result<String> {
    if let Some(column) = table.column_by_gql_name(gql_or_db_name) {
        return Ok(column.db_name.clone());
    }
    if let Some(column) = table.column_by_db_name(gql_or_db_name) {
        return Ok(column.db_name.clone());
    }
    Err(SchemaLookupError::UnknownColumn {
        table: table.db_name.clone(),
        column: gql_or_db_name.to_string(),
    }
    .into())
}

#[allow(clippy::too_many_arguments)]
fn compile_join_walk(
    column: &str,
    next: &TableFilter,
    table: &Table,
    table_ref: &str,
    catalog: &Catalog,
    dialect: &dyn Dialect,
    params: &ParamCollection,
    join_alias: &AtomicUsize,
    cancellation: &CancellationToken,
) -> Result<CompiledFilter> {
    let link = table.single_links.get(column).ok_or_else(|| SchemaLookupError::UnknownLink {
        table: table.db_name.clone(),
        link: column.to_string(),
    })?;

    let parent = catalog.table(link.parent_table);
    let parent_ref = dialect.escape_identifier(&parent.db_name);

    let inner = compile(next, parent, &parent_ref, catalog, dialect, params, join_alias, cancellation)?;

    let joinid_col = dialect.escape_identifier(&link.parent_key_column);
    let joinid_ref = dialect.escape_identifier("joinid");
    let mut subquery = format!("SELECT DISTINCT {joinid_col} AS {joinid_ref} FROM {parent_ref}");
    if !inner.joins.is_empty() {
        subquery.push(' ');
        subquery.push_str(&inner.joins);
    }
    if let Some(predicate) = &inner.predicate {
        subquery.push_str(" WHERE ");
        subquery.push_str(predicate);
    }

    let idx = join_alias.fetch_add(1, Ordering::SeqCst);
    let alias = dialect.escape_identifier(&format!("j{idx}"));
    let fk_col = dialect.escape_identifier(&link.child_fk_column);

    let join_clause = format!(
        "INNER JOIN ({subquery}) {alias} ON {alias}.{joinid_ref} = {table_ref}.{fk_col}"
    );

    Ok(CompiledFilter::joins_only(join_clause))
}
