//! Builds a [`GqlObjectQuery`] tree from a [`QueryField`] tree, bound against
//! a [`Catalog`] (spec §3 "Logical Query").

use crate::catalog::{Catalog, Table, TableId};
use crate::error::{QueryShapeError, Result, SchemaLookupError};
use crate::filter::{self, TableFilter};
use crate::intent::{classify, ArgValue, FieldClass, QueryField};
use crate::operator::{AggregateOp, FilterOperator};

use super::sort;
use super::{AggregateColumn, ForcedKind, GqlObjectQuery};

pub fn build_object_query(
    field: &QueryField,
    table_id: TableId,
    catalog: &Catalog,
    path: String,
) -> Result<GqlObjectQuery> {
    let table = catalog.table(table_id);

    let mut scalar_columns = Vec::new();
    let mut aggregates = Vec::new();
    let mut links = Vec::new();

    for child in &field.children {
        match classify(&child.name) {
            FieldClass::System => continue,
            FieldClass::Aggregate => aggregates.push(parse_aggregate(child)?),
            FieldClass::ExplicitJoin(link_name) => {
                links.push(build_link_child(
                    child,
                    link_name,
                    Some(ForcedKind::Join),
                    table,
                    catalog,
                    &path,
                )?);
            }
            FieldClass::ExplicitSingle(link_name) => {
                links.push(build_link_child(
                    child,
                    link_name,
                    Some(ForcedKind::Single),
                    table,
                    catalog,
                    &path,
                )?);
            }
            FieldClass::Standard => {
                if let Some(column) = table.column_by_gql_name(&child.name) {
                    scalar_columns.push(column.db_name.clone());
                } else if table.resolve_link(&child.name).is_some() {
                    links.push(build_link_child(child, &child.name, None, table, catalog, &path)?);
                } else {
                    return Err(SchemaLookupError::UnknownColumn {
                        table: table.db_name.clone(),
                        column: child.name.clone(),
                    }
                    .into());
                }
            }
        }
    }

    let filter = build_filter(field, table)?;
    let sorts = match field.argument("sort") {
        Some(value) => sort::parse_sort_tokens(&field.name, table, value)?,
        None => Vec::new(),
    };
    let limit = field.argument("limit").and_then(as_int);
    let offset = field.argument("offset").and_then(as_int);

    Ok(GqlObjectQuery {
        table: table_id,
        alias: field.response_key().to_string(),
        path,
        link_field_name: None,
        forced_kind: None,
        on_operator: None,
        scalar_columns,
        aggregates,
        links,
        filter,
        sorts,
        limit,
        offset,
        include_result: field.include_result,
    })
}

fn build_link_child(
    child: &QueryField,
    link_name: &str,
    forced: Option<ForcedKind>,
    table: &Table,
    catalog: &Catalog,
    parent_path: &str,
) -> Result<GqlObjectQuery> {
    let resolved = table.resolve_link(link_name).ok_or_else(|| SchemaLookupError::UnknownLink {
        table: table.db_name.clone(),
        link: link_name.to_string(),
    })?;
    let target_id = resolved.target_table();
    let child_path = format!("{parent_path}.{}", child.response_key());

    let mut built = build_object_query(child, target_id, catalog, child_path)?;
    built.link_field_name = Some(link_name.to_string());
    built.forced_kind = forced;
    built.on_operator = parse_on_operator(child)?;
    Ok(built)
}

/// Parses an `on` argument restricting a join to a single correlating
/// operator. More than one key is a `MultiColumnOn` error (spec §7) — the
/// wire shape beyond that single-operator case isn't specified further, so
/// this only supports overriding the default `_eq` correlation.
fn parse_on_operator(child: &QueryField) -> Result<Option<FilterOperator>> {
    let Some(on_arg) = child.argument("on") else {
        return Ok(None);
    };
    let Some(obj) = on_arg.as_object() else {
        return Ok(None);
    };
    if obj.len() > 1 {
        return Err(QueryShapeError::MultiColumnOn {
            field: child.response_key().to_string(),
        }
        .into());
    }
    Ok(obj.keys().next().and_then(|k| FilterOperator::from_wire(k)))
}

fn build_filter(field: &QueryField, table: &Table) -> Result<Option<TableFilter>> {
    let mut parts = Vec::new();

    if let Some(filter_arg) = field.argument("filter") {
        if let Some(obj) = filter_arg.as_object() {
            if let Some(parsed) = filter::parse_filter_object(&field.name, obj)? {
                parts.push(parsed);
            }
        }
    }

    if let Some(pk_arg) = field.argument("_primaryKey") {
        if let Some(values) = pk_arg.as_list() {
            parts.push(filter::primary_key_filter(&field.name, &table.key_columns, values)?);
        }
    }

    Ok(match parts.len() {
        0 => None,
        1 => Some(parts.remove(0)),
        _ => Some(TableFilter::And(parts)),
    })
}

fn as_int(value: &ArgValue) -> Option<i64> {
    match value {
        ArgValue::Int(i) => Some(*i),
        ArgValue::Float(f) => Some(*f as i64),
        _ => None,
    }
}

/// Parses a `_agg(operation: ..., value: {...})` field into an
/// [`AggregateColumn`], walking the `value` object's hop chain until it
/// finds the terminal `column` key (spec §6 "Aggregate selection").
fn parse_aggregate(field: &QueryField) -> Result<AggregateColumn> {
    let operation = field
        .argument("operation")
        .and_then(ArgValue::as_str)
        .and_then(AggregateOp::from_wire)
        .ok_or_else(|| QueryShapeError::MalformedAggregate {
            field: field.response_key().to_string(),
        })?;

    let mut current = field
        .argument("value")
        .and_then(ArgValue::as_object)
        .ok_or_else(|| QueryShapeError::MalformedAggregate {
            field: field.response_key().to_string(),
        })?;

    let mut hops = Vec::new();
    loop {
        if let Some(column) = current.get("column").and_then(ArgValue::as_str) {
            if current.len() != 1 {
                return Err(QueryShapeError::MalformedAggregate {
                    field: field.response_key().to_string(),
                }
                .into());
            }
            return Ok(AggregateColumn {
                alias: field.response_key().to_string(),
                hops,
                column: column.to_string(),
                operator: operation,
            });
        }

        if current.len() != 1 {
            return Err(QueryShapeError::MalformedAggregate {
                field: field.response_key().to_string(),
            }
            .into());
        }

        let (hop_name, next) = current.iter().next().expect("len checked above");
        let next_obj = next.as_object().ok_or_else(|| QueryShapeError::MalformedAggregate {
            field: field.response_key().to_string(),
        })?;
        hops.push(hop_name.clone());
        current = next_obj;
    }
}
