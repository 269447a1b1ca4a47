//! The filter-tree algebra (spec §3 "Filter node", §4.3, §6 "Filter argument
//! wire format").
//!
//! [`TableFilter`] is the tagged-variant tree the spec calls for — `And`,
//! `Or`, `Relation`, and `JoinWalk` — with exhaustive matching everywhere it's
//! consumed, no inheritance (spec §9).

pub mod compile;

use indexmap::IndexMap;

use crate::error::{QueryShapeError, Result};
use crate::intent::ArgValue;
use crate::operator::FilterOperator;

/// A single scalar bindable as a SQL parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterScalar {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
}

/// The right-hand side of a `Relation` node.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Null,
    Scalar(FilterScalar),
    List(Vec<FilterScalar>),
    /// An identifier-to-identifier comparison — the column named here is
    /// escaped and emitted as-is rather than bound as a parameter (spec §4.3:
    /// "Value is a field-reference").
    FieldRef(String),
}

#[derive(Debug, Clone)]
pub enum TableFilter {
    And(Vec<TableFilter>),
    Or(Vec<TableFilter>),
    Relation {
        column: String,
        operator: FilterOperator,
        value: FilterValue,
    },
    JoinWalk {
        column: String,
        next: Box<TableFilter>,
    },
}

/// Parses a top-level filter argument object (the value of a `filter:`
/// argument) into a [`TableFilter`]. Returns `None` when the object has no
/// entries, so callers can omit an empty `WHERE` entirely.
pub fn parse_filter_object(
    field_name: &str,
    obj: &IndexMap<String, ArgValue>,
) -> Result<Option<TableFilter>> {
    let mut nodes = Vec::new();

    for (key, value) in obj {
        match key.as_str() {
            "and" | "or" => {
                let items = value.as_list().ok_or_else(|| QueryShapeError::NullFilterObject {
                    field: field_name.to_string(),
                })?;
                let mut children = Vec::new();
                for item in items {
                    let obj = item.as_object().ok_or_else(|| QueryShapeError::NullFilterObject {
                        field: field_name.to_string(),
                    })?;
                    if let Some(parsed) = parse_filter_object(field_name, obj)? {
                        children.push(parsed);
                    }
                }
                if !children.is_empty() {
                    nodes.push(if key == "and" {
                        TableFilter::And(children)
                    } else {
                        TableFilter::Or(children)
                    });
                }
            }
            _ => {
                if value.is_null() {
                    return Err(QueryShapeError::NullFilterObject {
                        field: field_name.to_string(),
                    }
                    .into());
                }
                let value_obj = value.as_object().ok_or_else(|| QueryShapeError::NullFilterObject {
                    field: field_name.to_string(),
                })?;
                nodes.extend(parse_column_entries(field_name, key, value_obj)?);
            }
        }
    }

    Ok(combine_and(nodes))
}

fn parse_column_entries(
    field_name: &str,
    column: &str,
    value_obj: &IndexMap<String, ArgValue>,
) -> Result<Vec<TableFilter>> {
    let mut nodes = Vec::new();

    for (key, value) in value_obj {
        if let Some(operator) = FilterOperator::from_wire(key) {
            nodes.push(TableFilter::Relation {
                column: column.to_string(),
                operator,
                value: parse_filter_value(field_name, operator, value)?,
            });
        } else {
            let inner_obj = value.as_object().ok_or_else(|| QueryShapeError::NullFilterObject {
                field: field_name.to_string(),
            })?;
            let inner_nodes = parse_column_entries(field_name, key, inner_obj)?;
            if let Some(next) = combine_and(inner_nodes) {
                nodes.push(TableFilter::JoinWalk {
                    column: column.to_string(),
                    next: Box::new(next),
                });
            }
        }
    }

    Ok(nodes)
}

fn parse_filter_value(
    field_name: &str,
    operator: FilterOperator,
    value: &ArgValue,
) -> Result<FilterValue> {
    if let ArgValue::Object(obj) = value {
        if obj.len() == 1 {
            if let Some(ArgValue::String(name)) = obj.get("_field") {
                return Ok(FilterValue::FieldRef(name.clone()));
            }
        }
    }

    if operator.is_list_valued() {
        let items = value.as_list().ok_or_else(|| QueryShapeError::BetweenArity {
            field: field_name.to_string(),
            operator: operator.to_string(),
        })?;
        let scalars: Vec<FilterScalar> = items.iter().map(to_scalar).collect::<Option<_>>().ok_or_else(
            || QueryShapeError::BetweenArity {
                field: field_name.to_string(),
                operator: operator.to_string(),
            },
        )?;

        let min_arity = match operator {
            FilterOperator::Between | FilterOperator::NBetween => 2,
            _ => 1,
        };
        if scalars.len() < min_arity {
            return Err(QueryShapeError::BetweenArity {
                field: field_name.to_string(),
                operator: operator.to_string(),
            }
            .into());
        }
        return Ok(FilterValue::List(scalars));
    }

    if value.is_null() {
        return Ok(FilterValue::Null);
    }

    let scalar = to_scalar(value).ok_or_else(|| QueryShapeError::NullFilterObject {
        field: field_name.to_string(),
    })?;
    Ok(FilterValue::Scalar(scalar))
}

fn to_scalar(value: &ArgValue) -> Option<FilterScalar> {
    match value {
        ArgValue::Int(i) => Some(FilterScalar::Int(*i)),
        ArgValue::Float(f) => Some(FilterScalar::Float(*f)),
        ArgValue::String(s) | ArgValue::Enum(s) => Some(FilterScalar::String(s.clone())),
        ArgValue::Boolean(b) => Some(FilterScalar::Bool(*b)),
        _ => None,
    }
}

fn combine_and(mut nodes: Vec<TableFilter>) -> Option<TableFilter> {
    if nodes.is_empty() {
        None
    } else if nodes.len() == 1 {
        Some(nodes.remove(0))
    } else {
        Some(TableFilter::And(nodes))
    }
}

/// Builds the additional equality conjunct for a `_primaryKey` argument,
/// pairing values positionally against `key_columns` in declaration order
/// (spec §6).
pub fn primary_key_filter(
    field_name: &str,
    key_columns: &[String],
    values: &[ArgValue],
) -> Result<TableFilter> {
    if values.len() != key_columns.len() {
        return Err(QueryShapeError::PrimaryKeyArity {
            field: field_name.to_string(),
        }
        .into());
    }

    let mut nodes = Vec::with_capacity(key_columns.len());
    for (column, value) in key_columns.iter().zip(values) {
        let scalar = to_scalar(value).ok_or_else(|| QueryShapeError::PrimaryKeyArity {
            field: field_name.to_string(),
        })?;
        nodes.push(TableFilter::Relation {
            column: column.clone(),
            operator: FilterOperator::Eq,
            value: FilterValue::Scalar(scalar),
        });
    }

    Ok(combine_and(nodes).expect("non-empty key_columns"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(pairs: Vec<(&str, ArgValue)>) -> IndexMap<String, ArgValue> {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn parses_simple_relation() {
        let filter_arg = obj(vec![(
            "name",
            ArgValue::Object(obj(vec![("_eq", ArgValue::String("Alice".to_string()))])),
        )]);

        let parsed = parse_filter_object("users", &filter_arg).unwrap().unwrap();
        match parsed {
            TableFilter::Relation { column, operator, value } => {
                assert_eq!(column, "name");
                assert_eq!(operator, FilterOperator::Eq);
                assert_eq!(value, FilterValue::Scalar(FilterScalar::String("Alice".to_string())));
            }
            other => panic!("expected Relation, got {other:?}"),
        }
    }

    #[test]
    fn parses_join_walk() {
        let filter_arg = obj(vec![(
            "user",
            ArgValue::Object(obj(vec![(
                "tenantId",
                ArgValue::Object(obj(vec![(
                    "_eq",
                    ArgValue::Int(7),
                )])),
            )])),
        )]);

        let parsed = parse_filter_object("orders", &filter_arg).unwrap().unwrap();
        match parsed {
            TableFilter::JoinWalk { column, next } => {
                assert_eq!(column, "user");
                assert!(matches!(*next, TableFilter::Relation { .. }));
            }
            other => panic!("expected JoinWalk, got {other:?}"),
        }
    }

    #[test]
    fn between_requires_two_values() {
        let filter_arg = obj(vec![(
            "total",
            ArgValue::Object(obj(vec![(
                "_between",
                ArgValue::List(vec![ArgValue::Int(1)]),
            )])),
        )]);

        assert!(parse_filter_object("orders", &filter_arg).is_err());
    }

    #[test]
    fn empty_object_yields_no_filter() {
        assert!(parse_filter_object("users", &IndexMap::new()).unwrap().is_none());
    }
}
