//! Builds a [`QueryField`] forest from a parsed GraphQL document (spec §4.2).
//!
//! There is no shared mutable visitor stack (spec §9 "Visitor/stack state");
//! the tree is produced by a plain recursive fold over the document's AST,
//! with fragment spreads expanded as they're encountered.

use std::collections::HashMap;

use async_graphql_parser::types::{
    DocumentOperations, ExecutableDocument, Field, Selection, SelectionSet,
};
use async_graphql_parser::Positioned;
use async_graphql_value::{Name, Value as GqlValue};
use indexmap::IndexMap;
use tracing::{instrument, warn};

use crate::error::{ExecutionError, QueryShapeError, Result};

use super::fragment::FragmentTable;
use super::{ArgValue, QueryField};

const MAX_FRAGMENT_DEPTH: usize = 32;

/// Visits the named operation (or the sole operation, if the document has
/// only one) and returns its top-level fields, each flagged `include_result`.
#[instrument(skip_all, fields(operation_name))]
pub fn build_operation(
    document: &ExecutableDocument,
    operation_name: Option<&str>,
    variables: &IndexMap<Name, GqlValue>,
) -> Result<Vec<QueryField>> {
    let operation = match &document.operations {
        DocumentOperations::Single(op) => &op.node,
        DocumentOperations::Multiple(ops) => {
            let name = operation_name.ok_or_else(|| {
                ExecutionError::from(QueryShapeError::UnknownOperation {
                    name: "<unspecified>".to_string(),
                })
            })?;
            &ops
                .get(&Name::new(name))
                .ok_or_else(|| {
                    ExecutionError::from(QueryShapeError::UnknownOperation {
                        name: name.to_string(),
                    })
                })?
                .node
        }
    };

    let fragments = FragmentTable::new(&document.fragments);

    let mut fields = Vec::new();
    for item in &operation.selection_set.node.items {
        if let Selection::Field(field) = &item.node {
            let mut built = build_field(&field.node, &fragments, variables, 0)?;
            built.include_result = true;
            fields.push(built);
        }
    }

    Ok(fields)
}

fn build_field(
    field: &Field,
    fragments: &FragmentTable<'_>,
    variables: &IndexMap<Name, GqlValue>,
    depth: usize,
) -> Result<QueryField> {
    let arguments = field
        .arguments
        .iter()
        .map(|(name, value)| {
            (
                name.node.to_string(),
                resolve_value(&value.node, variables),
            )
        })
        .collect();

    let children = build_selection_set(&field.selection_set.node, fragments, variables, depth)?;

    Ok(QueryField {
        name: field.name.node.to_string(),
        alias: field.alias.as_ref().map(|a| a.node.to_string()),
        arguments,
        children,
        include_result: false,
    })
}

fn build_selection_set(
    set: &SelectionSet,
    fragments: &FragmentTable<'_>,
    variables: &IndexMap<Name, GqlValue>,
    depth: usize,
) -> Result<Vec<QueryField>> {
    let mut children = Vec::new();
    for item in &set.items {
        append_selection(&item.node, fragments, variables, depth, &mut children)?;
    }
    Ok(children)
}

fn append_selection(
    selection: &Selection,
    fragments: &FragmentTable<'_>,
    variables: &IndexMap<Name, GqlValue>,
    depth: usize,
    out: &mut Vec<QueryField>,
) -> Result<()> {
    match selection {
        Selection::Field(field) => {
            out.push(build_field(&field.node, fragments, variables, depth)?);
        }
        Selection::FragmentSpread(spread) => {
            if depth >= MAX_FRAGMENT_DEPTH {
                warn!(fragment = %spread.node.fragment_name.node, "fragment nesting too deep, dropping");
                return Ok(());
            }
            let name = spread.node.fragment_name.node.as_str();
            let Some(def) = fragments.get(name) else {
                warn!(fragment = name, "unknown fragment spread");
                return Ok(());
            };
            let mut expanded = build_selection_set(
                &def.selection_set.node,
                fragments,
                variables,
                depth + 1,
            )?;
            out.append(&mut expanded);
        }
        Selection::InlineFragment(inline) => {
            let mut expanded = build_selection_set(
                &inline.node.selection_set.node,
                fragments,
                variables,
                depth,
            )?;
            out.append(&mut expanded);
        }
    }
    Ok(())
}

fn resolve_value(value: &GqlValue, variables: &IndexMap<Name, GqlValue>) -> ArgValue {
    match value {
        GqlValue::Variable(name) => match variables.get(name) {
            Some(bound) => resolve_value(bound, variables),
            None => {
                warn!(variable = %name, "unbound variable, treating as null");
                ArgValue::Null
            }
        },
        GqlValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                ArgValue::Int(i)
            } else {
                ArgValue::Float(n.as_f64().unwrap_or_default())
            }
        }
        GqlValue::String(s) => ArgValue::String(s.clone()),
        GqlValue::Boolean(b) => ArgValue::Boolean(*b),
        GqlValue::Null => ArgValue::Null,
        GqlValue::Enum(name) => ArgValue::Enum(name.to_string()),
        GqlValue::List(items) => {
            ArgValue::List(items.iter().map(|v| resolve_value(v, variables)).collect())
        }
        GqlValue::Object(fields) => ArgValue::Object(
            fields
                .iter()
                .map(|(k, v)| (k.to_string(), resolve_value(v, variables)))
                .collect(),
        ),
        GqlValue::Binary(_) => {
            warn!("binary argument values are not supported, treating as null");
            ArgValue::Null
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_graphql_parser::parse_query;

    fn build(query: &str) -> Vec<QueryField> {
        let doc = parse_query(query).expect("valid query");
        build_operation(&doc, None, &IndexMap::new()).expect("builds")
    }

    #[test]
    fn flat_selection_marks_include_result() {
        let fields = build("{ users(limit: 10) { id email } }");
        assert_eq!(fields.len(), 1);
        assert!(fields[0].include_result);
        assert_eq!(fields[0].children.len(), 2);
    }

    #[test]
    fn fragment_spread_is_inlined() {
        let fields = build(
            "{ users { id ...details } } fragment details on User { email name }",
        );
        let names: Vec<_> = fields[0]
            .children
            .iter()
            .map(|f| f.name.clone())
            .collect();
        assert_eq!(names, vec!["id", "email", "name"]);
    }

    #[test]
    fn nested_object_argument_resolves() {
        let fields = build(r#"{ users(filter: {name: {_eq: "Alice"}}) { id } }"#);
        let filter = fields[0].argument("filter").unwrap().as_object().unwrap();
        let name_filter = filter.get("name").unwrap().as_object().unwrap();
        assert_eq!(name_filter.get("_eq").unwrap().as_str(), Some("Alice"));
    }
}
