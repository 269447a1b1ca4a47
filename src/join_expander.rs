//! Resolves a [`GqlObjectQuery`]'s `links` into explicit [`TableJoin`]
//! descriptors (spec §4.4).
//!
//! Many-to-many links rewrite into two single-hop joins through the junction
//! table: the junction hop's connected sub-query nests the second hop inside
//! its own `joins`, so the planner's ordinary "restricted parent id set"
//! recursion (spec §4.5) threads the correlation chain without any special
//! case for M:N.

use tracing::instrument;

use crate::catalog::{Catalog, ResolvedLink, TableId};
use crate::error::{Result, SchemaLookupError};
use crate::logical::{AggregateColumn, ForcedKind, GqlObjectQuery, SelectionKind, SortToken};
use crate::operator::FilterOperator;
use crate::filter::TableFilter;

/// A join-resolved, catalog-bound query — the output of expansion. Replaces
/// [`GqlObjectQuery::links`] with `joins`, every entry carrying the SQL
/// correlation details the planner needs (spec §3 "Join descriptor").
#[derive(Debug, Clone)]
pub struct ExpandedQuery {
    pub table: TableId,
    pub alias: String,
    pub path: String,
    pub scalar_columns: Vec<String>,
    pub aggregates: Vec<AggregateColumn>,
    pub joins: Vec<TableJoin>,
    pub filter: Option<TableFilter>,
    pub sorts: Vec<SortToken>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub include_result: bool,
}

#[derive(Debug, Clone)]
pub struct TableJoin {
    pub name: String,
    pub alias: Option<String>,
    pub from_table: TableId,
    pub from_column: String,
    pub connected_column: String,
    pub operator: FilterOperator,
    pub kind: SelectionKind,
    pub connected: ExpandedQuery,
}

#[instrument(skip_all, fields(path = %query.path))]
pub fn expand_query(query: &GqlObjectQuery, catalog: &Catalog) -> Result<ExpandedQuery> {
    let table = catalog.table(query.table);
    let mut joins = Vec::with_capacity(query.links.len());

    for link in &query.links {
        let link_name = link
            .link_field_name
            .as_deref()
            .expect("link children always carry link_field_name");

        let resolved = table.resolve_link(link_name).ok_or_else(|| SchemaLookupError::UnknownLink {
            table: table.db_name.clone(),
            link: link_name.to_string(),
        })?;

        let operator = link.on_operator.unwrap_or(FilterOperator::Eq);

        match resolved {
            ResolvedLink::Single(sl) => {
                let kind = match link.forced_kind {
                    Some(ForcedKind::Join) => SelectionKind::Join,
                    _ => SelectionKind::Single,
                };
                let connected = expand_query(link, catalog)?;
                joins.push(TableJoin {
                    name: link_name.to_string(),
                    alias: Some(link.alias.clone()),
                    from_table: query.table,
                    from_column: sl.child_fk_column.clone(),
                    connected_column: sl.parent_key_column.clone(),
                    operator,
                    kind,
                    connected,
                });
            }
            ResolvedLink::Multi(ml) => {
                let kind = match link.forced_kind {
                    Some(ForcedKind::Single) => SelectionKind::Single,
                    _ => SelectionKind::Join,
                };
                let connected = expand_query(link, catalog)?;
                joins.push(TableJoin {
                    name: link_name.to_string(),
                    alias: Some(link.alias.clone()),
                    from_table: query.table,
                    from_column: ml.parent_key_column.clone(),
                    connected_column: ml.child_fk_column.clone(),
                    operator,
                    kind,
                    connected,
                });
            }
            ResolvedLink::ManyToMany(m2m) => {
                let target_connected = expand_query(link, catalog)?;
                let junction_table = catalog.table(m2m.junction_table);

                let hop2 = TableJoin {
                    name: link_name.to_string(),
                    alias: Some(link.alias.clone()),
                    from_table: m2m.junction_table,
                    from_column: m2m.junction_target_column.clone(),
                    connected_column: m2m.target_column.clone(),
                    operator,
                    kind: SelectionKind::Join,
                    connected: target_connected,
                };

                let junction_query = ExpandedQuery {
                    table: m2m.junction_table,
                    alias: junction_table.gql_name.clone(),
                    path: format!("{}.{}", query.path, junction_table.gql_name),
                    scalar_columns: vec![m2m.junction_target_column.clone()],
                    aggregates: Vec::new(),
                    joins: vec![hop2],
                    filter: None,
                    sorts: Vec::new(),
                    limit: None,
                    offset: None,
                    include_result: false,
                };

                joins.push(TableJoin {
                    name: junction_table.gql_name.clone(),
                    alias: None,
                    from_table: query.table,
                    from_column: m2m.source_column.clone(),
                    connected_column: m2m.junction_source_column.clone(),
                    operator: FilterOperator::Eq,
                    kind: SelectionKind::Join,
                    connected: junction_query,
                });
            }
        }
    }

    Ok(ExpandedQuery {
        table: query.table,
        alias: query.alias.clone(),
        path: query.path.clone(),
        scalar_columns: query.scalar_columns.clone(),
        aggregates: query.aggregates.clone(),
        joins,
        filter: query.filter.clone(),
        sorts: query.sorts.clone(),
        limit: query.limit,
        offset: query.offset,
        include_result: query.include_result,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{IntrospectedColumn, IntrospectedTable, MetadataMap, NamingCase};
    use crate::catalog::DefaultTypeMapper;

    fn column(name: &str) -> IntrospectedColumn {
        IntrospectedColumn {
            name: name.to_string(),
            db_type: "int".to_string(),
            nullable: false,
            is_identity: name == "id",
        }
    }

    #[test]
    fn unknown_link_fails_with_schema_lookup_error() {
        let tables = vec![IntrospectedTable {
            schema: "dbo".to_string(),
            name: "users".to_string(),
            columns: vec![column("id")],
            primary_key: vec!["id".to_string()],
        }];
        let metadata = MetadataMap::new();
        let mapper = DefaultTypeMapper;
        let catalog = Catalog::build(&tables, &[], &metadata, &mapper, NamingCase::Underscore).unwrap();

        let query = GqlObjectQuery {
            table: 0,
            alias: "users".to_string(),
            path: "users".to_string(),
            link_field_name: None,
            forced_kind: None,
            on_operator: None,
            scalar_columns: vec!["id".to_string()],
            aggregates: Vec::new(),
            links: vec![GqlObjectQuery {
                table: 0,
                alias: "ghost".to_string(),
                path: "users.ghost".to_string(),
                link_field_name: Some("ghost".to_string()),
                forced_kind: None,
                on_operator: None,
                scalar_columns: Vec::new(),
                aggregates: Vec::new(),
                links: Vec::new(),
                filter: None,
                sorts: Vec::new(),
                limit: None,
                offset: None,
                include_result: false,
            }],
            filter: None,
            sorts: Vec::new(),
            limit: None,
            offset: None,
            include_result: true,
        };

        assert!(expand_query(&query, &catalog).is_err());
    }
}
