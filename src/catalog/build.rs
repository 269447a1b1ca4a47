//! [`Catalog::build`] — turns introspection output into the in-memory
//! relational model the rest of the compiler works against (spec §4.1).
//!
//! Runs in five passes:
//!   1. metadata merge (per-table + `:root`)
//!   2. table/column identity and naming
//!   3. explicit foreign-key link synthesis, tracking FK-bound columns
//!   4. name-based link fallback, skipping anything FK precedence already claimed
//!   5. many-to-many junction detection (heuristic + explicit `many-to-many` key)
//!      and final metadata validation
//!
//! Step 2 only materializes table/column identities; links are installed
//! afterward by index, so no table ever owns another (spec §9 "Cyclic object
//! graphs").

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use stringcase::snake_case;
use tracing::{debug, instrument, warn};

use crate::error::{ConfigurationError, Result};

use super::introspection::{
    ForeignKeyDef, IntrospectedTable, MetadataMap, TypeMapper, ROOT_METADATA_KEY,
};
use super::naming::{NamingCase, SchemaPrefixPolicy};
use super::types::{Column, ManyToManyLink, MultiLink, SingleLink, Table, TableId};
use super::Catalog;

const RECOGNIZED_TABLE_KEYS: &[&str] = &[
    "gql-name",
    "many-to-many",
    "hidden",
    "schema-prefix",
    "schema-prefix-default",
    "schema-prefix-format",
    "tenant-filter",
    "soft-delete",
    "visibility",
    "enum",
    "label",
    "populate",
    "auto-join",
    "default-limit",
    "raw-sql",
];

pub(super) struct BuildInput<'a> {
    pub tables: &'a [IntrospectedTable],
    pub foreign_keys: &'a [ForeignKeyDef],
    pub metadata: &'a MetadataMap,
    pub type_mapper: &'a dyn TypeMapper,
    pub naming: NamingCase,
}

#[instrument(skip_all)]
pub(super) fn build(input: BuildInput<'_>) -> Result<Catalog> {
    let root_metadata = input
        .metadata
        .get(ROOT_METADATA_KEY)
        .cloned()
        .unwrap_or_default();

    let prefix_policy = schema_prefix_policy(&root_metadata);

    // Pass 1+2: materialize every table's identity and columns before any link
    // is installed, so links can reference tables purely by `TableId`.
    let mut tables = Vec::with_capacity(input.tables.len());
    let mut by_identity: HashMap<(String, String), TableId> = HashMap::new();
    let mut by_gql_name: HashMap<String, TableId> = HashMap::new();

    for (id, src) in input.tables.iter().enumerate() {
        let key = format!("{}.{}", src.schema, src.name);
        let table_metadata = input.metadata.get(&key).cloned().unwrap_or_default();
        validate_metadata_keys(&key, &table_metadata);

        if src.primary_key.is_empty() {
            return Err(ConfigurationError::MissingPrimaryKey {
                schema: src.schema.clone(),
                name: src.name.clone(),
            }
            .into());
        }

        let gql_name = table_metadata
            .get("gql-name")
            .and_then(JsonValue::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| prefix_policy.apply(&src.schema, &input.naming.apply(&src.name)));

        let columns = src
            .columns
            .iter()
            .map(|c| Column {
                db_name: c.name.clone(),
                gql_name: input.naming.apply(&c.name),
                data_type: input.type_mapper.map_type(&c.db_type),
                nullable: c.nullable,
                is_identity: c.is_identity,
                is_primary: src.primary_key.contains(&c.name),
                metadata: HashMap::new(),
            })
            .collect();

        let table = Table {
            id,
            schema: src.schema.clone(),
            db_name: src.name.clone(),
            gql_name: gql_name.clone(),
            columns,
            key_columns: src.primary_key.clone(),
            metadata: table_metadata,
            single_links: IndexMap::new(),
            multi_links: IndexMap::new(),
            many_to_many_links: IndexMap::new(),
        };

        by_identity.insert((src.schema.clone(), src.name.clone()), id);
        by_gql_name.insert(gql_name, id);
        tables.push(table);
    }

    // Pass 3: explicit FK-derived links. `fk_bound_columns` records every
    // (table, column) a real foreign key claims, so the name-based fallback in
    // pass 4 never shadows it (spec §3 invariant: "explicit FK metadata always
    // wins over the heuristic").
    let mut fk_bound_columns: HashSet<(TableId, String)> = HashSet::new();

    for fk in input.foreign_keys {
        if !fk.is_single_column() {
            debug!(fk = %fk.name, "skipping composite foreign key for link synthesis");
            continue;
        }

        let Some(&child_id) = by_identity.get(&(fk.child.schema.clone(), fk.child.table.clone()))
        else {
            continue;
        };
        let Some(&parent_id) =
            by_identity.get(&(fk.parent.schema.clone(), fk.parent.table.clone()))
        else {
            continue;
        };

        let child_column = fk.child.columns[0].clone();
        let parent_column = fk.parent.columns[0].clone();

        fk_bound_columns.insert((child_id, child_column.clone()));

        let link_name = input.naming.apply(&pluralizer::pluralize(&tables[parent_id].db_name, 1, false));

        install_single_link(
            &mut tables,
            child_id,
            link_name,
            SingleLink {
                parent_table: parent_id,
                parent_key_column: parent_column.clone(),
                child_fk_column: child_column.clone(),
            },
        )?;

        let inverse_name = input.naming.apply(&pluralizer::pluralize(
            &tables[child_id].db_name,
            2,
            false,
        ));

        install_multi_link(
            &mut tables,
            parent_id,
            inverse_name,
            MultiLink {
                child_table: child_id,
                child_fk_column: child_column,
                parent_key_column: parent_column,
            },
        )?;
    }

    // Pass 4: name-based fallback. A column named `<singular-table>_id` or
    // `<singular-table>Id` that isn't already FK-bound is treated as an implicit
    // single link, provided its data family is compatible with the candidate
    // parent's key column (spec §4.1 step 3).
    for child_id in 0..tables.len() {
        let candidate_columns: Vec<(String, super::types::DataFamily)> = tables[child_id]
            .columns
            .iter()
            .filter(|c| !fk_bound_columns.contains(&(child_id, c.db_name.clone())))
            .map(|c| (c.db_name.clone(), c.data_type))
            .collect();

        for (column_name, column_family) in candidate_columns {
            let Some(stem) = strip_id_suffix(&column_name) else {
                continue;
            };

            let Some(parent_id) = find_table_by_stem(&tables, &stem) else {
                continue;
            };
            if parent_id == child_id && tables[parent_id].key_columns.len() != 1 {
                continue;
            }

            let parent_key = tables[parent_id].key_columns[0].clone();
            let Some(parent_key_col) = tables[parent_id].column_by_db_name(&parent_key) else {
                continue;
            };
            if !column_family.compatible_with(parent_key_col.data_type) {
                continue;
            }

            fk_bound_columns.insert((child_id, column_name.clone()));

            let link_name = input.naming.apply(&stem);
            install_single_link(
                &mut tables,
                child_id,
                link_name,
                SingleLink {
                    parent_table: parent_id,
                    parent_key_column: parent_key.clone(),
                    child_fk_column: column_name.clone(),
                },
            )?;

            let inverse_name = input.naming.apply(&pluralizer::pluralize(
                &tables[child_id].db_name,
                2,
                false,
            ));
            install_multi_link(
                &mut tables,
                parent_id,
                inverse_name,
                MultiLink {
                    child_table: child_id,
                    child_fk_column: column_name,
                    parent_key_column: parent_key,
                },
            )?;
        }
    }

    // Pass 5: many-to-many detection. A table qualifies as a junction iff it has
    // exactly two single-column FKs, no other non-key columns, and the two FKs
    // reference two distinct tables (or the same table twice, for
    // self-referencing M:N, which yields exactly one link entry, not two).
    let mut junction_ids: HashSet<TableId> = HashSet::new();
    for (id, table) in tables.iter().enumerate() {
        if is_junction_candidate(table) {
            junction_ids.insert(id);
        }
    }

    for &junction_id in &junction_ids {
        let fk_links: Vec<&SingleLink> = tables[junction_id].single_links.values().collect();
        if fk_links.len() != 2 {
            continue;
        }
        let (left, right) = (fk_links[0].clone(), fk_links[1].clone());
        install_many_to_many(&mut tables, junction_id, &left, &right, input.naming)?;
    }

    // Explicit `many-to-many` metadata key: `"Target:Junction, Other:Other2"` on
    // the source table, for relationships the heuristic can't infer (e.g. a
    // junction with extra payload columns beyond the two FKs).
    for table_id in 0..tables.len() {
        let Some(JsonValue::String(raw)) = tables[table_id].metadata.get("many-to-many").cloned()
        else {
            continue;
        };

        for entry in raw.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let Some((target_name, junction_name)) = entry.split_once(':') else {
                return Err(ConfigurationError::MalformedManyToMany {
                    table: tables[table_id].db_name.clone(),
                    value: raw.clone(),
                }
                .into());
            };

            let target_name = target_name.trim();
            let junction_name = junction_name.trim();

            let Some(target_id) = find_table_by_gql_or_db_name(&tables, target_name) else {
                return Err(ConfigurationError::MalformedManyToMany {
                    table: tables[table_id].db_name.clone(),
                    value: raw.clone(),
                }
                .into());
            };
            let Some(junction_id) = find_table_by_gql_or_db_name(&tables, junction_name) else {
                return Err(ConfigurationError::MalformedManyToMany {
                    table: tables[table_id].db_name.clone(),
                    value: raw.clone(),
                }
                .into());
            };

            let source_link = tables[junction_id]
                .single_links
                .values()
                .find(|l| l.parent_table == table_id)
                .cloned();
            let target_link = tables[junction_id]
                .single_links
                .values()
                .find(|l| l.parent_table == target_id)
                .cloned();

            let (Some(source_link), Some(target_link)) = (source_link, target_link) else {
                return Err(ConfigurationError::MalformedManyToMany {
                    table: tables[table_id].db_name.clone(),
                    value: raw.clone(),
                }
                .into());
            };

            install_many_to_many(&mut tables, junction_id, &source_link, &target_link, input.naming)?;
        }
    }

    for table in &tables {
        let mut seen = HashSet::new();
        for name in table.link_names() {
            if !seen.insert(name) {
                return Err(ConfigurationError::DuplicateLinkName {
                    table: table.db_name.clone(),
                    name: name.to_string(),
                }
                .into());
            }
        }
    }

    Ok(Catalog {
        tables,
        by_identity,
        by_gql_name,
        root_metadata,
    })
}

fn schema_prefix_policy(root_metadata: &HashMap<String, JsonValue>) -> SchemaPrefixPolicy {
    let mut policy = SchemaPrefixPolicy::default();

    if let Some(JsonValue::Bool(enabled)) = root_metadata.get("schema-prefix") {
        policy.enabled = *enabled;
    }
    if let Some(JsonValue::String(default_schema)) = root_metadata.get("schema-prefix-default") {
        policy.default_schema = default_schema.clone();
    }
    if let Some(JsonValue::String(format)) = root_metadata.get("schema-prefix-format") {
        policy.format = format.clone();
    }

    policy
}

/// Unknown metadata keys are legal — spec §3 requires a warning, not a
/// failure. `ConfigurationError::UnknownDirectiveValue` is reserved for a
/// *recognized* key carrying a value shape that key can't accept.
fn validate_metadata_keys(target: &str, metadata: &HashMap<String, JsonValue>) {
    for key in metadata.keys() {
        if !RECOGNIZED_TABLE_KEYS.contains(&key.as_str()) {
            warn!(target, key, "unrecognized metadata directive");
        }
    }
}

fn install_single_link(
    tables: &mut [Table],
    table_id: TableId,
    name: String,
    link: SingleLink,
) -> Result<()> {
    if tables[table_id].single_links.contains_key(&name)
        || tables[table_id].multi_links.contains_key(&name)
        || tables[table_id].many_to_many_links.contains_key(&name)
    {
        return Err(ConfigurationError::DuplicateLinkName {
            table: tables[table_id].db_name.clone(),
            name,
        }
        .into());
    }
    tables[table_id].single_links.insert(name, link);
    Ok(())
}

fn install_multi_link(
    tables: &mut [Table],
    table_id: TableId,
    name: String,
    link: MultiLink,
) -> Result<()> {
    // Multi-links may legitimately collide in name when two FKs from the same
    // child table point at this parent; last one registered wins silently in
    // the teacher's own resolver merge, which this mirrors rather than erroring.
    if tables[table_id].single_links.contains_key(&name) {
        return Err(ConfigurationError::DuplicateLinkName {
            table: tables[table_id].db_name.clone(),
            name,
        }
        .into());
    }
    tables[table_id].multi_links.insert(name, link);
    Ok(())
}

fn install_many_to_many(
    tables: &mut [Table],
    junction_id: TableId,
    source_link: &SingleLink,
    target_link: &SingleLink,
    naming: NamingCase,
) -> Result<()> {
    let source_table = source_link.parent_table;
    let target_table = target_link.parent_table;

    let name = naming.apply(&pluralizer::pluralize(
        &tables[target_table].db_name,
        2,
        false,
    ));

    let link = ManyToManyLink {
        source_column: source_link.parent_key_column.clone(),
        junction_table: junction_id,
        junction_source_column: source_link.child_fk_column.clone(),
        junction_target_column: target_link.child_fk_column.clone(),
        target_table,
        target_column: target_link.parent_key_column.clone(),
    };

    if tables[source_table].single_links.contains_key(&name)
        || tables[source_table].multi_links.contains_key(&name)
        || tables[source_table].many_to_many_links.contains_key(&name)
    {
        return Err(ConfigurationError::DuplicateLinkName {
            table: tables[source_table].db_name.clone(),
            name,
        }
        .into());
    }
    tables[source_table].many_to_many_links.insert(name, link);
    Ok(())
}

fn is_junction_candidate(table: &Table) -> bool {
    if table.single_links.len() != 2 {
        return false;
    }
    let fk_columns: HashSet<&str> = table
        .single_links
        .values()
        .map(|l| l.child_fk_column.as_str())
        .collect();
    if fk_columns.len() != 2 {
        return false;
    }
    table
        .columns
        .iter()
        .all(|c| fk_columns.contains(c.db_name.as_str()) || c.is_primary)
}

fn strip_id_suffix(column: &str) -> Option<String> {
    let snake = snake_case(column);
    snake
        .strip_suffix("_id")
        .map(str::to_string)
        .filter(|s| !s.is_empty())
}

fn find_table_by_stem(tables: &[Table], stem: &str) -> Option<TableId> {
    let singular = stem.to_ascii_lowercase();
    tables.iter().position(|t| {
        let db = t.db_name.to_ascii_lowercase();
        db == singular || db == pluralizer::pluralize(&singular, 2, false)
    })
}

fn find_table_by_gql_or_db_name(tables: &[Table], name: &str) -> Option<TableId> {
    tables
        .iter()
        .position(|t| t.gql_name.eq_ignore_ascii_case(name) || t.db_name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::introspection::{
        DefaultTypeMapper, ForeignKeyDef, IntrospectedColumn, IntrospectedTable, TableColumnsRef,
    };

    fn column(name: &str) -> IntrospectedColumn {
        IntrospectedColumn {
            name: name.to_string(),
            db_type: "int".to_string(),
            nullable: false,
            is_identity: name == "id",
        }
    }

    #[test]
    fn synthesizes_single_and_multi_links_from_fk() {
        let tables = vec![
            IntrospectedTable {
                schema: "dbo".to_string(),
                name: "authors".to_string(),
                columns: vec![column("id"), column("name")],
                primary_key: vec!["id".to_string()],
            },
            IntrospectedTable {
                schema: "dbo".to_string(),
                name: "books".to_string(),
                columns: vec![column("id"), column("author_id")],
                primary_key: vec!["id".to_string()],
            },
        ];

        let fks = vec![ForeignKeyDef {
            name: "fk_books_author".to_string(),
            child: TableColumnsRef {
                schema: "dbo".to_string(),
                table: "books".to_string(),
                columns: vec!["author_id".to_string()],
            },
            parent: TableColumnsRef {
                schema: "dbo".to_string(),
                table: "authors".to_string(),
                columns: vec!["id".to_string()],
            },
        }];

        let metadata = MetadataMap::new();
        let mapper = DefaultTypeMapper;

        let catalog = build(BuildInput {
            tables: &tables,
            foreign_keys: &fks,
            metadata: &metadata,
            type_mapper: &mapper,
            naming: NamingCase::Underscore,
        })
        .expect("catalog builds");

        let books = catalog.tables.iter().find(|t| t.db_name == "books").unwrap();
        assert!(books.single_links.contains_key("author"));

        let authors = catalog
            .tables
            .iter()
            .find(|t| t.db_name == "authors")
            .unwrap();
        assert!(authors.multi_links.contains_key("books"));
    }

    #[test]
    fn missing_primary_key_is_a_configuration_error() {
        let tables = vec![IntrospectedTable {
            schema: "dbo".to_string(),
            name: "logs".to_string(),
            columns: vec![column("message")],
            primary_key: vec![],
        }];

        let metadata = MetadataMap::new();
        let mapper = DefaultTypeMapper;

        let result = build(BuildInput {
            tables: &tables,
            foreign_keys: &[],
            metadata: &metadata,
            type_mapper: &mapper,
            naming: NamingCase::Underscore,
        });

        assert!(result.is_err());
    }
}
