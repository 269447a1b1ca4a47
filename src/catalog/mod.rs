//! The relational model compiled queries are bound against (spec §3, §4.1).

mod build;
pub mod introspection;
pub mod naming;
pub mod types;

use std::collections::HashMap;

use serde_json::Value as JsonValue;

use crate::error::{Result, SchemaLookupError};

pub use build::BuildInput;
pub use introspection::{
    DefaultTypeMapper, ForeignKeyDef, IntrospectedColumn, IntrospectedTable, MetadataMap,
    TableColumnsRef, TypeMapper, ROOT_METADATA_KEY,
};
pub use naming::{NamingCase, SchemaPrefixPolicy};
pub use types::{
    Column, DataFamily, ManyToManyLink, MultiLink, ResolvedLink, SingleLink, Table, TableId,
};

/// The compiled relational model: every table's identity, columns, and derived
/// link graph, plus whatever root-level metadata governed its construction.
#[derive(Debug, Clone)]
pub struct Catalog {
    tables: Vec<Table>,
    by_identity: HashMap<(String, String), TableId>,
    by_gql_name: HashMap<String, TableId>,
    root_metadata: HashMap<String, JsonValue>,
}

impl Catalog {
    /// Builds a catalog from introspection output. See [`build`] for the
    /// five-pass construction algorithm.
    pub fn build(
        tables: &[IntrospectedTable],
        foreign_keys: &[ForeignKeyDef],
        metadata: &MetadataMap,
        type_mapper: &dyn TypeMapper,
        naming: NamingCase,
    ) -> Result<Catalog> {
        build::build(BuildInput {
            tables,
            foreign_keys,
            metadata,
            type_mapper,
            naming,
        })
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn table(&self, id: TableId) -> &Table {
        &self.tables[id]
    }

    pub fn table_by_db_name(&self, schema: &str, name: &str) -> Option<&Table> {
        self.by_identity
            .get(&(schema.to_string(), name.to_string()))
            .map(|&id| &self.tables[id])
    }

    pub fn table_by_gql_name(&self, name: &str) -> Option<&Table> {
        self.by_gql_name.get(name).map(|&id| &self.tables[id])
    }

    /// As [`Self::table_by_gql_name`], but returns a typed lookup failure
    /// instead of `None` — used at the root of query compilation where an
    /// unknown top-level field name must surface as a [`SchemaLookupError`].
    pub fn require_table_by_gql_name(&self, name: &str) -> Result<&Table> {
        self.table_by_gql_name(name)
            .ok_or_else(|| SchemaLookupError::UnknownTable { name: name.to_string() }.into())
    }

    pub fn root_metadata(&self) -> &HashMap<String, JsonValue> {
        &self.root_metadata
    }
}
