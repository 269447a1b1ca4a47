//! Input DTOs the Catalog is built from (spec §6 "Inbound — Catalog
//! introspection"). Reading these from a live connection is an external
//! collaborator's job; the Catalog only ever consumes the shapes below.

use std::collections::HashMap;

use serde_json::Value as JsonValue;

use super::types::DataFamily;

#[derive(Debug, Clone)]
pub struct IntrospectedColumn {
    pub name: String,
    /// The raw DBMS type name, e.g. `"varchar"`, `"int4"`, `"NVARCHAR"`.
    pub db_type: String,
    pub nullable: bool,
    pub is_identity: bool,
}

#[derive(Debug, Clone)]
pub struct IntrospectedTable {
    pub schema: String,
    pub name: String,
    pub columns: Vec<IntrospectedColumn>,
    /// Primary-key column names, in declaration order.
    pub primary_key: Vec<String>,
}

/// One endpoint of a foreign key — either the referencing (child) or referenced
/// (parent) side.
#[derive(Debug, Clone)]
pub struct TableColumnsRef {
    pub schema: String,
    pub table: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ForeignKeyDef {
    pub name: String,
    pub child: TableColumnsRef,
    pub parent: TableColumnsRef,
}

impl ForeignKeyDef {
    /// Single-column FKs are the only ones link synthesis considers (spec §3
    /// invariant: "Composite FKs are ignored for link synthesis").
    pub fn is_single_column(&self) -> bool {
        self.child.columns.len() == 1 && self.parent.columns.len() == 1
    }
}

/// Per-table (and model-wide, under the `:root` key) metadata, as read from
/// whichever metadata sources the caller merges (spec §4.1 step 5, §6).
pub type MetadataMap = HashMap<String, HashMap<String, JsonValue>>;

pub const ROOT_METADATA_KEY: &str = ":root";

/// Maps a DBMS-native type name to the coarse [`DataFamily`] the rest of the
/// compiler reasons about. Implementations are pure lookups, one per dialect
/// family, matched the way the teacher's own `Introspector` matches SQLite
/// `pragma_table_info` type strings in `src/parser.rs`.
pub trait TypeMapper: Send + Sync {
    fn map_type(&self, db_type: &str) -> DataFamily;
}

/// A type mapper covering the common ANSI-ish type names shared by SQL Server,
/// PostgreSQL, and SQLite — good enough as a default for catalogs built from
/// any of the three dialects this crate ships.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTypeMapper;

impl TypeMapper for DefaultTypeMapper {
    fn map_type(&self, db_type: &str) -> DataFamily {
        match db_type.to_ascii_lowercase().as_str() {
            "int" | "integer" | "int4" | "serial" => DataFamily::Int,
            "bigint" | "int8" | "bigserial" => DataFamily::BigInt,
            "smallint" | "int2" => DataFamily::Short,
            "tinyint" | "byte" => DataFamily::Byte,
            "decimal" | "numeric" | "money" => DataFamily::Decimal,
            "float" | "real" | "double" | "double precision" | "float4" | "float8" => {
                DataFamily::Float
            }
            "bool" | "boolean" | "bit" => DataFamily::Bool,
            "date" | "datetime" | "timestamp" | "smalldatetime" => DataFamily::DateTime,
            "datetimeoffset" | "timestamptz" | "timestamp with time zone" => {
                DataFamily::DateTimeOffset
            }
            "json" | "jsonb" => DataFamily::Json,
            "blob" | "bytea" | "varbinary" | "binary" | "image" => DataFamily::Bytes,
            "text" | "varchar" | "nvarchar" | "char" | "nchar" | "uuid" | "uniqueidentifier" => {
                DataFamily::String
            }
            _ => DataFamily::String,
        }
    }
}
