//! The in-memory relational model (spec §3 "Catalog").

use std::collections::HashMap;

use indexmap::IndexMap;
use serde_json::Value as JsonValue;

/// Index into [`super::Catalog::tables`]. Tables reference each other through
/// links by id rather than by owning value — the graph is cyclic, so the two-pass
/// build (materialize identities, then install links) avoids any `Rc`/`RefCell`
/// machinery (spec §9 "Cyclic object graphs").
pub type TableId = usize;

/// Coarse, DBMS-independent data family a column's native type is mapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataFamily {
    Int,
    BigInt,
    Short,
    Byte,
    Decimal,
    Float,
    Bool,
    String,
    DateTime,
    DateTimeOffset,
    Json,
    Bytes,
}

impl DataFamily {
    /// Whether two families are close enough to treat one as "the same kind of
    /// key" as the other — used by the name-based link fallback (spec §4.1 step 3)
    /// to decide if a column could plausibly hold a foreign key value.
    pub fn compatible_with(self, other: DataFamily) -> bool {
        use DataFamily::*;
        if self == other {
            return true;
        }
        matches!(
            (self, other),
            (Int, BigInt)
                | (BigInt, Int)
                | (Int, Short)
                | (Short, Int)
                | (BigInt, Short)
                | (Short, BigInt)
        )
    }
}

#[derive(Debug, Clone)]
pub struct Column {
    pub db_name: String,
    pub gql_name: String,
    pub data_type: DataFamily,
    pub nullable: bool,
    pub is_identity: bool,
    pub is_primary: bool,
    pub metadata: HashMap<String, JsonValue>,
}

/// Child-to-parent relationship derived from a foreign key, exposed as a singleton
/// field on the child's GraphQL type.
#[derive(Debug, Clone)]
pub struct SingleLink {
    pub parent_table: TableId,
    pub parent_key_column: String,
    pub child_fk_column: String,
}

/// Parent-to-child relationship — the inverse of a [`SingleLink`], exposed as a
/// set-valued field on the parent's GraphQL type.
#[derive(Debug, Clone)]
pub struct MultiLink {
    pub child_table: TableId,
    pub child_fk_column: String,
    pub parent_key_column: String,
}

/// A many-to-many relationship through a junction table.
#[derive(Debug, Clone)]
pub struct ManyToManyLink {
    pub source_column: String,
    pub junction_table: TableId,
    pub junction_source_column: String,
    pub junction_target_column: String,
    pub target_table: TableId,
    pub target_column: String,
}

#[derive(Debug, Clone)]
pub struct Table {
    pub id: TableId,
    pub schema: String,
    pub db_name: String,
    pub gql_name: String,
    pub columns: Vec<Column>,
    /// Primary-key column db-names, in declaration order — used for `_primaryKey`
    /// argument binding (spec §3 "KeyColumns").
    pub key_columns: Vec<String>,
    pub metadata: HashMap<String, JsonValue>,
    pub single_links: IndexMap<String, SingleLink>,
    pub multi_links: IndexMap<String, MultiLink>,
    pub many_to_many_links: IndexMap<String, ManyToManyLink>,
}

impl Table {
    pub fn column_by_db_name(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.db_name == name)
    }

    pub fn column_by_gql_name(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.gql_name == name)
    }

    /// Every relationship exposed on this table's GraphQL type, regardless of
    /// kind — used to detect name collisions across the three link maps.
    pub fn link_names(&self) -> impl Iterator<Item = &str> {
        self.single_links
            .keys()
            .map(String::as_str)
            .chain(self.multi_links.keys().map(String::as_str))
            .chain(self.many_to_many_links.keys().map(String::as_str))
    }

    /// Resolves an exposed relationship name to whichever of the three link
    /// kinds carries it (spec §4.4 join expansion dispatches on this).
    pub fn resolve_link(&self, name: &str) -> Option<ResolvedLink<'_>> {
        if let Some(link) = self.single_links.get(name) {
            return Some(ResolvedLink::Single(link));
        }
        if let Some(link) = self.multi_links.get(name) {
            return Some(ResolvedLink::Multi(link));
        }
        if let Some(link) = self.many_to_many_links.get(name) {
            return Some(ResolvedLink::ManyToMany(link));
        }
        None
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ResolvedLink<'a> {
    Single(&'a SingleLink),
    Multi(&'a MultiLink),
    ManyToMany(&'a ManyToManyLink),
}

impl ResolvedLink<'_> {
    /// The table on the far side of the relationship (the parent for a
    /// single/multi link, the target table for a many-to-many link).
    pub fn target_table(&self) -> TableId {
        match self {
            ResolvedLink::Single(l) => l.parent_table,
            ResolvedLink::Multi(l) => l.child_table,
            ResolvedLink::ManyToMany(l) => l.target_table,
        }
    }
}
