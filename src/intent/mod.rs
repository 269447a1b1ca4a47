//! The protocol-neutral Query-Intent Tree (spec §3 "Query-Intent Tree", §4.2).
//!
//! A [`QueryField`] carries a name, optional alias, argument map, and nested
//! child fields — nothing GraphQL-specific survives past [`build_operation`].
//! Fragment spreads are expanded while the document is visited, so a built
//! tree never references a fragment by name.

pub mod fragment;
pub mod visitor;

use indexmap::IndexMap;

/// A parsed argument value, stripped of GraphQL-specific wrapper types
/// (`Variable`, `Binary`) the compiler has no use for.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Null,
    Int(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Enum(String),
    List(Vec<ArgValue>),
    Object(IndexMap<String, ArgValue>),
}

impl ArgValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::String(s) | ArgValue::Enum(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, ArgValue>> {
        match self {
            ArgValue::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ArgValue]> {
        match self {
            ArgValue::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ArgValue::Null)
    }
}

/// How a field classifies by its name (spec §3: "Nodes classify by name
/// prefix"). `_join_X` / `_single_X` force the join kind the join expander
/// should use for link `X` regardless of how the catalog would otherwise
/// classify it; `_agg` marks an aggregate selection; names starting `__` are
/// system fields (e.g. `__typename`) the compiler ignores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldClass<'a> {
    Standard,
    ExplicitJoin(&'a str),
    ExplicitSingle(&'a str),
    Aggregate,
    System,
}

pub fn classify(name: &str) -> FieldClass<'_> {
    if let Some(link) = name.strip_prefix("_join_") {
        FieldClass::ExplicitJoin(link)
    } else if let Some(link) = name.strip_prefix("_single_") {
        FieldClass::ExplicitSingle(link)
    } else if name == "_agg" {
        FieldClass::Aggregate
    } else if let Some(rest) = name.strip_prefix("__") {
        let _ = rest;
        FieldClass::System
    } else {
        FieldClass::Standard
    }
}

#[derive(Debug, Clone)]
pub struct QueryField {
    pub name: String,
    pub alias: Option<String>,
    pub arguments: IndexMap<String, ArgValue>,
    pub children: Vec<QueryField>,
    /// True for every field selected at the root of an operation (spec §4.2:
    /// "The top-level node of each operation has IncludeResult = true").
    pub include_result: bool,
}

impl QueryField {
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn argument(&self, name: &str) -> Option<&ArgValue> {
        self.arguments.get(name)
    }
}

pub use visitor::build_operation;
