//! Fragment storage used while visiting a document (spec §4.2).
//!
//! Fragment selection sets are expanded inline at each spread site by deep-
//! copying their fields, so two spreads of the same fragment never share a
//! single argument object — mutation during later passes (e.g. `_primaryKey`
//! injection) can't alias across copies (spec §9 "Fragment copy semantics").

use std::collections::HashMap;

use async_graphql_parser::types::FragmentDefinition;
use async_graphql_parser::Positioned;
use async_graphql_value::Name;

pub struct FragmentTable<'a> {
    definitions: &'a HashMap<Name, Positioned<FragmentDefinition>>,
}

impl<'a> FragmentTable<'a> {
    pub fn new(definitions: &'a HashMap<Name, Positioned<FragmentDefinition>>) -> Self {
        FragmentTable { definitions }
    }

    pub fn get(&self, name: &str) -> Option<&'a FragmentDefinition> {
        self.definitions.get(name).map(|pos| &pos.node)
    }
}
