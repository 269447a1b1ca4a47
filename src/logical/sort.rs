//! Sort-token parsing (spec §4.5 "Sort parsing", §6 "Sort argument").

use crate::catalog::Table;
use crate::dialect::SortDirection;
use crate::error::{QueryShapeError, Result, SchemaLookupError};
use crate::intent::ArgValue;

use super::SortToken;

/// Parses a `sort` argument's list of `<column>_asc` / `<column>_desc`
/// tokens against `table`. A token missing the direction suffix always fails
/// — there is no default direction (spec §4.5).
pub fn parse_sort_tokens(field_name: &str, table: &Table, value: &ArgValue) -> Result<Vec<SortToken>> {
    let Some(items) = value.as_list() else {
        return Ok(Vec::new());
    };

    let mut tokens = Vec::with_capacity(items.len());
    for item in items {
        let Some(token) = item.as_str() else {
            continue;
        };
        tokens.push(parse_one(field_name, table, token)?);
    }
    Ok(tokens)
}

fn parse_one(field_name: &str, table: &Table, token: &str) -> Result<SortToken> {
    let (column_part, direction) = if let Some(stripped) = token.strip_suffix("_asc") {
        (stripped, SortDirection::Asc)
    } else if let Some(stripped) = token.strip_suffix("_desc") {
        (stripped, SortDirection::Desc)
    } else {
        return Err(QueryShapeError::SortMissingDirection {
            token: token.to_string(),
        }
        .into());
    };

    let column = table
        .column_by_gql_name(column_part)
        .or_else(|| table.column_by_db_name(column_part))
        .ok_or_else(|| SchemaLookupError::UnknownColumn {
            table: table.db_name.clone(),
            column: column_part.to_string(),
        })?;

    let _ = field_name;
    Ok(SortToken {
        column: column.db_name.clone(),
        direction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Column, DataFamily, Table};
    use indexmap::IndexMap;
    use std::collections::HashMap;

    fn table() -> Table {
        Table {
            id: 0,
            schema: "dbo".to_string(),
            db_name: "Users".to_string(),
            gql_name: "users".to_string(),
            columns: vec![Column {
                db_name: "Name".to_string(),
                gql_name: "name".to_string(),
                data_type: DataFamily::String,
                nullable: false,
                is_identity: false,
                is_primary: false,
                metadata: HashMap::new(),
            }],
            key_columns: vec!["Id".to_string()],
            metadata: HashMap::new(),
            single_links: IndexMap::new(),
            multi_links: IndexMap::new(),
            many_to_many_links: IndexMap::new(),
        }
    }

    #[test]
    fn missing_suffix_is_an_error() {
        let t = table();
        assert!(parse_one("users", &t, "name").is_err());
    }

    #[test]
    fn parses_direction_suffix() {
        let t = table();
        let token = parse_one("users", &t, "name_desc").unwrap();
        assert_eq!(token.column, "Name");
        assert_eq!(token.direction, SortDirection::Desc);
    }
}
