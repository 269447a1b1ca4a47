use super::{Dialect, LikeShape, SortKey, effective_limit, effective_offset};

/// SQLite dialect, matching the teacher's own deployment target: `"quoted"`
/// identifiers (SQLite accepts double quotes for identifiers the way Postgres
/// does), `?`-style parameters, and `LIMIT/OFFSET` paging.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn escape_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn parameter_prefix(&self) -> &'static str {
        "?"
    }

    fn parameter_start(&self) -> usize {
        1
    }

    fn last_inserted_identity(&self) -> &'static str {
        "last_insert_rowid()"
    }

    fn pagination(&self, sorts: &[SortKey], offset: Option<i64>, limit: Option<i64>) -> String {
        let mut parts = Vec::new();

        if !sorts.is_empty() {
            let cols = sorts
                .iter()
                .map(|s| format!("{} {}", s.escaped_column, s.direction.sql()))
                .collect::<Vec<_>>()
                .join(", ");
            parts.push(format!("ORDER BY {cols}"));
        }

        // SQLite requires a LIMIT before OFFSET; -1 means "no limit" natively.
        let limit = effective_limit(limit).unwrap_or(-1);
        parts.push(format!("LIMIT {limit}"));
        parts.push(format!("OFFSET {}", effective_offset(offset)));

        parts.join(" ")
    }

    fn like_pattern(&self, param_ref: &str, shape: LikeShape) -> String {
        match shape {
            LikeShape::Contains => format!("'%' || {param_ref} || '%'"),
            LikeShape::StartsWith => format!("{param_ref} || '%'"),
            LikeShape::EndsWith => format!("'%' || {param_ref}"),
            LikeShape::Exact => param_ref.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_uses_native_sentinel() {
        let d = SqliteDialect;
        assert_eq!(
            d.pagination(&[], None, Some(-1)),
            "LIMIT -1 OFFSET 0"
        );
    }
}
