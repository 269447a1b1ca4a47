use super::{Dialect, LikeShape, SortKey, effective_limit, effective_offset};

/// PostgreSQL dialect: `"quoted"` identifiers, `$n` positional parameters, and
/// ordinary `LIMIT/OFFSET` paging (no sentinel sort required).
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn escape_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn parameter_prefix(&self) -> &'static str {
        "$"
    }

    fn parameter_start(&self) -> usize {
        1
    }

    fn last_inserted_identity(&self) -> &'static str {
        "LASTVAL()"
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

        if let Some(limit) = effective_limit(limit) {
            parts.push(format!("LIMIT {limit}"));
        }

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
    fn escapes_with_double_quotes() {
        let d = PostgresDialect;
        assert_eq!(d.escape_identifier("Users"), "\"Users\"");
    }

    #[test]
    fn paginates_without_sentinel_sort() {
        let d = PostgresDialect;
        assert_eq!(d.pagination(&[], Some(0), Some(10)), "LIMIT 10 OFFSET 0");
    }
}
