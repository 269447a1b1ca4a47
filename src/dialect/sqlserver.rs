use super::{Dialect, LikeShape, SortKey, effective_limit, effective_offset};

/// T-SQL dialect: `[bracket]` identifiers, `OFFSET ... FETCH NEXT` paging, and the
/// `ORDER BY (SELECT NULL)` sentinel SQL Server requires before `OFFSET` can be
/// used without a real sort (spec §4.5/§9 "Default limit policy").
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerDialect;

impl Dialect for SqlServerDialect {
    fn name(&self) -> &'static str {
        "sqlserver"
    }

    fn escape_identifier(&self, name: &str) -> String {
        format!("[{}]", name.replace(']', "]]"))
    }

    fn parameter_prefix(&self) -> &'static str {
        "@p"
    }

    fn last_inserted_identity(&self) -> &'static str {
        "SCOPE_IDENTITY()"
    }

    fn pagination(&self, sorts: &[SortKey], offset: Option<i64>, limit: Option<i64>) -> String {
        let order_by = if sorts.is_empty() {
            "ORDER BY (SELECT NULL)".to_string()
        } else {
            let cols = sorts
                .iter()
                .map(|s| format!("{} {}", s.escaped_column, s.direction.sql()))
                .collect::<Vec<_>>()
                .join(", ");
            format!("ORDER BY {cols}")
        };

        let offset = effective_offset(offset);
        match effective_limit(limit) {
            Some(limit) => {
                format!("{order_by} OFFSET {offset} ROWS FETCH NEXT {limit} ROWS ONLY")
            }
            None => format!("{order_by} OFFSET {offset} ROWS"),
        }
    }

    fn like_pattern(&self, param_ref: &str, shape: LikeShape) -> String {
        match shape {
            LikeShape::Contains => format!("'%' + {param_ref} + '%'"),
            LikeShape::StartsWith => format!("{param_ref} + '%'"),
            LikeShape::EndsWith => format!("'%' + {param_ref}"),
            LikeShape::Exact => param_ref.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_with_brackets() {
        let d = SqlServerDialect;
        assert_eq!(d.escape_identifier("Users"), "[Users]");
        assert_eq!(d.table_reference(Some("dbo"), "Users"), "[dbo].[Users]");
    }

    #[test]
    fn falls_back_to_null_sentinel_sort() {
        let d = SqlServerDialect;
        assert_eq!(
            d.pagination(&[], Some(0), Some(10)),
            "ORDER BY (SELECT NULL) OFFSET 0 ROWS FETCH NEXT 10 ROWS ONLY"
        );
    }

    #[test]
    fn unlimited_drops_fetch_clause() {
        let d = SqlServerDialect;
        assert_eq!(
            d.pagination(&[], Some(5), None),
            "ORDER BY (SELECT NULL) OFFSET 5 ROWS"
        );
    }
}
