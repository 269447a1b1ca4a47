//! Identifier sanitization and GraphQL-name derivation (spec §4.1 step 2,
//! §9 "Naming case policy"). Adapted from the teacher's `sanitize_graphql_name`
//! in `src/utils.rs`, generalized to the two casing conventions the spec
//! recognizes.

use stringcase::{camel_case, snake_case};

/// Naming convention applied to every derived GraphQL identifier — field,
/// type, and argument names. Chosen once per [`super::Catalog::build`] call,
/// not read from metadata (spec §9: "this is a build-time policy, not a
/// per-model setting").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingCase {
    Underscore,
    CamelCase,
}

impl NamingCase {
    pub fn apply(self, raw: &str) -> String {
        let sanitized = sanitize(raw);
        match self {
            NamingCase::Underscore => snake_case(&sanitized),
            NamingCase::CamelCase => camel_case(&sanitized),
        }
    }
}

/// Strips characters a GraphQL name cannot contain and ensures the result
/// doesn't start with a digit, mirroring the teacher's `sanitize_graphql_name`.
fn sanitize(raw: &str) -> String {
    let mut out: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    if out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        out.insert(0, '_');
    }

    if out.is_empty() {
        out.push('_');
    }

    out
}

/// Decides whether a table outside the default schema should carry a schema
/// prefix in its derived GraphQL type name, and how that prefix is formatted,
/// per the `schema-prefix` / `schema-prefix-default` / `schema-prefix-format`
/// root-metadata keys (spec §6).
#[derive(Debug, Clone)]
pub struct SchemaPrefixPolicy {
    pub enabled: bool,
    pub default_schema: String,
    /// `{schema}` and `{name}` placeholders, e.g. `"{schema}_{name}"`.
    pub format: String,
}

impl Default for SchemaPrefixPolicy {
    fn default() -> Self {
        SchemaPrefixPolicy {
            enabled: true,
            default_schema: "dbo".to_string(),
            format: "{schema}_{name}".to_string(),
        }
    }
}

impl SchemaPrefixPolicy {
    pub fn apply(&self, schema: &str, name: &str) -> String {
        if !self.enabled || schema.eq_ignore_ascii_case(&self.default_schema) {
            return name.to_string();
        }
        self.format.replace("{schema}", schema).replace("{name}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn underscore_case_lowercases_and_joins() {
        assert_eq!(NamingCase::Underscore.apply("OrderLine"), "order_line");
    }

    #[test]
    fn camel_case_first_letter_lowercase() {
        assert_eq!(NamingCase::CamelCase.apply("order_line"), "orderLine");
    }

    #[test]
    fn sanitizes_leading_digit() {
        assert_eq!(NamingCase::Underscore.apply("2fa_token"), "_2fa_token");
    }

    #[test]
    fn schema_prefix_skipped_for_default_schema() {
        let policy = SchemaPrefixPolicy::default();
        assert_eq!(policy.apply("dbo", "users"), "users");
        assert_eq!(policy.apply("audit", "users"), "audit_users");
    }
}
