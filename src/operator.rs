//! The underscore-prefixed operator vocabulary is a wire-level convention only;
//! everything past argument parsing works with this enum (spec §9 design note).

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    Contains,
    NContains,
    StartsWith,
    NStartsWith,
    EndsWith,
    NEndsWith,
    Like,
    NLike,
    In,
    Nin,
    Between,
    NBetween,
}

impl FilterOperator {
    /// Parses the `_eq`/`_like`/... wire suffix. Unknown suffixes return `None`
    /// so callers can raise `SchemaLookupError`/`QueryShapeError` with field context.
    pub fn from_wire(token: &str) -> Option<Self> {
        Some(match token {
            "_eq" => Self::Eq,
            "_neq" => Self::Neq,
            "_lt" => Self::Lt,
            "_lte" => Self::Lte,
            "_gt" => Self::Gt,
            "_gte" => Self::Gte,
            "_contains" => Self::Contains,
            "_ncontains" => Self::NContains,
            "_starts_with" => Self::StartsWith,
            "_nstarts_with" => Self::NStartsWith,
            "_ends_with" => Self::EndsWith,
            "_nends_with" => Self::NEndsWith,
            "_like" => Self::Like,
            "_nlike" => Self::NLike,
            "_in" => Self::In,
            "_nin" => Self::Nin,
            "_between" => Self::Between,
            "_nbetween" => Self::NBetween,
            _ => return None,
        })
    }

    pub fn is_like_family(self) -> bool {
        matches!(
            self,
            Self::Contains
                | Self::NContains
                | Self::StartsWith
                | Self::NStartsWith
                | Self::EndsWith
                | Self::NEndsWith
                | Self::Like
                | Self::NLike
        )
    }

    pub fn is_negated_like(self) -> bool {
        matches!(
            self,
            Self::NContains | Self::NStartsWith | Self::NEndsWith | Self::NLike
        )
    }

    pub fn is_list_valued(self) -> bool {
        matches!(self, Self::In | Self::Nin | Self::Between | Self::NBetween)
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Eq => "_eq",
            Self::Neq => "_neq",
            Self::Lt => "_lt",
            Self::Lte => "_lte",
            Self::Gt => "_gt",
            Self::Gte => "_gte",
            Self::Contains => "_contains",
            Self::NContains => "_ncontains",
            Self::StartsWith => "_starts_with",
            Self::NStartsWith => "_nstarts_with",
            Self::EndsWith => "_ends_with",
            Self::NEndsWith => "_nends_with",
            Self::Like => "_like",
            Self::NLike => "_nlike",
            Self::In => "_in",
            Self::Nin => "_nin",
            Self::Between => "_between",
            Self::NBetween => "_nbetween",
        };
        f.write_str(s)
    }
}

/// An aggregate computed over a link chain (spec §3, §6 `_agg`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateOp {
    Count,
    Sum,
    Avg,
    Max,
    Min,
}

impl AggregateOp {
    pub fn from_wire(token: &str) -> Option<Self> {
        Some(match token.to_ascii_uppercase().as_str() {
            "COUNT" => Self::Count,
            "SUM" => Self::Sum,
            "AVG" => Self::Avg,
            "MAX" => Self::Max,
            "MIN" => Self::Min,
            _ => return None,
        })
    }

    /// The SQL aggregate function name.
    pub fn sql_function(self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Max => "MAX",
            Self::Min => "MIN",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_known_tokens() {
        for token in [
            "_eq",
            "_neq",
            "_lt",
            "_lte",
            "_gt",
            "_gte",
            "_contains",
            "_ncontains",
            "_starts_with",
            "_nstarts_with",
            "_ends_with",
            "_nends_with",
            "_like",
            "_nlike",
            "_in",
            "_nin",
            "_between",
            "_nbetween",
        ] {
            let op = FilterOperator::from_wire(token).expect("known token");
            assert_eq!(op.to_string(), token);
        }
    }

    #[test]
    fn rejects_unknown_tokens() {
        assert!(FilterOperator::from_wire("_frobnicate").is_none());
    }
}
