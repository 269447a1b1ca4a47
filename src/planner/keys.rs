//! Deterministic result-key formatting (spec §4.5 key scheme, §4.8).

pub fn count_key(key: &str) -> String {
    format!("{key}=>count")
}

pub fn agg_key(key: &str, alias: &str) -> String {
    format!("{key}=>agg_{alias}")
}

pub fn join_key(parent_key: &str, child_name: &str) -> String {
    format!("{parent_key}->{child_name}")
}
