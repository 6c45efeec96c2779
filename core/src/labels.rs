//! Label protocol used to encode facets on templates.
//!
//! A template carrying facet value `centos7.0` for facet `os` has the label
//! `os.template.cnv.io/centos7.0` set to `"true"`. Any other value, or the
//! absence of the label, means the template does not carry that value.

use crate::template::Template;

pub const SUFFIX: &str = "template.cnv.io";
pub const FLAG_VALUE: &str = "true";

/// Query facet names whose label spelling differs.
const FACET_RENAMES: &[(&str, &str)] = &[("size", "flavor")];

/// Maps a query facet name to the facet name used in labels.
pub fn normalize_facet(facet: &str) -> &str {
    FACET_RENAMES
        .iter()
        .find(|(from, _)| *from == facet)
        .map_or(facet, |(_, to)| to)
}

pub fn encode_label(facet: &str, value: &str) -> String {
    format!("{facet}.{SUFFIX}/{value}")
}

/// Returns the value part of a facet label key, or `None` when the key does
/// not contain exactly one `/`.
pub fn decode_label_key(key: &str) -> Option<&str> {
    let mut parts = key.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(value), None) => Some(value),
        _ => None,
    }
}

/// Value carried by a single label for `facet`, if the label is a facet hit.
pub fn facet_value<'a>(key: &'a str, value: &str, facet: &str) -> Option<&'a str> {
    if value != FLAG_VALUE {
        return None;
    }
    let rest = key.strip_prefix(facet)?.strip_prefix('.')?.strip_prefix(SUFFIX)?;
    if !rest.starts_with('/') {
        return None;
    }
    decode_label_key(key)
}

/// All values of `facet` carried by `template`, in label iteration order.
pub fn extract_facet_values<'a>(template: &'a Template, facet: &str) -> Vec<&'a str> {
    template
        .labels()
        .iter()
        .filter_map(|(key, value)| facet_value(key, value, facet))
        .collect()
}
