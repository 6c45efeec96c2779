use crate::labels::extract_facet_values;
use crate::labels::normalize_facet;
use crate::template::Template;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;

pub const ANNOTATION_DISPLAY_NAME: &str = "openshift.io/display-name";
pub const ANNOTATION_DESCRIPTION: &str = "description";
pub const ANNOTATION_ICON: &str = "iconClass";

/// Facets a description resolves, and the only filter keys accepted from
/// requests.
pub const FACET_KEYS: [&str; 3] = ["os", "workload", "size"];

/// Display record for one template.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Description {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "icon-id")]
    pub icon: String,
    #[serde(rename = "osid")]
    pub os: String,
    pub workload: String,
    pub size: String,
}

/// Conjunction of facet filters, keyed by query facet name (`size`, not
/// `flavor`).
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct FilterOptions(BTreeMap<String, String>);

impl FilterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, facet: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(facet.into(), value.into());
        self
    }

    /// Keeps the recognised facet keys with a non-empty value; anything else
    /// in the query is ignored.
    pub fn from_query<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut filters = Self::new();
        for (key, value) in pairs {
            let key = key.as_ref();
            if !FACET_KEYS.contains(&key) {
                continue;
            }
            let value = value.into();
            if value.is_empty() {
                continue;
            }
            filters.0.insert(key.to_string(), value);
        }
        filters
    }

    pub fn get(&self, facet: &str) -> Option<&str> {
        self.0.get(facet).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Builds the description of `template`. A facet with a non-empty filter
/// value takes that value; otherwise the first value found on the template
/// is used. Labels iterate in key order, so with several values for one
/// facet the lexicographically smallest wins.
pub fn describe(template: &Template, filters: &FilterOptions) -> Description {
    let annotation = |key: &str| template.annotation(key).unwrap_or_default().to_string();
    let resolve = |facet: &str| match filters.get(facet) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => extract_facet_values(template, normalize_facet(facet))
            .first()
            .copied()
            .unwrap_or_default()
            .to_string(),
    };

    Description {
        id: template.name().to_string(),
        name: annotation(ANNOTATION_DISPLAY_NAME),
        description: annotation(ANNOTATION_DESCRIPTION),
        icon: annotation(ANNOTATION_ICON),
        os: resolve("os"),
        workload: resolve("workload"),
        size: resolve("size"),
    }
}
