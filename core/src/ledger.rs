use crate::error::IndexError;
use crate::error::Result;
use crate::index::TemplateIndex;
use crate::labels::extract_facet_values;
use crate::string_set::StringSet;
use crate::template::Template;
use serde::Deserialize;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing::warn;

/// One distinct facet value, with its display name when one is known.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Summary {
    pub id: String,
    pub name: String,
}

impl Summary {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Strategy turning a set of templates into the summaries of one facet.
///
/// Implementations must return summaries sorted ascending by `id`, without
/// duplicate ids.
pub trait Ledger: Send + Sync {
    fn summarize(&self, templates: &mut dyn Iterator<Item = &Template>) -> Vec<Summary>;
}

/// Ledger decoding facet values from template labels, with display names
/// read from a flat JSON object (`{"centos7.0": "CentOS 7", ...}`).
#[derive(Clone, Debug, Default)]
pub struct JsonLedger {
    label: String,
    names: HashMap<String, String>,
}

impl JsonLedger {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            names: HashMap::new(),
        }
    }

    pub fn names(&self) -> &HashMap<String, String> {
        &self.names
    }

    /// Replaces the name table with the contents of `path`. On error the
    /// previous table is left untouched.
    pub fn load_name_map(&mut self, path: &Path) -> Result<()> {
        let names = read_name_map(path).map_err(|source| IndexError::NameMap {
            path: path.to_path_buf(),
            source: Box::new(source),
        })?;
        self.names = names;
        Ok(())
    }
}

fn read_name_map(path: &Path) -> Result<HashMap<String, String>> {
    let content = fs::read(path)?;
    Ok(serde_json::from_slice(&content)?)
}

impl Ledger for JsonLedger {
    fn summarize(&self, templates: &mut dyn Iterator<Item = &Template>) -> Vec<Summary> {
        let mut seen = StringSet::new();
        let mut summaries = Vec::new();

        for template in templates {
            for value in extract_facet_values(template, &self.label) {
                if !seen.add(value) {
                    continue;
                }
                summaries.push(Summary {
                    id: value.to_string(),
                    name: self.names.get(value).cloned().unwrap_or_default(),
                });
            }
        }
        // ids are unique here, so this orders by id alone.
        summaries.sort();
        summaries
    }
}

/// Query key a ledger is registered under, and the facet label it decodes.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerSpec {
    pub name: String,
    pub label: String,
}

impl LedgerSpec {
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
        }
    }
}

pub fn default_ledger_specs() -> Vec<LedgerSpec> {
    vec![
        LedgerSpec::new("os", "os"),
        LedgerSpec::new("workload", "workload"),
        LedgerSpec::new("size", "flavor"),
    ]
}

/// Builds one [`JsonLedger`] per entry, loads its name map from
/// `<conf_dir>/<name>` and registers it. A name map that cannot be read is
/// logged and the ledger is registered without display names.
pub fn register_ledgers(index: &TemplateIndex, specs: &[LedgerSpec], conf_dir: &Path) {
    for spec in specs {
        let mut ledger = JsonLedger::new(&spec.label);
        let conf_path = conf_dir.join(&spec.name);
        if let Err(err) = ledger.load_name_map(&conf_path) {
            warn!(
                ledger = %spec.name,
                label = %spec.label,
                "{err}; continuing without display names"
            );
        }
        index.register_ledger(&spec.name, Arc::new(ledger));
        info!("added ledger {} for label={}", spec.name, spec.label);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn os_template(name: &str, os: &[&str]) -> Template {
        let mut builder = Template::builder(name);
        for value in os {
            builder = builder.label(format!("os.template.cnv.io/{value}"), "true");
        }
        builder.build()
    }

    #[test]
    fn unknown_label_yields_nothing() {
        let templates = [os_template("a", &["fedora28"])];
        let ledger = JsonLedger::new("foobar");
        assert_eq!(ledger.summarize(&mut templates.iter()), Vec::new());
    }

    #[test]
    fn summaries_are_sorted_and_unique() {
        let templates = [
            os_template("a", &["win10", "fedora28"]),
            os_template("b", &["centos7.0"]),
            os_template("c", &["fedora28", "centos7.0"]),
            os_template("d", &[]),
        ];
        let ledger = JsonLedger::new("os");
        let ids: Vec<String> = ledger
            .summarize(&mut templates.iter())
            .into_iter()
            .map(|summary| summary.id)
            .collect();
        assert_eq!(ids, vec!["centos7.0", "fedora28", "win10"]);
    }

    #[test]
    fn name_map_enriches_summaries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("os");
        fs::write(&path, r#"{"centos7.0": "CentOS 7"}"#).unwrap();

        let templates = [
            Template::builder("centos")
                .label("os.template.cnv.io/centos7.0", "true")
                .label("workload.template.cnv.io/generic", "true")
                .build(),
        ];
        let mut ledger = JsonLedger::new("os");
        assert_eq!(
            ledger.summarize(&mut templates.iter()),
            vec![Summary::new("centos7.0", "")]
        );

        ledger.load_name_map(&path).unwrap();
        assert_eq!(
            ledger.summarize(&mut templates.iter()),
            vec![Summary::new("centos7.0", "CentOS 7")]
        );
    }

    #[test]
    fn missing_name_map_keeps_previous_names() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("os");
        fs::write(&good, r#"{"fedora28": "Fedora 28"}"#).unwrap();
        let broken = dir.path().join("broken");
        fs::write(&broken, "not json").unwrap();

        let mut ledger = JsonLedger::new("os");
        ledger.load_name_map(&good).unwrap();

        let err = ledger.load_name_map(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, IndexError::NameMap { .. }));
        let err = ledger.load_name_map(&broken).unwrap_err();
        assert!(matches!(err, IndexError::NameMap { .. }));

        assert_eq!(
            ledger.names().get("fedora28"),
            Some(&"Fedora 28".to_string())
        );
    }

    #[test]
    fn register_ledgers_tolerates_missing_name_maps() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("size"), r#"{"tiny": "Tiny"}"#).unwrap();

        let index = TemplateIndex::new();
        register_ledgers(&index, &default_ledger_specs(), dir.path());
        index.bulk_load(vec![
            Template::builder("t")
                .label("flavor.template.cnv.io/tiny", "true")
                .build(),
        ])
        .unwrap();

        assert_eq!(
            index.summarize_by("size").unwrap(),
            vec![Summary::new("tiny", "Tiny")]
        );
        assert_eq!(index.summarize_by("os").unwrap(), Vec::new());
        assert_eq!(index.ledger_keys(), vec!["os", "size", "workload"]);
    }
}
