use crate::describe::Description;
use crate::describe::FilterOptions;
use crate::describe::describe;
use crate::error::IndexError;
use crate::error::Result;
use crate::labels::FLAG_VALUE;
use crate::labels::encode_label;
use crate::labels::normalize_facet;
use crate::ledger::Ledger;
use crate::ledger::Summary;
use crate::template::Template;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;
use tracing::debug;
use tracing::info;

/// A change notification for one template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TemplateEvent {
    Added(Template),
    Modified(Template),
    Deleted(Template),
}

impl TemplateEvent {
    pub fn template(&self) -> &Template {
        match self {
            Self::Added(t) | Self::Modified(t) | Self::Deleted(t) => t,
        }
    }
}

/// Concurrent store of templates keyed by name, plus the ledgers used to
/// summarize them.
///
/// Every mutation holds the write lock for its whole duration and every query
/// holds the read lock for its whole computation, so readers never see a
/// half-applied change.
#[derive(Default)]
pub struct TemplateIndex {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    templates: HashMap<String, Template>,
    ledgers: HashMap<String, Arc<dyn Ledger>>,
}

impl Inner {
    fn insert(&mut self, template: Template) {
        let name = template.name().to_string();
        debug!(template = %name, "added template");
        self.templates.insert(name, template);
    }

    fn remove(&mut self, name: &str) -> bool {
        let removed = self.templates.remove(name).is_some();
        if removed {
            debug!(template = %name, "removed template");
        }
        removed
    }
}

impl TemplateIndex {
    pub fn new() -> Self {
        Self::default()
    }

    // Poisoning is ignored: no mutation leaves the maps half-written.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn count(&self) -> usize {
        self.read().templates.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().templates.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<Template> {
        self.read().templates.get(name).cloned()
    }

    /// Names of all stored templates, sorted.
    pub fn template_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().templates.keys().cloned().collect();
        names.sort();
        names
    }

    /// Registers `ledger` under `key`, replacing any previous registration.
    pub fn register_ledger(&self, key: &str, ledger: Arc<dyn Ledger>) {
        self.write().ledgers.insert(key.to_string(), ledger);
    }

    /// Keys of the registered ledgers, sorted.
    pub fn ledger_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.read().ledgers.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Seeds the index from an authoritative snapshot. Every template is
    /// inserted, replacing any entry with the same name. Must run before
    /// notifications are applied.
    pub fn bulk_load(&self, templates: impl IntoIterator<Item = Template>) -> Result<usize> {
        let mut inner = self.write();
        let mut count = 0;
        for template in templates {
            inner.insert(template);
            count += 1;
        }
        info!("loaded {count} templates");
        Ok(count)
    }

    /// Legacy update protocol: inserts `template` when its name is unknown
    /// and removes the stored entry otherwise. Delivering the same
    /// notification twice therefore cancels it out.
    pub fn upsert_or_retract(&self, template: &Template) {
        let mut inner = self.write();
        info!(template = %template.name(), "handling template");
        if inner.templates.contains_key(template.name()) {
            inner.remove(template.name());
        } else {
            inner.insert(template.clone());
        }
    }

    /// Applies a notification carrying an explicit event kind. `Modified`
    /// replaces the stored template in place; deleting an unknown template is
    /// a no-op.
    pub fn apply(&self, event: TemplateEvent) {
        let mut inner = self.write();
        match event {
            TemplateEvent::Added(template) | TemplateEvent::Modified(template) => {
                inner.insert(template);
            }
            TemplateEvent::Deleted(template) => {
                if !inner.remove(template.name()) {
                    debug!(template = %template.name(), "delete for unknown template ignored");
                }
            }
        }
    }

    pub fn summarize_by(&self, key: &str) -> Result<Vec<Summary>> {
        let inner = self.read();
        let ledger = inner
            .ledgers
            .get(key)
            .ok_or_else(|| IndexError::UnknownLedger(key.to_string()))?;
        Ok(ledger.summarize(&mut inner.templates.values()))
    }

    /// Descriptions of every template carrying all the `filters` facet
    /// values, sorted by template name. A label only counts when set to
    /// `"true"`, as for summaries.
    pub fn describe_by(&self, filters: &FilterOptions) -> Vec<Description> {
        let labels: Vec<String> = filters
            .iter()
            .map(|(facet, value)| encode_label(normalize_facet(facet), value))
            .collect();

        let inner = self.read();
        let matching: BTreeMap<&str, &Template> = inner
            .templates
            .iter()
            .filter(|(_, template)| {
                labels.iter().all(|label| {
                    template
                        .labels()
                        .get(label)
                        .is_some_and(|value| value == FLAG_VALUE)
                })
            })
            .map(|(name, template)| (name.as_str(), template))
            .collect();
        matching
            .into_values()
            .map(|template| describe(template, filters))
            .collect()
    }
}
