use crate::error::Result;
use crate::snapshot::in_namespace;
use crate::snapshot::is_hidden_name;
use crate::snapshot::is_manifest_path;
use crate::snapshot::load_manifest_files;
use crate::snapshot::manifest_files;
use crate::snapshot::read_manifest;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;
use tindex_core::Template;
use tindex_core::TemplateEvent;
use tracing::debug;

/// Remembers which templates each manifest file under a root directory
/// contributed, so that a file change can be turned into per-template events.
///
/// Only the paths a snapshot walk would read are tracked. Changes below a
/// hidden entry (such as the `..data` link of a mounted config volume) are
/// answered with a rescan of the visible files.
#[derive(Debug)]
pub struct ManifestTracker {
    root: PathBuf,
    namespace: Option<String>,
    files: HashMap<PathBuf, BTreeMap<String, Template>>,
}

impl ManifestTracker {
    pub fn new(root: impl Into<PathBuf>, namespace: Option<String>) -> Self {
        Self {
            root: root.into(),
            namespace,
            files: HashMap::new(),
        }
    }

    /// Loads every manifest under `dir` and returns a tracker primed with
    /// them, together with the templates found.
    pub fn scan(dir: &Path, namespace: Option<String>) -> Result<(Self, Vec<Template>)> {
        let mut tracker = Self::new(dir, namespace);
        let loaded = load_manifest_files(dir, tracker.namespace())?;
        let mut templates = Vec::new();
        for (path, found) in loaded {
            let entry: BTreeMap<String, Template> = found
                .iter()
                .map(|template| (template.name().to_string(), template.clone()))
                .collect();
            templates.extend(found);
            if !entry.is_empty() {
                tracker.files.insert(path, entry);
            }
        }
        Ok((tracker, templates))
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn tracked_files(&self) -> usize {
        self.files.len()
    }

    /// Re-reads `path` and returns the events that bring an index from the
    /// previous view of it to the current one. A missing path retracts
    /// everything previously read from it, or from files below it. Paths
    /// outside the root are ignored.
    ///
    /// On error the previous view is kept, so a half-written file is picked
    /// up again by the next change.
    pub fn refresh(&mut self, path: &Path) -> Result<Vec<TemplateEvent>> {
        let Ok(relative) = path.strip_prefix(&self.root) else {
            debug!(path = %path.display(), "ignoring change outside the manifest root");
            return Ok(Vec::new());
        };
        if relative
            .components()
            .any(|component| is_hidden_name(component.as_os_str()))
        {
            return self.rescan();
        }
        if path.is_dir() {
            let mut events = Vec::new();
            for file in manifest_files(path)? {
                events.extend(self.refresh_file(&file)?);
            }
            return Ok(events);
        }
        if !path.exists() {
            return Ok(self.forget(path));
        }
        if !is_manifest_path(path) {
            return Ok(Vec::new());
        }
        self.refresh_file(path)
    }

    /// Re-reads every visible manifest under the root and retracts files
    /// that are gone.
    fn rescan(&mut self) -> Result<Vec<TemplateEvent>> {
        let files = manifest_files(&self.root)?;
        let present: HashSet<&PathBuf> = files.iter().collect();
        let stale: Vec<PathBuf> = self
            .files
            .keys()
            .filter(|file| !present.contains(file))
            .cloned()
            .collect();

        let mut events = Vec::new();
        for file in &files {
            events.extend(self.refresh_file(file)?);
        }
        for file in stale {
            events.extend(self.forget(&file));
        }
        Ok(events)
    }

    fn refresh_file(&mut self, path: &Path) -> Result<Vec<TemplateEvent>> {
        let current: BTreeMap<String, Template> = read_manifest(path)?
            .into_iter()
            .filter(|template| in_namespace(template, self.namespace()))
            .map(|template| (template.name().to_string(), template))
            .collect();
        let previous = self.files.remove(path).unwrap_or_default();

        let mut events = Vec::new();
        for (name, template) in &current {
            match previous.get(name) {
                None => events.push(TemplateEvent::Added(template.clone())),
                Some(old) if old != template => {
                    events.push(TemplateEvent::Modified(template.clone()));
                }
                Some(_) => {}
            }
        }
        for (name, template) in previous {
            if !current.contains_key(&name) {
                events.push(self.retract(template));
            }
        }

        if !current.is_empty() {
            self.files.insert(path.to_path_buf(), current);
        }
        Ok(events)
    }

    fn forget(&mut self, path: &Path) -> Vec<TemplateEvent> {
        let gone: Vec<PathBuf> = self
            .files
            .keys()
            .filter(|file| file.starts_with(path))
            .cloned()
            .collect();
        let mut removed = Vec::new();
        for file in gone {
            if let Some(templates) = self.files.remove(&file) {
                removed.extend(templates.into_values());
            }
        }
        removed
            .into_iter()
            .map(|template| self.retract(template))
            .collect()
    }

    /// A template that left one file may still be provided by another.
    fn retract(&self, template: Template) -> TemplateEvent {
        let elsewhere = self
            .files
            .values()
            .find_map(|templates| templates.get(template.name()));
        match elsewhere {
            Some(other) => TemplateEvent::Modified(other.clone()),
            None => TemplateEvent::Deleted(template),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn manifest(name: &str, flavor: &str) -> String {
        format!(
            "kind: Template\nmetadata:\n  name: {name}\n  labels:\n    flavor.template.cnv.io/{flavor}: \"true\"\n"
        )
    }

    fn summary(events: &[TemplateEvent]) -> Vec<(&'static str, String)> {
        events
            .iter()
            .map(|event| {
                let kind = match event {
                    TemplateEvent::Added(_) => "added",
                    TemplateEvent::Modified(_) => "modified",
                    TemplateEvent::Deleted(_) => "deleted",
                };
                (kind, event.template().name().to_string())
            })
            .collect()
    }

    #[test]
    fn create_rewrite_and_remove() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("templates.yaml");
        let mut tracker = ManifestTracker::new(dir.path(), None);

        fs::write(&path, format!("{}---\n{}", manifest("a", "small"), manifest("b", "small"))).unwrap();
        let events = tracker.refresh(&path).unwrap();
        assert_eq!(
            summary(&events),
            vec![("added", "a".to_string()), ("added", "b".to_string())]
        );

        fs::write(&path, format!("{}---\n{}", manifest("a", "large"), manifest("c", "tiny"))).unwrap();
        let events = tracker.refresh(&path).unwrap();
        assert_eq!(
            summary(&events),
            vec![
                ("modified", "a".to_string()),
                ("added", "c".to_string()),
                ("deleted", "b".to_string()),
            ]
        );

        fs::remove_file(&path).unwrap();
        let events = tracker.refresh(&path).unwrap();
        assert_eq!(
            summary(&events),
            vec![("deleted", "a".to_string()), ("deleted", "c".to_string())]
        );
        assert_eq!(tracker.tracked_files(), 0);
    }

    #[test]
    fn unchanged_rewrite_emits_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.yaml");
        fs::write(&path, manifest("a", "small")).unwrap();

        let (mut tracker, templates) = ManifestTracker::scan(dir.path(), None).unwrap();
        assert_eq!(templates.len(), 1);
        assert_eq!(tracker.refresh(&path).unwrap(), Vec::new());
    }

    #[test]
    fn template_moved_between_files_stays_present() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("first.yaml");
        let second = dir.path().join("second.yaml");
        fs::write(&first, manifest("a", "small")).unwrap();
        fs::write(&second, manifest("a", "large")).unwrap();
        let (mut tracker, _) = ManifestTracker::scan(dir.path(), None).unwrap();

        fs::remove_file(&first).unwrap();
        let events = tracker.refresh(&first).unwrap();
        assert_eq!(summary(&events), vec![("modified", "a".to_string())]);
        assert_eq!(
            events[0].template().labels().get("flavor.template.cnv.io/large"),
            Some(&"true".to_string())
        );
    }

    #[test]
    fn removed_directory_retracts_its_files() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("a.yaml"), manifest("a", "small")).unwrap();
        fs::write(dir.path().join("b.yaml"), manifest("b", "small")).unwrap();
        let (mut tracker, _) = ManifestTracker::scan(dir.path(), None).unwrap();
        assert_eq!(tracker.tracked_files(), 2);

        fs::remove_dir_all(&nested).unwrap();
        let events = tracker.refresh(&nested).unwrap();
        assert_eq!(summary(&events), vec![("deleted", "a".to_string())]);
        assert_eq!(tracker.tracked_files(), 1);
    }

    #[test]
    fn broken_rewrite_keeps_previous_view() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.json");
        fs::write(&path, r#"{"metadata": {"name": "a"}}"#).unwrap();
        let (mut tracker, _) = ManifestTracker::scan(dir.path(), None).unwrap();

        fs::write(&path, r#"{"metadata": "#).unwrap();
        assert!(tracker.refresh(&path).is_err());

        fs::remove_file(&path).unwrap();
        let events = tracker.refresh(&path).unwrap();
        assert_eq!(summary(&events), vec![("deleted", "a".to_string())]);
    }

    #[test]
    fn other_namespaces_are_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.yaml");
        let mut tracker = ManifestTracker::new(dir.path(), Some("openshift".to_string()));
        fs::write(
            &path,
            "metadata:\n  name: a\n  namespace: openshift\n---\nmetadata:\n  name: b\n  namespace: default\n",
        )
        .unwrap();
        let events = tracker.refresh(&path).unwrap();
        assert_eq!(summary(&events), vec![("added", "a".to_string())]);
    }

    #[test]
    fn paths_outside_the_root_are_ignored() {
        let root = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        let path = other.path().join("a.yaml");
        fs::write(&path, manifest("a", "small")).unwrap();

        let mut tracker = ManifestTracker::new(root.path(), None);
        assert_eq!(tracker.refresh(&path).unwrap(), Vec::new());
        assert_eq!(tracker.tracked_files(), 0);
    }

    /// Lays out `root` the way a mounted config volume does: the payload
    /// lives in `..<version>/`, `..data` points at the current version and
    /// every visible file is a link through `..data`.
    #[cfg(unix)]
    fn write_volume_version(root: &Path, version: &str, files: &[(&str, String)]) {
        use std::os::unix::fs::symlink;

        let payload = root.join(version);
        fs::create_dir_all(&payload).unwrap();
        for (file, content) in files {
            fs::write(payload.join(file), content).unwrap();
            let visible = root.join(file);
            if fs::symlink_metadata(&visible).is_err() {
                symlink(Path::new("..data").join(file), &visible).unwrap();
            }
        }
        let staged = root.join("..data_tmp");
        symlink(version, &staged).unwrap();
        fs::rename(&staged, root.join("..data")).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn config_volume_swap_retracts_removed_templates() {
        use tindex_core::TemplateIndex;

        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write_volume_version(
            root,
            "..v1",
            &[
                ("keep.yaml", manifest("keep", "small")),
                ("gone.yaml", manifest("gone", "small")),
            ],
        );

        let (mut tracker, templates) = ManifestTracker::scan(root, None).unwrap();
        assert_eq!(tracker.tracked_files(), 2);
        let index = TemplateIndex::new();
        index.bulk_load(templates).unwrap();

        write_volume_version(root, "..v2", &[("keep.yaml", manifest("keep", "large"))]);
        fs::remove_dir_all(root.join("..v1")).unwrap();

        let changed = [
            root.join("..v2").join("keep.yaml"),
            root.join("..data"),
            root.join("..v1").join("gone.yaml"),
            root.join("..v1"),
        ];
        for path in &changed {
            for event in tracker.refresh(path).unwrap() {
                index.apply(event);
            }
        }

        let fresh: Vec<String> = crate::snapshot::load_manifests(root, None)
            .unwrap()
            .iter()
            .map(|template| template.name().to_string())
            .collect();
        assert_eq!(fresh, vec!["keep"]);
        assert_eq!(index.template_names(), fresh);
        assert_eq!(
            index
                .get("keep")
                .and_then(|t| t.labels().get("flavor.template.cnv.io/large").cloned()),
            Some("true".to_string())
        );
        assert_eq!(tracker.tracked_files(), 1);
    }
}
