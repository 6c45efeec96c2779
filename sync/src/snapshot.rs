//! Reading template manifests from a directory.
//!
//! A manifest file holds a single template, a list object
//! (`{"kind": "List", "items": [...]}`), a JSON array of templates, or any
//! number of YAML documents separated by `---`. Documents of another kind are
//! skipped.

use crate::error::Result;
use crate::error::SyncError;
use serde::Deserialize;
use serde_json::Value;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use tindex_core::Template;
use tracing::debug;
use tracing::warn;
use walkdir::DirEntry;
use walkdir::WalkDir;

const MANIFEST_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

pub fn is_manifest_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| MANIFEST_EXTENSIONS.contains(&ext))
}

/// Whether `template` belongs to `namespace`; `None` accepts every namespace.
pub fn in_namespace(template: &Template, namespace: Option<&str>) -> bool {
    namespace.is_none_or(|namespace| template.namespace() == Some(namespace))
}

/// Parses the content of one manifest. `path` only selects the format.
pub fn parse_manifest(path: &Path, content: &str) -> Result<Vec<Template>> {
    let mut documents = Vec::new();
    if path.extension().is_some_and(|ext| ext == "json") {
        documents.push(serde_json::from_str::<Value>(content)?);
    } else {
        for document in serde_yaml::Deserializer::from_str(content) {
            documents.push(Value::deserialize(document)?);
        }
    }

    let mut templates = Vec::new();
    for document in documents {
        collect_templates(document, &mut templates)?;
    }
    Ok(templates)
}

fn collect_templates(document: Value, out: &mut Vec<Template>) -> Result<()> {
    match document {
        Value::Null => {}
        Value::Array(items) => {
            for item in items {
                collect_templates(item, out)?;
            }
        }
        Value::Object(mut object) if object.get("items").is_some_and(Value::is_array) => {
            if let Some(Value::Array(items)) = object.remove("items") {
                for item in items {
                    collect_templates(item, out)?;
                }
            }
        }
        Value::Object(object) => {
            let kind = object.get("kind").and_then(Value::as_str);
            if kind.is_some_and(|kind| kind != Template::KIND) {
                debug!(kind = ?kind, "skipping non-template document");
                return Ok(());
            }
            let template: Template = serde_json::from_value(Value::Object(object))?;
            if template.name().is_empty() {
                warn!("skipping template without metadata.name");
                return Ok(());
            }
            out.push(template);
        }
        other => {
            warn!("skipping manifest document that is not an object: {other}");
        }
    }
    Ok(())
}

pub fn read_manifest(path: &Path) -> Result<Vec<Template>> {
    let content = fs::read_to_string(path)?;
    parse_manifest(path, &content)
}

fn is_hidden(entry: &DirEntry) -> bool {
    is_hidden_name(entry.file_name())
}

pub(crate) fn is_hidden_name(name: &OsStr) -> bool {
    name.to_str().is_some_and(|name| name.starts_with('.'))
}

fn is_not_found(err: &walkdir::Error) -> bool {
    err.io_error()
        .is_some_and(|io| io.kind() == io::ErrorKind::NotFound)
}

/// Manifest files under `dir`, sorted by path. Hidden entries are skipped so
/// that the timestamped directories of a mounted config volume are not read
/// twice.
pub(crate) fn manifest_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let walker = WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            // A link whose target was swapped away, e.g. after a volume update.
            Err(err) if err.depth() > 0 && is_not_found(&err) => {
                debug!(path = ?err.path(), "skipping dangling manifest link");
                continue;
            }
            Err(source) => {
                return Err(SyncError::Walk {
                    path: dir.to_path_buf(),
                    source,
                });
            }
        };
        if entry.file_type().is_file() && is_manifest_path(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Reads every manifest under `dir`, keeping the file each template came
/// from.
pub(crate) fn load_manifest_files(
    dir: &Path,
    namespace: Option<&str>,
) -> Result<Vec<(PathBuf, Vec<Template>)>> {
    manifest_files(dir)?
        .into_iter()
        .map(|path| -> Result<(PathBuf, Vec<Template>)> {
            let templates = read_manifest(&path).map_err(|source| SyncError::Manifest {
                path: path.clone(),
                source: Box::new(source),
            })?;
            let templates = templates
                .into_iter()
                .filter(|template| in_namespace(template, namespace))
                .collect();
            Ok((path, templates))
        })
        .collect()
}

/// Reads the full template snapshot stored under `dir`. Any unreadable or
/// malformed manifest fails the whole load.
pub fn load_manifests(dir: &Path, namespace: Option<&str>) -> Result<Vec<Template>> {
    Ok(load_manifest_files(dir, namespace)?
        .into_iter()
        .flat_map(|(_, templates)| templates)
        .collect())
}
