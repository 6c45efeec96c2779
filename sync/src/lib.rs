//! Keeps a [`tindex_core::TemplateIndex`] in sync with a directory of
//! template manifests: an initial snapshot load followed by a filesystem
//! watch that feeds per-template events to a [`Reconciler`].

mod error;
mod reconciler;
mod snapshot;
mod tracker;
mod watcher;

pub use error::{Result, SyncError};
pub use reconciler::{Reconciler, UpdateSemantics};
pub use snapshot::{in_namespace, is_manifest_path, load_manifests, parse_manifest, read_manifest};
pub use tracker::ManifestTracker;
pub use watcher::ManifestWatcher;
