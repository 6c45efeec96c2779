use crate::error::Result;
use crate::error::SyncError;
use crate::tracker::ManifestTracker;
use crate::watcher::ManifestWatcher;
use serde::Deserialize;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tindex_core::TemplateEvent;
use tindex_core::TemplateIndex;
use tokio::sync::mpsc;
use tracing::debug;
use tracing::info;
use tracing::warn;

/// How template notifications are applied to the index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateSemantics {
    /// Added and modified templates replace the stored entry; deleted ones
    /// are removed.
    #[default]
    Replace,
    /// Every notification flips the template's presence, whatever its kind.
    Toggle,
}

impl fmt::Display for UpdateSemantics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replace => f.write_str("replace"),
            Self::Toggle => f.write_str("toggle"),
        }
    }
}

impl FromStr for UpdateSemantics {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "replace" => Ok(Self::Replace),
            "toggle" => Ok(Self::Toggle),
            other => Err(format!(
                "unknown update semantics `{other}` (expected `replace` or `toggle`)"
            )),
        }
    }
}

/// Keeps a [`TemplateIndex`] in step with the manifest source.
#[derive(Clone)]
pub struct Reconciler {
    index: Arc<TemplateIndex>,
    semantics: UpdateSemantics,
}

impl Reconciler {
    pub fn new(index: Arc<TemplateIndex>, semantics: UpdateSemantics) -> Self {
        Self { index, semantics }
    }

    pub fn semantics(&self) -> UpdateSemantics {
        self.semantics
    }

    /// Seeds the index with the snapshot under `dir` and returns the tracker
    /// describing it, ready to be handed to a watcher.
    pub fn sync_with_source(&self, dir: &Path, namespace: Option<&str>) -> Result<ManifestTracker> {
        let started = Instant::now();
        let (tracker, templates) = ManifestTracker::scan(dir, namespace.map(str::to_string))?;
        let count = self.index.bulk_load(templates)?;
        info!(
            "synced {count} templates from {} in {:?}",
            dir.display(),
            started.elapsed()
        );
        Ok(tracker)
    }

    /// Starts following `dir`: the watch is registered, then the snapshot is
    /// loaded when `sync` is set, then the watcher thread starts. Changes made
    /// while the snapshot is read are replayed against it; files it already
    /// covers produce no event. The returned receiver feeds [`Reconciler::run`].
    ///
    /// A directory that cannot be watched is logged and the receiver closes
    /// at once; a snapshot that cannot be loaded is an error.
    pub fn follow(
        &self,
        dir: &Path,
        namespace: Option<&str>,
        sync: bool,
    ) -> Result<mpsc::UnboundedReceiver<TemplateEvent>> {
        let watcher = ManifestWatcher::new(dir);
        let tracker = if sync {
            self.sync_with_source(dir, namespace)?
        } else {
            info!("skipping initial sync");
            ManifestTracker::new(dir, namespace.map(str::to_string))
        };

        let (tx, rx) = mpsc::unbounded_channel();
        match watcher {
            Ok(watcher) => {
                watcher.spawn(tracker, tx);
            }
            Err(err) => warn!(
                "not watching {} for template changes: {err}",
                dir.display()
            ),
        }
        Ok(rx)
    }

    pub fn handle(&self, event: TemplateEvent) {
        debug!(
            template = %event.template().name(),
            semantics = %self.semantics,
            "applying template event"
        );
        match self.semantics {
            UpdateSemantics::Replace => self.index.apply(event),
            UpdateSemantics::Toggle => self.index.upsert_or_retract(event.template()),
        }
    }

    /// Applies events until every sender is gone, which is reported as
    /// [`SyncError::ChannelClosed`].
    pub async fn run(&self, mut events: mpsc::UnboundedReceiver<TemplateEvent>) -> Result<()> {
        while let Some(event) = events.recv().await {
            self.handle(event);
        }
        Err(SyncError::ChannelClosed)
    }
}
