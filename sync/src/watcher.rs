use crate::error::Result;
use crate::tracker::ManifestTracker;
use notify::Config as NotifyConfig;
use notify::Event;
use notify::EventKind;
use notify::RecommendedWatcher;
use notify::RecursiveMode;
use notify::Watcher;
use std::path::Path;
use std::path::PathBuf;
use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;
use tindex_core::TemplateEvent;
use tokio::sync::mpsc;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

/// Recursive filesystem watch over a manifest directory, turned into
/// [`TemplateEvent`]s by a [`ManifestTracker`].
pub struct ManifestWatcher {
    dir: PathBuf,
    watcher: RecommendedWatcher,
    events: std_mpsc::Receiver<notify::Result<Event>>,
}

impl ManifestWatcher {
    /// Starts watching `dir`. Every change made after this returns is
    /// observed by [`ManifestWatcher::run`].
    pub fn new(dir: &Path) -> Result<Self> {
        let (tx, events) = std_mpsc::channel();
        let mut watcher = RecommendedWatcher::new(tx, NotifyConfig::default())?;
        watcher.watch(dir, RecursiveMode::Recursive)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            watcher,
            events,
        })
    }

    /// Blocks, forwarding template events to `tx` until the receiving side
    /// is dropped.
    pub fn run(
        self,
        mut tracker: ManifestTracker,
        tx: mpsc::UnboundedSender<TemplateEvent>,
    ) -> Result<()> {
        let Self {
            dir,
            watcher: _watcher,
            events,
        } = self;
        info!("watching {} for template changes", dir.display());

        for res in events {
            let event = match res {
                Ok(event) => event,
                Err(err) => {
                    warn!("manifest watcher error: {err:?}");
                    continue;
                }
            };
            if matches!(event.kind, EventKind::Access(_)) {
                continue;
            }
            for path in &event.paths {
                let changes = match tracker.refresh(path) {
                    Ok(changes) => changes,
                    Err(err) => {
                        warn!(path = %path.display(), "{err}");
                        continue;
                    }
                };
                for change in changes {
                    if tx.send(change).is_err() {
                        debug!("template event receiver dropped; stopping watcher");
                        return Ok(());
                    }
                }
            }
        }
        Ok(())
    }

    /// Runs the watcher on a dedicated thread.
    pub fn spawn(
        self,
        tracker: ManifestTracker,
        tx: mpsc::UnboundedSender<TemplateEvent>,
    ) -> JoinHandle<()> {
        std::thread::spawn(move || {
            if let Err(err) = self.run(tracker, tx) {
                error!("manifest watcher stopped: {err}");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::time::timeout;

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<TemplateEvent>) -> TemplateEvent {
        timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("timed out waiting for a template event")
            .expect("watcher hung up")
    }

    #[tokio::test]
    async fn reports_created_and_removed_manifests() {
        let dir = TempDir::new().unwrap();
        let watcher = ManifestWatcher::new(dir.path()).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _handle = watcher.spawn(ManifestTracker::new(dir.path(), None), tx);

        let path = dir.path().join("fedora.yaml");
        fs::write(&path, "metadata:\n  name: fedora28-generic-small\n").unwrap();
        match next_event(&mut rx).await {
            TemplateEvent::Added(template) => assert_eq!(template.name(), "fedora28-generic-small"),
            other => panic!("unexpected event {other:?}"),
        }

        fs::remove_file(&path).unwrap();
        match next_event(&mut rx).await {
            TemplateEvent::Deleted(template) => {
                assert_eq!(template.name(), "fedora28-generic-small");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
