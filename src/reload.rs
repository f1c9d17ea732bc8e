//! Configuration hot reload.
//!
//! A background task per watched file polls its metadata and triggers a
//! reload once the file has stopped changing. The quiet period matters:
//! editors and sync tools write config files in several bursts, and
//! reloading mid-write would trip the keep-previous-table path for nothing.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(500);
const QUIET_PERIOD: Duration = Duration::from_millis(300);

/// A store whose backing file can be re-read at runtime.
pub trait Reload: Send + Sync + 'static {
    fn reload(&self) -> Result<()>;
    fn path(&self) -> &Path;
}

impl Reload for crate::glossary::GlossaryStore {
    fn reload(&self) -> Result<()> {
        crate::glossary::GlossaryStore::reload(self)
    }
    fn path(&self) -> &Path {
        crate::glossary::GlossaryStore::path(self)
    }
}

impl Reload for crate::glossary::NoTranslateStore {
    fn reload(&self) -> Result<()> {
        crate::glossary::NoTranslateStore::reload(self)
    }
    fn path(&self) -> &Path {
        crate::glossary::NoTranslateStore::path(self)
    }
}

impl Reload for crate::glossary::ExclusionStore {
    fn reload(&self) -> Result<()> {
        crate::glossary::ExclusionStore::reload(self)
    }
    fn path(&self) -> &Path {
        crate::glossary::ExclusionStore::path(self)
    }
}

/// Modification signature: mtime plus length, so same-second rewrites with
/// different content are still seen.
fn signature(path: &Path) -> Option<(SystemTime, u64)> {
    let meta = std::fs::metadata(path).ok()?;
    let mtime = meta.modified().ok()?;
    Some((mtime, meta.len()))
}

/// Spawn a watcher task for `store` with the default timings.
pub fn spawn_watcher<S: Reload>(store: Arc<S>) -> JoinHandle<()> {
    spawn_watcher_with(store, POLL_INTERVAL, QUIET_PERIOD)
}

/// Watcher with explicit timings; split out so tests can run fast.
pub fn spawn_watcher_with<S: Reload>(
    store: Arc<S>,
    poll: Duration,
    quiet: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last = signature(store.path());
        loop {
            tokio::time::sleep(poll).await;
            let current = signature(store.path());
            if current == last {
                continue;
            }

            // Wait until the file holds still before reloading.
            let mut settled = current;
            loop {
                tokio::time::sleep(quiet).await;
                let next = signature(store.path());
                if next == settled {
                    break;
                }
                settled = next;
            }
            last = settled;

            let name = store
                .path()
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            match store.reload() {
                Ok(()) => info!("Reloaded {} after change on disk", name),
                Err(e) => warn!("Reload of {} failed: {:#}", name, e),
            }
            debug!("Watcher for {} back to polling", name);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glossary::GlossaryStore;
    use tempfile::TempDir;

    // ==================== Watcher Tests ====================

    #[tokio::test]
    async fn test_watcher_reloads_on_change() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("glossary.json");
        std::fs::write(&path, r#"{"km": {"Kampot": "កំពត"}}"#).unwrap();

        let store = GlossaryStore::open(&path);
        let handle = spawn_watcher_with(
            Arc::clone(&store),
            Duration::from_millis(20),
            Duration::from_millis(10),
        );

        tokio::time::sleep(Duration::from_millis(60)).await;
        std::fs::write(&path, r#"{"zh": {"Kampot": "贡布"}}"#).unwrap();

        let mut reloaded = false;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            if store.snapshot().contains_key("zh") {
                reloaded = true;
                break;
            }
        }
        handle.abort();
        assert!(reloaded, "watcher should pick up the rewritten file");
    }

    #[tokio::test]
    async fn test_watcher_keeps_table_on_broken_rewrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("glossary.json");
        std::fs::write(&path, r#"{"km": {"Kampot": "កំពត"}}"#).unwrap();

        let store = GlossaryStore::open(&path);
        let handle = spawn_watcher_with(
            Arc::clone(&store),
            Duration::from_millis(20),
            Duration::from_millis(10),
        );

        tokio::time::sleep(Duration::from_millis(60)).await;
        std::fs::write(&path, "{ broken").unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        handle.abort();
        assert!(store.snapshot().contains_key("km"));
    }
}
