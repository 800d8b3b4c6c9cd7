//! Process-wide preview context: the live server registry and the shared
//! workspace root.
//!
//! At most one preview server is live by policy. Before every build the
//! registry is drained, each server stopped and its workspace deleted, and
//! the shared root emptied. Concurrent builds are not supported; callers
//! serialize them. The registry lock only guards against accidental
//! overlap and is never held across an await.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::PreviewConfig;
use crate::error::{PreviewError, PreviewResult};
use crate::server::RunningPreviewServer;

/// Owner of every workspace and preview server created in this process.
#[derive(Debug)]
pub struct PreviewContext {
    root: PathBuf,
    min_free_bytes: u64,
    servers: Mutex<Vec<RunningPreviewServer>>,
}

impl PreviewContext {
    pub fn new(root: impl Into<PathBuf>, min_free_bytes: u64) -> Self {
        Self {
            root: root.into(),
            min_free_bytes,
            servers: Mutex::new(Vec::new()),
        }
    }

    pub fn from_config(config: &PreviewConfig) -> Self {
        Self::new(config.preview_root.clone(), config.min_free_bytes)
    }

    /// Shared root holding every workspace.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of registered servers.
    pub fn live_servers(&self) -> usize {
        self.servers.lock().len()
    }

    /// URLs of registered servers.
    pub fn server_urls(&self) -> Vec<String> {
        self.servers.lock().iter().map(|s| s.url.clone()).collect()
    }

    /// Track a server so the next build or shutdown tears it down.
    pub fn register(&self, server: RunningPreviewServer) {
        info!("Registered preview server {} ({})", server.url, server.workspace.display());
        self.servers.lock().push(server);
    }

    /// Stop every registered server and delete its workspace.
    ///
    /// Waits for each listener to close so the port is free afterwards.
    pub async fn teardown_servers(&self) -> usize {
        let drained: Vec<RunningPreviewServer> = std::mem::take(&mut *self.servers.lock());
        let count = drained.len();

        for server in drained {
            let workspace = server.workspace.clone();
            server.stop().await;
            remove_dir_quietly(&workspace);
        }

        if count > 0 {
            info!("Tore down {} preview server(s)", count);
        }
        count
    }

    /// Delete every child of the shared root. Returns how many were removed.
    pub fn clean_root(&self) -> usize {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return 0;
        };
        let mut removed = 0;
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            let result = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            match result {
                Ok(()) => removed += 1,
                Err(e) => warn!("Could not remove {}: {}", path.display(), e),
            }
        }
        if removed > 0 {
            debug!("Removed {} residual entries from {}", removed, self.root.display());
        }
        removed
    }

    /// Pre-flight cleanup before a build.
    ///
    /// Tears down servers, empties the root, then checks free space. When
    /// space is short the root is removed entirely and checked once more.
    pub async fn prepare_clean_workspace(&self) -> PreviewResult<()> {
        self.teardown_servers().await;
        self.clean_root();
        fs::create_dir_all(&self.root)?;

        let Some(available) = self.available_space() else {
            return Ok(());
        };
        if available >= self.min_free_bytes {
            return Ok(());
        }

        warn!(
            "Low disk space ({} bytes free, {} required), retrying cleanup",
            available, self.min_free_bytes
        );
        remove_dir_quietly(&self.root);
        fs::create_dir_all(&self.root)?;

        match self.available_space() {
            Some(available) if available < self.min_free_bytes => {
                Err(PreviewError::InsufficientDiskSpace {
                    available,
                    required: self.min_free_bytes,
                })
            }
            _ => Ok(()),
        }
    }

    /// Create a fresh, uniquely named workspace under the root.
    ///
    /// The workspace outlives a successful build; it is deleted when its
    /// server is torn down or at shutdown.
    pub fn create_workspace(&self) -> PreviewResult<PathBuf> {
        let workspace = self.root.join(Uuid::new_v4().simple().to_string());
        fs::create_dir_all(&workspace)?;
        debug!("Created workspace {}", workspace.display());
        Ok(workspace)
    }

    /// Synchronous best-effort teardown of everything. Safe to call repeatedly.
    pub fn shutdown(&self) {
        let drained: Vec<RunningPreviewServer> = std::mem::take(&mut *self.servers.lock());
        for mut server in drained {
            server.abort();
            remove_dir_quietly(&server.workspace);
        }
        if self.root.exists() {
            remove_dir_quietly(&self.root);
            debug!("Removed preview root {}", self.root.display());
        }
    }

    /// Free bytes on the volume holding the root; `None` if it cannot be read.
    fn available_space(&self) -> Option<u64> {
        match fs2::available_space(&self.root) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("Could not read free disk space, continuing: {}", e);
                None
            }
        }
    }
}

/// Runs [`PreviewContext::shutdown`] when dropped.
pub struct ShutdownGuard {
    context: Arc<PreviewContext>,
}

impl ShutdownGuard {
    pub fn new(context: Arc<PreviewContext>) -> Self {
        Self { context }
    }
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        self.context.shutdown();
    }
}

fn remove_dir_quietly(path: &Path) {
    if let Err(e) = fs::remove_dir_all(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Could not remove {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_create_workspace_unique() {
        let dir = tempdir().unwrap();
        let context = PreviewContext::new(dir.path().join("root"), 0);
        let a = context.create_workspace().unwrap();
        let b = context.create_workspace().unwrap();
        assert_ne!(a, b);
        assert!(a.is_dir() && b.is_dir());
        assert!(a.starts_with(context.root()));
    }

    #[test]
    fn test_clean_root_removes_children() {
        let dir = tempdir().unwrap();
        let context = PreviewContext::new(dir.path(), 0);
        context.create_workspace().unwrap();
        fs::write(dir.path().join("stray.txt"), "x").unwrap();

        assert_eq!(context.clean_root(), 2);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let dir = tempdir().unwrap();
        let context = PreviewContext::new(dir.path().join("root"), 0);
        context.shutdown();
        context.create_workspace().unwrap();
        context.shutdown();
        context.shutdown();
        assert!(!context.root().exists());
    }

    #[test]
    fn test_guard_runs_shutdown() {
        let dir = tempdir().unwrap();
        let context = Arc::new(PreviewContext::new(dir.path().join("root"), 0));
        context.create_workspace().unwrap();
        drop(ShutdownGuard::new(context.clone()));
        assert!(!context.root().exists());
    }

    #[tokio::test]
    async fn test_prepare_clean_workspace_empties_root() {
        let dir = tempdir().unwrap();
        let context = PreviewContext::new(dir.path().join("root"), 0);
        let old = context.create_workspace().unwrap();

        context.prepare_clean_workspace().await.unwrap();
        assert!(!old.exists());
        assert!(context.root().is_dir());
    }

    #[tokio::test]
    async fn test_insufficient_disk_space() {
        let dir = tempdir().unwrap();
        let context = PreviewContext::new(dir.path().join("root"), u64::MAX);

        let err = context.prepare_clean_workspace().await.unwrap_err();
        assert!(matches!(err, PreviewError::InsufficientDiskSpace { required, .. } if required == u64::MAX));
        assert!(err.to_string().contains("Insufficient disk space"));
    }
}
