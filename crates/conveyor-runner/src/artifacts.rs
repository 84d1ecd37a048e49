//! Filesystem artifact store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use conveyor_core::ports::{ArtifactBundle, ArtifactStore};
use conveyor_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Copies retained paths from the workspace into a per-job directory
/// under a root, recording the expiry next to them. Expired bundles are
/// eligible for deletion by whoever owns the root; this store never
/// deletes anything.
pub struct FsArtifactStore {
    workspace: PathBuf,
    root: PathBuf,
}

/// Metadata written alongside each stored bundle.
#[derive(Debug, Serialize, Deserialize)]
pub struct BundleManifest {
    pub job: String,
    pub paths: Vec<String>,
    pub stored_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl FsArtifactStore {
    pub fn new(workspace: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            root: root.into(),
        }
    }

    fn copy_tree(source: &Path, target: &Path) -> std::io::Result<()> {
        if source.is_dir() {
            std::fs::create_dir_all(target)?;
            for entry in std::fs::read_dir(source)? {
                let entry = entry?;
                Self::copy_tree(&entry.path(), &target.join(entry.file_name()))?;
            }
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(source, target)?;
        }
        Ok(())
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn store(&self, job: &str, bundle: &ArtifactBundle) -> Result<()> {
        let workspace = self.workspace.clone();
        let paths = bundle.paths.clone();
        let manifest = BundleManifest {
            job: job.to_string(),
            paths: bundle.paths.clone(),
            stored_at: Utc::now(),
            expires_at: bundle.expires_at,
        };

        let dir = self.root.join(job);
        tokio::task::spawn_blocking(move || -> std::io::Result<usize> {
            std::fs::create_dir_all(&dir)?;
            let mut copied = 0;
            for path in &paths {
                let source = workspace.join(path);
                if !source.exists() {
                    debug!(path = %path, "Declared artifact path missing; skipping");
                    continue;
                }
                FsArtifactStore::copy_tree(&source, &dir.join(path))?;
                copied += 1;
            }
            let manifest_json = serde_json::to_vec_pretty(&manifest)?;
            std::fs::write(dir.join(".manifest.json"), manifest_json)?;
            Ok(copied)
        })
        .await
        .map_err(|e| Error::ArtifactStorage(e.to_string()))?
        .map_err(|e| Error::ArtifactStorage(e.to_string()))
        .map(|copied| {
            info!(job = %job, copied, "Stored artifact bundle");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_copies_files_and_writes_manifest() {
        let workspace = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(workspace.path().join("dist")).unwrap();
        std::fs::write(workspace.path().join("dist/pkg.whl"), b"bits").unwrap();

        let store = FsArtifactStore::new(workspace.path(), root.path());
        let bundle = ArtifactBundle {
            paths: vec!["dist".to_string()],
            expires_at: Some(Utc::now() + chrono::Duration::weeks(1)),
        };
        store.store("package", &bundle).await.unwrap();

        assert!(root.path().join("package/dist/pkg.whl").exists());
        let manifest: BundleManifest = serde_json::from_slice(
            &std::fs::read(root.path().join("package/.manifest.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(manifest.job, "package");
        assert!(manifest.expires_at.is_some());
    }

    #[tokio::test]
    async fn test_missing_paths_are_skipped_not_fatal() {
        let workspace = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(workspace.path(), root.path());
        let bundle = ArtifactBundle {
            paths: vec!["no-such-dir".to_string()],
            expires_at: None,
        };
        store.store("j", &bundle).await.unwrap();
        assert!(root.path().join("j/.manifest.json").exists());
    }
}
