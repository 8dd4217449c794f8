use crate::errors::{AppError, AppResult};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Process-wide root directory, shared by every handler through `AppState`.
#[derive(Clone, Default)]
pub struct RootHandle {
    current: Arc<RwLock<Option<PathBuf>>>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RootInfo {
    pub configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_name: Option<String>,
}

impl RootHandle {
    pub fn new() -> Self { Self::default() }

    /// Validates `candidate` and swaps it in. On error the previous root stays.
    pub async fn set(&self, candidate: &Path) -> AppResult<RootInfo> {
        let canonical = validate_root(candidate).await?;
        let info = describe(&canonical);
        let previous = self.current.write().await.replace(canonical);
        tracing::info!(
            previous = ?previous,
            root = info.root_path.as_deref().unwrap_or_default(),
            "root changed"
        );
        Ok(info)
    }

    pub async fn get(&self) -> Option<PathBuf> { self.current.read().await.clone() }

    pub async fn require(&self) -> AppResult<PathBuf> { self.get().await.ok_or(AppError::Unconfigured) }

    pub async fn info(&self) -> RootInfo {
        match self.get().await {
            Some(root) => describe(&root),
            None => RootInfo { configured: false, root_path: None, folder_name: None },
        }
    }
}

pub async fn validate_root(candidate: &Path) -> AppResult<PathBuf> {
    if candidate.as_os_str().is_empty() {
        return Err(AppError::InvalidRoot("path is empty".into()));
    }
    let invalid = |e: std::io::Error| AppError::InvalidRoot(format!("{}: {e}", candidate.display()));
    let meta = tokio::fs::metadata(candidate).await.map_err(invalid)?;
    if !meta.is_dir() {
        return Err(AppError::InvalidRoot(format!("{} is not a directory", candidate.display())));
    }
    let owned = candidate.to_path_buf();
    tokio::task::spawn_blocking(move || dunce::canonicalize(owned))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(invalid)
}

pub fn folder_name(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string())
}

fn describe(root: &Path) -> RootInfo {
    RootInfo {
        configured: true,
        root_path: Some(root.display().to_string()),
        folder_name: Some(folder_name(root)),
    }
}
