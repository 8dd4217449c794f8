use crate::errors::AppError;
use axum::http::HeaderMap;
use std::path::{Component, Path, PathBuf};

/// Resolves a caller-supplied path against `root`.
///
/// The input is always treated as relative: leading separators and drive prefixes
/// are dropped rather than honoured. `..` that climbs above the root is rejected
/// before touching the filesystem; the canonical result (symlinks resolved) must
/// still sit under the canonical root.
pub fn resolve(root: &Path, relative: &str) -> Result<PathBuf, AppError> {
    let normalized = normalize_relative(relative)?;
    let canon_root = dunce::canonicalize(root).map_err(|e| AppError::from_io(&e))?;
    let canon_path = dunce::canonicalize(canon_root.join(&normalized)).map_err(|e| AppError::from_io(&e))?;
    if canon_path.starts_with(&canon_root) {
        Ok(canon_path)
    } else {
        Err(AppError::AccessDenied)
    }
}

/// Lexically folds `.` and `..`; fails with `AccessDenied` when `..` would leave the root.
pub fn normalize_relative(relative: &str) -> Result<PathBuf, AppError> {
    let mut out = PathBuf::new();
    for part in Path::new(relative).components() {
        match part {
            Component::Normal(seg) => out.push(seg),
            Component::ParentDir => {
                if !out.pop() {
                    return Err(AppError::AccessDenied);
                }
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    Ok(out)
}

/// Slash-separated path of `full` relative to `root`, used for the `path` fields sent to clients.
pub fn relative_display(root: &Path, full: &Path) -> String {
    full.strip_prefix(root)
        .map(|rel| {
            rel.components()
                .filter_map(|c| match c {
                    Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_default()
}

pub fn content_length_ok(headers: &HeaderMap, max_kb: usize) -> Result<(), AppError> {
    if let Some(len) = headers
        .get(axum::http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<usize>().ok())
    {
        if len > max_kb * 1024 {
            return Err(AppError::RequestTooLarge);
        }
    }
    Ok(())
}
