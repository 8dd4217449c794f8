use crate::{
    config::{Browse, FileFilter},
    content::{self, ContentKind},
    security::relative_display,
};
use serde::Serialize;
use std::fs::{self, DirEntry};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DirectoryNode {
    pub name: String,
    pub path: String,
    pub children: Vec<DirectoryNode>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FolderEntry {
    pub name: String,
    pub path: String,
    pub sub_folders: Vec<DirectoryNode>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
pub struct Listing {
    pub folders: Vec<FolderEntry>,
    pub files: Vec<FileEntry>,
}

/// Walks a directory under a fixed root, applying the browse policy.
pub struct Enumerator<'a> {
    root: &'a Path,
    opts: &'a Browse,
}

struct Entries {
    dirs: Vec<(String, PathBuf)>,
    files: Vec<(String, PathBuf)>,
}

impl<'a> Enumerator<'a> {
    pub fn new(root: &'a Path, opts: &'a Browse) -> Self { Self { root, opts } }

    /// One level of `dir`: its files, and its folders with their sub-folder trees attached.
    /// Fails only if `dir` itself cannot be read.
    pub fn list_level(&self, dir: &Path) -> io::Result<Listing> {
        let entries = self.read(dir)?;
        let folders = entries
            .dirs
            .into_iter()
            .map(|(name, path)| FolderEntry {
                sub_folders: self.children(&path, 1),
                path: relative_display(self.root, &path),
                name,
            })
            .collect();
        let files = entries
            .files
            .into_iter()
            .map(|(name, path)| FileEntry {
                kind: content::extension_of(&path),
                path: relative_display(self.root, &path),
                name,
            })
            .collect();
        Ok(Listing { folders, files })
    }

    /// Folders-only tree rooted at `dir`.
    pub fn folder_tree(&self, dir: &Path) -> io::Result<DirectoryNode> {
        let entries = self.read(dir)?;
        let children = entries
            .dirs
            .into_iter()
            .map(|(name, path)| self.node(name, &path, 1))
            .collect();
        Ok(DirectoryNode {
            name: crate::root::folder_name(dir),
            path: relative_display(self.root, dir),
            children,
        })
    }

    fn node(&self, name: String, path: &Path, depth: usize) -> DirectoryNode {
        DirectoryNode {
            children: self.children(path, depth),
            path: relative_display(self.root, path),
            name,
        }
    }

    /// Sub-folders of a folder sitting `depth` levels below the listed directory.
    fn children(&self, dir: &Path, depth: usize) -> Vec<DirectoryNode> {
        if self.opts.max_depth != 0 && depth >= self.opts.max_depth {
            return Vec::new();
        }
        match self.read(dir) {
            Ok(entries) => entries
                .dirs
                .into_iter()
                .map(|(name, path)| self.node(name, &path, depth + 1))
                .collect(),
            Err(e) => {
                tracing::debug!(dir = %dir.display(), error = %e, "skipping unreadable directory");
                Vec::new()
            }
        }
    }

    fn read(&self, dir: &Path) -> io::Result<Entries> {
        let mut dirs = Vec::new();
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let Ok(entry) = entry else { continue };
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            match self.classify(&entry) {
                Some(true) => {
                    if !self.opts.excluded_dirs.iter().any(|x| *x == name) {
                        dirs.push((name, entry.path()));
                    }
                }
                Some(false) => {
                    let path = entry.path();
                    if self.keeps_file(&path) {
                        files.push((name, path));
                    }
                }
                None => {}
            }
        }
        dirs.sort_by(|a, b| a.0.cmp(&b.0));
        files.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(Entries { dirs, files })
    }

    /// `Some(true)` for folders, `Some(false)` for files, `None` for entries to skip.
    fn classify(&self, entry: &DirEntry) -> Option<bool> {
        let ft = entry.file_type().ok()?;
        if ft.is_symlink() {
            if !self.opts.follow_symlinks {
                return None;
            }
            let meta = fs::metadata(entry.path()).ok()?;
            let target = dunce::canonicalize(entry.path()).ok()?;
            if !target.starts_with(self.root) {
                return None;
            }
            return Some(meta.is_dir());
        }
        if ft.is_dir() {
            Some(true)
        } else if ft.is_file() {
            Some(false)
        } else {
            None
        }
    }

    fn keeps_file(&self, path: &Path) -> bool {
        match self.opts.file_filter {
            FileFilter::All => true,
            FileFilter::Known => !matches!(content::classify(&content::extension_of(path)), ContentKind::Other),
        }
    }
}
