//! Filesystem view over a bundle source tree.
//!
//! The bundle never owns the tree it reads: a [`BundleSource`] is a read-only
//! capability that scanning, verification and packing borrow for the duration
//! of one call. Callers keep the tree stable while those calls run.

use std::fmt;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

use walkdir::WalkDir;

use crate::error::{PackError, PackResult};

/// One entry found while walking a source. `path` is relative to the root
/// and always uses forward slashes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub path: String,
    pub is_dir: bool,
}

impl SourceEntry {
    /// Last path component.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Attributes carried into archive headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceStat {
    pub size: u64,
    pub mode: u32,
    /// Seconds since the Unix epoch.
    pub mtime: u64,
    pub is_dir: bool,
}

/// Read-only filesystem a bundle is built from.
pub trait BundleSource: fmt::Debug + Send + Sync {
    /// Visit every entry below the root (root excluded) in a stable order.
    /// The first error, from the walk or from `visit`, stops the walk.
    fn walk(&self, visit: &mut dyn FnMut(&SourceEntry) -> PackResult<()>) -> PackResult<()>;

    fn stat(&self, path: &str) -> PackResult<SourceStat>;

    fn open(&self, path: &str) -> PackResult<Box<dyn Read + '_>>;
}

/// A directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    /// Fails when `root` does not exist or is not a directory.
    pub fn new(root: impl Into<PathBuf>) -> PackResult<Self> {
        let root = root.into();
        let meta = std::fs::metadata(&root).map_err(|e| PackError::io("opening path", &root, e))?;
        if !meta.is_dir() {
            return Err(PackError::Validation(vec![format!(
                "{} is not a directory",
                root.display()
            )]));
        }
        Ok(Self { root })
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl BundleSource for DirSource {
    fn walk(&self, visit: &mut dyn FnMut(&SourceEntry) -> PackResult<()>) -> PackResult<()> {
        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name();

        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(&self.root).to_path_buf();
                PackError::io("reading", path, e.into())
            })?;
            let rel = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or_else(|_| entry.path());
            visit(&SourceEntry {
                path: to_slash_path(rel),
                is_dir: entry.file_type().is_dir(),
            })?;
        }
        Ok(())
    }

    fn stat(&self, path: &str) -> PackResult<SourceStat> {
        let full = self.resolve(path);
        let meta =
            std::fs::metadata(&full).map_err(|e| PackError::io("reading file info", &full, e))?;
        let mtime = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Ok(SourceStat {
            size: meta.len(),
            mode: file_mode(&meta),
            mtime,
            is_dir: meta.is_dir(),
        })
    }

    fn open(&self, path: &str) -> PackResult<Box<dyn Read + '_>> {
        let full = self.resolve(path);
        let file = std::fs::File::open(&full).map_err(|e| PackError::io("opening", &full, e))?;
        Ok(Box::new(file))
    }
}

#[cfg(unix)]
fn file_mode(meta: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn file_mode(meta: &std::fs::Metadata) -> u32 {
    if meta.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

fn to_slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
