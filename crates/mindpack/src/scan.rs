//! Bundle tree scanner.
//!
//! Classifies every file of a bundle source into the manifest, a profile or a
//! rule type, hashes artifacts, and decodes the declared manifest. Any file
//! outside that layout aborts the scan. The same rules apply to a directory
//! tree and to the entries of a packed archive.

use std::io::Read;
use std::path::{Component, Path};

use tracing::debug;

use crate::digest::file_hashes;
use crate::error::{PackError, PackResult};
use crate::manifest::{File, Files, Manifest};
use crate::source::BundleSource;

/// Canonical paths inside a bundle (POSIX, relative to root).
pub mod paths {
    /// Profiles directory.
    pub const PROFILES: &str = "profiles";
    /// Rule types directory.
    pub const RULE_TYPES: &str = "rule_types";
    /// Manifest at bundle root.
    pub const MANIFEST: &str = "manifest.json";
}

/// Where a file belongs in the bundle layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Manifest,
    Profile,
    RuleType,
}

/// Classify a relative file path. Fails for anything outside the layout.
pub fn classify(path: &str) -> PackResult<EntryKind> {
    let violation = || PackError::StructuralViolation {
        path: path.to_string(),
    };

    let clean = Path::new(path)
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if !clean {
        return Err(violation());
    }

    if path == paths::MANIFEST {
        return Ok(EntryKind::Manifest);
    }
    if in_dir(path, paths::PROFILES) {
        return Ok(EntryKind::Profile);
    }
    if in_dir(path, paths::RULE_TYPES) {
        return Ok(EntryKind::RuleType);
    }
    Err(violation())
}

fn in_dir(path: &str, dir: &str) -> bool {
    path.strip_prefix(dir)
        .and_then(|rest| rest.strip_prefix('/'))
        .is_some_and(|rest| !rest.is_empty())
}

/// Result of one scan: the declared manifest (if the source has one) and the
/// inventory derived from the files actually present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    pub manifest: Option<Manifest>,
    pub files: Files,
}

#[derive(Debug, Default)]
struct Scanner {
    outcome: ScanOutcome,
}

impl Scanner {
    fn visit_file<R: Read>(&mut self, path: &str, reader: R) -> PackResult<()> {
        match classify(path)? {
            EntryKind::Manifest => {
                if self.outcome.manifest.is_some() {
                    return Err(PackError::StructuralViolation {
                        path: path.to_string(),
                    });
                }
                debug!(path, "parsing manifest");
                self.outcome.manifest = Some(Manifest::read(reader)?);
            }
            kind => {
                let hashes = file_hashes(reader).map_err(|e| PackError::io("hashing", path, e))?;
                let entry = File {
                    name: base_name(path).to_string(),
                    hashes,
                };
                debug!(path, ?kind, "hashed bundle file");
                match kind {
                    EntryKind::Profile => self.outcome.files.profiles.push(entry),
                    _ => self.outcome.files.rule_types.push(entry),
                }
            }
        }
        Ok(())
    }
}

fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Scan a filesystem source. Stops at the first error.
pub fn scan_source(source: &dyn BundleSource) -> PackResult<ScanOutcome> {
    let mut scanner = Scanner::default();
    source.walk(&mut |entry| {
        if entry.is_dir {
            return Ok(());
        }
        // Checked before opening so foreign files are never read.
        classify(&entry.path)?;
        let reader = source.open(&entry.path)?;
        scanner.visit_file(&entry.path, reader)
    })?;
    Ok(scanner.outcome)
}

/// Scan the entries of an uncompressed tar archive. Stops at the first error.
pub fn scan_archive<R: Read>(reader: R) -> PackResult<ScanOutcome> {
    let mut archive = tar::Archive::new(reader);
    let mut scanner = Scanner::default();

    let entries = archive
        .entries()
        .map_err(|e| PackError::io("reading archive", "<archive>", e))?;

    for (i, entry) in entries.enumerate() {
        let entry = entry.map_err(|e| PackError::io("reading archive entry", format!("#{i}"), e))?;
        let raw_path = entry
            .path()
            .map_err(|e| PackError::io("reading archive entry path", format!("#{i}"), e))?
            .to_path_buf();
        let path = archive_path(&raw_path);

        let kind = entry.header().entry_type();
        if kind.is_dir() {
            continue;
        }
        if !kind.is_file() {
            return Err(PackError::StructuralViolation { path });
        }
        scanner.visit_file(&path, entry)?;
    }
    Ok(scanner.outcome)
}

/// Tar paths as forward-slash strings, without a leading `./`.
fn archive_path(path: &Path) -> String {
    let text = path.to_string_lossy().replace('\\', "/");
    match text.strip_prefix("./") {
        Some(rest) => rest.to_string(),
        None => text,
    }
}
