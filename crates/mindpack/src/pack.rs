//! Bundle initialization and archive packing.
//!
//! [`Packer::init`] writes a fresh `manifest.json` into a source directory.
//! [`Packer::write`] streams every regular file of a bundle source into an
//! uncompressed tar archive, preserving path, size, mode and mtime. Packing
//! does no hashing: run init (or [`Bundle::update_manifest`]) first so the
//! manifest matches the tree.

use std::fs::OpenOptions;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tar::{Builder, Header};
use tracing::{debug, info};

use crate::bundle::Bundle;
use crate::error::{PackError, PackResult};
use crate::manifest::Metadata;
use crate::scan::paths;
use crate::validate::check_metadata;

/// Archive entry attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryHeader {
    /// Relative POSIX path.
    pub path: String,
    pub size: u64,
    pub mode: u32,
    /// Seconds since the Unix epoch.
    pub mtime: u64,
}

/// Destination for archive entries.
pub trait ArchiveSink {
    /// Write one entry; `data` must yield exactly `header.size` bytes.
    fn append(&mut self, header: &EntryHeader, data: &mut dyn Read) -> PackResult<()>;

    /// Flush trailing archive structures.
    fn finish(&mut self) -> PackResult<()>;
}

/// Plain tar archive sink.
pub struct TarSink<W: Write> {
    builder: Builder<W>,
}

impl<W: Write> TarSink<W> {
    pub fn new(w: W) -> Self {
        Self {
            builder: Builder::new(w),
        }
    }

    /// Finish the archive and return the underlying writer.
    pub fn into_inner(self) -> PackResult<W> {
        self.builder
            .into_inner()
            .map_err(|e| PackError::io("finalizing archive", "<archive>", e))
    }
}

impl<W: Write> ArchiveSink for TarSink<W> {
    fn append(&mut self, header: &EntryHeader, data: &mut dyn Read) -> PackResult<()> {
        let mut tar_header = Header::new_gnu();
        tar_header.set_size(header.size);
        tar_header.set_mode(header.mode);
        tar_header.set_mtime(header.mtime);
        tar_header.set_entry_type(tar::EntryType::Regular);
        // append_data handles long paths and sets the checksum.
        self.builder
            .append_data(&mut tar_header, &header.path, data)
            .map_err(|e| PackError::io("writing data to archive", &header.path, e))
    }

    fn finish(&mut self) -> PackResult<()> {
        self.builder
            .finish()
            .map_err(|e| PackError::io("finalizing archive", "<archive>", e))
    }
}

/// Options for [`Packer::init`].
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    pub metadata: Metadata,
    /// Source directory of the new bundle.
    pub path: PathBuf,
}

impl InitOptions {
    pub fn new(metadata: Metadata, path: impl Into<PathBuf>) -> Self {
        Self {
            metadata,
            path: path.into(),
        }
    }

    /// Check every option and report all problems at once.
    pub fn validate(&self) -> PackResult<()> {
        let mut errs = Vec::new();
        check_metadata(&self.metadata, &mut errs);

        match std::fs::metadata(&self.path) {
            Err(e) => errs.push(format!("opening path {}: {e}", self.path.display())),
            Ok(meta) if !meta.is_dir() => {
                errs.push(format!("{} is not a directory", self.path.display()))
            }
            Ok(_) => {
                let manifest = self.manifest_path();
                if manifest.exists() {
                    errs.push(format!("manifest found in {}", manifest.display()));
                }
            }
        }

        if errs.is_empty() {
            Ok(())
        } else {
            Err(PackError::Validation(errs))
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.path.join(paths::MANIFEST)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Packer;

impl Packer {
    pub fn new() -> Self {
        Self
    }

    /// Create `manifest.json` for the tree at `opts.path`.
    ///
    /// Nothing is written when validation fails. A failure while writing is
    /// returned and the partial file stays on disk.
    pub fn init(&self, opts: &InitOptions) -> PackResult<Bundle> {
        opts.validate()?;

        let mut bundle = Bundle::from_directory(&opts.path)?;
        bundle.metadata = opts.metadata.clone();
        bundle.update_manifest();
        bundle.manifest.metadata.date = Some(Utc::now());
        bundle.metadata.date = bundle.manifest.metadata.date;

        let path = opts.manifest_path();
        // create_new: never truncate a manifest that appeared after validation.
        let f = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| PackError::io("opening manifest file", &path, e))?;
        let mut w = io::BufWriter::new(f);
        bundle.manifest.write(&mut w)?;
        w.flush()
            .map_err(|e| PackError::io("writing manifest data", &path, e))?;

        info!(
            path = %path.display(),
            profiles = bundle.files.profiles.len(),
            rule_types = bundle.files.rule_types.len(),
            "wrote new manifest"
        );
        Ok(bundle)
    }

    /// Pack the bundle into a new file at `path`.
    pub fn write_to_file(&self, bundle: &Bundle, path: impl AsRef<Path>) -> PackResult<()> {
        let path = path.as_ref();
        if bundle.source.is_none() {
            return Err(PackError::NoSource);
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| PackError::io("creating directory", parent, e))?;
        }
        let f = std::fs::File::create(path).map_err(|e| PackError::io("opening file", path, e))?;
        let mut w = io::BufWriter::new(f);
        self.write(bundle, &mut w)?;
        w.flush()
            .map_err(|e| PackError::io("writing bundle to file", path, e))?;
        info!(path = %path.display(), "wrote bundle archive");
        Ok(())
    }

    /// Pack the bundle as a tar stream into `w`.
    pub fn write<W: Write>(&self, bundle: &Bundle, w: W) -> PackResult<()> {
        let mut sink = TarSink::new(w);
        self.write_to_sink(bundle, &mut sink)?;
        sink.into_inner()?;
        Ok(())
    }

    /// Stream every regular file of the bundle source into `sink`.
    pub fn write_to_sink(&self, bundle: &Bundle, sink: &mut dyn ArchiveSink) -> PackResult<()> {
        let source = bundle.source.as_ref().ok_or(PackError::NoSource)?;
        let mut count = 0_usize;

        source.walk(&mut |entry| {
            let stat = source.stat(&entry.path)?;
            if stat.is_dir {
                return Ok(());
            }
            let mut reader = source.open(&entry.path)?;
            let header = EntryHeader {
                path: entry.path.clone(),
                size: stat.size,
                mode: stat.mode,
                mtime: stat.mtime,
            };
            debug!(path = %header.path, size = header.size, "adding archive entry");
            sink.append(&header, &mut reader)?;
            count += 1;
            Ok(())
        })?;

        sink.finish()?;
        debug!(entries = count, "archive complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[derive(Default)]
    struct RecordingSink {
        entries: Vec<(EntryHeader, Vec<u8>)>,
        finished: bool,
    }

    impl ArchiveSink for RecordingSink {
        fn append(&mut self, header: &EntryHeader, data: &mut dyn Read) -> PackResult<()> {
            let mut buf = Vec::new();
            data.read_to_end(&mut buf).unwrap();
            self.entries.push((header.clone(), buf));
            Ok(())
        }

        fn finish(&mut self) -> PackResult<()> {
            self.finished = true;
            Ok(())
        }
    }

    fn tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("profiles")).unwrap();
        fs::create_dir_all(dir.path().join("rule_types/nested")).unwrap();
        fs::write(dir.path().join("profiles/p1.yaml"), "p1").unwrap();
        fs::write(dir.path().join("rule_types/nested/r1.yaml"), "rule-one").unwrap();
        dir
    }

    #[test]
    fn sink_receives_files_only() {
        let dir = tree();
        let bundle = Bundle::from_directory(dir.path()).unwrap();
        let mut sink = RecordingSink::default();
        Packer::new().write_to_sink(&bundle, &mut sink).unwrap();

        assert!(sink.finished);
        let paths: Vec<_> = sink.entries.iter().map(|(h, _)| h.path.as_str()).collect();
        assert_eq!(paths, ["profiles/p1.yaml", "rule_types/nested/r1.yaml"]);
        assert_eq!(sink.entries[1].0.size, 8);
        assert_eq!(sink.entries[1].1, b"rule-one");
    }

    #[test]
    fn write_without_source_fails() {
        let err = Packer::new()
            .write(&Bundle::default(), Vec::new())
            .unwrap_err();
        assert!(matches!(err, PackError::NoSource));
    }

    #[test]
    fn init_validation_aggregates() {
        let dir = tempfile::tempdir().unwrap();
        let opts = InitOptions::new(
            Metadata::new("", "bad/ns", "v0.0.1"),
            dir.path().join("missing"),
        );
        match opts.validate().unwrap_err() {
            PackError::Validation(errs) => {
                assert_eq!(errs.len(), 3, "{errs:?}");
                assert!(errs[0].contains("name is required"));
                assert!(errs[1].contains("namespace"));
                assert!(errs[2].contains("opening path"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!dir.path().join("missing").exists());
    }

    #[test]
    fn init_writes_stamped_manifest() {
        let dir = tree();
        let opts = InitOptions::new(Metadata::new("bundle", "", "v0.0.1"), dir.path());
        let bundle = Packer::new().init(&opts).unwrap();

        let written = fs::read(dir.path().join("manifest.json")).unwrap();
        let decoded = crate::manifest::Manifest::from_json_slice(&written).unwrap();
        assert_eq!(decoded, bundle.manifest);
        assert!(decoded.metadata.date.is_some());
        assert_eq!(decoded.metadata.name, "bundle");
        assert_eq!(decoded.files.len(), 2);
    }
}
