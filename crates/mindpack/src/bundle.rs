//! In-memory bundle: declared manifest, identity, derived inventory and the
//! filesystem source they were read from.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{PackError, PackResult};
use crate::manifest::{Files, Manifest, Metadata};
use crate::scan::scan_source;
use crate::source::{BundleSource, DirSource};
use crate::verify::{compare_inventories, VerifyReport};

/// A bundle under construction or inspection.
///
/// `manifest.files` is the declared inventory; `files` is derived from the
/// source by the last scan. They diverge when the tree changes after the
/// manifest was written, which is what [`Bundle::verify`] detects.
#[derive(Debug, Clone, Default)]
pub struct Bundle {
    pub manifest: Manifest,
    pub metadata: Metadata,
    pub files: Files,
    /// Non-owning view of the source tree.
    pub source: Option<Arc<dyn BundleSource>>,
    declared: bool,
}

impl Bundle {
    /// Bundle over an arbitrary source. Nothing is read until [`Bundle::read_source`].
    pub fn with_source(source: Arc<dyn BundleSource>) -> Self {
        Self {
            source: Some(source),
            ..Self::default()
        }
    }

    /// Open `path` as the bundle source and scan it.
    pub fn from_directory(path: impl AsRef<Path>) -> PackResult<Self> {
        let path = path.as_ref();
        let source = DirSource::new(path)?;
        let mut bundle = Self::with_source(Arc::new(source));
        bundle.read_source()?;
        debug!(
            path = %path.display(),
            profiles = bundle.files.profiles.len(),
            rule_types = bundle.files.rule_types.len(),
            has_manifest = bundle.declared,
            "read bundle source"
        );
        Ok(bundle)
    }

    /// Load the declared manifest and the derived inventory from the source.
    /// Without a `manifest.json` the manifest is an empty placeholder.
    pub fn read_source(&mut self) -> PackResult<()> {
        let source = self.source.as_ref().ok_or(PackError::NoSource)?;
        let outcome = scan_source(source.as_ref())?;

        self.declared = outcome.manifest.is_some();
        self.manifest = outcome.manifest.unwrap_or_default();
        self.files = outcome.files;
        Ok(())
    }

    /// Whether the source contained a `manifest.json` at the last scan.
    pub fn has_declared_manifest(&self) -> bool {
        self.declared
    }

    /// Replace the manifest with the current metadata and derived inventory.
    pub fn update_manifest(&mut self) {
        self.manifest = Manifest {
            metadata: self.metadata.clone(),
            files: self.files.clone(),
        };
    }

    /// Re-scan the source and compare the fresh inventory with the declared one.
    ///
    /// The declared manifest is the one loaded by the last scan or set by
    /// [`Bundle::update_manifest`]; a `manifest.json` changed on disk since
    /// then is not reloaded.
    pub fn verify(&mut self) -> PackResult<VerifyReport> {
        let source = self.source.as_ref().ok_or(PackError::NoSource)?;
        let outcome = scan_source(source.as_ref())?;
        self.files = outcome.files;

        let report = compare_inventories(&self.manifest.files, &self.files);
        if report.is_ok() {
            info!(files = self.files.len(), "bundle verified");
        }
        Ok(report)
    }
}
