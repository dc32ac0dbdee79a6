//! Mindpack bundles: profiles and rule types packaged with a hashed manifest.
//!
//! A bundle source is a directory laid out as:
//!
//! ```text
//! manifest.json        # identity + per-file sha-256 (written by init)
//! profiles/**          # profile artifacts
//! rule_types/**        # rule type artifacts
//! ```
//!
//! # Example
//!
//! ```no_run
//! use mindpack::{verify_archive, InitOptions, Metadata, Packer, Bundle};
//!
//! # fn main() -> mindpack::PackResult<()> {
//! let packer = Packer::new();
//! packer.init(&InitOptions::new(Metadata::new("my-bundle", "", "v0.1.0"), "bundle-data"))?;
//!
//! let bundle = Bundle::from_directory("bundle-data")?;
//! packer.write_to_file(&bundle, "my-bundle.mpk")?;
//!
//! let report = verify_archive(std::fs::File::open("my-bundle.mpk").unwrap())?;
//! assert!(report.is_ok());
//! # Ok(())
//! # }
//! ```

pub mod bundle;
pub mod digest;
pub mod error;
pub mod manifest;
pub mod pack;
pub mod scan;
pub mod source;
pub mod validate;
pub mod verify;

// Convenience re-exports
pub use bundle::Bundle;
pub use digest::{sha256_hex_bytes, sha256_hex_reader, SHA256};
pub use error::{PackError, PackResult};
pub use manifest::{File, Files, Manifest, Metadata};
pub use pack::{ArchiveSink, EntryHeader, InitOptions, Packer, TarSink};
pub use scan::{classify, paths, scan_archive, scan_source, EntryKind, ScanOutcome};
pub use source::{BundleSource, DirSource, SourceEntry, SourceStat};
pub use validate::{is_valid_name, validate_version};
pub use verify::{
    compare_inventories, verify_archive, Category, Violation, ViolationKind, VerifyReport,
};
