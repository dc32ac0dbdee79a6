//! Bundle verification: declared manifest vs. derived inventory.
//!
//! Files are compared per category and matched by base name. Every
//! discrepancy is collected; nothing short-circuits. An empty report means
//! the bundle is consistent with its manifest.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;

use serde::Serialize;
use tracing::debug;

use crate::error::{PackError, PackResult};
use crate::manifest::{File, Files};
use crate::scan::scan_archive;

/// Inventory partition a file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Profiles,
    RuleTypes,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Profiles => f.write_str("profiles"),
            Self::RuleTypes => f.write_str("rule_types"),
        }
    }
}

/// Kind of verification failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Declared in the manifest, absent from the bundle contents.
    MissingFile,
    /// Present in the bundle contents, not declared in the manifest.
    UntrackedFile,
    /// Declared digests differ from the computed ones.
    HashMismatch,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingFile => f.write_str("missing file"),
            Self::UntrackedFile => f.write_str("untracked file"),
            Self::HashMismatch => f.write_str("hash mismatch"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub category: Category,
    pub name: String,
    /// Algorithm -> digest recorded in the manifest (empty for untracked files).
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub expected: BTreeMap<String, String>,
    /// Algorithm -> digest computed from contents (empty for missing files).
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub actual: BTreeMap<String, String>,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}/{}", self.kind, self.category, self.name)?;
        if self.kind == ViolationKind::HashMismatch {
            for (algorithm, expected) in &self.expected {
                let actual = self.actual.get(algorithm).map_or("<none>", String::as_str);
                write!(f, " ({algorithm}: manifest {expected} vs computed {actual})")?;
            }
        }
        Ok(())
    }
}

/// All violations found by one verification pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub violations: Vec<Violation>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn count(&self, kind: ViolationKind) -> usize {
        self.violations.iter().filter(|v| v.kind == kind).count()
    }

    fn push(&mut self, violation: Violation) {
        debug!(
            kind = %violation.kind,
            category = %violation.category,
            name = %violation.name,
            "bundle verification violation"
        );
        self.violations.push(violation);
    }
}

/// Compare a declared inventory with a derived one.
pub fn compare_inventories(declared: &Files, derived: &Files) -> VerifyReport {
    let mut report = VerifyReport::default();
    compare_category(
        Category::Profiles,
        &declared.profiles,
        &derived.profiles,
        &mut report,
    );
    compare_category(
        Category::RuleTypes,
        &declared.rule_types,
        &derived.rule_types,
        &mut report,
    );
    report
}

fn by_name(files: &[File]) -> BTreeMap<&str, Vec<&File>> {
    let mut map: BTreeMap<&str, Vec<&File>> = BTreeMap::new();
    for file in files {
        map.entry(file.name.as_str()).or_default().push(file);
    }
    map
}

fn compare_category(
    category: Category,
    declared: &[File],
    derived: &[File],
    report: &mut VerifyReport,
) {
    let derived_by_name = by_name(derived);
    let declared_by_name = by_name(declared);

    // Same base name may occur more than once (nested directories); pair occurrences in order.
    for (name, declared_files) in &declared_by_name {
        let found = derived_by_name.get(name).map_or(&[][..], Vec::as_slice);
        for (i, want) in declared_files.iter().enumerate() {
            match found.get(i) {
                None => report.push(Violation {
                    kind: ViolationKind::MissingFile,
                    category,
                    name: name.to_string(),
                    expected: want.hashes.clone(),
                    actual: BTreeMap::new(),
                }),
                Some(got) => {
                    let matches = want
                        .hashes
                        .iter()
                        .all(|(algorithm, digest)| got.hashes.get(algorithm) == Some(digest));
                    if !matches {
                        report.push(Violation {
                            kind: ViolationKind::HashMismatch,
                            category,
                            name: name.to_string(),
                            expected: want.hashes.clone(),
                            actual: got.hashes.clone(),
                        });
                    }
                }
            }
        }
    }

    for (name, derived_files) in &derived_by_name {
        let declared_count = declared_by_name.get(name).map_or(0, Vec::len);
        for got in derived_files.iter().skip(declared_count) {
            report.push(Violation {
                kind: ViolationKind::UntrackedFile,
                category,
                name: name.to_string(),
                expected: BTreeMap::new(),
                actual: got.hashes.clone(),
            });
        }
    }
}

/// Verify a packed (uncompressed tar) bundle against the manifest it carries.
pub fn verify_archive<R: Read>(reader: R) -> PackResult<VerifyReport> {
    let outcome = scan_archive(reader)?;
    let manifest = outcome.manifest.ok_or(PackError::MissingManifest)?;
    Ok(compare_inventories(&manifest.files, &outcome.files))
}
