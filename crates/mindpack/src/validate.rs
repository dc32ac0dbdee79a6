//! Identity checks for bundle metadata.

use lazy_static::lazy_static;
use regex::Regex;

use crate::manifest::Metadata;

lazy_static! {
    /// DNS-label style names: alphanumeric ends, `-`/`_` inside, at most 63 chars.
    pub static ref DNS_STYLE_NAME: Regex =
        Regex::new(r"^[a-zA-Z0-9](?:[-_a-zA-Z0-9]{0,61}[a-zA-Z0-9])?$").expect("valid regex");
}

pub fn is_valid_name(name: &str) -> bool {
    DNS_STYLE_NAME.is_match(name)
}

/// SemVer 2.0, optionally prefixed with `v` (`v0.0.1`, `1.2.3-rc.1+build.5`).
pub fn validate_version(version: &str) -> Result<semver::Version, String> {
    let bare = version.strip_prefix('v').unwrap_or(version);
    semver::Version::parse(bare)
        .map_err(|err| format!("{version:?} is not a valid semantic version: {err}"))
}

/// Append one message per metadata problem to `errs`.
pub(crate) fn check_metadata(metadata: &Metadata, errs: &mut Vec<String>) {
    if metadata.name.is_empty() {
        errs.push("name is required to initialize a mindpack".to_string());
    } else if !is_valid_name(&metadata.name) {
        errs.push(format!("{:?} is not a valid mindpack name", metadata.name));
    }

    if !metadata.namespace.is_empty() && !is_valid_name(&metadata.namespace) {
        errs.push(format!("{:?} is not a valid namespace", metadata.namespace));
    }

    if !metadata.version.is_empty() {
        if let Err(msg) = validate_version(&metadata.version) {
            errs.push(msg);
        }
    }
}
