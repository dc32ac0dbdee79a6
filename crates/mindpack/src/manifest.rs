//! Bundle manifest schema (`manifest.json` at the bundle root).
//!
//! The manifest records bundle identity and the inventory of packaged files,
//! each with its content hashes. It is encoded as pretty-printed JSON
//! (2-space indentation) so it diffs cleanly under version control.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::digest::SHA256;
use crate::error::{PackError, PackResult};

/// Bundle identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Metadata {
    /// DNS-label style bundle name.
    #[serde(default)]
    pub name: String,

    /// Optional namespace, same pattern as `name`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    /// Semantic version of the bundle.
    #[serde(default)]
    pub version: String,

    /// Set once, when the manifest is written by init. Written as RFC 3339;
    /// `{"seconds": N, "nanos": M}` objects are accepted on decode.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "date::deserialize"
    )]
    pub date: Option<DateTime<Utc>>,
}

impl Metadata {
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            version: version.into(),
            date: None,
        }
    }
}

mod date {
    use chrono::{DateTime, Utc};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum WireDate {
        Rfc3339(DateTime<Utc>),
        Timestamp {
            #[serde(default)]
            seconds: i64,
            #[serde(default)]
            nanos: u32,
        },
    }

    pub(super) fn deserialize<'de, D>(d: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<WireDate>::deserialize(d)? {
            None => Ok(None),
            Some(WireDate::Rfc3339(date)) => Ok(Some(date)),
            Some(WireDate::Timestamp { seconds, nanos }) => {
                DateTime::from_timestamp(seconds, nanos).map(Some).ok_or_else(|| {
                    D::Error::custom(format!("timestamp out of range: {seconds}s {nanos}ns"))
                })
            }
        }
    }
}

/// One packaged artifact.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct File {
    /// Base file name (no directory).
    pub name: String,
    /// Algorithm id -> lowercase hex digest.
    #[serde(default)]
    pub hashes: BTreeMap<String, String>,
}

/// File inventory, in traversal order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Files {
    #[serde(default)]
    pub profiles: Vec<File>,
    #[serde(default)]
    pub rule_types: Vec<File>,
}

impl Files {
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty() && self.rule_types.is_empty()
    }

    pub fn len(&self) -> usize {
        self.profiles.len() + self.rule_types.len()
    }
}

/// Persisted bundle record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Manifest {
    pub metadata: Metadata,
    pub files: Files,
}

impl Manifest {
    /// Decode a manifest from JSON read from `r`.
    pub fn read<R: Read>(r: R) -> PackResult<Self> {
        let manifest: Manifest = serde_json::from_reader(r).map_err(PackError::Decode)?;
        manifest.check_hashes()?;
        Ok(manifest)
    }

    /// Encode the manifest as indented JSON into `w`.
    pub fn write<W: Write>(&self, mut w: W) -> PackResult<()> {
        serde_json::to_writer_pretty(&mut w, self).map_err(PackError::Encode)?;
        w.write_all(b"\n")
            .map_err(|e| PackError::Encode(serde_json::Error::io(e)))?;
        Ok(())
    }

    pub fn from_json_slice(bytes: &[u8]) -> PackResult<Self> {
        Self::read(bytes)
    }

    pub fn to_json_pretty(&self) -> PackResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.write(&mut buf)?;
        Ok(buf)
    }

    /// Every file entry must carry the mandatory sha-256 digest.
    fn check_hashes(&self) -> PackResult<()> {
        let entries = self.files.profiles.iter().chain(&self.files.rule_types);
        for file in entries {
            if !file.hashes.contains_key(SHA256) {
                return Err(PackError::MissingHash {
                    name: file.name.clone(),
                    algorithm: SHA256,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn file(name: &str, digest: &str) -> File {
        File {
            name: name.into(),
            hashes: BTreeMap::from([(SHA256.to_string(), digest.to_string())]),
        }
    }

    fn sample() -> Manifest {
        Manifest {
            metadata: Metadata {
                name: "test".into(),
                namespace: "testspace".into(),
                version: "v1.2.0".into(),
                date: Some(Utc.timestamp_opt(1709866805, 123_456_789).unwrap()),
            },
            files: Files {
                profiles: vec![file(
                    "profile.yaml",
                    "8b438ca800dfa20c6ca66ed83f05ef874cc1e1859d1a0a193b4c0727e5629977",
                )],
                rule_types: vec![file(
                    "rule_type.yaml",
                    "0aecaf4d7ce19dc39679952c6951005e1396a5e615289ff3deb351873957d055",
                )],
            },
        }
    }

    #[test]
    fn write_then_read_is_identity() {
        let m = sample();
        let bytes = m.to_json_pretty().unwrap();
        let back = Manifest::from_json_slice(&bytes).unwrap();
        assert_eq!(m, back);
    }

    #[test]
    fn empty_manifest_round_trips() {
        let m = Manifest::default();
        let back = Manifest::from_json_slice(&m.to_json_pretty().unwrap()).unwrap();
        assert_eq!(m, back);
    }

    #[test]
    fn extra_hash_algorithms_survive() {
        let mut m = sample();
        m.files.profiles[0]
            .hashes
            .insert("sha-512".into(), "ab".repeat(64));
        let back = Manifest::from_json_slice(&m.to_json_pretty().unwrap()).unwrap();
        assert_eq!(back.files.profiles[0].hashes.len(), 2);
        assert_eq!(m, back);
    }

    #[test]
    fn output_is_two_space_indented() {
        let text = String::from_utf8(sample().to_json_pretty().unwrap()).unwrap();
        assert!(text.starts_with("{\n  \"metadata\": {\n    \"name\": \"test\""));
        assert!(text.contains("\"rule_types\": ["));
        assert!(text.contains("\"sha-256\": \"8b438ca8"));
        assert!(text.ends_with("}\n"));
    }

    #[test]
    fn empty_namespace_and_date_are_omitted() {
        let m = Manifest {
            metadata: Metadata::new("bundle", "", "v0.0.1"),
            files: Files::default(),
        };
        let v: serde_json::Value = serde_json::from_slice(&m.to_json_pretty().unwrap()).unwrap();
        assert!(v["metadata"].get("namespace").is_none());
        assert!(v["metadata"].get("date").is_none());
    }

    #[test]
    fn malformed_json_is_decode_error() {
        let err = Manifest::from_json_slice(br#"{"metadata": {"name": "x"}, "files": "#).unwrap_err();
        assert!(matches!(err, PackError::Decode(_)));
    }

    #[test]
    fn wrong_shape_is_decode_error() {
        let err =
            Manifest::from_json_slice(br#"{"metadata": {"name": 7}, "files": {}}"#).unwrap_err();
        assert!(matches!(err, PackError::Decode(_)));
    }

    #[test]
    fn file_without_sha256_is_rejected() {
        let doc = br#"{
          "metadata": {"name": "x", "version": "v1.0.0"},
          "files": {"profiles": [{"name": "p.yaml", "hashes": {"md5": "00"}}]}
        }"#;
        let err = Manifest::from_json_slice(doc).unwrap_err();
        assert!(
            matches!(err, PackError::MissingHash { ref name, .. } if name == "p.yaml"),
            "{err:?}"
        );
    }

    #[test]
    fn seconds_nanos_date_is_accepted() {
        let doc = br#"{
          "metadata": {
            "name": "test",
            "namespace": "testspace",
            "version": "v1.2.0",
            "date": {"seconds": 1709866805}
          },
          "files": {
            "profiles": [{"name": "profile.yaml", "hashes": {"sha-256": "8b438ca800dfa20c6ca66ed83f05ef874cc1e1859d1a0a193b4c0727e5629977"}}],
            "rule_types": [{"name": "rule_type.yaml", "hashes": {"sha-256": "0aecaf4d7ce19dc39679952c6951005e1396a5e615289ff3deb351873957d055"}}]
          }
        }"#;
        let m = Manifest::from_json_slice(doc).unwrap();
        assert_eq!(
            m.metadata.date,
            Some(Utc.timestamp_opt(1709866805, 0).unwrap())
        );
        assert_eq!(m.files, sample().files);

        // Re-encoded as RFC 3339.
        let text = String::from_utf8(m.to_json_pretty().unwrap()).unwrap();
        assert!(text.contains("\"date\": \"2024-03-08T03:00:05Z\""), "{text}");
    }

    #[test]
    fn seconds_nanos_date_keeps_nanos() {
        let doc = br#"{"metadata": {"name": "x", "date": {"seconds": 1709866805, "nanos": 123456789}}, "files": {}}"#;
        let m = Manifest::from_json_slice(doc).unwrap();
        assert_eq!(
            m.metadata.date,
            Some(Utc.timestamp_opt(1709866805, 123_456_789).unwrap())
        );
    }

    #[test]
    fn null_date_is_absent() {
        let doc = br#"{"metadata": {"name": "x", "date": null}, "files": {}}"#;
        assert_eq!(Manifest::from_json_slice(doc).unwrap().metadata.date, None);
    }

    #[test]
    fn malformed_date_is_decode_error() {
        for date in [r#""yesterday""#, r#"{"seconds": "soon"}"#, "7"] {
            let doc = format!(r#"{{"metadata": {{"name": "x", "date": {date}}}, "files": {{}}}}"#);
            let err = Manifest::from_json_slice(doc.as_bytes()).unwrap_err();
            assert!(matches!(err, PackError::Decode(_)), "{date}: {err:?}");
        }
    }

    fn arb_file() -> impl Strategy<Value = File> {
        (
            "[a-z0-9_.-]{1,24}",
            "[0-9a-f]{64}",
            proptest::option::of("[0-9a-f]{128}"),
        )
            .prop_map(|(name, sha256, sha512)| {
                let mut hashes = BTreeMap::from([(SHA256.to_string(), sha256)]);
                if let Some(digest) = sha512 {
                    hashes.insert("sha-512".to_string(), digest);
                }
                File { name, hashes }
            })
    }

    fn arb_manifest() -> impl Strategy<Value = Manifest> {
        (
            "[a-z0-9-]{0,20}",
            "[a-z0-9-]{0,20}",
            "v?[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}",
            proptest::option::of((0_i64..4_102_444_800, 0_u32..1_000_000_000)),
            proptest::collection::vec(arb_file(), 0..5),
            proptest::collection::vec(arb_file(), 0..5),
        )
            .prop_map(|(name, namespace, version, date, profiles, rule_types)| Manifest {
                metadata: Metadata {
                    name,
                    namespace,
                    version,
                    date: date.and_then(|(secs, nanos)| DateTime::from_timestamp(secs, nanos)),
                },
                files: Files {
                    profiles,
                    rule_types,
                },
            })
    }

    proptest! {
        #[test]
        fn generated_manifests_round_trip(m in arb_manifest()) {
            let bytes = m.to_json_pretty().unwrap();
            let back = Manifest::from_json_slice(&bytes).unwrap();
            prop_assert_eq!(m, back);
        }
    }
}
