// src/record/schema.rs

//! Install record schema versions
//!
//! Every version keeps its own entry shape:
//! - v1: `{targetDir?}`
//! - v2: `{targetDir, paths, srcPaths}`
//! - v3: `{targetDir, paths, srcPaths, sha256sums}` (legacy directory order)
//! - v4: `{targetDir, paths, srcPaths, checksums}`, sorted directory order
//!
//! Records are never converted field by field between versions. Moving to the
//! current version means uninstalling with the old record and reinstalling.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current schema version
pub const CURRENT_VERSION: u32 = 4;

/// A v1 entry: only the target directory is known
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryV1 {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_dir: Option<String>,
}

/// A v2 entry: placements without checksums
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryV2 {
    pub target_dir: String,
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub src_paths: Vec<String>,
}

/// A v3/v4 entry: placements with one checksum per copied path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryV3 {
    pub target_dir: String,
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub src_paths: Vec<String>,
    #[serde(default, alias = "sha256sums")]
    pub checksums: Vec<Option<String>>,
}

/// v3 files name their checksum list `sha256sums`
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EntryV3Out<'a> {
    target_dir: &'a str,
    paths: &'a [String],
    src_paths: &'a [String],
    sha256sums: &'a [Option<String>],
}

impl<'a> From<&'a EntryV3> for EntryV3Out<'a> {
    fn from(entry: &'a EntryV3) -> Self {
        Self {
            target_dir: &entry.target_dir,
            paths: &entry.paths,
            src_paths: &entry.src_paths,
            sha256sums: &entry.checksums,
        }
    }
}

/// On-disk layout shared by all versions
#[derive(Debug, Serialize, Deserialize)]
struct RecordFile<E> {
    version: u32,
    #[serde(default = "BTreeMap::new")]
    installs: BTreeMap<String, E>,
}

/// What an install produced, independent of the record version it lands in
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstalledEntry {
    pub target_dir: String,
    pub src_paths: Vec<String>,
    pub paths: Vec<String>,
    /// Empty for link packages
    pub checksums: Vec<Option<String>>,
}

/// Read-only view of an entry of any version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryView<'a> {
    pub target_dir: Option<&'a str>,
    /// Source and target paths, absent before v2
    pub placements: Option<(&'a [String], &'a [String])>,
    /// Absent before v3
    pub checksums: Option<&'a [Option<String>]>,
}

/// An install record at one of the supported schema versions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallRecord {
    V1(BTreeMap<String, EntryV1>),
    V2(BTreeMap<String, EntryV2>),
    V3(BTreeMap<String, EntryV3>),
    V4(BTreeMap<String, EntryV3>),
}

impl Default for InstallRecord {
    fn default() -> Self {
        InstallRecord::V4(BTreeMap::new())
    }
}

/// Why raw record data could not be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    UnsupportedVersion(u64),
    Malformed(String),
}

impl InstallRecord {
    /// Parse a record, dispatching on its `version` field
    pub fn parse(raw: &str) -> std::result::Result<Self, ParseFailure> {
        let value: serde_json::Value =
            serde_json::from_str(raw).map_err(|e| ParseFailure::Malformed(e.to_string()))?;

        let version = value
            .get("version")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0);

        match version {
            1 => Ok(InstallRecord::V1(installs(value)?)),
            2 => Ok(InstallRecord::V2(installs(value)?)),
            3 => Ok(InstallRecord::V3(installs(value)?)),
            4 => Ok(InstallRecord::V4(installs(value)?)),
            other => Err(ParseFailure::UnsupportedVersion(other)),
        }
    }

    /// Serialize in this record's own shape
    pub fn to_json(&self) -> serde_json::Result<String> {
        let version = self.version();
        match self {
            InstallRecord::V1(installs) => to_json(version, installs),
            InstallRecord::V2(installs) => to_json(version, installs),
            InstallRecord::V3(installs) => {
                let legacy: BTreeMap<&str, EntryV3Out<'_>> = installs
                    .iter()
                    .map(|(key, entry)| (key.as_str(), EntryV3Out::from(entry)))
                    .collect();
                to_json(version, &legacy)
            }
            InstallRecord::V4(installs) => to_json(version, installs),
        }
    }

    pub fn version(&self) -> u32 {
        match self {
            InstallRecord::V1(_) => 1,
            InstallRecord::V2(_) => 2,
            InstallRecord::V3(_) => 3,
            InstallRecord::V4(_) => 4,
        }
    }

    pub fn is_current(&self) -> bool {
        self.version() == CURRENT_VERSION
    }

    /// Package keys in record order
    pub fn keys(&self) -> Vec<String> {
        match self {
            InstallRecord::V1(installs) => installs.keys().cloned().collect(),
            InstallRecord::V2(installs) => installs.keys().cloned().collect(),
            InstallRecord::V3(installs) | InstallRecord::V4(installs) => {
                installs.keys().cloned().collect()
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entry(key).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }

    pub fn entry(&self, key: &str) -> Option<EntryView<'_>> {
        match self {
            InstallRecord::V1(installs) => installs.get(key).map(|e| EntryView {
                target_dir: e.target_dir.as_deref(),
                placements: None,
                checksums: None,
            }),
            InstallRecord::V2(installs) => installs.get(key).map(|e| EntryView {
                target_dir: Some(e.target_dir.as_str()),
                placements: Some((e.src_paths.as_slice(), e.paths.as_slice())),
                checksums: None,
            }),
            InstallRecord::V3(installs) | InstallRecord::V4(installs) => {
                installs.get(key).map(|e| EntryView {
                    target_dir: Some(e.target_dir.as_str()),
                    placements: Some((e.src_paths.as_slice(), e.paths.as_slice())),
                    checksums: Some(e.checksums.as_slice()),
                })
            }
        }
    }

    /// Store an install result using the fields this version has
    pub fn insert(&mut self, key: String, entry: InstalledEntry) {
        match self {
            InstallRecord::V1(installs) => {
                installs.insert(
                    key,
                    EntryV1 {
                        target_dir: Some(entry.target_dir),
                    },
                );
            }
            InstallRecord::V2(installs) => {
                installs.insert(
                    key,
                    EntryV2 {
                        target_dir: entry.target_dir,
                        paths: entry.paths,
                        src_paths: entry.src_paths,
                    },
                );
            }
            InstallRecord::V3(installs) | InstallRecord::V4(installs) => {
                installs.insert(
                    key,
                    EntryV3 {
                        target_dir: entry.target_dir,
                        paths: entry.paths,
                        src_paths: entry.src_paths,
                        checksums: entry.checksums,
                    },
                );
            }
        }
    }

    /// Move the entry stored under `from` to `to`
    pub fn rekey(&mut self, from: &str, to: String) {
        fn move_entry<E>(installs: &mut BTreeMap<String, E>, from: &str, to: String) {
            if let Some(entry) = installs.remove(from) {
                installs.insert(to, entry);
            }
        }

        match self {
            InstallRecord::V1(installs) => move_entry(installs, from, to),
            InstallRecord::V2(installs) => move_entry(installs, from, to),
            InstallRecord::V3(installs) | InstallRecord::V4(installs) => {
                move_entry(installs, from, to)
            }
        }
    }

    /// Drop an entry, returning whether it existed
    pub fn remove(&mut self, key: &str) -> bool {
        match self {
            InstallRecord::V1(installs) => installs.remove(key).is_some(),
            InstallRecord::V2(installs) => installs.remove(key).is_some(),
            InstallRecord::V3(installs) | InstallRecord::V4(installs) => {
                installs.remove(key).is_some()
            }
        }
    }
}

fn installs<E: DeserializeOwned>(
    value: serde_json::Value,
) -> std::result::Result<BTreeMap<String, E>, ParseFailure> {
    let file: RecordFile<E> =
        serde_json::from_value(value).map_err(|e| ParseFailure::Malformed(e.to_string()))?;
    Ok(file.installs)
}

fn to_json<K: Serialize, E: Serialize>(
    version: u32,
    installs: &BTreeMap<K, E>,
) -> serde_json::Result<String> {
    #[derive(Serialize)]
    struct Borrowed<'a, K, E> {
        version: u32,
        installs: &'a BTreeMap<K, E>,
    }

    serde_json::to_string_pretty(&Borrowed { version, installs })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_each_version_into_its_own_shape() {
        let v1 = InstallRecord::parse(r#"{"version": 1, "installs": {"/p": {"targetDir": "/h"}}}"#)
            .unwrap();
        assert_eq!(v1.version(), 1);
        let view = v1.entry("/p").unwrap();
        assert_eq!(view.target_dir, Some("/h"));
        assert!(view.placements.is_none());

        let v2 = InstallRecord::parse(
            r#"{"version": 2, "installs": {"/p": {"targetDir": "/h", "paths": ["/h/a"], "srcPaths": ["/p/a"]}}}"#,
        )
        .unwrap();
        assert_eq!(v2.version(), 2);
        let view = v2.entry("/p").unwrap();
        assert!(view.checksums.is_none());
        assert_eq!(view.placements.unwrap().1, ["/h/a".to_string()]);

        let v3 = InstallRecord::parse(
            r#"{"version": 3, "installs": {"/p": {"targetDir": "/h", "paths": ["/h/a"], "srcPaths": ["/p/a"], "sha256sums": ["abc"]}}}"#,
        )
        .unwrap();
        assert_eq!(v3.version(), 3);
        assert_eq!(
            v3.entry("/p").unwrap().checksums.unwrap(),
            [Some("abc".to_string())]
        );

        let v4 = InstallRecord::parse(r#"{"version": 4, "installs": {}}"#).unwrap();
        assert_eq!(v4, InstallRecord::default());
    }

    #[test]
    fn test_parse_rejects_unknown_versions() {
        assert_eq!(
            InstallRecord::parse(r#"{"version": 5, "installs": {}}"#),
            Err(ParseFailure::UnsupportedVersion(5))
        );
        assert_eq!(
            InstallRecord::parse(r#"{"installs": {}}"#),
            Err(ParseFailure::UnsupportedVersion(0))
        );
    }

    #[test]
    fn test_parse_rejects_wrong_shape() {
        let result = InstallRecord::parse(r#"{"version": 2, "installs": {"/p": {"paths": []}}}"#);
        assert!(matches!(result, Err(ParseFailure::Malformed(_))));

        let result = InstallRecord::parse("not json");
        assert!(matches!(result, Err(ParseFailure::Malformed(_))));
    }

    #[test]
    fn test_insert_keeps_version_shape() {
        let entry = InstalledEntry {
            target_dir: "/h".to_string(),
            src_paths: vec!["/p/a".to_string()],
            paths: vec!["/h/a".to_string()],
            checksums: vec![Some("abc".to_string())],
        };

        let mut v2 = InstallRecord::V2(BTreeMap::new());
        v2.insert("/p".to_string(), entry.clone());
        let json = v2.to_json().unwrap();
        assert!(!json.contains("checksums"));
        assert!(json.contains(r#""version": 2"#));

        let mut v4 = InstallRecord::default();
        v4.insert("p".to_string(), entry);
        v4.rekey("p", "/p".to_string());
        assert_eq!(v4.keys(), vec!["/p".to_string()]);
        let reparsed = InstallRecord::parse(&v4.to_json().unwrap()).unwrap();
        assert_eq!(reparsed, v4);

        assert!(v4.remove("/p"));
        assert!(!v4.remove("/p"));
        assert!(v4.is_empty());
    }

    #[test]
    fn test_v3_writes_sha256sums_key() {
        let raw = r#"{"version": 3, "installs": {"/p": {"targetDir": "/h", "paths": ["/h/a"], "srcPaths": ["/p/a"], "sha256sums": ["abc"]}}}"#;
        let v3 = InstallRecord::parse(raw).unwrap();

        let json = v3.to_json().unwrap();
        assert!(json.contains(r#""sha256sums""#));
        assert!(!json.contains(r#""checksums""#));
        assert_eq!(InstallRecord::parse(&json).unwrap(), v3);

        let mut v4 = InstallRecord::default();
        v4.insert(
            "/p".to_string(),
            InstalledEntry {
                target_dir: "/h".to_string(),
                src_paths: vec!["/p/a".to_string()],
                paths: vec!["/h/a".to_string()],
                checksums: vec![Some("abc".to_string())],
            },
        );
        let json = v4.to_json().unwrap();
        assert!(json.contains(r#""checksums""#));
        assert!(!json.contains(r#""sha256sums""#));
    }
}
