//! Normalization of the metadata `files` field.
//!
//! The archive has served `files` both as an object keyed by file name and as
//! an array of file records. Each shape has its own normalization function;
//! both produce the same [`ListedFile`] sequence.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// A file as listed by the archive, before extension filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedFile {
    /// File name relative to the item, `/`-separated.
    pub name: String,
    /// Declared size in bytes, when present and numeric.
    pub size: Option<u64>,
}

/// The two shapes of the `files` field.
///
/// Entries stay untyped so that one malformed entry drops only itself.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum FileListing {
    Mapping(BTreeMap<String, Value>),
    Listing(Vec<Value>),
}

impl FileListing {
    /// Flattens either shape into listed files.
    pub(crate) fn into_files(self) -> Vec<ListedFile> {
        match self {
            Self::Mapping(map) => normalize_mapping(map),
            Self::Listing(entries) => normalize_listing(entries),
        }
    }
}

/// Mapping shape: keys are names, sometimes with a leading `/`. Values that
/// are not objects still name a file, just without a size.
fn normalize_mapping(map: BTreeMap<String, Value>) -> Vec<ListedFile> {
    map.into_iter()
        .filter_map(|(key, attributes)| {
            let name = key.trim_start_matches('/').to_string();
            (!name.is_empty()).then(|| ListedFile {
                name,
                size: size_of(&attributes),
            })
        })
        .collect()
}

/// Array shape: entries that are not objects or lack a string name are ignored.
fn normalize_listing(entries: Vec<Value>) -> Vec<ListedFile> {
    entries
        .iter()
        .filter_map(|entry| {
            let name = entry.get("name")?.as_str()?.trim_start_matches('/');
            if name.is_empty() {
                debug!("skipping file entry with an empty name");
                return None;
            }
            Some(ListedFile {
                name: name.to_string(),
                size: size_of(entry),
            })
        })
        .collect()
}

/// Sizes arrive as strings (`"12345"`) or plain numbers.
fn size_of(attributes: &Value) -> Option<u64> {
    match attributes.get("size")? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
