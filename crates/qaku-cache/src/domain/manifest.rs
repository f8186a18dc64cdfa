//! Dataset manifest as reported by the storage node
//!
//! The manifest endpoint answers with
//! `{"cid": "...", "manifest": {"datasetSize": 2000000, "blockSize": 65536, ...}}`.
//! Only `datasetSize` is required; the rest default when absent.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ResolutionError;

/// Size and structural metadata of a stored dataset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetManifest {
    /// Total dataset size in bytes.
    #[serde(rename = "datasetSize")]
    pub dataset_size_bytes: u64,
    #[serde(rename = "blockSize", default)]
    pub block_size_bytes: u64,
    #[serde(rename = "protected", default)]
    pub is_protected: bool,
    #[serde(rename = "treeCid", default)]
    pub tree_cid: String,
    #[serde(rename = "uploadedAt", default, deserialize_with = "string_or_number")]
    pub uploaded_at: String,
}

impl DatasetManifest {
    /// Convenience constructor for a manifest that only knows its size.
    pub fn with_size(dataset_size_bytes: u64) -> Self {
        Self {
            dataset_size_bytes,
            ..Self::default()
        }
    }

    /// Dataset size in kilobytes, the unit of the size histogram.
    pub fn size_kib(&self) -> f64 {
        self.dataset_size_bytes as f64 / 1024.0
    }
}

/// Response body of the manifest endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataContent {
    #[serde(default)]
    pub cid: Option<String>,
    pub manifest: DatasetManifest,
}

impl DataContent {
    /// Parse a manifest endpoint response body.
    pub fn from_json(body: &[u8]) -> Result<Self, ResolutionError> {
        serde_json::from_slice(body).map_err(|e| ResolutionError::Malformed(e.to_string()))
    }
}

/// Some storage node versions report `uploadedAt` as a unix timestamp.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
        Null,
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(n) => n.to_string(),
        Raw::Null => String::new(),
    })
}
