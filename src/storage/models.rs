use serde::{Deserialize, Serialize};

/// Metadata for one uploaded blob. Immutable once created.
///
/// Field names on the wire (and in the persisted msgpack) are
/// `UUID`, `FileName`, `Directory`, `TagTime`, `UploadTime`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    #[serde(rename = "UUID")]
    pub id: String,
    #[serde(rename = "FileName")]
    pub filename: String,
    /// Relative to the blob root, always ends with `/`
    #[serde(rename = "Directory")]
    pub directory: String,
    /// Epoch milliseconds
    #[serde(rename = "TagTime")]
    pub tag_time: String,
    /// `YYYY-MM-DD HH:MM:SS`
    #[serde(rename = "UploadTime")]
    pub upload_time: String,
}

impl ItemRecord {
    /// Relative path of the blob this record describes.
    pub fn blob_path(&self) -> String {
        format!("{}{}", self.directory, self.filename)
    }
}

/// One pagination entry in the key index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMapEntry {
    #[serde(rename = "UUID")]
    pub id: String,
    #[serde(rename = "TagTime")]
    pub tag_time: String,
    /// Index length at the time the entry was appended
    #[serde(rename = "Index")]
    pub position: usize,
}
