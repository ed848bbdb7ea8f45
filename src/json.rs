//! JSON export and import of document metadata.
//!
//! The JSON form carries the complete entity tree including entity ids, but
//! no sample data. It is meant for inspection, diffing, and for rebuilding a
//! document skeleton to save with new data.

use crate::model::FamosHeader;
use crate::{Error, Result};
use std::path::Path;

impl FamosHeader {
    /// Serialize the metadata as pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::Json(format!("JSON serialization failed: {e}")))
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::Json(format!("JSON deserialization failed: {e}")))
    }

    /// Write the metadata to a JSON file.
    pub fn save_metadata_json(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }

    /// Load metadata written by [`save_metadata_json`](Self::save_metadata_json).
    pub fn load_metadata_json(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}
