use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use crate::models::{AnnotationSet, PunctuatedSet};

/// Read and decode a UTF-8 JSON file
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse JSON in {:?}", path))
}

/// Parse an annotation file: group key -> array of segment objects
pub fn read_annotation_file(path: &Path) -> Result<AnnotationSet> {
    read_json_file(path)
}

/// Parse an annotator output file: group key -> array of punctuated records
pub fn read_punctuated_file(path: &Path) -> Result<PunctuatedSet> {
    read_json_file(path)
}
