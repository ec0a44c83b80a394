use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::io::{read_annotation_file, read_punctuated_file, write_json_pretty};
use crate::models::{AnnotationSet, PunctuatedSet, SegmentId};

/// Counters for a merge run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub groups: usize,
    pub segments: usize,
    /// Segments whose text was replaced
    pub replaced: usize,
    /// Segments passed through unchanged
    pub unmatched: usize,
}

/// Result of merging punctuated text into an annotation set
#[derive(Debug, Clone)]
pub struct MergeResult {
    pub set: AnnotationSet,
    pub replaced: usize,
    /// Ids of segments left unchanged (None when the segment had no id)
    pub unmatched: Vec<Option<SegmentId>>,
}

/// Map every id of the punctuated set to its punctuated text
///
/// A later entry with the same id overwrites an earlier one. Entries without
/// an id, with an empty id or without punctuated text are skipped.
pub fn build_punctuation_map(set: &PunctuatedSet) -> HashMap<String, String> {
    let mut map = HashMap::new();

    for (_, records) in set.iter() {
        for record in records {
            let (Some(id), Some(text)) = (&record.id, &record.text_with_punctuation) else {
                continue;
            };
            if id.is_blank() {
                continue;
            }
            if let Some(previous) = map.insert(id.key(), text.clone()) {
                debug!("Duplicate id {}: replacing {:?} with {:?}", id, previous, text);
            }
        }
    }

    map
}

/// Substitute punctuated text into the original set
///
/// Groups, segment order and every field other than `text` are kept as they
/// are. Segments whose id is missing from the map pass through unchanged.
pub fn merge_punctuation(original: &AnnotationSet, map: &HashMap<String, String>) -> MergeResult {
    let mut set = AnnotationSet::new();
    let mut replaced = 0;
    let mut unmatched = Vec::new();

    for (key, segments) in original.iter() {
        let merged = segments
            .iter()
            .map(|segment| {
                let id = segment.id();
                let punctuated = id
                    .as_ref()
                    .filter(|id| !id.is_blank())
                    .and_then(|id| map.get(&id.key()));

                match punctuated {
                    Some(text) => {
                        replaced += 1;
                        segment.with_text(text)
                    }
                    None => {
                        match &id {
                            Some(id) => warn!("No punctuated text found for id: {}", id),
                            None => warn!("No punctuated text found for segment without id in group {}", key),
                        }
                        unmatched.push(id);
                        segment.clone()
                    }
                }
            })
            .collect();
        set.insert(key, merged);
    }

    MergeResult {
        set,
        replaced,
        unmatched,
    }
}

/// Merge the punctuated file into the original file and write the result
pub fn execute_merge(original: &Path, punctuated: &Path, output: &Path) -> Result<MergeSummary> {
    info!("{}", "==".repeat(20));
    info!("Starting merge process");
    info!("Original file: {:?}", original);
    info!("Punctuated file: {:?}", punctuated);
    info!("Output file: {:?}", output);

    let original_set = read_annotation_file(original)?;
    let punctuated_set = read_punctuated_file(punctuated)?;

    let map = build_punctuation_map(&punctuated_set);
    info!(
        "Loaded {} punctuated ids from {} groups",
        map.len(),
        punctuated_set.len()
    );

    let result = merge_punctuation(&original_set, &map);
    write_json_pretty(output, &result.set)?;

    info!("Successfully merged data and saved to {:?}", output);
    Ok(MergeSummary {
        groups: original_set.len(),
        segments: original_set.item_count(),
        replaced: result.replaced,
        unmatched: result.unmatched.len(),
    })
}
