pub mod cli;
pub mod error;
pub mod io;
pub mod llm;
pub mod logging;
pub mod models;
pub mod stages;

pub use error::AttemptError;
pub use io::{read_annotation_file, read_punctuated_file, write_json_pretty};
pub use llm::{CompletionClient, LlmConfig, Provider, RetryPolicy};
pub use logging::setup_logging;
pub use models::{AnnotationSet, Groups, PunctuatedSegment, PunctuatedSet, Segment, SegmentId};
pub use stages::{
    annotate_set, build_punctuation_map, execute_annotate, execute_merge, merge_punctuation,
    punctuate_texts, AnnotateSummary, MergeSummary, PunctuateConfig, PunctuateResult,
};
