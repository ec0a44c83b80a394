use std::path::Path;

use anyhow::Result;
use tracing::{info, warn};

use super::{punctuate_texts, PunctuateConfig};
use crate::io::{read_annotation_file, write_json_pretty};
use crate::llm::CompletionClient;
use crate::models::{AnnotationSet, PunctuatedSegment, PunctuatedSet, Segment};

/// Counters for an annotation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotateSummary {
    pub groups: usize,
    pub segments: usize,
    pub batches: usize,
    /// Segments that received fallback punctuation
    pub fallback_segments: usize,
    /// Completion requests made
    pub service_calls: usize,
}

/// Result of annotating an in-memory set
#[derive(Debug, Clone)]
pub struct AnnotateResult {
    pub output: PunctuatedSet,
    pub summary: AnnotateSummary,
}

/// Punctuate every group of an annotation set
///
/// Groups are processed in document order. Within a group the segment texts
/// go to the orchestrator in order and the results are zipped back onto the
/// segments by position. A segment without a string `text` is sent as an
/// empty string and keeps `text: null` in the output.
pub async fn annotate_set<C: CompletionClient + ?Sized>(
    client: &C,
    set: &AnnotationSet,
    config: &PunctuateConfig,
) -> AnnotateResult {
    let mut output = PunctuatedSet::new();
    let mut summary = AnnotateSummary {
        groups: set.len(),
        ..Default::default()
    };

    for (key, segments) in set.iter() {
        summary.segments += segments.len();
        if segments.is_empty() {
            info!("Group {}: no segments", key);
            output.insert(key, Vec::new());
            continue;
        }

        info!("Group {}: {} segments", key, segments.len());
        let texts = collect_texts(key, segments);
        let punctuated = punctuate_texts(client, &texts, config).await;

        summary.batches += punctuated.batches;
        summary.service_calls += punctuated.attempts;
        summary.fallback_segments += punctuated.fallback_count();

        for &index in &punctuated.fallback_indices {
            warn!(
                "Group {}: fallback punctuation for id {}",
                key,
                describe_id(&segments[index])
            );
        }

        let records = segments
            .iter()
            .zip(punctuated.texts)
            .map(|(segment, text)| PunctuatedSegment::from_segment(segment, text))
            .collect();
        output.insert(key, records);
    }

    AnnotateResult { output, summary }
}

/// Read `input`, punctuate it and write the id-keyed result to `output`
///
/// File-level failures abort the run; per-batch failures never do.
pub async fn execute_annotate<C: CompletionClient + ?Sized>(
    client: &C,
    input: &Path,
    output: &Path,
    config: &PunctuateConfig,
) -> Result<AnnotateSummary> {
    info!("{}", "==".repeat(20));
    info!("Starting extraction from {:?} to {:?}", input, output);

    let set = read_annotation_file(input)?;
    info!(
        "Loaded {} groups with {} segments",
        set.len(),
        set.item_count()
    );

    let result = annotate_set(client, &set, config).await;
    write_json_pretty(output, &result.output)?;

    info!("Data successfully extracted and saved to {:?}", output);
    Ok(result.summary)
}

fn collect_texts(key: &str, segments: &[Segment]) -> Vec<String> {
    segments
        .iter()
        .map(|segment| match segment.text() {
            Some(text) => text.to_string(),
            None => {
                warn!(
                    "Group {}: segment {} has no text, sending an empty string",
                    key,
                    describe_id(segment)
                );
                String::new()
            }
        })
        .collect()
}

fn describe_id(segment: &Segment) -> String {
    segment
        .id()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "<missing>".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::stub::{EchoClient, ScriptedClient};
    use crate::llm::RetryPolicy;

    fn fast_config() -> PunctuateConfig {
        PunctuateConfig {
            retry: RetryPolicy::immediate(2),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_annotate_end_to_end_scenario() {
        let set: AnnotationSet = serde_json::from_str(
            r#"{"g1": [{"id":"1","text":"你好"}, {"id":"2","text":"再见"}]}"#,
        )
        .unwrap();
        let client = ScriptedClient::new(vec![Ok(r#"["你好。","再见。"]"#)]);

        let result = annotate_set(&client, &set, &fast_config()).await;

        let json = serde_json::to_string(&result.output).unwrap();
        assert_eq!(
            json,
            r#"{"g1":[{"id":"1","text":"你好","text_with_punctuation":"你好。"},{"id":"2","text":"再见","text_with_punctuation":"再见。"}]}"#
        );
        assert_eq!(result.summary.segments, 2);
        assert_eq!(result.summary.service_calls, 1);
        assert_eq!(client.requests(), vec![r#"["你好","再见"]"#]);
    }

    #[tokio::test]
    async fn test_groups_keep_order_and_empty_groups() {
        let set: AnnotationSet = serde_json::from_str(
            r#"{"b": [{"id":"1","text":"一"}], "a": [], "c": [{"id":"2","text":"二"}]}"#,
        )
        .unwrap();

        let result = annotate_set(&EchoClient, &set, &fast_config()).await;

        let keys: Vec<&str> = result.output.keys().collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
        assert_eq!(result.output.get("a").unwrap().len(), 0);
        assert_eq!(
            result.output.get("c").unwrap()[0].text_with_punctuation.as_deref(),
            Some("二。")
        );
        assert_eq!(result.summary.groups, 3);
        assert_eq!(result.summary.batches, 2);
    }

    #[tokio::test]
    async fn test_missing_text_and_id_do_not_crash() {
        let set: AnnotationSet =
            serde_json::from_str(r#"{"g": [{"text":"好"}, {"id":"x"}]}"#).unwrap();

        let result = annotate_set(&EchoClient, &set, &fast_config()).await;
        let records = result.output.get("g").unwrap();

        assert_eq!(records.len(), 2);
        assert!(records[0].id.is_none());
        assert_eq!(records[0].text_with_punctuation.as_deref(), Some("好。"));
        assert!(records[1].text.is_none());
        assert_eq!(records[1].text_with_punctuation.as_deref(), Some("。"));
    }

    #[tokio::test]
    async fn test_fallback_counted_in_summary() {
        let set: AnnotationSet =
            serde_json::from_str(r#"{"g": [{"id":"1","text":"你好"}]}"#).unwrap();

        let result = annotate_set(&ScriptedClient::failing(), &set, &fast_config()).await;

        assert_eq!(result.summary.fallback_segments, 1);
        assert_eq!(result.summary.service_calls, 2);
        assert_eq!(
            result.output.get("g").unwrap()[0].text_with_punctuation.as_deref(),
            Some("你好。")
        );
    }
}
