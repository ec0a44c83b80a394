use tracing::{debug, error, info, warn};

use crate::error::AttemptError;
use crate::llm::{
    build_batch_payload, format_batch_for_log, parse_batch_response, CompletionClient, RetryPolicy,
    SYSTEM_PROMPT,
};

/// Configuration for batch punctuation
#[derive(Debug, Clone)]
pub struct PunctuateConfig {
    /// Texts sent to the service per request
    pub batch_size: usize,
    /// Attempts and pause per batch
    pub retry: RetryPolicy,
    /// Mark appended to every text of a batch that exhausted its attempts
    pub fallback_mark: String,
}

impl Default for PunctuateConfig {
    fn default() -> Self {
        Self {
            batch_size: 25,
            retry: RetryPolicy::default(),
            fallback_mark: "。".to_string(),
        }
    }
}

/// Result of punctuating a sequence of texts
#[derive(Debug, Clone, Default)]
pub struct PunctuateResult {
    /// Punctuated texts, same length and order as the input
    pub texts: Vec<String>,
    /// Number of batches the input was split into
    pub batches: usize,
    /// 1-based numbers of batches that fell back to default punctuation
    pub fallback_batches: Vec<usize>,
    /// Input positions that received fallback punctuation
    pub fallback_indices: Vec<usize>,
    /// Total completion requests made
    pub attempts: usize,
}

impl PunctuateResult {
    pub fn fallback_count(&self) -> usize {
        self.fallback_indices.len()
    }
}

/// Deterministic punctuation used when the service cannot be relied on
pub fn fallback_punctuation(text: &str, mark: &str) -> String {
    format!("{}{}", text, mark)
}

/// Punctuate `texts` through the completion service
///
/// The input is split into contiguous batches of at most `batch_size` texts.
/// Each batch is sent on its own and retried per the retry policy; a batch
/// that never yields a valid response is punctuated with the fallback mark.
/// The output always has the same length and order as the input.
pub async fn punctuate_texts<C: CompletionClient + ?Sized>(
    client: &C,
    texts: &[String],
    config: &PunctuateConfig,
) -> PunctuateResult {
    let batch_size = config.batch_size.max(1);
    let total_batches = texts.len().div_ceil(batch_size);
    let total_chars: usize = texts.iter().map(|t| t.chars().count()).sum();

    info!(
        "Processing {} texts with total {} characters ({} batches via {})",
        texts.len(),
        total_chars,
        total_batches,
        client.name()
    );

    let mut result = PunctuateResult {
        texts: Vec::with_capacity(texts.len()),
        batches: total_batches,
        ..Default::default()
    };

    for (batch_index, batch) in texts.chunks(batch_size).enumerate() {
        let batch_number = batch_index + 1;
        let (punctuated, attempts) =
            punctuate_batch(client, batch, batch_number, total_batches, config).await;
        result.attempts += attempts;

        match punctuated {
            Some(punctuated) => result.texts.extend(punctuated),
            None => {
                warn!(
                    "Failed after {} attempts for batch {}. Using fallback punctuation.",
                    attempts, batch_number
                );
                warn!("Failed texts:");
                let offset = batch_index * batch_size;
                for (i, text) in batch.iter().enumerate() {
                    warn!("  {}. {}", i + 1, text);
                    result.fallback_indices.push(offset + i);
                    result
                        .texts
                        .push(fallback_punctuation(text, &config.fallback_mark));
                }
                result.fallback_batches.push(batch_number);
            }
        }
    }

    if !result.fallback_batches.is_empty() {
        warn!(
            "{} of {} batches used fallback punctuation: {:?}",
            result.fallback_batches.len(),
            total_batches,
            result.fallback_batches
        );
    }

    result
}

/// Run one batch through the retry loop
///
/// Returns the punctuated batch (None when every attempt failed) and the
/// number of attempts made.
async fn punctuate_batch<C: CompletionClient + ?Sized>(
    client: &C,
    batch: &[String],
    batch_number: usize,
    total_batches: usize,
    config: &PunctuateConfig,
) -> (Option<Vec<String>>, usize) {
    let payload = build_batch_payload(batch);
    let mut attempts = 0;

    for attempt in config.retry.attempts() {
        attempts += 1;
        info!(
            "Processing batch {} of {}, attempt {} of {}",
            batch_number, total_batches, attempt, config.retry.max_attempts
        );
        debug!("Input texts: {}", payload);

        match request_batch(client, &payload, batch.len()).await {
            Ok(punctuated) => {
                info!(
                    "Successfully processed batch {} of {}",
                    batch_number, total_batches
                );
                return (Some(punctuated), attempts);
            }
            Err((err, response)) => {
                error!("Error on attempt {}: {}", attempt, err);
                error!("Batch content: {}", format_batch_for_log(batch));
                if let Some(content) = response {
                    error!("Last response content: {}", content);
                }
            }
        }

        if !config.retry.is_last(attempt) {
            config.retry.pause().await;
        }
    }

    (None, attempts)
}

/// A single request; on a rejected response the raw completion comes back
/// with the error
async fn request_batch<C: CompletionClient + ?Sized>(
    client: &C,
    payload: &str,
    expected_len: usize,
) -> Result<Vec<String>, (AttemptError, Option<String>)> {
    let content = client
        .complete(SYSTEM_PROMPT, payload)
        .await
        .map_err(|e| (AttemptError::transport(&e), None))?;
    debug!("Raw response: {}", content);

    parse_batch_response(&content, expected_len).map_err(|e| (e, Some(content)))
}
