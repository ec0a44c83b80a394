use serde_json::Value;

use crate::error::AttemptError;

/// Locate the JSON array in a completion
///
/// Models often wrap the array in prose or code fences, so the array is taken
/// to span from the first `[` to the last `]` of the text.
pub fn extract_json_array(content: &str) -> Result<&str, AttemptError> {
    let start = content.find('[').ok_or(AttemptError::MissingArray)?;
    let end = content.rfind(']').ok_or(AttemptError::MissingArray)?;
    if end < start {
        return Err(AttemptError::MissingArray);
    }
    Ok(&content[start..=end])
}

/// Decode and validate a completion for a batch of `expected_len` texts
///
/// Succeeds only when the extracted array holds exactly `expected_len`
/// strings, returned in response order.
pub fn parse_batch_response(content: &str, expected_len: usize) -> Result<Vec<String>, AttemptError> {
    let array = extract_json_array(content)?;
    let values: Vec<Value> = serde_json::from_str(array)?;

    if values.len() != expected_len {
        return Err(AttemptError::LengthMismatch {
            expected: expected_len,
            actual: values.len(),
        });
    }

    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| match value {
            Value::String(s) => Ok(s),
            _ => Err(AttemptError::NonStringElement { index }),
        })
        .collect()
}
