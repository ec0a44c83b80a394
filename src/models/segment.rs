use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use super::Groups;

/// Identifier of a segment, as written in the annotation file
///
/// Ids are normally strings; numeric ids are kept as numbers so they
/// round-trip unchanged, digit for digit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum SegmentId {
    Text(String),
    Number(Number),
}

impl SegmentId {
    /// Read an id from a raw JSON value; other value types carry no id
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(SegmentId::Text(s.clone())),
            Value::Number(n) => Some(SegmentId::Number(n.clone())),
            _ => None,
        }
    }

    /// Key used for id lookups
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// An empty string id cannot be matched
    pub fn is_blank(&self) -> bool {
        matches!(self, SegmentId::Text(s) if s.is_empty())
    }
}

impl<'de> Deserialize<'de> for SegmentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        SegmentId::from_value(&value)
            .ok_or_else(|| de::Error::custom(format!("expected a string or number id, got {}", value)))
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentId::Text(s) => f.write_str(s),
            SegmentId::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for SegmentId {
    fn from(value: &str) -> Self {
        SegmentId::Text(value.to_string())
    }
}

/// A single annotated segment
///
/// The segment is kept as the raw JSON object so that fields other than
/// `id` and `text` survive untouched, in their original key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Segment(Map<String, Value>);

impl Segment {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Segment id, if present and a string or number
    pub fn id(&self) -> Option<SegmentId> {
        self.0.get("id").and_then(SegmentId::from_value)
    }

    /// Segment text, if present and a string
    pub fn text(&self) -> Option<&str> {
        self.0.get("text").and_then(Value::as_str)
    }

    /// Copy of this segment with `text` replaced; every other field is kept
    pub fn with_text(&self, text: &str) -> Self {
        let mut fields = self.0.clone();
        fields.insert("text".to_string(), Value::String(text.to_string()));
        Self(fields)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for Segment {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Annotator output record: original text alongside the punctuated text
///
/// Decoding is lenient: a field of the wrong type reads as absent, so one bad
/// record never rejects the whole file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PunctuatedSegment {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<SegmentId>,
    /// Original text (null when the source segment had none)
    #[serde(default, deserialize_with = "lenient_text")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub text_with_punctuation: Option<String>,
}

fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<SegmentId>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(SegmentId::from_value))
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Ok(Some(s)),
        _ => Ok(None),
    }
}

impl PunctuatedSegment {
    pub fn from_segment(segment: &Segment, punctuated: String) -> Self {
        Self {
            id: segment.id(),
            text: segment.text().map(str::to_string),
            text_with_punctuation: Some(punctuated),
        }
    }
}

/// Original annotation file: group key -> ordered segments
pub type AnnotationSet = Groups<Segment>;

/// Annotator output file: group key -> ordered punctuated records
pub type PunctuatedSet = Groups<PunctuatedSegment>;
