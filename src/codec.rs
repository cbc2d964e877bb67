//! Field value codec: wire payloads and the persisted form of upload fields.
//!
//! Upload fields are stored as a versioned JSON envelope in a text column:
//!
//! ```json
//! {"v":1,"single":{"path":"gallery/2024-05/","file":"f3c1.jpg","variants":{...}}}
//! {"v":1,"items":[{"path":"...","file":"..."}, ...]}
//! ```
//!
//! Scalars pass through unchanged. An empty or absent stored value decodes to no uploads.

use crate::error::AppError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

pub const ENVELOPE_VERSION: u32 = 1;

/// Metadata for one stored upload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    /// Directory relative to the uploads root, with trailing '/'.
    pub path: String,
    pub file: String,
    /// Variant name -> storage key of that rendition.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variants: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl UploadResult {
    pub fn new(path: impl Into<String>, file: impl Into<String>) -> Self {
        UploadResult {
            path: path.into(),
            file: file.into(),
            variants: BTreeMap::new(),
            content_type: None,
        }
    }

    /// Public URL of one variant: `{base_url}uploads/{path}{variant}/{file}`.
    pub fn url(&self, base_url: &str, variant: &str) -> String {
        format!("{}uploads/{}{}/{}", base_url, self.path, variant, self.file)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoredUploads {
    Single(UploadResult),
    Items(Vec<UploadResult>),
}

impl StoredUploads {
    pub fn into_vec(self) -> Vec<UploadResult> {
        match self {
            StoredUploads::Single(u) => vec![u],
            StoredUploads::Items(v) => v,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    v: u32,
    #[serde(flatten)]
    body: StoredUploads,
}

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("unsupported upload envelope version {0}")]
    Version(u32),
    #[error("malformed upload value: {0}")]
    Malformed(String),
}

impl From<CodecError> for AppError {
    fn from(e: CodecError) -> Self {
        AppError::Internal(e.to_string())
    }
}

/// Serialize uploads into the stored column value.
pub fn encode(uploads: &StoredUploads) -> Result<Value, CodecError> {
    let envelope = Envelope {
        v: ENVELOPE_VERSION,
        body: uploads.clone(),
    };
    serde_json::to_string(&envelope)
        .map(Value::String)
        .map_err(|e| CodecError::Malformed(e.to_string()))
}

pub fn encode_single(upload: &UploadResult) -> Result<Value, CodecError> {
    encode(&StoredUploads::Single(upload.clone()))
}

pub fn encode_items(uploads: &[UploadResult]) -> Result<Value, CodecError> {
    encode(&StoredUploads::Items(uploads.to_vec()))
}

/// Parse a stored column value. Empty/absent values yield `None`.
pub fn decode(stored: &Value) -> Result<Option<StoredUploads>, CodecError> {
    let envelope: Envelope = match stored {
        Value::Null => return Ok(None),
        Value::String(s) if s.trim().is_empty() => return Ok(None),
        Value::String(s) => serde_json::from_str(s).map_err(|e| CodecError::Malformed(e.to_string()))?,
        Value::Object(_) => {
            serde_json::from_value(stored.clone()).map_err(|e| CodecError::Malformed(e.to_string()))?
        }
        other => return Err(CodecError::Malformed(format!("unexpected stored value {}", other))),
    };
    if envelope.v != ENVELOPE_VERSION {
        return Err(CodecError::Version(envelope.v));
    }
    Ok(Some(envelope.body))
}

/// Stored value as a flat list; empty/absent is an empty list.
pub fn decode_uploads(stored: &Value) -> Result<Vec<UploadResult>, CodecError> {
    Ok(decode(stored)?.map(StoredUploads::into_vec).unwrap_or_default())
}

/// Emptiness of a wire or stored value: null, "", false, [] and {} are empty.
pub fn is_empty_value(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Number(_) => false,
    }
}

/// Raw bytes of an upload payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedPayload {
    pub bytes: Vec<u8>,
    /// Media type from a `data:` URL prefix, when the payload carried one.
    pub content_type: Option<String>,
}

/// Decode a base64 upload payload, optionally in `data:<type>;base64,<data>` form.
pub fn decode_payload(content: &Value) -> Result<DecodedPayload, AppError> {
    let s = content
        .as_str()
        .ok_or_else(|| AppError::BadRequest("invalid upload payload: base64 string expected".into()))?;
    let (content_type, data) = match s.strip_prefix("data:") {
        Some(rest) => {
            let (meta, data) = rest
                .split_once(',')
                .ok_or_else(|| AppError::BadRequest("invalid upload payload: malformed data URL".into()))?;
            let media = meta
                .strip_suffix(";base64")
                .ok_or_else(|| AppError::BadRequest("invalid upload payload: data URL must be base64".into()))?;
            (Some(media.to_string()).filter(|m| !m.is_empty()), data)
        }
        None => (None, s),
    };
    let cleaned: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = BASE64
        .decode(cleaned.as_bytes())
        .map_err(|e| AppError::BadRequest(format!("invalid upload payload: {}", e)))?;
    if bytes.is_empty() {
        return Err(AppError::BadRequest("invalid upload payload: no data".into()));
    }
    Ok(DecodedPayload { bytes, content_type })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample(file: &str) -> UploadResult {
        let mut u = UploadResult::new("gallery/2024-05/", file);
        u.variants.insert("original".into(), format!("gallery/2024-05/original/{}", file));
        u.variants.insert("thumbnail".into(), format!("gallery/2024-05/thumbnail/{}", file));
        u.content_type = Some("image/jpeg".into());
        u
    }

    #[test]
    fn single_round_trips() {
        let stored = StoredUploads::Single(sample("a.jpg"));
        let encoded = encode(&stored).unwrap();
        assert_eq!(decode(&encoded).unwrap(), Some(stored));
    }

    #[test]
    fn sequence_round_trips_in_order() {
        let items = vec![sample("a.jpg"), sample("b.jpg"), sample("c.jpg")];
        let encoded = encode_items(&items).unwrap();
        assert_eq!(decode_uploads(&encoded).unwrap(), items);
    }

    #[test]
    fn empty_values_decode_to_empty_sequence() {
        assert!(decode_uploads(&Value::Null).unwrap().is_empty());
        assert!(decode_uploads(&json!("")).unwrap().is_empty());
        assert!(decode_uploads(&json!("   ")).unwrap().is_empty());
    }

    #[test]
    fn rejects_unknown_version() {
        let stored = json!(r#"{"v":2,"items":[]}"#);
        assert!(matches!(decode(&stored), Err(CodecError::Version(2))));
    }

    #[test]
    fn accepts_jsonb_object_form() {
        let stored = json!({"v": 1, "single": {"path": "p/", "file": "f.png"}});
        assert_eq!(decode_uploads(&stored).unwrap(), vec![UploadResult::new("p/", "f.png")]);
    }

    #[test]
    fn envelope_shape_is_stable() {
        let encoded = encode_single(&UploadResult::new("p/", "f.png")).unwrap();
        assert_eq!(encoded, json!(r#"{"v":1,"single":{"path":"p/","file":"f.png"}}"#));
    }

    #[test]
    fn url_uses_variant_segment() {
        let u = UploadResult::new("gallery/2024-05/", "abc.jpg");
        assert_eq!(
            u.url("https://example.com/", "thumbnail"),
            "https://example.com/uploads/gallery/2024-05/thumbnail/abc.jpg"
        );
    }

    #[test]
    fn emptiness_rules() {
        assert!(is_empty_value(&Value::Null));
        assert!(is_empty_value(&json!("")));
        assert!(is_empty_value(&json!(false)));
        assert!(is_empty_value(&json!([])));
        assert!(!is_empty_value(&json!(0)));
        assert!(!is_empty_value(&json!("x")));
    }

    #[test]
    fn decodes_plain_and_data_url_payloads() {
        let plain = decode_payload(&json!("aGVsbG8=")).unwrap();
        assert_eq!(plain.bytes, b"hello");
        assert_eq!(plain.content_type, None);

        let data_url = decode_payload(&json!("data:image/png;base64,aGVs\nbG8=")).unwrap();
        assert_eq!(data_url.bytes, b"hello");
        assert_eq!(data_url.content_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn rejects_malformed_payloads() {
        assert!(matches!(decode_payload(&json!(42)), Err(AppError::BadRequest(_))));
        assert!(matches!(decode_payload(&json!("not base64!")), Err(AppError::BadRequest(_))));
        assert!(matches!(decode_payload(&json!("data:image/png,abc")), Err(AppError::BadRequest(_))));
        assert!(matches!(decode_payload(&json!("")), Err(AppError::BadRequest(_))));
    }
}
