//! Types for the pinning subsystem.

use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::warn;

/// Errors from pinning operations.
#[derive(Debug, Clone, Error)]
pub enum PinError {
    /// Could not reach the pinning API.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// The API answered with an error.
    #[error("API error: {0}")]
    ApiError(String),

    /// Every attempt for the batch holding this request failed.
    #[error("pinning failed after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },

    /// The queue went away before settling the request.
    #[error("pin request was dropped before completion")]
    Dropped,
}

/// One file of a batch upload. `name` is the request's correlation id.
#[derive(Debug, Clone)]
pub struct PinUpload {
    pub name: String,
    pub data: Arc<Vec<u8>>,
}

impl PinUpload {
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Result line of the pinning API: `{"Name": ..., "Hash": ..., "Size": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PinnedFile {
    pub name: String,
    pub hash: String,
    #[serde(default, deserialize_with = "deserialize_size")]
    pub size: u64,
}

/// The API reports sizes as strings; accept numbers too.
fn deserialize_size<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Size {
        Number(u64),
        Text(String),
    }

    match Size::deserialize(deserializer)? {
        Size::Number(n) => Ok(n),
        Size::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Parse a newline-delimited JSON response into pinned files.
///
/// Lines that fail to parse are logged and skipped; the requests they
/// would have matched stay queued.
pub fn parse_pin_response(body: &str) -> Vec<PinnedFile> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match serde_json::from_str::<PinnedFile>(line) {
            Ok(file) => Some(file),
            Err(e) => {
                warn!(
                    error = %e,
                    line = %line.chars().take(200).collect::<String>(),
                    "Skipping unparsable pin response line"
                );
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_string_sizes() {
        let body = concat!(
            r#"{"Name":"a1","Hash":"QmAaa","Size":"1024"}"#,
            "\n",
            r#"{"Name":"b2","Hash":"QmBbb","Size":"2048"}"#,
            "\n"
        );
        let files = parse_pin_response(body);
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].name, "a1");
        assert_eq!(files[0].hash, "QmAaa");
        assert_eq!(files[0].size, 1024);
        assert_eq!(files[1].size, 2048);
    }

    #[test]
    fn test_parse_numeric_size() {
        let files = parse_pin_response(r#"{"Name":"a1","Hash":"QmAaa","Size":7}"#);
        assert_eq!(files[0].size, 7);
    }

    #[test]
    fn test_parse_skips_bad_lines() {
        let body = "\n  \nnot json\n{\"Name\":\"a1\",\"Hash\":\"QmAaa\",\"Size\":\"3\"}\r\n{\"Hash\":\"QmNoName\"}\n";
        let files = parse_pin_response(body);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "a1");
    }

    #[test]
    fn test_parse_empty_body() {
        assert!(parse_pin_response("").is_empty());
    }

    #[test]
    fn test_error_display() {
        let err = PinError::Exhausted {
            attempts: 5,
            last_error: "connection failed: refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "pinning failed after 5 attempts: connection failed: refused"
        );
    }
}
