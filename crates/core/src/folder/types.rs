//! Directory node types.

use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// UnixFS `Data` of an empty directory (`08 01`), base64 without padding as
/// dag-json expects.
pub const EMPTY_DIRECTORY_DATA: &str = "CAE";

/// Errors from folder assembly.
#[derive(Debug, Clone, Error)]
pub enum FolderError {
    /// Could not reach the API.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// The API answered with an error.
    #[error("API error: {0}")]
    ApiError(String),

    /// Node could not be encoded.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Every attempt failed.
    #[error("folder assembly failed after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}

/// A named child of a directory node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryLink {
    pub name: String,
    pub hash: String,
    pub size: u64,
}

impl DirectoryLink {
    pub fn new(name: impl Into<String>, hash: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            hash: hash.into(),
            size,
        }
    }
}

/// A directory node: the empty-directory marker plus links sorted by name.
///
/// Construction sorts the links, so the same set of links always encodes
/// to the same bytes regardless of the order they were collected in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryNode {
    links: Vec<DirectoryLink>,
}

impl DirectoryNode {
    pub fn new(mut links: Vec<DirectoryLink>) -> Self {
        links.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.hash.cmp(&b.hash)));
        Self { links }
    }

    pub fn links(&self) -> &[DirectoryLink] {
        &self.links
    }

    /// The node in dag-json form. Keys come out sorted, as dag-json requires.
    pub fn to_dag_json(&self) -> serde_json::Value {
        let links: Vec<serde_json::Value> = self
            .links
            .iter()
            .map(|link| {
                json!({
                    "Hash": { "/": link.hash },
                    "Name": link.name,
                    "Tsize": link.size.max(1),
                })
            })
            .collect();

        json!({
            "Data": { "/": { "bytes": EMPTY_DIRECTORY_DATA } },
            "Links": links,
        })
    }

    /// Encoded dag-json bytes.
    pub fn encode(&self) -> Result<Vec<u8>, FolderError> {
        serde_json::to_vec(&self.to_dag_json()).map_err(|e| FolderError::Encoding(e.to_string()))
    }

    /// SHA-256 of the encoded node, hex encoded.
    pub fn fingerprint(&self) -> Result<String, FolderError> {
        let digest = Sha256::digest(self.encode()?);
        Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
    }
}
