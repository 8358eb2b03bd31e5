//! Collection document types.

use serde::{Deserialize, Serialize};

/// Save status of one NFT item, stored as an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum NftStatus {
    #[default]
    Unfinished,
    Saved,
}

impl From<u8> for NftStatus {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Saved,
            _ => Self::Unfinished,
        }
    }
}

impl From<NftStatus> for u8 {
    fn from(status: NftStatus) -> Self {
        match status {
            NftStatus::Unfinished => 0,
            NftStatus::Saved => 1,
        }
    }
}

/// Where a rendered item folder was pinned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PinInfo {
    pub ipfs_hash: String,
    pub pin_size: u64,
    /// Milliseconds since the Unix epoch, as a string.
    pub timestamp: String,
}

/// One generative item of a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftConfig {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(rename = "_status", default)]
    pub status: NftStatus,

    /// Number of frames to render.
    pub total_supply: usize,

    /// Location of the generative script.
    #[serde(default)]
    pub script: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipfs: Option<PinInfo>,
}

/// A collection document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: String,

    #[serde(default)]
    pub network: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,

    #[serde(default)]
    pub nfts: Vec<NftConfig>,
}

impl Collection {
    pub fn item(&self, item_id: &str) -> Option<&NftConfig> {
        self.nfts.iter().find(|nft| nft.id == item_id)
    }

    pub fn item_mut(&mut self, item_id: &str) -> Option<&mut NftConfig> {
        self.nfts.iter_mut().find(|nft| nft.id == item_id)
    }

    /// Symbol used in user messages, "nft" when the collection has none.
    pub fn display_symbol(&self) -> &str {
        match self.symbol.as_deref() {
            Some(symbol) if !symbol.is_empty() => symbol,
            _ => "nft",
        }
    }
}
