//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of every collaborator trait,
//! so the pin queue, gateway batcher, scheduler and orchestrator can be
//! exercised without an IPFS node, a renderer or a database.
//!
//! # Example
//!
//! ```rust,ignore
//! use pinforge_core::testing::{MockPinEndpoint, MockRenderer};
//!
//! let endpoint = MockPinEndpoint::new();
//! endpoint.set_fail_next(2).await;
//!
//! let renderer = MockRenderer::new();
//! renderer.set_frame_delay(Duration::from_millis(10)).await;
//! ```

mod mock_collections;
mod mock_dag_endpoint;
mod mock_gateway;
mod mock_notifier;
mod mock_pin_endpoint;
mod mock_renderer;

pub use mock_collections::MockCollectionRepository;
pub use mock_dag_endpoint::MockDagEndpoint;
pub use mock_gateway::MockGatewayTransport;
pub use mock_notifier::MockNotifier;
pub use mock_pin_endpoint::{MockPinEndpoint, RecordedBatch};
pub use mock_renderer::{MockRenderer, MockScriptSource, RecordedRender};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::collection::{Collection, NftConfig, NftStatus};

    /// Create an unfinished item with `total_supply` frames.
    pub fn nft(id: &str, total_supply: usize) -> NftConfig {
        NftConfig {
            id: id.to_string(),
            status: NftStatus::Unfinished,
            total_supply,
            script: format!("https://scripts.example.com/{}.js", id),
            ipfs: None,
        }
    }

    /// Create a collection with the given `(item id, total supply)` items.
    pub fn collection(id: &str, items: &[(&str, usize)]) -> Collection {
        Collection {
            id: id.to_string(),
            network: "mainnet".to_string(),
            symbol: Some("GEN".to_string()),
            nfts: items
                .iter()
                .map(|(item_id, supply)| nft(item_id, *supply))
                .collect(),
        }
    }
}
