//! Batched fetching from a multi-address IPFS gateway.
//!
//! Callers ask for one address at a time; the batcher coalesces duplicate
//! addresses, groups the rest into chunks, fetches a few chunks at once and
//! splits each framed response body back into per-address blobs.

mod batcher;
mod client;
mod config;
mod framing;
mod traits;

pub use batcher::{FetchHandle, GatewayFetchBatcher};
pub use client::HttpGatewayTransport;
pub use config::GatewayConfig;
pub use framing::{parse_frames, Frame, FRAME_END, FRAME_START};
pub use traits::{GatewayError, GatewayTransport};
