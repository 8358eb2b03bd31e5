//! Batched pinning of rendered files.
//!
//! Individual pin requests are queued in memory and drained by a single
//! worker that packs them into batches bounded by file count and total
//! bytes, submits each batch to the remote pinning API with a fixed attempt
//! budget, and settles every request exactly once.

mod client;
mod config;
mod queue;
mod traits;
mod types;

pub use client::HttpPinEndpoint;
pub use config::PinningConfig;
pub use queue::{pack_batch, BatchLimits, PinBatchQueue, PinHandle};
pub use traits::PinEndpoint;
pub use types::{parse_pin_response, PinError, PinUpload, PinnedFile};
