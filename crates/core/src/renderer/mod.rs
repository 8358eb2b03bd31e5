//! Frame rendering.
//!
//! The pipeline treats rendering as an opaque capability: a script goes in,
//! numbered PNG frames come out on a channel, and a cancellation token stops
//! the renderer at the next frame boundary.

mod config;
mod error;
mod process;
mod script;
mod traits;

pub use config::RendererConfig;
pub use error::RenderError;
pub use process::ProcessRenderer;
pub use script::HttpScriptSource;
pub use traits::{RenderedFrame, Renderer, ScriptSource};
