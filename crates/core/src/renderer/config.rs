//! Configuration for the renderer module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the process-based renderer and the script source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Render command. Receives the script on stdin and writes one PNG to stdout.
    #[serde(default = "default_command")]
    pub command: PathBuf,

    /// Extra arguments passed before the frame arguments.
    #[serde(default)]
    pub args: Vec<String>,

    /// Maximum frames rendered at once across all jobs.
    #[serde(default = "default_max_parallel")]
    pub max_parallel_frames: usize,

    /// Timeout for a single frame in seconds.
    #[serde(default = "default_frame_timeout")]
    pub frame_timeout_secs: u64,

    /// Timeout for downloading an item script in seconds.
    #[serde(default = "default_script_timeout")]
    pub script_timeout_secs: u64,
}

fn default_command() -> PathBuf {
    PathBuf::from("pinforge-render")
}

fn default_max_parallel() -> usize {
    15
}

fn default_frame_timeout() -> u64 {
    120
}

fn default_script_timeout() -> u64 {
    30
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: Vec::new(),
            max_parallel_frames: default_max_parallel(),
            frame_timeout_secs: default_frame_timeout(),
            script_timeout_secs: default_script_timeout(),
        }
    }
}
