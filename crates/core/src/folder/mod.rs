//! Folder assembly: one directory node linking every pinned frame.

mod assembler;
mod client;
mod traits;
mod types;

pub use assembler::FolderAssembler;
pub use client::HttpDagEndpoint;
pub use traits::DagEndpoint;
pub use types::{DirectoryLink, DirectoryNode, FolderError, EMPTY_DIRECTORY_DATA};
