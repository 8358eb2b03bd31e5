//! Collection metadata repository.

mod repository;
mod sqlite;
mod types;

pub use repository::{CollectionError, CollectionRepository};
pub use sqlite::SqliteCollectionRepository;
pub use types::{Collection, NftConfig, NftStatus, PinInfo};
