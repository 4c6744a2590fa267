pub mod error;
pub mod index;
pub mod persist;
pub mod record;
pub mod search;
pub mod store;
pub mod tokenizer;

pub use error::{Error, Result};
pub use index::{DocId, InvertedIndex};
pub use record::{DatasetSnapshot, SnapshotMeta, VideoRecord};
pub use search::{SearchEngine, SearchHit, SearchResult};
pub use store::{ActivePair, DatasetStore};
