pub mod collect;
pub mod lock;
pub mod normalize;
pub mod retry;
pub mod sample;
pub mod source;

pub use collect::{CollectStats, Collector, CollectorConfig, IngestReport};
pub use retry::RetryPolicy;
pub use source::{MetadataSource, Page, PageRequest, RawVideo, SourceError, YouTubeSource};
