pub mod aggregator;
pub mod indexer;
pub mod key;

pub use aggregator::{FacetAggregator, FacetOptions};
pub use indexer::Indexer;
pub use key::KeyEncoder;
