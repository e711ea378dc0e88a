pub mod engine;
pub mod server;

pub use engine::{QueryEngine, SearchResponse};
pub use server::QueryServer;
