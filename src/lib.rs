#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod config;
pub mod core;
pub mod index;
pub mod query;
pub mod stats;
pub mod storage;

use std::sync::Arc;

use crate::config::Config;
use crate::core::FacetSchema;
use crate::index::Indexer;
use crate::query::{QueryEngine, QueryServer};
use crate::stats::ConsistencyVerifier;
use crate::storage::StoreAdapter;

/// 按配置装配全部组件（schema 只构建一次，以 Arc 注入）
pub fn build_server(config: &Config, store: Arc<dyn StoreAdapter>) -> anyhow::Result<QueryServer> {
    let schema = Arc::new(FacetSchema::from_config(&config.schema)?);
    let indexer = Indexer::new(schema.clone(), store.clone())
        .with_atomic_writes(config.index.atomic_writes);
    let engine = QueryEngine::new(schema.clone(), store.clone())
        .with_result_limit(config.query.result_limit);
    let verifier = ConsistencyVerifier::new(schema, store);
    Ok(QueryServer::new(
        Arc::new(indexer),
        Arc::new(engine),
        Arc::new(verifier),
    ))
}
