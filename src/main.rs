use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use preset_index::config::Config;
use preset_index::core::Record;
use preset_index::query::QueryServer;
use preset_index::storage::MemoryStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Faceted preset index over an ordered key-value store
#[derive(Parser, Debug)]
#[command(name = "preset-index", version)]
struct Cli {
    /// TOML config file (default: <config dir>/preset-index/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    bind: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    /// JSON array of presets to index at startup
    #[arg(long)]
    seed: Option<PathBuf>,

    /// Print the default configuration as TOML and exit
    #[arg(long)]
    print_default_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.print_default_config {
        print!("{}", Config::default().to_toml()?);
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting preset-index: faceted lookup over an ordered KV store");

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let store = Arc::new(MemoryStore::new());
    let server = preset_index::build_server(&config, store)?;

    if let Some(seed) = cli.seed.as_deref() {
        let data = std::fs::read(seed)?;
        let presets: Vec<serde_json::Value> = serde_json::from_slice(&data)?;
        let total = presets.len();
        let mut loaded = 0usize;
        for preset in presets {
            match Record::from_json(preset).and_then(|r| server.indexer().create(r)) {
                Ok(()) => loaded += 1,
                Err(e) => tracing::warn!("Skipping seed preset: {}", e),
            }
        }
        info!("Seeded {}/{} presets from {:?}", loaded, total, seed);
    }

    // 先绑定再派生任务：端口占用/地址非法直接让进程失败退出
    let listener = QueryServer::bind(&config.server.bind, config.server.port).await?;
    let mut handle = tokio::spawn(server.serve(listener));

    info!(
        "preset-index ready. Query via: http://localhost:{}/presets?category=Grains",
        config.server.port
    );

    // 优雅退出处理；服务任务提前结束时把错误带出 main
    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res?;
            info!("Shutting down...");
            handle.abort();
        }
        res = &mut handle => {
            res??;
            tracing::warn!("HTTP server exited");
        }
    }

    Ok(())
}
