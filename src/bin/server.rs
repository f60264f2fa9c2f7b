//! OpenFAM metadata server binary
//!
//! Run with: cargo run --bin openfam-metadata-server -- --help

use anyhow::Result;
use clap::Parser;
use openfam::metadata_service::{MetadataService, MetadataServiceConfig};
use openfam::rpc_service::MetadataRpcService;

#[derive(Parser, Debug)]
#[command(name = "openfam-metadata-server")]
#[command(about = "OpenFAM distributed fabric-attached-memory metadata service")]
struct Args {
    /// gRPC listen address
    #[arg(long, default_value = "[::1]:50051")]
    listen_addr: String,

    /// Comma-separated persistent memory server ids available at startup
    #[arg(long, default_value = "0")]
    persistent_servers: String,

    /// Comma-separated volatile memory server ids available at startup
    #[arg(long, default_value = "0")]
    volatile_servers: String,

    /// Maximum length of a region or dataitem name
    #[arg(long, default_value = "255")]
    max_key_len: usize,

    /// Number of region ids addressable per memory server
    #[arg(long, default_value = "16384")]
    region_id_capacity: u64,

    /// Allow a single region to span multiple memory servers
    #[arg(long, default_value = "true")]
    enable_region_spanning: bool,

    /// Bytes of a spanning region placed on each memory server before
    /// spilling onto the next
    #[arg(long, default_value = "1073741824")]
    region_span_size_per_memoryserver: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn parse_server_list(s: &str) -> Vec<u64> {
    s.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<u64>().ok())
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .init();

    let config = MetadataServiceConfig {
        max_key_len: args.max_key_len,
        region_id_capacity: args.region_id_capacity,
        enable_region_spanning: args.enable_region_spanning,
        region_span_size_per_memoryserver: args.region_span_size_per_memoryserver,
    };

    let persistent_servers = parse_server_list(&args.persistent_servers);
    let volatile_servers = parse_server_list(&args.volatile_servers);

    tracing::info!(
        ?persistent_servers,
        ?volatile_servers,
        listen_addr = %args.listen_addr,
        "starting OpenFAM metadata server"
    );

    let service = MetadataService::new(config, persistent_servers, volatile_servers);
    let rpc = MetadataRpcService::new(std::sync::Arc::new(service));

    let addr = args.listen_addr.parse()?;
    tracing::info!(%addr, "listening");

    tonic::transport::Server::builder()
        .add_service(rpc.into_server())
        .serve(addr)
        .await?;

    Ok(())
}
