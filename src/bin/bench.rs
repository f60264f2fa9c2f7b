//! OpenFAM Metadata Service Throughput Benchmark
//!
//! Drives a running metadata service through create_region, allocate,
//! lookup, and destroy_region to measure control-plane operation throughput.
//!
//! Run with: cargo run --bin openfam-bench -- --help

use anyhow::Result;
use clap::Parser;
use openfam::pb::metadata_service_client::MetadataServiceClient;
use openfam::pb::{
    AllocateRequest, CreateRegionRequest, DestroyRegionRequest, LookupRequest, MemoryType,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tonic::transport::Channel;

#[derive(Parser, Debug, Clone)]
#[command(name = "openfam-bench")]
#[command(about = "OpenFAM Metadata Service Throughput Benchmark")]
struct Args {
    /// Metadata service address (gRPC endpoint)
    #[arg(long, default_value = "http://[::1]:50051")]
    server_addr: String,

    /// Number of regions to create
    #[arg(long, default_value = "100")]
    num_regions: usize,

    /// Region size in bytes (supports suffixes: KB, MB, e.g., 16KB, 1MB)
    #[arg(long, default_value = "1MB")]
    region_size: String,

    /// Dataitems allocated per region
    #[arg(long, default_value = "10")]
    items_per_region: usize,

    /// Dataitem size in bytes
    #[arg(long, default_value = "4KB")]
    item_size: String,

    /// Number of concurrent workers (tokio tasks, not OS threads)
    #[arg(long, default_value = "16")]
    num_workers: usize,

    /// Caller uid used for permission checks
    #[arg(long, default_value = "1000")]
    uid: u32,

    /// Caller gid used for permission checks
    #[arg(long, default_value = "1000")]
    gid: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Parse value size string like "16KB", "1MB", etc.
fn parse_size(s: &str) -> Result<u64> {
    let s = s.trim().to_uppercase();

    if let Some(stripped) = s.strip_suffix("KB") {
        Ok(stripped.parse::<u64>()? * 1024)
    } else if let Some(stripped) = s.strip_suffix("MB") {
        Ok(stripped.parse::<u64>()? * 1024 * 1024)
    } else if let Some(stripped) = s.strip_suffix("GB") {
        Ok(stripped.parse::<u64>()? * 1024 * 1024 * 1024)
    } else if let Some(stripped) = s.strip_suffix('B') {
        Ok(stripped.parse::<u64>()?)
    } else {
        Ok(s.parse::<u64>()?)
    }
}

fn format_throughput(ops_per_sec: f64) -> String {
    format!("{:.0} ops/sec", ops_per_sec)
}

async fn connect(addr: &str) -> Result<MetadataServiceClient<Channel>> {
    Ok(MetadataServiceClient::connect(addr.to_string()).await?)
}

/// Create-region phase: each worker creates a share of the regions and
/// returns the (name, region_id) pairs it created, for later phases to
/// address the same regions by name (lookup) or id (allocate/destroy).
async fn create_region_phase(args: &Args, region_size: u64) -> Result<(Duration, Vec<(String, u64)>)> {
    println!("\n=== Create Region Phase ===");
    println!(
        "Creating {} regions of {} bytes with {} workers...",
        args.num_regions, region_size, args.num_workers
    );

    let errors = Arc::new(AtomicU64::new(0));
    let mut tasks = JoinSet::new();
    let start = Instant::now();

    for worker_id in 0..args.num_workers {
        let addr = args.server_addr.clone();
        let uid = args.uid;
        let gid = args.gid;
        let num_regions = args.num_regions;
        let num_workers = args.num_workers;
        let errors = Arc::clone(&errors);

        tasks.spawn(async move {
            let mut client = connect(&addr).await?;
            let start_idx = worker_id;
            let mut regions = Vec::new();

            let mut idx = start_idx;
            while idx < num_regions {
                let name = format!("bench_region_{:08}", idx);
                let resp = client
                    .create_region(CreateRegionRequest {
                        name: name.clone(),
                        size: region_size,
                        perm: 0o777,
                        uid,
                        gid,
                        interleave_enable: false,
                        interleave_size: 0,
                        memory_type: MemoryType::Volatile as i32,
                    })
                    .await?
                    .into_inner();

                if resp.errorcode == 0 {
                    regions.push((name, resp.region_id));
                } else {
                    tracing::warn!(region = idx, error = %resp.errormsg, "create_region failed");
                    errors.fetch_add(1, Ordering::Relaxed);
                }

                idx += num_workers;
            }

            Ok::<Vec<(String, u64)>, anyhow::Error>(regions)
        });
    }

    let mut region_ids = Vec::new();
    while let Some(result) = tasks.join_next().await {
        region_ids.extend(result??);
    }

    let duration = start.elapsed();
    let ops_per_sec = region_ids.len() as f64 / duration.as_secs_f64();
    println!(
        "Created {} regions in {:.2}s: {}",
        region_ids.len(),
        duration.as_secs_f64(),
        format_throughput(ops_per_sec)
    );

    let total_errors = errors.load(Ordering::Relaxed);
    if total_errors > 0 {
        println!("Errors: {}", total_errors);
    }

    Ok((duration, region_ids))
}

/// Allocate phase: each worker allocates dataitems in a share of the
/// regions created above.
async fn allocate_phase(
    args: &Args,
    item_size: u64,
    regions: &[(String, u64)],
) -> Result<(Duration, usize)> {
    let total_items = regions.len() * args.items_per_region;

    println!("\n=== Allocate Phase ===");
    println!(
        "Allocating {} dataitems ({} per region × {} regions) with {} workers...",
        total_items,
        args.items_per_region,
        regions.len(),
        args.num_workers
    );

    let region_ids: Arc<Vec<u64>> = Arc::new(regions.iter().map(|(_, id)| *id).collect());
    let completed = Arc::new(AtomicU64::new(0));
    let errors = Arc::new(AtomicU64::new(0));
    let mut tasks = JoinSet::new();
    let start = Instant::now();

    for worker_id in 0..args.num_workers {
        let addr = args.server_addr.clone();
        let uid = args.uid;
        let gid = args.gid;
        let region_ids = Arc::clone(&region_ids);
        let completed = Arc::clone(&completed);
        let errors = Arc::clone(&errors);
        let items_per_region = args.items_per_region;
        let num_workers = args.num_workers;

        tasks.spawn(async move {
            let mut client = connect(&addr).await?;

            let mut region_idx = worker_id;
            while region_idx < region_ids.len() {
                let region_id = region_ids[region_idx];

                for item_idx in 0..items_per_region {
                    let resp = client
                        .allocate(AllocateRequest {
                            region_id,
                            name: format!("item_{}", item_idx),
                            size: item_size,
                            perm: 0o777,
                            uid,
                            gid,
                            dup: false,
                        })
                        .await?
                        .into_inner();

                    if resp.errorcode == 0 {
                        completed.fetch_add(1, Ordering::Relaxed);
                    } else {
                        tracing::warn!(region_id, item_idx, error = %resp.errormsg, "allocate failed");
                        errors.fetch_add(1, Ordering::Relaxed);
                    }
                }

                region_idx += num_workers;
            }

            Ok::<(), anyhow::Error>(())
        });
    }

    while let Some(result) = tasks.join_next().await {
        result??;
    }

    let duration = start.elapsed();
    let done = completed.load(Ordering::Relaxed) as usize;
    let ops_per_sec = done as f64 / duration.as_secs_f64();
    println!(
        "Allocated {} dataitems in {:.2}s: {}",
        done,
        duration.as_secs_f64(),
        format_throughput(ops_per_sec)
    );

    let total_errors = errors.load(Ordering::Relaxed);
    if total_errors > 0 {
        println!("Errors: {}", total_errors);
    }

    Ok((duration, done))
}

/// Lookup phase: each worker looks up the dataitems allocated above.
async fn lookup_phase(args: &Args, regions: &[(String, u64)]) -> Result<Duration> {
    let total_lookups = regions.len() * args.items_per_region;

    println!("\n=== Lookup Phase ===");
    println!(
        "Looking up {} dataitems with {} workers...",
        total_lookups, args.num_workers
    );

    let regions = Arc::new(regions.to_vec());
    let completed = Arc::new(AtomicU64::new(0));
    let errors = Arc::new(AtomicU64::new(0));
    let mut tasks = JoinSet::new();
    let start = Instant::now();

    for worker_id in 0..args.num_workers {
        let addr = args.server_addr.clone();
        let uid = args.uid;
        let gid = args.gid;
        let regions = Arc::clone(&regions);
        let completed = Arc::clone(&completed);
        let errors = Arc::clone(&errors);
        let items_per_region = args.items_per_region;
        let num_workers = args.num_workers;

        tasks.spawn(async move {
            let mut client = connect(&addr).await?;

            let mut region_idx = worker_id;
            while region_idx < regions.len() {
                let (region_name, _) = &regions[region_idx];

                for item_idx in 0..items_per_region {
                    let resp = client
                        .lookup(LookupRequest {
                            item_name: format!("item_{}", item_idx),
                            region_name: region_name.clone(),
                            uid,
                            gid,
                        })
                        .await?
                        .into_inner();

                    if resp.errorcode == 0 {
                        completed.fetch_add(1, Ordering::Relaxed);
                    } else {
                        errors.fetch_add(1, Ordering::Relaxed);
                    }
                }

                region_idx += num_workers;
            }

            Ok::<(), anyhow::Error>(())
        });
    }

    while let Some(result) = tasks.join_next().await {
        result??;
    }

    let duration = start.elapsed();
    let done = completed.load(Ordering::Relaxed);
    let ops_per_sec = done as f64 / duration.as_secs_f64();
    println!(
        "Looked up {} dataitems in {:.2}s: {}",
        done,
        duration.as_secs_f64(),
        format_throughput(ops_per_sec)
    );

    let total_errors = errors.load(Ordering::Relaxed);
    if total_errors > 0 {
        println!("Errors: {}", total_errors);
    }

    Ok(duration)
}

/// Destroy phase: tear down every created region, which frees its
/// allocated dataitems along with it.
async fn destroy_phase(args: &Args, regions: &[(String, u64)]) -> Result<Duration> {
    println!("\n=== Destroy Phase ===");
    println!(
        "Destroying {} regions with {} workers...",
        regions.len(),
        args.num_workers
    );

    let region_ids: Arc<Vec<u64>> = Arc::new(regions.iter().map(|(_, id)| *id).collect());
    let completed = Arc::new(AtomicU64::new(0));
    let mut tasks = JoinSet::new();
    let start = Instant::now();

    for worker_id in 0..args.num_workers {
        let addr = args.server_addr.clone();
        let uid = args.uid;
        let gid = args.gid;
        let region_ids = Arc::clone(&region_ids);
        let completed = Arc::clone(&completed);
        let num_workers = args.num_workers;

        tasks.spawn(async move {
            let mut client = connect(&addr).await?;

            let mut region_idx = worker_id;
            while region_idx < region_ids.len() {
                let region_id = region_ids[region_idx];
                let resp = client
                    .destroy_region(DestroyRegionRequest {
                        region_id,
                        uid,
                        gid,
                    })
                    .await?
                    .into_inner();
                if resp.errorcode == 0 {
                    completed.fetch_add(1, Ordering::Relaxed);
                }
                region_idx += num_workers;
            }

            Ok::<(), anyhow::Error>(())
        });
    }

    while let Some(result) = tasks.join_next().await {
        result??;
    }

    let duration = start.elapsed();
    println!(
        "Destroyed {} regions in {:.2}s",
        completed.load(Ordering::Relaxed),
        duration.as_secs_f64()
    );

    Ok(duration)
}

#[tokio::main(worker_threads = 4)]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .init();

    let region_size = parse_size(&args.region_size)?;
    let item_size = parse_size(&args.item_size)?;

    println!("==============================================");
    println!("OpenFAM Metadata Service Throughput Benchmark");
    println!("==============================================");
    println!("Server:             {}", args.server_addr);
    println!("Regions:            {}", args.num_regions);
    println!("Region size:        {} bytes", region_size);
    println!("Items per region:   {}", args.items_per_region);
    println!("Item size:          {} bytes", item_size);
    println!("Concurrent workers: {}", args.num_workers);
    println!("==============================================");

    let (create_duration, regions) = create_region_phase(&args, region_size).await?;
    let (allocate_duration, allocated) = allocate_phase(&args, item_size, &regions).await?;
    let lookup_duration = lookup_phase(&args, &regions).await?;
    let destroy_duration = destroy_phase(&args, &regions).await?;

    println!("\n=== Summary ===");
    println!(
        "Create region: {:.2}s, {}",
        create_duration.as_secs_f64(),
        format_throughput(regions.len() as f64 / create_duration.as_secs_f64())
    );
    println!(
        "Allocate:      {:.2}s, {}",
        allocate_duration.as_secs_f64(),
        format_throughput(allocated as f64 / allocate_duration.as_secs_f64())
    );
    println!(
        "Lookup:        {:.2}s, {}",
        lookup_duration.as_secs_f64(),
        format_throughput((regions.len() * args.items_per_region) as f64 / lookup_duration.as_secs_f64())
    );
    println!(
        "Destroy:       {:.2}s, {}",
        destroy_duration.as_secs_f64(),
        format_throughput(regions.len() as f64 / destroy_duration.as_secs_f64())
    );

    Ok(())
}
