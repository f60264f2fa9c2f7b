//! OpenFAM control-plane CLI
//!
//! Run with: cargo run --bin openfam-cli -- --help

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use openfam::pb::metadata_service_client::MetadataServiceClient;
use openfam::pb::{
    AllocateRequest, ChangeDataitemPermissionRequest, ChangeRegionPermissionRequest,
    CreateRegionRequest, DeallocateRequest, DestroyRegionRequest, LookupRegionRequest,
    LookupRequest, MemoryType, MetadataMaxKeyLenRequest, ResizeRegionRequest,
};
use tonic::transport::Channel;

#[derive(Parser, Debug)]
#[command(name = "openfam-cli")]
#[command(about = "OpenFAM metadata service control-plane client")]
struct Args {
    /// Metadata service address (gRPC endpoint)
    #[arg(long, default_value = "http://[::1]:50051")]
    server_addr: String,

    /// Caller uid used for permission checks
    #[arg(long, default_value = "1000")]
    uid: u32,

    /// Caller gid used for permission checks
    #[arg(long, default_value = "1000")]
    gid: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a region
    CreateRegion {
        name: String,
        size: u64,
        #[arg(long, default_value = "511")]
        perm: u32,
        #[arg(long, default_value_t = false)]
        persistent: bool,
    },
    /// Destroy a region
    DestroyRegion { region_id: u64 },
    /// Resize a region
    ResizeRegion { region_id: u64, size: u64 },
    /// Change a region's permission bits
    ChmodRegion { region_id: u64, perm: u32 },
    /// Look up a region by name
    LookupRegion { name: String },
    /// Allocate a dataitem within a region
    Allocate {
        region_id: u64,
        size: u64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value = "511")]
        perm: u32,
    },
    /// Deallocate a dataitem
    Deallocate { region_id: u64, offset: u64 },
    /// Change a dataitem's permission bits
    ChmodItem {
        region_id: u64,
        offset: u64,
        perm: u32,
    },
    /// Look up a dataitem by name within a region
    Lookup { region_name: String, item_name: String },
    /// Print the service's maximum key length
    MaxKeyLen,
    /// Run an interactive REPL
    Repl,
}

async fn connect(addr: &str) -> Result<MetadataServiceClient<Channel>> {
    Ok(MetadataServiceClient::connect(addr.to_string()).await?)
}

async fn cmd_create_region(
    client: &mut MetadataServiceClient<Channel>,
    args: &Args,
    name: String,
    size: u64,
    perm: u32,
    persistent: bool,
) -> Result<()> {
    let resp = client
        .create_region(CreateRegionRequest {
            name,
            size,
            perm,
            uid: args.uid,
            gid: args.gid,
            interleave_enable: false,
            interleave_size: 0,
            memory_type: if persistent {
                MemoryType::Persistent
            } else {
                MemoryType::Volatile
            } as i32,
        })
        .await?
        .into_inner();

    if resp.errorcode != 0 {
        return Err(anyhow!("create_region failed: {}", resp.errormsg));
    }
    println!("region_id={} offset={}", resp.region_id, resp.offset);
    Ok(())
}

async fn cmd_destroy_region(
    client: &mut MetadataServiceClient<Channel>,
    args: &Args,
    region_id: u64,
) -> Result<()> {
    let resp = client
        .destroy_region(DestroyRegionRequest {
            region_id,
            uid: args.uid,
            gid: args.gid,
        })
        .await?
        .into_inner();
    if resp.errorcode != 0 {
        return Err(anyhow!("destroy_region failed: {}", resp.errormsg));
    }
    println!("OK");
    Ok(())
}

async fn cmd_resize_region(
    client: &mut MetadataServiceClient<Channel>,
    args: &Args,
    region_id: u64,
    size: u64,
) -> Result<()> {
    let resp = client
        .resize_region(ResizeRegionRequest {
            region_id,
            size,
            uid: args.uid,
            gid: args.gid,
        })
        .await?
        .into_inner();
    if resp.errorcode != 0 {
        return Err(anyhow!("resize_region failed: {}", resp.errormsg));
    }
    println!("OK");
    Ok(())
}

async fn cmd_chmod_region(
    client: &mut MetadataServiceClient<Channel>,
    args: &Args,
    region_id: u64,
    perm: u32,
) -> Result<()> {
    let resp = client
        .change_region_permission(ChangeRegionPermissionRequest {
            region_id,
            perm,
            uid: args.uid,
            gid: args.gid,
        })
        .await?
        .into_inner();
    if resp.errorcode != 0 {
        return Err(anyhow!("chmod_region failed: {}", resp.errormsg));
    }
    println!("OK");
    Ok(())
}

async fn cmd_lookup_region(
    client: &mut MetadataServiceClient<Channel>,
    args: &Args,
    name: String,
) -> Result<()> {
    let resp = client
        .lookup_region(LookupRegionRequest {
            name,
            uid: args.uid,
            gid: args.gid,
        })
        .await?
        .into_inner();
    if resp.errorcode != 0 {
        return Err(anyhow!("lookup_region failed: {}", resp.errormsg));
    }
    println!(
        "region_id={} offset={} size={}",
        resp.region_id, resp.offset, resp.size
    );
    Ok(())
}

async fn cmd_allocate(
    client: &mut MetadataServiceClient<Channel>,
    args: &Args,
    region_id: u64,
    size: u64,
    name: Option<String>,
    perm: u32,
) -> Result<()> {
    let resp = client
        .allocate(AllocateRequest {
            region_id,
            name: name.unwrap_or_default(),
            size,
            perm,
            uid: args.uid,
            gid: args.gid,
            dup: false,
        })
        .await?
        .into_inner();
    if resp.errorcode != 0 {
        return Err(anyhow!("allocate failed: {}", resp.errormsg));
    }
    println!(
        "region_id={} offset={} keys={:?} bases={:?}",
        resp.region_id, resp.offset, resp.keys, resp.bases
    );
    Ok(())
}

async fn cmd_deallocate(
    client: &mut MetadataServiceClient<Channel>,
    args: &Args,
    region_id: u64,
    offset: u64,
) -> Result<()> {
    let resp = client
        .deallocate(DeallocateRequest {
            region_id,
            offset,
            uid: args.uid,
            gid: args.gid,
            key: 0,
        })
        .await?
        .into_inner();
    if resp.errorcode != 0 {
        return Err(anyhow!("deallocate failed: {}", resp.errormsg));
    }
    println!("OK");
    Ok(())
}

async fn cmd_chmod_item(
    client: &mut MetadataServiceClient<Channel>,
    args: &Args,
    region_id: u64,
    offset: u64,
    perm: u32,
) -> Result<()> {
    let resp = client
        .change_dataitem_permission(ChangeDataitemPermissionRequest {
            region_id,
            offset,
            perm,
            uid: args.uid,
            gid: args.gid,
        })
        .await?
        .into_inner();
    if resp.errorcode != 0 {
        return Err(anyhow!("chmod_item failed: {}", resp.errormsg));
    }
    println!("OK");
    Ok(())
}

async fn cmd_lookup(
    client: &mut MetadataServiceClient<Channel>,
    args: &Args,
    region_name: String,
    item_name: String,
) -> Result<()> {
    let resp = client
        .lookup(LookupRequest {
            item_name,
            region_name,
            uid: args.uid,
            gid: args.gid,
        })
        .await?
        .into_inner();
    if resp.errorcode != 0 {
        return Err(anyhow!("lookup failed: {}", resp.errormsg));
    }
    println!(
        "region_id={} offset={} size={}",
        resp.region_id, resp.offset, resp.size
    );
    Ok(())
}

async fn cmd_max_key_len(client: &mut MetadataServiceClient<Channel>) -> Result<()> {
    let resp = client
        .metadata_max_key_len(MetadataMaxKeyLenRequest {})
        .await?
        .into_inner();
    println!("{}", resp.max_key_len);
    Ok(())
}

async fn cmd_repl(client: &mut MetadataServiceClient<Channel>, args: &Args) -> Result<()> {
    use std::io::{self, BufRead, Write};

    println!("OpenFAM REPL - create-region <name> <size>, lookup-region <name>, allocate <region_id> <size>, lookup <region_name> <item_name>, max-key-len, quit");
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("openfam> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let parts: Vec<&str> = line.trim().split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }

        let result = match parts[0] {
            "create-region" if parts.len() >= 3 => {
                let name = parts[1].to_string();
                let size = parts[2].parse().unwrap_or(0);
                cmd_create_region(client, args, name, size, 511, false).await
            }
            "lookup-region" if parts.len() >= 2 => {
                cmd_lookup_region(client, args, parts[1].to_string()).await
            }
            "allocate" if parts.len() >= 3 => {
                let region_id = parts[1].parse().unwrap_or(0);
                let size = parts[2].parse().unwrap_or(0);
                cmd_allocate(client, args, region_id, size, None, 511).await
            }
            "lookup" if parts.len() >= 3 => {
                cmd_lookup(client, args, parts[1].to_string(), parts[2].to_string()).await
            }
            "max-key-len" => cmd_max_key_len(client).await,
            "quit" | "exit" | "q" => break,
            _ => {
                println!("unrecognized command or missing arguments");
                continue;
            }
        };

        if let Err(e) = result {
            eprintln!("Error: {}", e);
        }
    }

    Ok(())
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

    let mut client = connect(&args.server_addr).await?;

    match args.command {
        Commands::CreateRegion {
            ref name,
            size,
            perm,
            persistent,
        } => cmd_create_region(&mut client, &args, name.clone(), size, perm, persistent).await,
        Commands::DestroyRegion { region_id } => {
            cmd_destroy_region(&mut client, &args, region_id).await
        }
        Commands::ResizeRegion { region_id, size } => {
            cmd_resize_region(&mut client, &args, region_id, size).await
        }
        Commands::ChmodRegion { region_id, perm } => {
            cmd_chmod_region(&mut client, &args, region_id, perm).await
        }
        Commands::LookupRegion { ref name } => {
            cmd_lookup_region(&mut client, &args, name.clone()).await
        }
        Commands::Allocate {
            region_id,
            size,
            ref name,
            perm,
        } => cmd_allocate(&mut client, &args, region_id, size, name.clone(), perm).await,
        Commands::Deallocate { region_id, offset } => {
            cmd_deallocate(&mut client, &args, region_id, offset).await
        }
        Commands::ChmodItem {
            region_id,
            offset,
            perm,
        } => cmd_chmod_item(&mut client, &args, region_id, offset, perm).await,
        Commands::Lookup {
            ref region_name,
            ref item_name,
        } => cmd_lookup(&mut client, &args, region_name.clone(), item_name.clone()).await,
        Commands::MaxKeyLen => cmd_max_key_len(&mut client).await,
        Commands::Repl => cmd_repl(&mut client, &args).await,
    }
}
