//! Integration tests for the OpenFAM metadata service RPC surface

use openfam::metadata_service::{MetadataService, MetadataServiceConfig};
use openfam::pb::metadata_service_client::MetadataServiceClient;
use openfam::pb::{
    AllocateRequest, ChangeRegionPermissionRequest, CreateRegionRequest, DeallocateRequest,
    DestroyRegionRequest, LookupRegionRequest, LookupRequest, MemoryType,
    MetadataMaxKeyLenRequest, ResizeRegionRequest,
};
use openfam::rpc_service::MetadataRpcService;
use std::sync::Arc;
use std::time::Duration;
use tonic::transport::Channel;

/// Find an available port for testing
fn find_available_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn spawn_server() -> (tokio::task::JoinHandle<()>, MetadataServiceClient<Channel>) {
    let port = find_available_port();
    let server_addr = format!("[::1]:{}", port);
    let client_addr = format!("http://[::1]:{}", port);

    let service = MetadataService::new(MetadataServiceConfig::default(), vec![0], vec![1]);
    let rpc = MetadataRpcService::new(Arc::new(service));

    let handle = tokio::spawn(async move {
        tonic::transport::Server::builder()
            .add_service(rpc.into_server())
            .serve(server_addr.parse().unwrap())
            .await
            .unwrap();
    });

    tokio::time::sleep(Duration::from_millis(100)).await;

    let client = MetadataServiceClient::connect(client_addr).await.unwrap();
    (handle, client)
}

#[tokio::test]
async fn test_create_allocate_lookup_destroy_round_trip() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("openfam=debug")
        .try_init();

    let (server_handle, mut client) = spawn_server().await;

    let create_resp = client
        .create_region(CreateRegionRequest {
            name: "region_a".into(),
            size: 4096,
            perm: 0o777,
            uid: 1000,
            gid: 1000,
            interleave_enable: false,
            interleave_size: 0,
            memory_type: MemoryType::Volatile as i32,
        })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(create_resp.errorcode, 0);
    let region_id = create_resp.region_id;

    let alloc_resp = client
        .allocate(AllocateRequest {
            region_id,
            name: "item1".into(),
            size: 256,
            perm: 0o777,
            uid: 1000,
            gid: 1000,
            dup: false,
        })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(alloc_resp.errorcode, 0);
    assert!(!alloc_resp.keys.is_empty());
    assert_eq!(alloc_resp.keys.len(), alloc_resp.bases.len());

    let lookup_resp = client
        .lookup(LookupRequest {
            item_name: "item1".into(),
            region_name: "region_a".into(),
            uid: 1000,
            gid: 1000,
        })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(lookup_resp.errorcode, 0);
    assert_eq!(lookup_resp.size, 256);

    let dealloc_resp = client
        .deallocate(DeallocateRequest {
            region_id,
            offset: alloc_resp.offset,
            uid: 1000,
            gid: 1000,
            key: 0,
        })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(dealloc_resp.errorcode, 0);

    let destroy_resp = client
        .destroy_region(DestroyRegionRequest {
            region_id,
            uid: 1000,
            gid: 1000,
        })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(destroy_resp.errorcode, 0);

    server_handle.abort();
}

#[tokio::test]
async fn test_permission_denied_across_uid() {
    let _ = tracing_subscriber::fmt().with_env_filter("warn").try_init();

    let (server_handle, mut client) = spawn_server().await;

    let create_resp = client
        .create_region(CreateRegionRequest {
            name: "private_region".into(),
            size: 4096,
            perm: 0o700,
            uid: 1000,
            gid: 1000,
            interleave_enable: false,
            interleave_size: 0,
            memory_type: MemoryType::Volatile as i32,
        })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(create_resp.errorcode, 0);
    let region_id = create_resp.region_id;

    let resize_resp = client
        .resize_region(ResizeRegionRequest {
            region_id,
            size: 8192,
            uid: 2000,
            gid: 2000,
        })
        .await
        .unwrap()
        .into_inner();
    assert_ne!(resize_resp.errorcode, 0);

    let chmod_resp = client
        .change_region_permission(ChangeRegionPermissionRequest {
            region_id,
            perm: 0o777,
            uid: 2000,
            gid: 2000,
        })
        .await
        .unwrap()
        .into_inner();
    assert_ne!(chmod_resp.errorcode, 0);

    server_handle.abort();
}

#[tokio::test]
async fn test_lookup_region_by_name() {
    let _ = tracing_subscriber::fmt().with_env_filter("warn").try_init();

    let (server_handle, mut client) = spawn_server().await;

    let create_resp = client
        .create_region(CreateRegionRequest {
            name: "named_region".into(),
            size: 2048,
            perm: 0o777,
            uid: 1000,
            gid: 1000,
            interleave_enable: false,
            interleave_size: 0,
            memory_type: MemoryType::Volatile as i32,
        })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(create_resp.errorcode, 0);

    let lookup_resp = client
        .lookup_region(LookupRegionRequest {
            name: "named_region".into(),
            uid: 1000,
            gid: 1000,
        })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(lookup_resp.errorcode, 0);
    assert_eq!(lookup_resp.region_id, create_resp.region_id);
    assert_eq!(lookup_resp.size, 2048);

    let missing_resp = client
        .lookup_region(LookupRegionRequest {
            name: "does_not_exist".into(),
            uid: 1000,
            gid: 1000,
        })
        .await
        .unwrap()
        .into_inner();
    assert_ne!(missing_resp.errorcode, 0);

    server_handle.abort();
}

#[tokio::test]
async fn test_metadata_max_key_len() {
    let (server_handle, mut client) = spawn_server().await;

    let resp = client
        .metadata_max_key_len(MetadataMaxKeyLenRequest {})
        .await
        .unwrap()
        .into_inner();
    assert_eq!(resp.max_key_len, 255);

    server_handle.abort();
}
