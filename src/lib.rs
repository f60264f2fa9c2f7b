pub mod allocator_client;
pub mod bitmap;
pub mod descriptor;
pub mod dataitem_cache;
pub mod error;
pub mod heap;
pub mod kvs;
pub mod metadata_service;
pub mod name_directory;
pub mod permission;
pub mod placement;
pub mod rpc_service;
pub mod transport;

pub mod pb {
    tonic::include_proto!("openfam");
}

pub use descriptor::{Descriptor, GlobalDescriptor};
pub use error::{OpenFamError, Result};
pub use metadata_service::{MetadataService, MetadataServiceConfig};
pub use rpc_service::MetadataRpcService;
