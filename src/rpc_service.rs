//! gRPC binding for the metadata service: translates generated `pb::*`
//! messages to and from `metadata_service::MetadataService` calls.

use std::sync::Arc;

use tonic::{Request, Response, Status};

use crate::descriptor::SELF_OFFSET;
use crate::metadata_service::{
    AllocateDataitemParams, CopyParams, CreateRegionParams, MetadataService,
};
use crate::pb::metadata_service_server::MetadataService as MetadataServiceRpc;
use crate::pb::*;

pub struct MetadataRpcService {
    inner: Arc<MetadataService>,
}

impl MetadataRpcService {
    pub fn new(inner: Arc<MetadataService>) -> Self {
        Self { inner }
    }

    pub fn into_server(self) -> crate::pb::metadata_service_server::MetadataServiceServer<Self> {
        crate::pb::metadata_service_server::MetadataServiceServer::new(self)
    }
}

/// `errorcode = 0` means success; any other value pairs with `errormsg`.
fn status_fields(result: &crate::error::Result<()>) -> (u32, String) {
    match result {
        Ok(()) => (0, String::new()),
        Err(e) => (e.error_code(), e.to_string()),
    }
}

fn pb_memory_type(t: i32) -> crate::name_directory::MemoryType {
    match MemoryType::try_from(t) {
        Ok(MemoryType::Persistent) => crate::name_directory::MemoryType::Persistent,
        _ => crate::name_directory::MemoryType::Volatile,
    }
}

#[tonic::async_trait]
impl MetadataServiceRpc for MetadataRpcService {
    async fn create_region(
        &self,
        request: Request<CreateRegionRequest>,
    ) -> Result<Response<CreateRegionResponse>, Status> {
        let req = request.into_inner();
        tracing::debug!(name = %req.name, size = req.size, "create_region");

        let memory_type = pb_memory_type(req.memory_type);
        match self.inner.create_region(CreateRegionParams {
            name: req.name,
            size: req.size,
            perm: req.perm,
            uid: req.uid,
            gid: req.gid,
            interleave_enable: req.interleave_enable,
            interleave_size: req.interleave_size,
            memory_type,
        }) {
            Ok(descriptor) => Ok(Response::new(CreateRegionResponse {
                region_id: descriptor.region_id,
                offset: descriptor.offset,
                errorcode: 0,
                errormsg: String::new(),
            })),
            Err(e) => {
                tracing::warn!(error = %e, "create_region failed");
                Ok(Response::new(CreateRegionResponse {
                    region_id: 0,
                    offset: SELF_OFFSET,
                    errorcode: e.error_code(),
                    errormsg: e.to_string(),
                }))
            }
        }
    }

    async fn destroy_region(
        &self,
        request: Request<DestroyRegionRequest>,
    ) -> Result<Response<StatusResponse>, Status> {
        let req = request.into_inner();
        let result = self.inner.destroy_region(req.region_id, req.uid, req.gid);
        let (errorcode, errormsg) = status_fields(&result);
        Ok(Response::new(StatusResponse { errorcode, errormsg }))
    }

    async fn resize_region(
        &self,
        request: Request<ResizeRegionRequest>,
    ) -> Result<Response<StatusResponse>, Status> {
        let req = request.into_inner();
        let result = self
            .inner
            .resize_region(req.region_id, req.size, req.uid, req.gid);
        let (errorcode, errormsg) = status_fields(&result);
        Ok(Response::new(StatusResponse { errorcode, errormsg }))
    }

    async fn allocate(
        &self,
        request: Request<AllocateRequest>,
    ) -> Result<Response<AllocateResponse>, Status> {
        let req = request.into_inner();
        let name = if req.name.is_empty() { None } else { Some(req.name) };
        match self.inner.allocate_dataitem(AllocateDataitemParams {
            region_id: req.region_id,
            name,
            size: req.size,
            perm: req.perm,
            uid: req.uid,
            gid: req.gid,
            dup: req.dup,
        }) {
            Ok(handle) => Ok(Response::new(AllocateResponse {
                region_id: handle.descriptor.region_id,
                offset: handle.descriptor.offset,
                keys: handle.keys,
                bases: handle.bases,
                errorcode: 0,
                errormsg: String::new(),
            })),
            Err(e) => Ok(Response::new(AllocateResponse {
                region_id: req.region_id,
                offset: SELF_OFFSET,
                keys: Vec::new(),
                bases: Vec::new(),
                errorcode: e.error_code(),
                errormsg: e.to_string(),
            })),
        }
    }

    async fn deallocate(
        &self,
        request: Request<DeallocateRequest>,
    ) -> Result<Response<StatusResponse>, Status> {
        let req = request.into_inner();
        let result = self
            .inner
            .deallocate_dataitem(req.region_id, req.offset, req.uid, req.gid);
        let (errorcode, errormsg) = status_fields(&result);
        Ok(Response::new(StatusResponse { errorcode, errormsg }))
    }

    async fn change_region_permission(
        &self,
        request: Request<ChangeRegionPermissionRequest>,
    ) -> Result<Response<StatusResponse>, Status> {
        let req = request.into_inner();
        let result = self
            .inner
            .change_region_permission(req.region_id, req.perm, req.uid, req.gid);
        let (errorcode, errormsg) = status_fields(&result);
        Ok(Response::new(StatusResponse { errorcode, errormsg }))
    }

    async fn change_dataitem_permission(
        &self,
        request: Request<ChangeDataitemPermissionRequest>,
    ) -> Result<Response<StatusResponse>, Status> {
        let req = request.into_inner();
        let result = self.inner.change_dataitem_permission(
            req.region_id,
            req.offset,
            req.perm,
            req.uid,
            req.gid,
        );
        let (errorcode, errormsg) = status_fields(&result);
        Ok(Response::new(StatusResponse { errorcode, errormsg }))
    }

    async fn lookup_region(
        &self,
        request: Request<LookupRegionRequest>,
    ) -> Result<Response<LookupRegionResponse>, Status> {
        let req = request.into_inner();
        match self.inner.lookup_region(&req.name, req.uid, req.gid) {
            Ok((descriptor, size)) => Ok(Response::new(LookupRegionResponse {
                region_id: descriptor.region_id,
                offset: descriptor.offset,
                size,
                errorcode: 0,
                errormsg: String::new(),
            })),
            Err(e) => Ok(Response::new(LookupRegionResponse {
                region_id: 0,
                offset: SELF_OFFSET,
                size: 0,
                errorcode: e.error_code(),
                errormsg: e.to_string(),
            })),
        }
    }

    async fn lookup(
        &self,
        request: Request<LookupRequest>,
    ) -> Result<Response<LookupResponse>, Status> {
        let req = request.into_inner();
        match self
            .inner
            .lookup_dataitem(&req.item_name, &req.region_name, req.uid, req.gid)
        {
            Ok(handle) => Ok(Response::new(LookupResponse {
                region_id: handle.descriptor.region_id,
                offset: handle.descriptor.offset,
                size: handle.size,
                errorcode: 0,
                errormsg: String::new(),
            })),
            Err(e) => Ok(Response::new(LookupResponse {
                region_id: 0,
                offset: SELF_OFFSET,
                size: 0,
                errorcode: e.error_code(),
                errormsg: e.to_string(),
            })),
        }
    }

    async fn check_permission_get_region_info(
        &self,
        request: Request<CheckPermissionGetRegionInfoRequest>,
    ) -> Result<Response<RegionInfoResponse>, Status> {
        let req = request.into_inner();
        match self
            .inner
            .check_permission_get_region_info(req.region_id, req.uid, req.gid)
        {
            Ok(handle) => Ok(Response::new(RegionInfoResponse {
                size: handle.size,
                errorcode: 0,
                errormsg: String::new(),
            })),
            Err(e) => Ok(Response::new(RegionInfoResponse {
                size: 0,
                errorcode: e.error_code(),
                errormsg: e.to_string(),
            })),
        }
    }

    async fn check_permission_get_item_info(
        &self,
        request: Request<CheckPermissionGetItemInfoRequest>,
    ) -> Result<Response<ItemInfoResponse>, Status> {
        let req = request.into_inner();
        match self.inner.check_permission_get_item_info(
            req.region_id,
            req.offset,
            req.uid,
            req.gid,
        ) {
            Ok(handle) => Ok(Response::new(ItemInfoResponse {
                keys: handle.keys,
                size: handle.size,
                bases: handle.bases,
                errorcode: 0,
                errormsg: String::new(),
            })),
            Err(e) => Ok(Response::new(ItemInfoResponse {
                keys: Vec::new(),
                size: 0,
                bases: Vec::new(),
                errorcode: e.error_code(),
                errormsg: e.to_string(),
            })),
        }
    }

    async fn copy(&self, request: Request<CopyRequest>) -> Result<Response<CopyResponse>, Status> {
        let req = request.into_inner();
        match self.inner.copy(CopyParams {
            src_region_id: req.src_region_id,
            dest_region_id: req.dest_region_id,
            size: req.size,
            uid: req.uid,
            gid: req.gid,
        }) {
            Ok((tag, owning_memserver_id)) => Ok(Response::new(CopyResponse {
                tag,
                owning_memserver_id,
                errorcode: 0,
                errormsg: String::new(),
            })),
            Err(e) => Ok(Response::new(CopyResponse {
                tag: 0,
                owning_memserver_id: 0,
                errorcode: e.error_code(),
                errormsg: e.to_string(),
            })),
        }
    }

    async fn wait_for_copy(
        &self,
        request: Request<WaitForCopyRequest>,
    ) -> Result<Response<StatusResponse>, Status> {
        let req = request.into_inner();
        let result = self.inner.wait_for_copy(req.tag);
        let (errorcode, errormsg) = status_fields(&result);
        Ok(Response::new(StatusResponse { errorcode, errormsg }))
    }

    async fn acquire_cas_lock(
        &self,
        request: Request<CasLockRequest>,
    ) -> Result<Response<StatusResponse>, Status> {
        let req = request.into_inner();
        let result = self.inner.acquire_cas_lock(req.region_id, req.offset);
        let (errorcode, errormsg) = status_fields(&result);
        Ok(Response::new(StatusResponse { errorcode, errormsg }))
    }

    async fn release_cas_lock(
        &self,
        request: Request<CasLockRequest>,
    ) -> Result<Response<StatusResponse>, Status> {
        let req = request.into_inner();
        let result = self.inner.release_cas_lock(req.region_id, req.offset);
        let (errorcode, errormsg) = status_fields(&result);
        Ok(Response::new(StatusResponse { errorcode, errormsg }))
    }

    async fn update_memory_server(
        &self,
        request: Request<UpdateMemoryServerRequest>,
    ) -> Result<Response<StatusResponse>, Status> {
        let req = request.into_inner();
        tracing::info!(
            persistent = req.persistent_list.len(),
            volatile = req.volatile_list.len(),
            "update_memory_server"
        );
        self.inner
            .update_memoryserver(req.persistent_list, req.volatile_list);
        Ok(Response::new(StatusResponse {
            errorcode: 0,
            errormsg: String::new(),
        }))
    }

    async fn metadata_max_key_len(
        &self,
        _request: Request<MetadataMaxKeyLenRequest>,
    ) -> Result<Response<MetadataMaxKeyLenResponse>, Status> {
        Ok(Response::new(MetadataMaxKeyLenResponse {
            max_key_len: self.inner.max_key_len(),
        }))
    }

    async fn reset_bitmap(
        &self,
        request: Request<ResetBitmapRequest>,
    ) -> Result<Response<StatusResponse>, Status> {
        let req = request.into_inner();
        self.inner.reset_bitmap(req.region_id);
        Ok(Response::new(StatusResponse {
            errorcode: 0,
            errormsg: String::new(),
        }))
    }

    async fn signal_start(
        &self,
        request: Request<SignalStartRequest>,
    ) -> Result<Response<SignalStartResponse>, Status> {
        let req = request.into_inner();
        tracing::info!(client_id = req.client_id, "signal_start");
        Ok(Response::new(SignalStartResponse {
            fabric_addr_name: self.inner.signal_start(),
        }))
    }

    async fn signal_termination(
        &self,
        request: Request<SignalTerminationRequest>,
    ) -> Result<Response<StatusResponse>, Status> {
        let req = request.into_inner();
        tracing::info!(client_id = req.client_id, "signal_termination");
        Ok(Response::new(StatusResponse {
            errorcode: 0,
            errormsg: String::new(),
        }))
    }
}

