//! Error taxonomy for the OpenFAM control plane.
//!
//! Every variant corresponds to one entry in the stable numeric taxonomy
//! described in the design docs and carries the wire error code that
//! `errorcode` in an RPC response is populated with.

use thiserror::Error;
use tonic::Status;

/// Stable numeric error codes carried on the wire (`errorcode` in every
/// RPC response). `0` is reserved for success and is never produced by
/// [`OpenFamError::error_code`].
pub mod code {
    pub const REGION_NAME_TOO_LONG: u32 = 1;
    pub const DATAITEM_NAME_TOO_LONG: u32 = 2;
    pub const REGION_EXIST: u32 = 3;
    pub const REGION_NOT_FOUND: u32 = 4;
    pub const DATAITEM_EXIST: u32 = 5;
    pub const DATAITEM_NOT_FOUND: u32 = 6;
    pub const NO_FREE_REGION_ID: u32 = 7;
    pub const NO_PERMISSION: u32 = 8;
    pub const REQUESTED_MEMORY_TYPE_NOT_AVAILABLE: u32 = 9;
    pub const OUT_OF_RANGE: u32 = 10;
    pub const METADATA_ERROR: u32 = 11;
    pub const RPC_ERROR: u32 = 12;
    pub const RPC_CLIENT_NOT_FOUND: u32 = 13;
    pub const UNIMPLEMENTED: u32 = 14;
}

#[derive(Debug, Error)]
pub enum OpenFamError {
    #[error("region name exceeds metadata_maxkeylen")]
    RegionNameTooLong,

    #[error("dataitem name exceeds metadata_maxkeylen")]
    DataitemNameTooLong,

    #[error("region already exists")]
    RegionExist,

    #[error("region not found")]
    RegionNotFound,

    #[error("dataitem already exists")]
    DataitemExist,

    #[error("dataitem not found")]
    DataitemNotFound,

    #[error("no free region id available")]
    NoFreeRegionId,

    #[error("insufficient permission")]
    NoPermission,

    #[error("requested memory type not available")]
    RequestedMemoryTypeNotAvailable,

    #[error("offset + size exceeds dataitem bounds")]
    OutOfRange,

    #[error("metadata error: {0}")]
    MetadataError(String),

    #[error("rpc error: {0}")]
    RpcError(String),

    #[error("no rpc client registered for memory server {0}")]
    RpcClientNotFound(u64),

    #[error("operation not implemented: {0}")]
    Unimplemented(&'static str),

    #[error("descriptor is not in a usable state: {0:?}")]
    InvalidDescriptor(crate::descriptor::DescriptorStatus),
}

impl OpenFamError {
    pub fn error_code(&self) -> u32 {
        use OpenFamError::*;
        match self {
            RegionNameTooLong => code::REGION_NAME_TOO_LONG,
            DataitemNameTooLong => code::DATAITEM_NAME_TOO_LONG,
            RegionExist => code::REGION_EXIST,
            RegionNotFound => code::REGION_NOT_FOUND,
            DataitemExist => code::DATAITEM_EXIST,
            DataitemNotFound => code::DATAITEM_NOT_FOUND,
            NoFreeRegionId => code::NO_FREE_REGION_ID,
            NoPermission => code::NO_PERMISSION,
            RequestedMemoryTypeNotAvailable => code::REQUESTED_MEMORY_TYPE_NOT_AVAILABLE,
            OutOfRange => code::OUT_OF_RANGE,
            MetadataError(_) => code::METADATA_ERROR,
            RpcError(_) => code::RPC_ERROR,
            RpcClientNotFound(_) => code::RPC_CLIENT_NOT_FOUND,
            Unimplemented(_) => code::UNIMPLEMENTED,
            InvalidDescriptor(_) => code::METADATA_ERROR,
        }
    }

    /// Whether the caller can usefully retry without changing inputs.
    /// Permission and not-found errors are not retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, OpenFamError::MetadataError(_) | OpenFamError::RpcError(_))
    }
}

pub type Result<T> = std::result::Result<T, OpenFamError>;

impl From<OpenFamError> for tonic::Status {
    fn from(err: OpenFamError) -> Self {
        use tonic::Code;
        let code = match &err {
            OpenFamError::RegionExist | OpenFamError::DataitemExist => Code::AlreadyExists,
            OpenFamError::RegionNotFound | OpenFamError::DataitemNotFound => Code::NotFound,
            OpenFamError::NoPermission => Code::PermissionDenied,
            OpenFamError::RegionNameTooLong | OpenFamError::DataitemNameTooLong => {
                Code::InvalidArgument
            }
            OpenFamError::RequestedMemoryTypeNotAvailable => Code::FailedPrecondition,
            OpenFamError::OutOfRange => Code::OutOfRange,
            OpenFamError::NoFreeRegionId => Code::ResourceExhausted,
            OpenFamError::Unimplemented(_) => Code::Unimplemented,
            OpenFamError::RpcClientNotFound(_) => Code::Unavailable,
            OpenFamError::MetadataError(_)
            | OpenFamError::RpcError(_)
            | OpenFamError::InvalidDescriptor(_) => Code::Internal,
        };
        let mut status = Status::new(code, err.to_string());
        if let Ok(value) = err.error_code().to_string().parse::<tonic::metadata::MetadataValue<tonic::metadata::Ascii>>() {
            status.metadata_mut().insert("openfam-error-code", value);
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable_and_nonzero() {
        assert_eq!(OpenFamError::RegionExist.error_code(), code::REGION_EXIST);
        assert_eq!(OpenFamError::NoPermission.error_code(), code::NO_PERMISSION);
        assert_ne!(OpenFamError::RegionNotFound.error_code(), 0);
    }

    #[test]
    fn permission_and_not_found_are_not_retryable() {
        assert!(!OpenFamError::NoPermission.is_retryable());
        assert!(!OpenFamError::RegionNotFound.is_retryable());
        assert!(OpenFamError::MetadataError("io".into()).is_retryable());
    }

    #[test]
    fn status_conversion_maps_kinds() {
        let status: tonic::Status = OpenFamError::RegionExist.into();
        assert_eq!(status.code(), tonic::Code::AlreadyExists);
        let status: tonic::Status = OpenFamError::NoPermission.into();
        assert_eq!(status.code(), tonic::Code::PermissionDenied);
    }
}
