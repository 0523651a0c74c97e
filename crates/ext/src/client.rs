//! Typed client for the extension protocol.
//!
//! Extensions hold one connection and issue requests sequentially; the
//! server answers them in the same order.

use std::path::Path;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
#[cfg(unix)]
use tokio::net::UnixStream;

use azd_types::{ComposedResource, ComposedResourceType};

use crate::wire::{
    self, AddResourceRequest, GetResourceRequest, GetResourceTypeRequest, PROTOCOL_VERSION, RequestTag, StatusCode,
    WireError,
};

/// A call over the extension protocol failed.
#[derive(Debug, Error)]
pub enum ExtClientError {
    #[error(transparent)]
    Wire(#[from] WireError),
    #[error("the extension service closed the connection")]
    Disconnected,
    #[error("the extension service answered with protocol version {0}")]
    Version(u8),
    #[error("the extension service answered with unknown status {0}")]
    UnknownStatus(u8),
    #[error("{status:?}: {message}")]
    Status { status: StatusCode, message: String },
}

pub struct ExtensionClient<S> {
    stream: S,
}

#[cfg(unix)]
impl ExtensionClient<UnixStream> {
    /// Connect to a service listening on a Unix socket.
    pub async fn connect_unix(socket_path: &Path) -> Result<Self, ExtClientError> {
        let stream = UnixStream::connect(socket_path).await.map_err(WireError::Io)?;
        Ok(Self::new(stream))
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> ExtensionClient<S> {
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// All resources currently configured in the active project.
    pub async fn list_resources(&mut self) -> Result<Vec<ComposedResource>, ExtClientError> {
        self.call(RequestTag::ListResources, Vec::new()).await
    }

    /// One resource by name.
    pub async fn get_resource(&mut self, name: &str) -> Result<ComposedResource, ExtClientError> {
        let body = wire::encode(&GetResourceRequest { name: name.to_string() })?;
        self.call(RequestTag::GetResource, body).await
    }

    /// The static resource-type catalog.
    pub async fn list_resource_types(&mut self) -> Result<Vec<ComposedResourceType>, ExtClientError> {
        self.call(RequestTag::ListResourceTypes, Vec::new()).await
    }

    /// One catalog entry by type id.
    pub async fn get_resource_type(&mut self, type_name: &str) -> Result<ComposedResourceType, ExtClientError> {
        let body = wire::encode(&GetResourceTypeRequest {
            type_name: type_name.to_string(),
        })?;
        self.call(RequestTag::GetResourceType, body).await
    }

    /// Append a resource to the project; returns the normalized form.
    pub async fn add_resource(&mut self, resource: ComposedResource) -> Result<ComposedResource, ExtClientError> {
        let body = wire::encode(&AddResourceRequest { resource })?;
        self.call(RequestTag::AddResource, body).await
    }

    async fn call<T: bincode::Decode<()>>(&mut self, tag: RequestTag, body: Vec<u8>) -> Result<T, ExtClientError> {
        wire::write_frame(&mut self.stream, tag.as_u8(), &body).await?;
        let frame = wire::read_frame(&mut self.stream)
            .await?
            .ok_or(ExtClientError::Disconnected)?;
        if frame.version != PROTOCOL_VERSION {
            return Err(ExtClientError::Version(frame.version));
        }
        let status = StatusCode::from_u8(frame.tag).ok_or(ExtClientError::UnknownStatus(frame.tag))?;
        if status != StatusCode::Ok {
            let message: String = wire::decode(&frame.body).unwrap_or_default();
            return Err(ExtClientError::Status { status, message });
        }
        Ok(wire::decode(&frame.body)?)
    }
}
