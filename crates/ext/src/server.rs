//! Extension service host.
//!
//! The service is in-process with the host command and shares its project
//! model. Connections are served concurrently; within one connection
//! requests are handled strictly in arrival order. Mutations funnel through
//! the project's writer lock, so concurrent `AddResource` calls serialize.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use azd_project::{Project, ProjectError, resource_type_catalog};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::wire::{
    self, AddResourceRequest, Frame, GetResourceRequest, GetResourceTypeRequest, PROTOCOL_VERSION, RequestTag,
    StatusCode, WireError,
};

#[derive(Clone)]
pub struct ExtensionService {
    project: Arc<Project>,
}

impl ExtensionService {
    pub fn new(project: Arc<Project>) -> Self {
        Self { project }
    }

    /// Serve connections on a Unix socket until `cancellation` fires.
    ///
    /// A stale socket file from a previous run is removed before binding.
    pub async fn serve_unix(&self, socket_path: &Path, cancellation: CancellationToken) -> Result<()> {
        if socket_path.exists() {
            std::fs::remove_file(socket_path)
                .with_context(|| format!("remove stale socket {}", socket_path.display()))?;
        }
        let listener = UnixListener::bind(socket_path)
            .with_context(|| format!("bind extension socket {}", socket_path.display()))?;
        debug!(socket = %socket_path.display(), "extension service listening");

        let socket_guard = SocketGuard(socket_path.to_path_buf());
        loop {
            tokio::select! {
                _ = cancellation.cancelled() => break,
                accepted = listener.accept() => {
                    let (stream, _addr) = accepted.context("accept extension connection")?;
                    let service = self.clone();
                    tokio::spawn(async move {
                        if let Err(error) = service.handle_connection(stream).await {
                            warn!("extension connection failed: {error}");
                        }
                    });
                }
            }
        }
        drop(socket_guard);
        Ok(())
    }

    /// Serve one connection's requests in arrival order.
    pub async fn handle_connection<S: AsyncRead + AsyncWrite + Unpin>(&self, mut stream: S) -> Result<(), WireError> {
        while let Some(frame) = wire::read_frame(&mut stream).await? {
            let (status, body) = self.dispatch(&frame);
            wire::write_frame(&mut stream, status.as_u8(), &body).await?;
        }
        Ok(())
    }

    fn dispatch(&self, frame: &Frame) -> (StatusCode, Vec<u8>) {
        if frame.version != PROTOCOL_VERSION {
            return error_response(
                StatusCode::InvalidArgument,
                format!("unsupported protocol version {}", frame.version),
            );
        }
        let Some(tag) = RequestTag::from_u8(frame.tag) else {
            return error_response(StatusCode::InvalidArgument, format!("unrecognized message tag {}", frame.tag));
        };
        match self.handle(tag, &frame.body) {
            Ok(body) => (StatusCode::Ok, body),
            Err(failure) => error_response(failure.status, failure.message),
        }
    }

    fn handle(&self, tag: RequestTag, body: &[u8]) -> Result<Vec<u8>, RequestFailure> {
        match tag {
            RequestTag::ListResources => encode_ok(&self.project.list_resources()),
            RequestTag::GetResource => {
                let request: GetResourceRequest = decode_request(body)?;
                let resource = self.project.get_resource(&request.name).ok_or_else(|| RequestFailure {
                    status: StatusCode::NotFound,
                    message: format!("no resource named '{}' in the project", request.name),
                })?;
                encode_ok(&resource)
            }
            RequestTag::ListResourceTypes => encode_ok(&resource_type_catalog().to_vec()),
            RequestTag::GetResourceType => {
                let request: GetResourceTypeRequest = decode_request(body)?;
                let resource_type =
                    azd_project::find_resource_type(&request.type_name).ok_or_else(|| RequestFailure {
                        status: StatusCode::NotFound,
                        message: format!("no resource type named '{}'", request.type_name),
                    })?;
                encode_ok(resource_type)
            }
            RequestTag::AddResource => {
                let request: AddResourceRequest = decode_request(body)?;
                let added = self.project.add_resource(request.resource).map_err(|error| {
                    let status = match error {
                        ProjectError::DuplicateName(_) => StatusCode::AlreadyExists,
                        ProjectError::UnknownType(_) | ProjectError::EmptyName => StatusCode::InvalidArgument,
                    };
                    RequestFailure {
                        status,
                        message: error.to_string(),
                    }
                })?;
                encode_ok(&added)
            }
        }
    }
}

struct RequestFailure {
    status: StatusCode,
    message: String,
}

fn decode_request<T: bincode::Decode<()>>(body: &[u8]) -> Result<T, RequestFailure> {
    wire::decode(body).map_err(|error| RequestFailure {
        status: StatusCode::InvalidArgument,
        message: format!("malformed request body: {error}"),
    })
}

fn encode_ok<T: bincode::Encode>(value: &T) -> Result<Vec<u8>, RequestFailure> {
    wire::encode(value).map_err(|error| RequestFailure {
        status: StatusCode::Internal,
        message: format!("failed to encode response: {error}"),
    })
}

fn error_response(status: StatusCode, message: String) -> (StatusCode, Vec<u8>) {
    let body = wire::encode(&message).unwrap_or_default();
    (status, body)
}

/// Removes the socket file when the service stops.
struct SocketGuard(PathBuf);

impl Drop for SocketGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}
