//! Framing and message encoding for the extension protocol.
//!
//! Every frame is a big-endian `u32` payload length followed by the payload:
//! one protocol version byte, one numeric tag byte, then the bincode-encoded
//! message body. On requests the tag identifies the operation; on responses
//! it carries the status code. Struct fields travel by declaration order, so
//! the field layout of [`azd_types::ComposedResource`] and
//! [`azd_types::ComposedResourceType`] is part of this protocol.

use bincode::{Decode, Encode};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use azd_types::ComposedResource;

/// Version byte carried in every frame.
pub const PROTOCOL_VERSION: u8 = 1;

/// Upper bound on a frame payload; anything larger is a protocol error.
pub const MAX_FRAME_LEN: u32 = 4 * 1024 * 1024;

/// Numeric tags identifying request messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RequestTag {
    ListResources = 1,
    GetResource = 2,
    ListResourceTypes = 3,
    GetResourceType = 4,
    AddResource = 5,
}

impl RequestTag {
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::ListResources),
            2 => Some(Self::GetResource),
            3 => Some(Self::ListResourceTypes),
            4 => Some(Self::GetResourceType),
            5 => Some(Self::AddResource),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Well-known response status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StatusCode {
    Ok = 0,
    InvalidArgument = 3,
    NotFound = 5,
    AlreadyExists = 6,
    Internal = 13,
}

impl StatusCode {
    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Ok),
            3 => Some(Self::InvalidArgument),
            5 => Some(Self::NotFound),
            6 => Some(Self::AlreadyExists),
            13 => Some(Self::Internal),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Request body for [`RequestTag::GetResource`].
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct GetResourceRequest {
    pub name: String,
}

/// Request body for [`RequestTag::GetResourceType`].
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct GetResourceTypeRequest {
    pub type_name: String,
}

/// Request body for [`RequestTag::AddResource`].
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct AddResourceRequest {
    pub resource: ComposedResource,
}

/// One decoded frame: version, tag (or status), body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub version: u8,
    pub tag: u8,
    pub body: Vec<u8>,
}

/// Protocol-level failure.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("wire io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("frame of {len} bytes exceeds the {MAX_FRAME_LEN} byte limit")]
    Oversized { len: u32 },
    #[error("frame is too short to carry a header")]
    Truncated,
    #[error("failed to encode message: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("failed to decode message: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

/// Encode a message body with the protocol's bincode configuration.
pub fn encode<T: Encode>(value: &T) -> Result<Vec<u8>, WireError> {
    Ok(bincode::encode_to_vec(value, bincode::config::standard())?)
}

/// Decode a message body with the protocol's bincode configuration.
pub fn decode<T: Decode<()>>(bytes: &[u8]) -> Result<T, WireError> {
    let (value, _) = bincode::decode_from_slice(bytes, bincode::config::standard())?;
    Ok(value)
}

/// Write one frame.
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, tag: u8, body: &[u8]) -> Result<(), WireError> {
    let len = body.len() as u64 + 2;
    if len > MAX_FRAME_LEN as u64 {
        return Err(WireError::Oversized { len: len.min(u32::MAX as u64) as u32 });
    }
    writer.write_all(&(len as u32).to_be_bytes()).await?;
    writer.write_all(&[PROTOCOL_VERSION, tag]).await?;
    writer.write_all(body).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame; `None` on a clean end of stream.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Frame>, WireError> {
    let mut len_bytes = [0u8; 4];
    match reader.read_exact(&mut len_bytes).await {
        Ok(_) => {}
        Err(error) if error.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(error) => return Err(error.into()),
    }
    let len = u32::from_be_bytes(len_bytes);
    if len < 2 {
        return Err(WireError::Truncated);
    }
    if len > MAX_FRAME_LEN {
        return Err(WireError::Oversized { len });
    }
    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;
    let body = payload.split_off(2);
    Ok(Some(Frame {
        version: payload[0],
        tag: payload[1],
        body,
    }))
}
