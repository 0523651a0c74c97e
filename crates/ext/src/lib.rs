//! Local extension RPC surface.
//!
//! Out-of-tree extension processes observe and mutate the composable project
//! model through a small request/response protocol: length-prefixed frames
//! carrying schema-versioned bincode messages over a local byte stream. The
//! CLI serves it on a Unix socket; tests drive it over in-memory duplex
//! pipes.

pub mod client;
pub mod server;
pub mod wire;

pub use client::{ExtClientError, ExtensionClient};
pub use server::ExtensionService;
pub use wire::{PROTOCOL_VERSION, RequestTag, StatusCode, WireError};
