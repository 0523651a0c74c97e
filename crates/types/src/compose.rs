//! Composable resource model exposed over the extension surface.
//!
//! These structs are encoded with bincode onto the extension wire, where
//! fields travel by ordinal position. The declaration order below is the
//! wire contract and must not change; append new fields at the end.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// A named, typed entry in the project model whose configuration is opaque
/// to the host.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, Encode, Decode)]
pub struct ComposedResource {
    /// Unique name within the project (wire ordinal 1)
    pub name: String,
    /// Catalog type id, e.g. "db.postgres" (wire ordinal 2)
    pub r#type: String,
    /// Opaque configuration blob owned by the extension (wire ordinal 3)
    #[serde(default, with = "config_bytes")]
    pub config: Vec<u8>,
    /// Names of sibling resources this resource consumes (wire ordinal 4)
    #[serde(default)]
    pub uses: Vec<String>,
    /// Remote identity once provisioned (wire ordinal 5)
    #[serde(default)]
    pub resource_id: Option<String>,
}

/// A catalog entry describing one composable resource type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, Encode, Decode)]
pub struct ComposedResourceType {
    /// Catalog id, e.g. "db.postgres" (wire ordinal 1)
    pub name: String,
    /// Human-readable name shown in pickers (wire ordinal 2)
    pub display_name: String,
    /// Backing control-plane resource type (wire ordinal 3)
    pub r#type: String,
    /// Type variants, e.g. container app kinds (wire ordinal 4)
    #[serde(default)]
    pub kinds: Vec<String>,
}

/// JSON project files carry the opaque config blob base64-encoded.
mod config_bytes {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
