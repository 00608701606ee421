//! Visit data model
//!
//! A [`Visit`] is one recorded access to a web resource. It is decoded from
//! broker payloads, cached by the hub and written to every subscriber using
//! the same JSON encoding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An access to a web resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    /// Time the resource was accessed
    pub timestamp: DateTime<Utc>,

    /// Identity of the client
    pub identity: String,

    /// The resource that was accessed
    #[serde(rename = "uri")]
    pub resource: Resource,
}

impl Visit {
    /// Create a new visit
    pub fn new(timestamp: DateTime<Utc>, identity: impl Into<String>, resource: Resource) -> Self {
        Self {
            timestamp,
            identity: identity.into(),
            resource,
        }
    }

    /// Decode a visit from its JSON encoding
    pub fn from_json(payload: &[u8]) -> crate::Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// Encode the visit as a JSON string
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Location of a resource
///
/// `port` and `path` are optional; an absent value is encoded as `null` and
/// stays distinct from an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub protocol: String,
    pub hostname: String,
    #[serde(default)]
    pub port: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

impl Resource {
    /// Create a resource with no port or path
    pub fn new(protocol: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            hostname: hostname.into(),
            port: None,
            path: None,
        }
    }

    /// Set the port
    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.port = Some(port.into());
        self
    }

    /// Set the path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}
