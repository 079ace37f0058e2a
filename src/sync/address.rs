use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

use crate::membership::types::Node;

/// A routable peer address of the form `scheme://host[:port]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerUri(String);

impl PeerUri {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PeerUri {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<PeerUri> for String {
    fn from(uri: PeerUri) -> Self {
        uri.0
    }
}

/// Turns member addresses into peer URIs using a fixed scheme and port.
/// Only the IP of a member is used, so two members on the same host map to
/// the same URI.
#[derive(Debug, Clone)]
pub struct AddressBuilder {
    scheme: String,
    port: Option<u16>,
}

impl AddressBuilder {
    pub fn new(scheme: impl Into<String>, port: Option<u16>) -> Self {
        Self {
            scheme: scheme.into(),
            port,
        }
    }

    pub fn build_uri(&self, addr: IpAddr) -> PeerUri {
        let host = match addr {
            IpAddr::V4(v4) => v4.to_string(),
            IpAddr::V6(v6) => format!("[{}]", v6),
        };

        match self.port {
            Some(port) => PeerUri(format!("{}://{}:{}", self.scheme, host, port)),
            None => PeerUri(format!("{}://{}", self.scheme, host)),
        }
    }

    pub fn for_node(&self, node: &Node) -> PeerUri {
        self.build_uri(node.addr.ip())
    }
}
