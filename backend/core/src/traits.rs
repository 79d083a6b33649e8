use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Undecoded attribute map: attribute name to wire value array.
pub type RawState = serde_json::Map<String, serde_json::Value>;

/// One `(path, attributes)` entry of a `GetState` reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
    pub path: String,
    pub state: RawState,
}

impl RawNode {
    pub fn new(path: impl Into<String>, state: RawState) -> Self {
        Self {
            path: path.into(),
            state,
        }
    }
}

/// The introspection channel exposed by the application under test.
///
/// Implementations carry the query to the remote side and hand back the raw
/// reply; they do no decoding of their own. A call either completes or
/// fails; retry policy, if any, belongs to the implementation.
#[async_trait]
pub trait IntrospectionTransport: Send + Sync {
    /// Wire protocol version spoken by the remote side, as `"<major>.<minor>"`.
    async fn get_version(&self) -> Result<String>;

    /// Run a compiled query and return every matching node.
    async fn get_state(&self, query: &str) -> Result<Vec<RawNode>>;
}
