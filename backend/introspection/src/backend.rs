//! Query executor.
//!
//! Sends the wire-representable part of a [`Query`] to `GetState` and applies
//! the rest as client-side filters. The remote protocol version is checked
//! once, before the first `GetState` call.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use treeprobe_config::defaults::{DEFAULT_LARGE_RESULT_WARNING, DEFAULT_PROTOCOL_VERSION};
use treeprobe_core::{materialize, IntrospectionTransport, Node, ProbeError, ProbeResult, RawNode};
use treeprobe_query::Query;

#[derive(Debug, Clone)]
pub struct BackendOptions {
    pub expected_version: String,
    pub large_result_warning: usize,
    /// Drop nodes that fail to materialize instead of failing the query.
    pub skip_malformed_nodes: bool,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            expected_version: DEFAULT_PROTOCOL_VERSION.to_string(),
            large_result_warning: DEFAULT_LARGE_RESULT_WARNING,
            skip_malformed_nodes: false,
        }
    }
}

pub struct Backend {
    transport: Arc<dyn IntrospectionTransport>,
    options: BackendOptions,
    remote_version: OnceCell<String>,
}

impl Backend {
    pub fn new(transport: Arc<dyn IntrospectionTransport>, options: BackendOptions) -> Self {
        Self {
            transport,
            options,
            remote_version: OnceCell::new(),
        }
    }

    pub fn options(&self) -> &BackendOptions {
        &self.options
    }

    /// Check the remote protocol version, calling `GetVersion` at most once
    /// per backend. A mismatch is returned on every subsequent call too.
    pub async fn ensure_compatible(&self) -> ProbeResult<()> {
        let actual = self
            .remote_version
            .get_or_try_init(|| async {
                let version = self
                    .transport
                    .get_version()
                    .await
                    .map_err(ProbeError::Transport)?;
                info!(
                    remote = %version,
                    expected = %self.options.expected_version,
                    "Introspection protocol handshake"
                );
                Ok::<_, ProbeError>(version)
            })
            .await?;

        if *actual != self.options.expected_version {
            return Err(ProbeError::ProtocolVersionMismatch {
                expected: self.options.expected_version.clone(),
                actual: actual.clone(),
            });
        }
        Ok(())
    }

    /// Issue exactly one `GetState` call for the query and return the
    /// undecoded reply.
    pub async fn fetch_raw(&self, query: &Query) -> ProbeResult<Vec<RawNode>> {
        self.ensure_compatible().await?;

        let started = Instant::now();
        let reply = self
            .transport
            .get_state(query.server_query())
            .await
            .map_err(ProbeError::Transport)?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        debug!(query = %query, results = reply.len(), elapsed_ms, "GetState");
        if reply.len() > self.options.large_result_warning {
            warn!(
                query = %query,
                results = reply.len(),
                "Your query returned a lot of data; consider narrowing it"
            );
        }
        Ok(reply)
    }

    /// Execute a query: fetch, materialize and apply client-side filters.
    /// Nodes keep the order the remote side returned them in.
    pub async fn execute(&self, query: &Query) -> ProbeResult<Vec<Node>> {
        let reply = self.fetch_raw(query).await?;

        let mut nodes = Vec::with_capacity(reply.len());
        for raw in reply {
            match materialize(raw.path.as_str(), &raw.state) {
                Ok(node) => nodes.push(node),
                Err(e) if self.options.skip_malformed_nodes => {
                    warn!(path = %raw.path, error = %e, "Skipping malformed node");
                }
                Err(e) => return Err(e),
            }
        }

        let filters = query.client_side_filters();
        if !filters.is_empty() {
            let before = nodes.len();
            nodes.retain(|node| filters.iter().all(|(key, value)| node.matches(key, value)));
            debug!(
                query = %query,
                before,
                after = nodes.len(),
                "Applied client-side filters"
            );
        }
        Ok(nodes)
    }
}
