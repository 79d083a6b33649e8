//! Introspection sessions.
//!
//! A [`Session`] owns one backend and one read-only proxy registry. Sessions
//! share nothing, so several can run side by side in one process. Cloning a
//! session is cheap and yields a handle to the same backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};
use uuid::Uuid;

use treeprobe_config::{defaults, ProbeConfig};
use treeprobe_core::{IntrospectionTransport, Node, NotFoundReason, ProbeError, ProbeResult};
use treeprobe_query::Query;

use crate::backend::{Backend, BackendOptions};
use crate::polling::Poller;
use crate::proxy::ProxyObject;
use crate::registry::ProxyRegistry;

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub backend: BackendOptions,
    pub poll_interval: Duration,
    pub default_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            backend: BackendOptions::default(),
            poll_interval: Duration::from_millis(defaults::DEFAULT_POLL_INTERVAL_MS),
            default_timeout: Duration::from_millis(defaults::DEFAULT_TIMEOUT_MS),
        }
    }
}

impl SessionOptions {
    /// Options from a loaded config; unset fields fall back to the defaults.
    pub fn from_config(config: &ProbeConfig) -> Self {
        let fallback = Self::default();
        let protocol = config.protocol.clone().unwrap_or_default();
        let polling = config.polling.clone().unwrap_or_default();
        let query = config.query.clone().unwrap_or_default();

        Self {
            backend: BackendOptions {
                expected_version: protocol
                    .expected_version
                    .unwrap_or(fallback.backend.expected_version),
                large_result_warning: query
                    .large_result_warning
                    .unwrap_or(fallback.backend.large_result_warning),
                skip_malformed_nodes: query
                    .skip_malformed_nodes
                    .unwrap_or(fallback.backend.skip_malformed_nodes),
            },
            poll_interval: polling
                .interval_ms
                .map(Duration::from_millis)
                .unwrap_or(fallback.poll_interval),
            default_timeout: polling
                .default_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(fallback.default_timeout),
        }
    }
}

#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    id: Uuid,
    backend: Backend,
    registry: Arc<ProxyRegistry>,
    poll_interval: Duration,
    default_timeout: Duration,
}

impl Session {
    /// The registry is frozen from here on.
    pub fn new(
        transport: Arc<dyn IntrospectionTransport>,
        registry: impl Into<Arc<ProxyRegistry>>,
        options: SessionOptions,
    ) -> Self {
        let registry = registry.into();
        let id = Uuid::new_v4();
        info!(
            session = %id,
            expected_version = %options.backend.expected_version,
            proxy_classes = registry.len(),
            "Introspection session created"
        );
        Self {
            inner: Arc::new(SessionInner {
                id,
                backend: Backend::new(transport, options.backend),
                registry,
                poll_interval: options.poll_interval,
                default_timeout: options.default_timeout,
            }),
        }
    }

    pub fn from_config(
        transport: Arc<dyn IntrospectionTransport>,
        registry: impl Into<Arc<ProxyRegistry>>,
        config: &ProbeConfig,
    ) -> Self {
        Self::new(transport, registry, SessionOptions::from_config(config))
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn registry(&self) -> &ProxyRegistry {
        &self.inner.registry
    }

    pub fn default_timeout(&self) -> Duration {
        self.inner.default_timeout
    }

    pub fn poller(&self, timeout: Duration) -> Poller {
        Poller::new(self.inner.poll_interval, timeout)
    }

    /// Execute a query and return the decoded nodes without binding them.
    pub async fn execute(&self, query: &Query) -> ProbeResult<Vec<Node>> {
        let result = self.inner.backend.execute(query).await;
        if let Err(e) = &result {
            debug!(session = %self.id(), query = %query, error = %e, "Query failed");
        }
        result
    }

    /// All nodes matching `query`, bound to their proxy classes. May be empty.
    pub async fn select_many(&self, query: &Query) -> ProbeResult<Vec<ProxyObject>> {
        self.execute(query)
            .await?
            .into_iter()
            .map(|node| self.bind(node))
            .collect()
    }

    /// Exactly one node matching `query`; zero or several is `StateNotFound`.
    pub async fn select_single(&self, query: &Query) -> ProbeResult<ProxyObject> {
        let mut nodes = self.execute(query).await?;
        match nodes.len() {
            0 => Err(ProbeError::not_found(query.to_string(), NotFoundReason::NoMatch)),
            1 => self.bind(nodes.remove(0)),
            n => Err(ProbeError::not_found(query.to_string(), NotFoundReason::Ambiguous(n))),
        }
    }

    /// Poll [`select_single`](Self::select_single) until it finds exactly one
    /// node. Only "no match" is retried; ambiguity fails at once.
    pub async fn wait_select_single(
        &self,
        query: &Query,
        timeout: Duration,
    ) -> ProbeResult<ProxyObject> {
        let found = self
            .poller(timeout)
            .run(|| async move {
                match self.select_single(query).await {
                    Ok(proxy) => Ok(Some(proxy)),
                    Err(e) if e.is_no_match() => Ok(None),
                    Err(e) => Err(e),
                }
            })
            .await?;
        found.ok_or_else(|| {
            ProbeError::not_found(query.to_string(), NotFoundReason::TimedOut(timeout))
        })
    }

    /// Poll until `query` yields at least `min_count` nodes.
    pub async fn wait_select_many(
        &self,
        query: &Query,
        min_count: usize,
        timeout: Duration,
    ) -> ProbeResult<Vec<ProxyObject>> {
        let last_seen = AtomicUsize::new(0);
        let last_seen = &last_seen;
        let found = self
            .poller(timeout)
            .run(|| async move {
                let proxies = self.select_many(query).await?;
                last_seen.store(proxies.len(), Ordering::Relaxed);
                Ok::<_, ProbeError>((proxies.len() >= min_count).then_some(proxies))
            })
            .await?;
        found.ok_or_else(|| {
            ProbeError::not_found(
                query.to_string(),
                NotFoundReason::TooFew {
                    wanted: min_count,
                    found: last_seen.load(Ordering::Relaxed),
                },
            )
        })
    }

    /// The root of the tree, whatever its name.
    pub async fn root(&self) -> ProbeResult<ProxyObject> {
        self.select_single(&Query::pseudo_tree_root()).await
    }

    pub(crate) fn bind(&self, node: Node) -> ProbeResult<ProxyObject> {
        let class = self.inner.registry.resolve(&node)?;
        let query = Query::from_path_and_id(node.path(), node.id())?;
        Ok(ProxyObject::new(node, class, query, self.clone()))
    }
}
