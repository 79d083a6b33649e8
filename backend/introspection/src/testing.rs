//! Scripted transport for tests and offline fixtures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

use treeprobe_core::{IntrospectionTransport, RawNode};

type Responder = Box<dyn Fn(&str) -> Result<Vec<RawNode>> + Send + Sync>;

/// An [`IntrospectionTransport`] that answers from a script and records
/// every call it receives.
pub struct FakeTransport {
    version: String,
    responder: Responder,
    queries: Mutex<Vec<String>>,
    version_calls: AtomicUsize,
}

impl FakeTransport {
    /// A transport speaking `version` that answers every query with nothing.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            responder: Box::new(|_| Ok(Vec::new())),
            queries: Mutex::new(Vec::new()),
            version_calls: AtomicUsize::new(0),
        }
    }

    /// Answer every query with the same nodes.
    pub fn with_nodes(self, nodes: Vec<RawNode>) -> Self {
        self.with_responder(move |_| Ok(nodes.clone()))
    }

    /// Answer by exact query string; unknown queries return nothing.
    pub fn with_responses<I, Q>(self, responses: I) -> Self
    where
        I: IntoIterator<Item = (Q, Vec<RawNode>)>,
        Q: Into<String>,
    {
        let table: HashMap<String, Vec<RawNode>> = responses
            .into_iter()
            .map(|(query, nodes)| (query.into(), nodes))
            .collect();
        self.with_responder(move |query| Ok(table.get(query).cloned().unwrap_or_default()))
    }

    /// Compute each reply with a closure, e.g. to simulate a tree that
    /// changes over time or a failing bus.
    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&str) -> Result<Vec<RawNode>> + Send + Sync + 'static,
    {
        self.responder = Box::new(responder);
        self
    }

    /// Every query string received by `get_state`, in order.
    pub async fn queries(&self) -> Vec<String> {
        self.queries.lock().await.clone()
    }

    pub fn version_calls(&self) -> usize {
        self.version_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IntrospectionTransport for FakeTransport {
    async fn get_version(&self) -> Result<String> {
        self.version_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.version.clone())
    }

    async fn get_state(&self, query: &str) -> Result<Vec<RawNode>> {
        self.queries.lock().await.push(query.to_string());
        (self.responder)(query)
    }
}

/// Build a reply entry from a JSON object literal of wire arrays.
pub fn raw_node(path: &str, state: serde_json::Value) -> RawNode {
    RawNode::new(path, state.as_object().cloned().unwrap_or_default())
}
