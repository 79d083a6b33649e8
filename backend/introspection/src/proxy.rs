//! Selection façade.
//!
//! A [`ProxyObject`] is an immutable snapshot of one node plus the query
//! that addresses it again (path and id). Every selection it offers runs
//! relative to that query through the owning [`Session`].

use std::cmp::Ordering;
use std::fmt;
use std::time::Duration;

use serde_json::{Map, Value};

use treeprobe_core::{
    Attributes, Literal, Node, NotFoundReason, ProbeError, ProbeResult, WireValue,
};
use treeprobe_query::{Filters, Query, WILDCARD};

use crate::registry::{CustomProxy, ProxyClass};
use crate::session::Session;

#[derive(Clone)]
pub struct ProxyObject {
    node: Node,
    class: ProxyClass,
    query: Query,
    session: Session,
}

impl ProxyObject {
    pub(crate) fn new(node: Node, class: ProxyClass, query: Query, session: Session) -> Self {
        Self {
            node,
            class,
            query,
            session,
        }
    }

    // ------------------------------------------------------------------
    // Snapshot
    // ------------------------------------------------------------------

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn id(&self) -> i64 {
        self.node.id()
    }

    pub fn path(&self) -> &str {
        self.node.path()
    }

    pub fn type_name(&self) -> &str {
        self.node.type_name()
    }

    pub fn class(&self) -> &ProxyClass {
        &self.class
    }

    /// The query that finds this object again.
    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn attribute(&self, name: &str) -> Option<&WireValue> {
        self.node.attribute(name)
    }

    pub fn attributes(&self) -> &Attributes {
        self.node.attributes()
    }

    /// Every attribute as JSON, with `id` included.
    pub fn properties(&self) -> ProbeResult<Map<String, Value>> {
        let mut properties = Map::new();
        properties.insert("id".to_string(), Value::from(self.id()));
        for (name, value) in self.node.attributes() {
            let json = serde_json::to_value(value)
                .map_err(|e| ProbeError::decode(e.to_string()).for_attribute(name))?;
            properties.insert(name.clone(), json);
        }
        Ok(properties)
    }

    /// Convert into the typed proxy `T`, if the resolver bound this node to
    /// `T`'s registration. Returns `self` unchanged otherwise.
    pub fn downcast<T: CustomProxy>(self) -> Result<T, Self> {
        if self.class.name() == Some(T::CLASS_NAME) {
            Ok(T::from_proxy(self))
        } else {
            Err(self)
        }
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// The single descendant named `type_name` matching `filters`.
    pub async fn select_single(&self, type_name: &str, filters: Filters) -> ProbeResult<Self> {
        let query = self.query.select_descendant(type_name, filters)?;
        self.session.select_single(&query).await
    }

    /// Every descendant named `type_name` matching `filters`.
    pub async fn select_many(&self, type_name: &str, filters: Filters) -> ProbeResult<Vec<Self>> {
        let query = self.query.select_descendant(type_name, filters)?;
        self.session.select_many(&query).await
    }

    /// Like [`select_many`](Self::select_many), ordered by the given
    /// attributes. Objects lacking an attribute sort first; ties keep the
    /// remote order.
    pub async fn select_many_sorted(
        &self,
        type_name: &str,
        filters: Filters,
        sort_keys: &[&str],
    ) -> ProbeResult<Vec<Self>> {
        let mut proxies = self.select_many(type_name, filters).await?;
        sort_by_attributes(&mut proxies, sort_keys);
        Ok(proxies)
    }

    pub async fn wait_select_single(
        &self,
        type_name: &str,
        filters: Filters,
        timeout: Duration,
    ) -> ProbeResult<Self> {
        let query = self.query.select_descendant(type_name, filters)?;
        self.session.wait_select_single(&query, timeout).await
    }

    pub async fn wait_select_many(
        &self,
        type_name: &str,
        filters: Filters,
        min_count: usize,
        timeout: Duration,
    ) -> ProbeResult<Vec<Self>> {
        let query = self.query.select_descendant(type_name, filters)?;
        self.session.wait_select_many(&query, min_count, timeout).await
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    pub async fn get_children(&self) -> ProbeResult<Vec<Self>> {
        let query = self.query.select_child(WILDCARD, Filters::new())?;
        self.session.select_many(&query).await
    }

    /// Immediate children named `type_name` matching `filters`.
    pub async fn get_children_by_type(
        &self,
        type_name: &str,
        filters: Filters,
    ) -> ProbeResult<Vec<Self>> {
        let query = self.query.select_child(type_name, filters)?;
        self.session.select_many(&query).await
    }

    /// The parent object. The root is its own parent.
    pub async fn get_parent(&self) -> ProbeResult<Self> {
        let query = self.query.select_parent()?;
        self.session.select_single(&query).await
    }

    /// The nearest ancestor whose type is `type_name`.
    pub async fn get_parent_of_type(&self, type_name: &str) -> ProbeResult<Self> {
        let components: Vec<&str> = self.path().split('/').filter(|c| !c.is_empty()).collect();
        let own = components.len().saturating_sub(1);
        let Some(index) = components[..own].iter().rposition(|c| *c == type_name) else {
            return Err(ProbeError::not_found(
                format!("ancestor '{type_name}' of {}", self.path()),
                NotFoundReason::NoMatch,
            ));
        };

        let mut query = self.query.clone();
        for _ in index..own {
            query = query.select_parent()?;
        }
        self.session.select_single(&query).await
    }

    pub async fn get_root_instance(&self) -> ProbeResult<Self> {
        self.session.root().await
    }

    /// Every object in the tree with this object's type.
    pub async fn get_all_instances(&self) -> ProbeResult<Vec<Self>> {
        let query = Query::whole_tree_search(self.type_name(), Filters::new())?;
        self.session.select_many(&query).await
    }

    // ------------------------------------------------------------------
    // Freshness
    // ------------------------------------------------------------------

    /// A new snapshot of this object. `StateNotFound` once it is gone.
    pub async fn refresh(&self) -> ProbeResult<Self> {
        self.session.select_single(&self.query).await
    }

    /// Poll until `attribute` equals `expected`, returning the snapshot that
    /// satisfied it.
    pub async fn wait_for(
        &self,
        attribute: &str,
        expected: impl Into<Literal>,
        timeout: Duration,
    ) -> ProbeResult<Self> {
        let expected = expected.into();
        let expected_ref = &expected;
        let found = self
            .session
            .poller(timeout)
            .run(|| async move {
                let fresh = self.refresh().await?;
                Ok::<_, ProbeError>(fresh.node.matches(attribute, expected_ref).then_some(fresh))
            })
            .await?;
        found.ok_or_else(|| ProbeError::WaitTimeout {
            what: format!("{attribute} of {} to equal {expected:?}", self.path()),
            timeout,
        })
    }

    pub async fn wait_until_destroyed(&self, timeout: Duration) -> ProbeResult<()> {
        let gone = self
            .session
            .poller(timeout)
            .run(|| async move {
                let nodes = self.session.execute(&self.query).await?;
                Ok::<_, ProbeError>(nodes.is_empty().then_some(()))
            })
            .await?;
        gone.ok_or_else(|| ProbeError::WaitTimeout {
            what: format!("{} (id {}) to be destroyed", self.path(), self.id()),
            timeout,
        })
    }
}

impl fmt::Debug for ProxyObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyObject")
            .field("path", &self.path())
            .field("id", &self.id())
            .field("class", &self.class)
            .finish()
    }
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
enum SortValue<'a> {
    Missing,
    Id(i64),
    Value(&'a WireValue),
}

fn sort_value<'a>(proxy: &'a ProxyObject, key: &str) -> SortValue<'a> {
    if key == "id" {
        return SortValue::Id(proxy.id());
    }
    proxy
        .attribute(key)
        .map_or(SortValue::Missing, SortValue::Value)
}

fn sort_by_attributes(proxies: &mut [ProxyObject], keys: &[&str]) {
    proxies.sort_by(|a, b| {
        keys.iter()
            .map(|key| sort_value(a, key).cmp(&sort_value(b, key)))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    });
}
