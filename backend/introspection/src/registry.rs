//! Proxy resolver.
//!
//! A closed registry of proxy classes. Each registration names the type it
//! targets and may carry a match predicate; resolving a node gathers every
//! registration that applies to it and refuses to pick when more than one
//! does.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use treeprobe_core::{Attributes, Node, ProbeError, ProbeResult};

use crate::proxy::ProxyObject;

/// Match predicate over a node's path and decoded attributes.
pub type Matcher = Arc<dyn Fn(&str, &Attributes) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct Registration {
    class_name: String,
    type_name: String,
    matcher: Option<Matcher>,
}

impl Registration {
    /// A registration applying to every node whose type is `type_name`.
    pub fn new(class_name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            type_name: type_name.into(),
            matcher: None,
        }
    }

    /// Replace the type-name check with a custom predicate.
    pub fn with_matcher<F>(mut self, matcher: F) -> Self
    where
        F: Fn(&str, &Attributes) -> bool + Send + Sync + 'static,
    {
        self.matcher = Some(Arc::new(matcher));
        self
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Type name used when this class is the target of a query.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn applies_to(&self, node: &Node) -> bool {
        match &self.matcher {
            Some(matcher) => matcher(node.path(), node.attributes()),
            None => node.type_name() == self.type_name,
        }
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("class_name", &self.class_name)
            .field("type_name", &self.type_name)
            .field("has_matcher", &self.matcher.is_some())
            .finish()
    }
}

/// A typed wrapper around [`ProxyObject`] for one registered class.
pub trait CustomProxy: Sized {
    const CLASS_NAME: &'static str;

    fn type_name() -> &'static str {
        Self::CLASS_NAME
    }

    fn registration() -> Registration {
        Registration::new(Self::CLASS_NAME, Self::type_name())
    }

    fn from_proxy(proxy: ProxyObject) -> Self;
}

/// The class a node was bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyClass {
    Generic,
    Custom(String),
}

impl ProxyClass {
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Generic => None,
            Self::Custom(name) => Some(name),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProxyRegistry {
    registrations: Vec<Registration>,
}

impl ProxyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, registration: Registration) -> ProbeResult<()> {
        if self.get(registration.class_name()).is_some() {
            return Err(ProbeError::DuplicateProxyClass(registration.class_name));
        }
        debug!(
            class = %registration.class_name,
            type_name = %registration.type_name,
            "Registered proxy class"
        );
        self.registrations.push(registration);
        Ok(())
    }

    pub fn register_proxy<T: CustomProxy>(&mut self) -> ProbeResult<()> {
        self.register(T::registration())
    }

    pub fn get(&self, class_name: &str) -> Option<&Registration> {
        self.registrations.iter().find(|r| r.class_name == class_name)
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Pick the class for `node`: generic when nothing applies, the single
    /// candidate when one does, [`ProbeError::AmbiguousProxy`] otherwise.
    pub fn resolve(&self, node: &Node) -> ProbeResult<ProxyClass> {
        let candidates: Vec<&Registration> = self
            .registrations
            .iter()
            .filter(|r| r.applies_to(node))
            .collect();

        match candidates.as_slice() {
            [] => Ok(ProxyClass::Generic),
            [only] => Ok(ProxyClass::Custom(only.class_name.clone())),
            many => Err(ProbeError::AmbiguousProxy {
                path: node.path().to_string(),
                candidates: many.iter().map(|r| r.class_name.clone()).collect(),
            }),
        }
    }
}
