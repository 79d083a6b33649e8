//! `treeprobe-introspection`: querying a live introspection tree.
//!
//! Provides:
//! - [`Backend`]: the query executor (version handshake, `GetState`,
//!   client-side filtering)
//! - [`ProxyRegistry`]: closed registry of proxy classes with loud conflicts
//! - [`ProxyObject`]: the selection façade bound to one node
//! - [`Session`]: ties a transport, a registry and polling options together
//! - [`testing::FakeTransport`]: scripted transport for tests

pub mod backend;
pub mod polling;
pub mod proxy;
pub mod registry;
pub mod session;
pub mod testing;

pub use backend::{Backend, BackendOptions};
pub use polling::Poller;
pub use proxy::ProxyObject;
pub use registry::{CustomProxy, Matcher, ProxyClass, ProxyRegistry, Registration};
pub use session::{Session, SessionOptions};
