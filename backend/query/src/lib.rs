//! `treeprobe-query`: the introspection query language.
//!
//! Provides:
//! - Query segments with ordered equality predicates
//! - The compiler producing the canonical query string
//! - Server/client predicate splitting
//! - A parser for compiled query strings

pub mod compiler;
pub mod parser;
pub mod query;
pub mod segment;

pub use compiler::{compile, is_server_side_predicate};
pub use parser::parse_query;
pub use query::Query;
pub use segment::{Filters, Segment, PARENT, WILDCARD};
