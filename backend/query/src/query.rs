//! Immutable introspection queries.
//!
//! A [`Query`] is built from a root, a path, or an existing query plus one
//! more segment. Every constructor validates eagerly, so a `Query` value
//! always compiles. Predicates that cannot be sent over the wire stay on the
//! last segment and are reported by [`Query::client_side_filters`].

use std::fmt;

use serde::Serialize;
use treeprobe_core::{Literal, ProbeError, ProbeResult};

use crate::compiler::{compile, is_server_side_predicate};
use crate::segment::{Filters, Segment, PARENT};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Query {
    segments: Vec<Segment>,
    server_query: String,
    client_filters: Filters,
}

impl Query {
    /// Validate a full segment list.
    pub fn from_segments(segments: Vec<Segment>) -> ProbeResult<Self> {
        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| ProbeError::invalid_query("a query needs at least one segment"))?;

        for parent in parents {
            let (_, client) = split_predicates(&parent.predicates);
            if !client.is_empty() {
                return Err(ProbeError::invalid_query(format!(
                    "only the last segment may need client-side filtering, but '{}' does",
                    parent.name
                )));
            }
        }

        let (server, client_filters) = split_predicates(&last.predicates);
        let mut wire_segments = segments.clone();
        if let Some(wire_last) = wire_segments.last_mut() {
            wire_last.predicates = server;
        }
        let server_query = compile(&wire_segments)?;

        Ok(Self {
            segments,
            server_query,
            client_filters,
        })
    }

    /// Query selecting the root node by name, e.g. `/AppName`.
    pub fn root(app_name: &str) -> ProbeResult<Self> {
        Self::from_segments(vec![Segment::child(app_name)])
    }

    /// Query selecting the tree root without knowing its name.
    ///
    /// The result cannot be extended; use [`Query::root`] when the name is
    /// known.
    pub fn pseudo_tree_root() -> Self {
        Self {
            segments: vec![Segment::tree_root()],
            server_query: "/".to_string(),
            client_filters: Filters::new(),
        }
    }

    /// Search the entire tree for `name`, e.g. `//Button[visible=True]`.
    ///
    /// This can be slow on large trees; prefer absolute queries.
    pub fn whole_tree_search(name: &str, filters: Filters) -> ProbeResult<Self> {
        Self::from_segments(vec![Segment::descendant(name).with_predicates(filters)])
    }

    /// Rebuild the query addressing one object from its full path and id.
    pub fn from_path_and_id(path: &str, id: i64) -> ProbeResult<Self> {
        let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
        if !path.starts_with('/') || components.is_empty() {
            return Err(ProbeError::invalid_query(format!("invalid path '{path}'")));
        }
        let last = components.len() - 1;
        let segments = components
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let segment = Segment::child(*name);
                if i == last {
                    segment.with("id", id)
                } else {
                    segment
                }
            })
            .collect();
        Self::from_segments(segments)
    }

    /// Immediate children named `name` (or any type, with [`WILDCARD`]).
    pub fn select_child(&self, name: &str, filters: Filters) -> ProbeResult<Self> {
        self.extend(Segment::child(name).with_predicates(filters))
    }

    /// Nodes named `name` anywhere beneath this query's result.
    pub fn select_descendant(&self, name: &str, filters: Filters) -> ProbeResult<Self> {
        self.extend(Segment::descendant(name).with_predicates(filters))
    }

    /// The parent of this query's result. On the root the remote side returns
    /// the root itself.
    pub fn select_parent(&self) -> ProbeResult<Self> {
        self.extend(Segment::child(PARENT))
    }

    fn extend(&self, segment: Segment) -> ProbeResult<Self> {
        if self.needs_client_side_filtering() {
            return Err(ProbeError::invalid_query(
                "cannot create a new query from a parent that requires client-side filtering",
            ));
        }
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self::from_segments(segments)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The compiled string sent to `GetState`, without client-side predicates.
    pub fn server_query(&self) -> &str {
        &self.server_query
    }

    pub fn client_side_filters(&self) -> &Filters {
        &self.client_filters
    }

    pub fn needs_client_side_filtering(&self) -> bool {
        !self.client_filters.is_empty()
    }

    /// Type name requested by the last segment.
    pub fn target_name(&self) -> &str {
        self.segments.last().map(|s| s.name.as_str()).unwrap_or_default()
    }
}

fn split_predicates(predicates: &Filters) -> (Filters, Filters) {
    predicates.partition(|key: &str, value: &Literal| is_server_side_predicate(key, value))
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.server_query)?;
        if self.needs_client_side_filtering() {
            let keys: Vec<_> = self.client_filters.iter().map(|(k, _)| k).collect();
            write!(f, " (client-side: {})", keys.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::WILDCARD;
    use treeprobe_core::{Rectangle, WireValue};

    #[test]
    fn builds_from_root() {
        let q = Query::root("Unity")
            .unwrap()
            .select_descendant("Launcher", Filters::new().with("visible", true))
            .unwrap()
            .select_child("Icon", Filters::new())
            .unwrap();
        assert_eq!(q.server_query(), "/Unity//Launcher[visible=True]/Icon");
        assert!(!q.needs_client_side_filtering());
        assert_eq!(q.target_name(), "Icon");
    }

    #[test]
    fn pseudo_tree_root_cannot_be_extended() {
        let root = Query::pseudo_tree_root();
        assert_eq!(root.server_query(), "/");
        assert!(root.select_child("App", Filters::new()).is_err());
        assert!(root.select_parent().is_err());
    }

    #[test]
    fn unrepresentable_predicates_move_client_side() {
        let rect = WireValue::Rectangle(Rectangle::new(0, 0, 10, 10));
        let q = Query::root("App")
            .unwrap()
            .select_descendant(
                "Button",
                Filters::new()
                    .with("objectName", "ok")
                    .with("globalRect", rect.clone()),
            )
            .unwrap();
        assert_eq!(q.server_query(), r#"/App//Button[objectName="ok"]"#);
        assert_eq!(q.client_side_filters().get("globalRect"), Some(&Literal::Value(rect)));
        assert!(q.to_string().ends_with("(client-side: globalRect)"));
    }

    #[test]
    fn non_ascii_strings_move_client_side() {
        let q = Query::root("App")
            .unwrap()
            .select_child(
                "Label",
                Filters::new().with("visible", true).with("text", "Grüße"),
            )
            .unwrap();
        assert_eq!(q.server_query(), "/App/Label[visible=True]");
        assert_eq!(q.client_side_filters().get("text"), Some(&Literal::from("Grüße")));
    }

    #[test]
    fn client_filtered_query_cannot_be_extended() {
        let q = Query::root("App")
            .unwrap()
            .select_child("Panel", Filters::new().with("serial", 1_i64 << 40))
            .unwrap();
        assert!(q.needs_client_side_filtering());
        let err = q.select_child("Button", Filters::new()).unwrap_err();
        assert!(matches!(err, ProbeError::InvalidQuery(_)));
    }

    #[test]
    fn wildcard_descendant_needs_a_server_predicate() {
        let root = Query::root("App").unwrap();
        assert!(root.select_descendant(WILDCARD, Filters::new()).is_err());

        let rect = WireValue::Rectangle(Rectangle::new(0, 0, 1, 1));
        assert!(root
            .select_descendant(WILDCARD, Filters::new().with("globalRect", rect))
            .is_err());

        let q = root
            .select_descendant(WILDCARD, Filters::new().with("objectName", "x"))
            .unwrap();
        assert_eq!(q.server_query(), r#"/App//*[objectName="x"]"#);
    }

    #[test]
    fn from_path_and_id_addresses_one_object() {
        let q = Query::from_path_and_id("/Unity/Panel/Button", 12).unwrap();
        assert_eq!(q.server_query(), "/Unity/Panel/Button[id=12]");

        let big = Query::from_path_and_id("/Unity", 1_i64 << 40).unwrap();
        assert_eq!(big.server_query(), "/Unity");
        assert!(big.needs_client_side_filtering());

        assert!(Query::from_path_and_id("Unity", 1).is_err());
        assert!(Query::from_path_and_id("/", 1).is_err());
    }

    #[test]
    fn whole_tree_search_is_relative() {
        let q = Query::whole_tree_search("Button", Filters::new()).unwrap();
        assert_eq!(q.server_query(), "//Button");
    }

    #[test]
    fn parent_selection() {
        let q = Query::root("App").unwrap().select_parent().unwrap();
        assert_eq!(q.server_query(), "/App/..");
    }
}
