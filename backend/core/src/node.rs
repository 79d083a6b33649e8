//! Tree node materializer.
//!
//! Turns one `(path, attributes)` reply entry into an immutable [`Node`].
//! Either every attribute decodes or the whole node is rejected.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{ProbeError, ProbeResult};
use crate::literal::Literal;
use crate::traits::RawState;
use crate::value::{decode_object_id, decode_value, PlainValue, Rectangle, WireValue};

/// Decoded attributes, keyed by their case-sensitive names.
pub type Attributes = BTreeMap<String, WireValue>;

const ID_KEY: &str = "id";
const CHILDREN_KEY: &str = "Children";
const GLOBAL_RECT_KEY: &str = "globalRect";

/// A decoded snapshot of one object in the introspection tree.
///
/// `id` identifies the object itself: the same object reached through two
/// paths carries the same id. `id` and `Children` are lifted out of the
/// attribute map into typed fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    path: String,
    id: i64,
    attributes: Attributes,
    children: Option<Vec<String>>,
    global_rect: Option<Rectangle>,
}

impl Node {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    /// Type name of the object: the last component of its path.
    pub fn type_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or_default()
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&WireValue> {
        self.attributes.get(name)
    }

    /// Type names of the immediate children, when the remote side declared them.
    pub fn children_type_names(&self) -> Option<&[String]> {
        self.children.as_deref()
    }

    pub fn global_rect(&self) -> Option<Rectangle> {
        self.global_rect
    }

    /// Equality check used for client-side predicates.
    pub fn matches(&self, key: &str, expected: &Literal) -> bool {
        if key == ID_KEY {
            return match expected {
                Literal::Int(id) => *id == self.id,
                Literal::Value(WireValue::Plain(PlainValue::Int(id))) => i64::from(*id) == self.id,
                _ => false,
            };
        }
        self.attribute(key).is_some_and(|value| expected.matches(value))
    }
}

/// Decode one reply entry into a [`Node`].
pub fn materialize(path: impl Into<String>, state: &RawState) -> ProbeResult<Node> {
    let path = path.into();

    let raw_id = state.get(ID_KEY).ok_or_else(|| ProbeError::MalformedNode {
        path: path.clone(),
        reason: "missing required 'id' attribute".to_string(),
    })?;
    let id = decode_object_id(raw_id).map_err(|e| ProbeError::MalformedNode {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    let mut attributes = Attributes::new();
    let mut children = None;
    for (key, raw) in state {
        if key == ID_KEY {
            continue;
        }
        let value = decode_value(raw).map_err(|e| e.for_attribute(key))?;
        if key == CHILDREN_KEY {
            children = Some(child_type_names(value).map_err(|e| e.for_attribute(key))?);
            continue;
        }
        attributes.insert(key.clone(), value);
    }

    let global_rect = match attributes.get(GLOBAL_RECT_KEY) {
        Some(WireValue::Rectangle(rect)) => Some(*rect),
        Some(other) => {
            warn!(path = %path, kind = ?other.value_type(), "globalRect is not a rectangle");
            None
        }
        None => None,
    };

    debug!(path = %path, id, attributes = attributes.len(), "Materialized node");
    Ok(Node {
        path,
        id,
        attributes,
        children,
        global_rect,
    })
}

fn child_type_names(value: WireValue) -> ProbeResult<Vec<String>> {
    match value {
        WireValue::Plain(PlainValue::List(items)) => items
            .into_iter()
            .map(|item| match item {
                PlainValue::Text(name) => Ok(name),
                other => Err(ProbeError::decode(format!(
                    "child type names must be strings, got {other:?}"
                ))),
            })
            .collect(),
        other => Err(ProbeError::decode(format!(
            "expected a list of child type names, got {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state(value: serde_json::Value) -> RawState {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn materializes_conventional_attributes() {
        let node = materialize(
            "/Unity",
            &state(json!({
                "id": [0, 0],
                "Children": [0, ["DashController", "PanelController"]],
                "globalRect": [1, 0, 0, 1920, 1080],
                "visible": [0, true],
            })),
        )
        .unwrap();

        assert_eq!(node.id(), 0);
        assert_eq!(node.type_name(), "Unity");
        assert_eq!(
            node.children_type_names().unwrap(),
            ["DashController", "PanelController"]
        );
        assert_eq!(node.global_rect(), Some(Rectangle::new(0, 0, 1920, 1080)));
        assert_eq!(node.attribute("visible"), Some(&WireValue::from(true)));
        assert!(node.attribute("id").is_none());
        assert!(node.attribute("Children").is_none());
    }

    #[test]
    fn conventional_attributes_are_optional() {
        let node = materialize("/App/Button", &state(json!({"id": [0, 3]}))).unwrap();
        assert!(node.children_type_names().is_none());
        assert!(node.global_rect().is_none());
        assert_eq!(node.type_name(), "Button");
    }

    #[test]
    fn missing_or_bad_id_is_fatal() {
        let err = materialize("/App", &state(json!({"visible": [0, true]}))).unwrap_err();
        assert!(matches!(err, ProbeError::MalformedNode { .. }), "{err}");

        let err = materialize("/App", &state(json!({"id": [0, "seven"]}))).unwrap_err();
        assert!(matches!(err, ProbeError::MalformedNode { .. }), "{err}");
    }

    #[test]
    fn one_bad_attribute_rejects_the_node() {
        let err = materialize(
            "/App",
            &state(json!({"id": [0, 1], "ok": [0, 1], "broken": [1, 1, 2]})),
        )
        .unwrap_err();
        match err {
            ProbeError::ValueDecode { attribute, .. } => {
                assert_eq!(attribute.as_deref(), Some("broken"));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn double_and_map_attributes_materialize() {
        let node = materialize(
            "/App/Overlay",
            &state(json!({"id": [0, 1], "opacity": [0, 0.5], "hints": [0, {"blur": 2.0}]})),
        )
        .unwrap();
        assert_eq!(node.attribute("opacity").and_then(WireValue::as_float), Some(0.5));
        assert!(node.matches("opacity", &Literal::from(WireValue::from(0.5))));
        assert!(matches!(
            node.attribute("hints"),
            Some(WireValue::Plain(PlainValue::Map(_)))
        ));
    }

    #[test]
    fn client_side_matching_covers_id() {
        let node = materialize("/App", &state(json!({"id": [0, 42], "name": [0, "x"]}))).unwrap();
        assert!(node.matches("id", &Literal::Int(42)));
        assert!(!node.matches("id", &Literal::Int(41)));
        assert!(node.matches("name", &Literal::from("x")));
        assert!(!node.matches("missing", &Literal::from("x")));
    }
}
