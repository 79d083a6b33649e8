use serde::Serialize;
use treeprobe_core::Literal;

/// Name filter matching any type name.
pub const WILDCARD: &str = "*";

/// Name of the pseudo-segment that selects the parent node.
pub const PARENT: &str = "..";

/// Ordered equality predicates for one segment.
///
/// Keys are unique. Insertion order is kept so equal inputs always compile to
/// byte-identical query strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Filters {
    entries: Vec<(String, Literal)>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a predicate; a repeated key replaces the earlier value in place.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Literal>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Literal>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Literal> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Literal)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Split into the entries accepted by `keep` and the rest, preserving order.
    pub fn partition(&self, keep: impl Fn(&str, &Literal) -> bool) -> (Filters, Filters) {
        let (kept, rest): (Vec<_>, Vec<_>) =
            self.entries.iter().cloned().partition(|(k, v)| keep(k, v));
        (Filters { entries: kept }, Filters { entries: rest })
    }
}

impl<K: Into<String>, V: Into<Literal>> FromIterator<(K, V)> for Filters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut filters = Filters::new();
        for (k, v) in iter {
            filters.insert(k, v);
        }
        filters
    }
}

/// One step of a query path.
///
/// `relative` selects the `//` separator (search anywhere beneath the
/// previous segment) instead of `/` (immediate child). An empty name on the
/// first segment denotes the tree root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub name: String,
    pub relative: bool,
    pub predicates: Filters,
}

impl Segment {
    pub fn child(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            relative: false,
            predicates: Filters::new(),
        }
    }

    pub fn descendant(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            relative: true,
            predicates: Filters::new(),
        }
    }

    /// The empty root segment, rendered as a bare `/`.
    pub fn tree_root() -> Self {
        Self::child("")
    }

    pub fn with_predicates(mut self, predicates: Filters) -> Self {
        self.predicates = predicates;
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Literal>) -> Self {
        self.predicates.insert(key, value);
        self
    }

    pub fn is_wildcard(&self) -> bool {
        self.name == WILDCARD
    }

    pub fn is_parent(&self) -> bool {
        self.name == PARENT
    }

    pub fn is_tree_root(&self) -> bool {
        self.name.is_empty()
    }
}
