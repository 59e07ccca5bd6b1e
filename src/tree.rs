//! In-memory tree model for parsed documents.
//!
//! Format-specific loaders (XML, HTML, ...) parse a byte stream into a
//! `Tree`; the extraction core borrows it read-only. Positions within a tree
//! are `NodeId` handles into an arena, so queries can move freely between
//! parents, children and siblings without reference cycles.

use indexmap::IndexMap;

/// Handle to a node within a [`Tree`].
///
/// A `NodeId` is only meaningful for the tree that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum NodeKind {
    Element {
        name: String,
        attributes: IndexMap<String, String>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// An arena-backed document tree.
///
/// Elements carry a name and string attributes; text is stored in dedicated
/// text nodes interleaved with element children, preserving document order.
///
/// # Example
///
/// ```
/// use gleaner::tree::Tree;
///
/// let mut tree = Tree::new("play");
/// let lines = tree.add_element(tree.root(), "lines");
/// tree.set_attribute(lines, "character", "HAMLET");
/// tree.add_text_element(lines, "l", "Whither wilt thou lead me?");
///
/// assert_eq!(tree.name(lines), Some("lines"));
/// assert_eq!(tree.attribute(lines, "character"), Some("HAMLET"));
/// ```
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Create a tree containing a single root element.
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Element {
                    name: root_name.into(),
                    attributes: IndexMap::new(),
                },
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// The root element of the tree.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Append a new element as the last child of `parent`.
    pub fn add_element(&mut self, parent: NodeId, name: impl Into<String>) -> NodeId {
        self.push_node(
            parent,
            NodeKind::Element {
                name: name.into(),
                attributes: IndexMap::new(),
            },
        )
    }

    /// Append a text node as the last child of `parent`.
    pub fn add_text(&mut self, parent: NodeId, text: impl Into<String>) -> NodeId {
        self.push_node(parent, NodeKind::Text(text.into()))
    }

    /// Append an element containing a single text child. Convenience for the
    /// common leaf shape, e.g. `<l>Mark me.</l>`.
    pub fn add_text_element(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        text: impl Into<String>,
    ) -> NodeId {
        let element = self.add_element(parent, name);
        self.add_text(element, text);
        element
    }

    /// Set an attribute on an element node. Overwrites any existing value.
    /// Ignored for text nodes.
    pub fn set_attribute(
        &mut self,
        node: NodeId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) {
        if let NodeKind::Element { attributes, .. } = &mut self.nodes[node.0].kind {
            attributes.insert(name.into(), value.into());
        }
    }

    fn push_node(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Whether `node` is an element (as opposed to a text node).
    pub fn is_element(&self, node: NodeId) -> bool {
        matches!(self.node(node).kind, NodeKind::Element { .. })
    }

    /// Element name, or `None` for text nodes.
    pub fn name(&self, node: NodeId) -> Option<&str> {
        match &self.node(node).kind {
            NodeKind::Element { name, .. } => Some(name),
            NodeKind::Text(_) => None,
        }
    }

    /// Attribute value on an element, or `None` when the attribute (or the
    /// element itself) is absent.
    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.node(node).kind {
            NodeKind::Element { attributes, .. } => attributes.get(name).map(|s| s.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    /// All attributes of an element in document order, or `None` for text
    /// nodes.
    pub fn attributes(&self, node: NodeId) -> Option<&IndexMap<String, String>> {
        match &self.node(node).kind {
            NodeKind::Element { attributes, .. } => Some(attributes),
            NodeKind::Text(_) => None,
        }
    }

    /// The parent of a node, or `None` at the root.
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).parent
    }

    /// All child nodes (elements and text) in document order.
    pub fn child_nodes(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.node(node).children.iter().copied()
    }

    /// Element children in document order.
    pub fn children(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.child_nodes(node).filter(|&c| self.is_element(c))
    }

    /// All element descendants of `node` in document (pre-)order, excluding
    /// `node` itself.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.node(node).children.iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            if self.is_element(current) {
                result.push(current);
            }
            stack.extend(self.node(current).children.iter().rev().copied());
        }
        result
    }

    /// Element siblings that precede `node`, in document order.
    pub fn preceding_siblings(&self, node: NodeId) -> Vec<NodeId> {
        self.siblings_of(node, true)
    }

    /// Element siblings that follow `node`, in document order.
    pub fn following_siblings(&self, node: NodeId) -> Vec<NodeId> {
        self.siblings_of(node, false)
    }

    fn siblings_of(&self, node: NodeId, preceding: bool) -> Vec<NodeId> {
        let Some(parent) = self.parent(node) else {
            return Vec::new();
        };
        let mut seen_self = false;
        let mut result = Vec::new();
        for sibling in self.children(parent) {
            if sibling == node {
                seen_self = true;
                continue;
            }
            if preceding != seen_self {
                result.push(sibling);
            }
        }
        result
    }

    /// Concatenated text content of `node` and its descendants, in document
    /// order. Whitespace is preserved exactly as the tree stores it.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut text = String::new();
        self.collect_text(node, &mut text);
        text
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        match &self.node(node).kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element { .. } => {
                for &child in &self.node(node).children {
                    self.collect_text(child, out);
                }
            }
        }
    }
}
