//! Declarative tag queries over a [`Tree`].
//!
//! A [`TagQuery`] is an ordered chain of [`TagQueryStep`]s describing a path
//! through a tree. Each step is a pure mapping from one position to an
//! ordered sequence of positions; evaluating a chain threads the position
//! set through every step in order. Steps never mutate the tree, and a step
//! that matches nothing simply collapses that branch of the search.

use std::fmt;
use std::sync::Arc;

use crate::tree::{NodeId, Tree};

/// Expected value of an attribute filter.
///
/// `Any` is a distinct wildcard case for attribute-presence checks, rather
/// than an absent-value convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrMatch {
    /// The attribute must be present with exactly this value.
    Value(String),
    /// The attribute must be present; any value matches.
    Any,
}

/// An equality constraint on one attribute of a candidate element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeFilter {
    pub name: String,
    pub expected: AttrMatch,
}

impl AttributeFilter {
    /// Filter requiring `name` to equal `value` (string comparison).
    pub fn value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expected: AttrMatch::Value(value.into()),
        }
    }

    /// Filter requiring `name` to be present, with any value.
    pub fn present(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expected: AttrMatch::Any,
        }
    }

    fn matches(&self, tree: &Tree, node: NodeId) -> bool {
        match (&self.expected, tree.attribute(node, &self.name)) {
            (AttrMatch::Any, Some(_)) => true,
            (AttrMatch::Value(expected), Some(actual)) => expected == actual,
            (_, None) => false,
        }
    }
}

/// Direction of a sibling step, relative to the current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiblingDirection {
    Preceding,
    Following,
}

/// Caller-supplied position mapping for the [`TagQueryStep::Transform`]
/// escape hatch.
pub type StepFn = Arc<dyn Fn(&Tree, NodeId) -> Vec<NodeId> + Send + Sync>;

/// One declarative move through a tree.
///
/// Every step is a pure function of `(tree, position)` returning an ordered
/// sequence of positions.
#[derive(Clone)]
pub enum TagQueryStep {
    /// Select children matching a name and attribute filters. With
    /// `recursive`, matching descends to any depth below the current
    /// position, in document (pre-)order; otherwise only direct children
    /// are considered.
    Child {
        name: String,
        filters: Vec<AttributeFilter>,
        recursive: bool,
    },
    /// Move up `levels` ancestors. Produces zero positions past the root.
    Parent { levels: usize },
    /// Select siblings matching a name and filters, in the given direction.
    Sibling {
        name: String,
        direction: SiblingDirection,
        filters: Vec<AttributeFilter>,
    },
    /// Arbitrary position mapping for logic the algebra cannot express.
    Transform(StepFn),
}

impl fmt::Debug for TagQueryStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagQueryStep::Child {
                name,
                filters,
                recursive,
            } => f
                .debug_struct("Child")
                .field("name", name)
                .field("filters", filters)
                .field("recursive", recursive)
                .finish(),
            TagQueryStep::Parent { levels } => {
                f.debug_struct("Parent").field("levels", levels).finish()
            }
            TagQueryStep::Sibling {
                name,
                direction,
                filters,
            } => f
                .debug_struct("Sibling")
                .field("name", name)
                .field("direction", direction)
                .field("filters", filters)
                .finish(),
            TagQueryStep::Transform(_) => f.write_str("Transform(..)"),
        }
    }
}

impl TagQueryStep {
    /// Apply this step to a single position, returning matches in document
    /// order.
    pub fn apply(&self, tree: &Tree, position: NodeId) -> Vec<NodeId> {
        match self {
            TagQueryStep::Child {
                name,
                filters,
                recursive,
            } => {
                let candidates: Vec<NodeId> = if *recursive {
                    tree.descendants(position)
                } else {
                    tree.children(position).collect()
                };
                candidates
                    .into_iter()
                    .filter(|&c| Self::element_matches(tree, c, name, filters))
                    .collect()
            }
            TagQueryStep::Parent { levels } => {
                let mut current = Some(position);
                for _ in 0..*levels {
                    current = current.and_then(|node| tree.parent(node));
                }
                current.into_iter().collect()
            }
            TagQueryStep::Sibling {
                name,
                direction,
                filters,
            } => {
                let siblings = match direction {
                    SiblingDirection::Preceding => tree.preceding_siblings(position),
                    SiblingDirection::Following => tree.following_siblings(position),
                };
                siblings
                    .into_iter()
                    .filter(|&s| Self::element_matches(tree, s, name, filters))
                    .collect()
            }
            TagQueryStep::Transform(func) => func(tree, position),
        }
    }

    fn element_matches(
        tree: &Tree,
        node: NodeId,
        name: &str,
        filters: &[AttributeFilter],
    ) -> bool {
        tree.name(node) == Some(name) && filters.iter().all(|f| f.matches(tree, node))
    }
}

/// Match semantics for chain evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    /// Return at most one position: the first, in document order, that a
    /// full evaluation would produce.
    First,
    /// Return every position the chain produces.
    All,
}

/// An ordered chain of tag query steps.
///
/// Step *i+1* is evaluated against every position produced by step *i*;
/// results are concatenated preserving step-*i* order, then within-step
/// document order. The empty chain is the identity: it yields the start
/// position.
///
/// # Example
///
/// ```
/// use gleaner::query::{QueryMode, TagQuery};
/// use gleaner::tree::Tree;
///
/// let mut tree = Tree::new("play");
/// let lines = tree.add_element(tree.root(), "lines");
/// let line = tree.add_text_element(lines, "l", "Mark me.");
///
/// let query = TagQuery::new().child("lines").child("l");
/// assert_eq!(query.evaluate(&tree, tree.root(), QueryMode::All), vec![line]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TagQuery {
    steps: Vec<TagQueryStep>,
}

impl TagQuery {
    /// The empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an arbitrary step.
    pub fn step(mut self, step: TagQueryStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Append a direct-child step matching `name`.
    pub fn child(self, name: impl Into<String>) -> Self {
        self.step(TagQueryStep::Child {
            name: name.into(),
            filters: Vec::new(),
            recursive: false,
        })
    }

    /// Append a direct-child step with attribute filters.
    pub fn child_where(self, name: impl Into<String>, filters: Vec<AttributeFilter>) -> Self {
        self.step(TagQueryStep::Child {
            name: name.into(),
            filters,
            recursive: false,
        })
    }

    /// Append a recursive descendant step matching `name` at any depth.
    pub fn descendant(self, name: impl Into<String>) -> Self {
        self.step(TagQueryStep::Child {
            name: name.into(),
            filters: Vec::new(),
            recursive: true,
        })
    }

    /// Append a recursive descendant step with attribute filters.
    pub fn descendant_where(self, name: impl Into<String>, filters: Vec<AttributeFilter>) -> Self {
        self.step(TagQueryStep::Child {
            name: name.into(),
            filters,
            recursive: true,
        })
    }

    /// Append a step ascending `levels` ancestors.
    pub fn parent(self, levels: usize) -> Self {
        self.step(TagQueryStep::Parent { levels })
    }

    /// Append a sibling step.
    pub fn sibling(self, name: impl Into<String>, direction: SiblingDirection) -> Self {
        self.sibling_where(name, direction, Vec::new())
    }

    /// Append a sibling step with attribute filters.
    pub fn sibling_where(
        self,
        name: impl Into<String>,
        direction: SiblingDirection,
        filters: Vec<AttributeFilter>,
    ) -> Self {
        self.step(TagQueryStep::Sibling {
            name: name.into(),
            direction,
            filters,
        })
    }

    /// Append a caller-supplied transform step.
    pub fn transform(
        self,
        func: impl Fn(&Tree, NodeId) -> Vec<NodeId> + Send + Sync + 'static,
    ) -> Self {
        self.step(TagQueryStep::Transform(Arc::new(func)))
    }

    /// The steps of this chain, in order.
    pub fn steps(&self) -> &[TagQueryStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Evaluate the chain from `start` under the given mode.
    pub fn evaluate(&self, tree: &Tree, start: NodeId, mode: QueryMode) -> Vec<NodeId> {
        match mode {
            QueryMode::All => self.all(tree, start),
            QueryMode::First => self.first(tree, start).into_iter().collect(),
        }
    }

    /// Every position the chain produces, in order.
    pub fn all(&self, tree: &Tree, start: NodeId) -> Vec<NodeId> {
        let mut positions = vec![start];
        for step in &self.steps {
            positions = positions
                .iter()
                .flat_map(|&position| step.apply(tree, position))
                .collect();
        }
        positions
    }

    /// The first position a full evaluation would produce, found by a
    /// short-circuiting depth-first left-to-right fold over the chain.
    pub fn first(&self, tree: &Tree, start: NodeId) -> Option<NodeId> {
        Self::find_first(&self.steps, tree, start)
    }

    fn find_first(steps: &[TagQueryStep], tree: &Tree, position: NodeId) -> Option<NodeId> {
        match steps.split_first() {
            None => Some(position),
            Some((step, rest)) => step
                .apply(tree, position)
                .into_iter()
                .find_map(|next| Self::find_first(rest, tree, next)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested_tree() -> Tree {
        let mut tree = Tree::new("play");
        let act = tree.add_element(tree.root(), "act");
        tree.set_attribute(act, "n", "I");
        let scene = tree.add_element(act, "scene");
        tree.add_text_element(scene, "location", "A castle.");
        let hamlet = tree.add_element(scene, "lines");
        tree.set_attribute(hamlet, "character", "HAMLET");
        tree.add_text_element(hamlet, "l", "Whither wilt thou lead me?");
        let ghost = tree.add_element(scene, "lines");
        tree.set_attribute(ghost, "character", "GHOST");
        tree.add_text_element(ghost, "l", "Mark me.");
        tree
    }

    #[test]
    fn test_empty_chain_is_identity() {
        let tree = nested_tree();
        let query = TagQuery::new();

        assert_eq!(query.all(&tree, tree.root()), vec![tree.root()]);
        assert_eq!(query.first(&tree, tree.root()), Some(tree.root()));
    }

    #[test]
    fn test_child_is_not_recursive() {
        let tree = nested_tree();

        assert!(TagQuery::new().child("l").all(&tree, tree.root()).is_empty());
        assert_eq!(TagQuery::new().child("act").all(&tree, tree.root()).len(), 1);
    }

    #[test]
    fn test_descendant_matches_in_preorder() {
        let tree = nested_tree();

        let lines = TagQuery::new().descendant("l").all(&tree, tree.root());
        assert_eq!(lines.len(), 2);
        assert_eq!(tree.text_content(lines[0]), "Whither wilt thou lead me?");
        assert_eq!(tree.text_content(lines[1]), "Mark me.");
    }

    #[test]
    fn test_attribute_filters() {
        let tree = nested_tree();

        let ghost = TagQuery::new()
            .descendant_where("lines", vec![AttributeFilter::value("character", "GHOST")])
            .all(&tree, tree.root());
        assert_eq!(ghost.len(), 1);
        assert_eq!(tree.attribute(ghost[0], "character"), Some("GHOST"));

        let any = TagQuery::new()
            .descendant_where("lines", vec![AttributeFilter::present("character")])
            .all(&tree, tree.root());
        assert_eq!(any.len(), 2);

        let none = TagQuery::new()
            .descendant_where("lines", vec![AttributeFilter::present("n")])
            .all(&tree, tree.root());
        assert!(none.is_empty());
    }

    #[test]
    fn test_parent_steps() {
        let tree = nested_tree();
        let line = TagQuery::new().descendant("l").first(&tree, tree.root()).unwrap();

        let scene = TagQuery::new().parent(2).all(&tree, line);
        assert_eq!(scene.len(), 1);
        assert_eq!(tree.name(scene[0]), Some("scene"));

        // Ascending past the document root yields no positions, not an error.
        assert!(TagQuery::new().parent(10).all(&tree, line).is_empty());
    }

    #[test]
    fn test_child_then_parent_round_trip() {
        let tree = nested_tree();

        let act = TagQuery::new().child("act").first(&tree, tree.root()).unwrap();
        let back = TagQuery::new().parent(1).all(&tree, act);
        assert_eq!(back, vec![tree.root()]);
    }

    #[test]
    fn test_sibling_directions() {
        let tree = nested_tree();
        let hamlet = TagQuery::new()
            .descendant_where("lines", vec![AttributeFilter::value("character", "HAMLET")])
            .first(&tree, tree.root())
            .unwrap();

        let preceding = TagQuery::new()
            .sibling("location", SiblingDirection::Preceding)
            .all(&tree, hamlet);
        assert_eq!(preceding.len(), 1);
        assert_eq!(tree.text_content(preceding[0]), "A castle.");

        let following = TagQuery::new()
            .sibling("lines", SiblingDirection::Following)
            .all(&tree, hamlet);
        assert_eq!(following.len(), 1);
        assert_eq!(tree.attribute(following[0], "character"), Some("GHOST"));
    }

    #[test]
    fn test_transform_step() {
        let tree = nested_tree();

        let grandchildren = TagQuery::new()
            .transform(|tree, node| tree.children(node).flat_map(|c| tree.children(c)).collect())
            .all(&tree, tree.root());
        assert_eq!(grandchildren.len(), 1);
        assert_eq!(tree.name(grandchildren[0]), Some("scene"));
    }

    #[test]
    fn test_first_is_head_of_all() {
        let tree = nested_tree();
        let queries = [
            TagQuery::new(),
            TagQuery::new().descendant("l"),
            TagQuery::new().child("act").child("scene").child("lines"),
            TagQuery::new().descendant("lines").child("l"),
            TagQuery::new().child("nonexistent"),
        ];

        for query in &queries {
            let all = query.all(&tree, tree.root());
            assert_eq!(query.first(&tree, tree.root()), all.first().copied());
        }
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let tree = nested_tree();
        let query = TagQuery::new().descendant("lines").child("l");

        let once = query.evaluate(&tree, tree.root(), QueryMode::All);
        let twice = query.evaluate(&tree, tree.root(), QueryMode::All);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_chain_preserves_step_order() {
        let tree = nested_tree();

        // Both `lines` elements are produced by the first step; the second
        // step's matches must stay grouped by their producing position.
        let lines = TagQuery::new().descendant("lines").child("l").all(&tree, tree.root());
        assert_eq!(tree.text_content(lines[0]), "Whither wilt thou lead me?");
        assert_eq!(tree.text_content(lines[1]), "Mark me.");
    }
}
