use la_arena::{Arena, Idx};

use crate::container::{Children, LabeledContainer, SequenceContainer, Slot};
use crate::error::{MastError, Result};
use crate::lattice::{Grammar, KindOf, Mask, MaskOf, NodeKind};
use crate::terminal::Literal;

pub type NodeId<G> = Idx<Node<G>>;

#[derive(Clone, Debug)]
pub struct Node<G: Grammar> {
    kind: KindOf<G>,
    /// Index of the node whose container holds this one. Advisory only:
    /// ownership runs strictly from parent to child.
    parent: Option<NodeId<G>>,
    children: Option<Children<NodeId<G>>>,
    value: Option<Literal>,
}

impl<G: Grammar> Node<G> {
    fn new(kind: KindOf<G>) -> Self {
        Self {
            kind,
            parent: None,
            children: None,
            value: None,
        }
    }

    pub fn kind(&self) -> KindOf<G> {
        self.kind
    }

    pub fn production(&self) -> Option<G::Production> {
        match self.kind {
            NodeKind::Concrete(p) => Some(p),
            NodeKind::Masked(_) => None,
        }
    }

    pub fn is_masked(&self) -> bool {
        self.kind.is_masked()
    }

    pub fn parent(&self) -> Option<NodeId<G>> {
        self.parent
    }

    pub fn children(&self) -> Option<&Children<NodeId<G>>> {
        self.children.as_ref()
    }

    /// Literal attribute of a terminal node.
    pub fn value(&self) -> Option<&Literal> {
        self.value.as_ref()
    }
}

/// A (partially) masked syntax tree. All nodes live in one arena; nodes that
/// get replaced stay allocated but are no longer reachable from the root.
#[derive(Clone, Debug)]
pub struct Tree<G: Grammar> {
    nodes: Arena<Node<G>>,
    root: NodeId<G>,
}

impl<G: Grammar> Tree<G> {
    /// A tree consisting of a single placeholder.
    pub fn new(root: MaskOf<G>) -> Self {
        let mut nodes = Arena::new();
        let root = nodes.alloc(Node::new(NodeKind::Masked(root)));
        Self { nodes, root }
    }

    pub fn root(&self) -> NodeId<G> {
        self.root
    }

    pub fn node(&self, id: NodeId<G>) -> &Node<G> {
        &self.nodes[id]
    }

    pub fn kind(&self, id: NodeId<G>) -> KindOf<G> {
        self.nodes[id].kind
    }

    /// A detached placeholder, to be attached through `replace` or a constructor.
    pub fn placeholder(&mut self, mask: MaskOf<G>) -> NodeId<G> {
        self.nodes.alloc(Node::new(NodeKind::Masked(mask)))
    }

    pub fn leaf(&mut self, production: G::Production, value: Literal) -> NodeId<G> {
        let mut node = Node::new(NodeKind::Concrete(production));
        node.value = Some(value);
        self.nodes.alloc(node)
    }

    pub fn labeled(
        &mut self,
        production: G::Production,
        slots: impl IntoIterator<Item = (&'static str, NodeId<G>)>,
    ) -> NodeId<G> {
        let children = Children::Labeled(LabeledContainer::new(slots));
        self.branch(production, children)
    }

    pub fn sequence(
        &mut self,
        production: G::Production,
        items: impl IntoIterator<Item = NodeId<G>>,
    ) -> NodeId<G> {
        let children = Children::Sequence(SequenceContainer::new(items));
        self.branch(production, children)
    }

    fn branch(&mut self, production: G::Production, children: Children<NodeId<G>>) -> NodeId<G> {
        let kids: Vec<NodeId<G>> = children.enumerate().map(|(_, c)| c).collect();
        let mut node = Node::new(NodeKind::Concrete(production));
        node.children = Some(children);
        let id = self.nodes.alloc(node);
        for kid in kids {
            self.nodes[kid].parent = Some(id);
        }
        id
    }

    /// Substitute `new` for `old` in whichever container holds `old`.
    /// Replacing the root re-roots the tree.
    pub fn replace(&mut self, old: NodeId<G>, new: NodeId<G>) -> Result<Option<Slot>> {
        let slot = match self.nodes[old].parent {
            None if old == self.root => {
                self.root = new;
                None
            }
            None => {
                return Err(MastError::NotAChild {
                    child: format!("{old:?}"),
                })
            }
            Some(parent) => {
                let children = self.nodes[parent].children.as_mut().ok_or_else(|| {
                    MastError::NotAChild {
                        child: format!("{old:?}"),
                    }
                })?;
                Some(children.replace(old, new)?)
            }
        };
        self.nodes[new].parent = self.nodes[old].parent.take();
        Ok(slot)
    }

    /// Put `id` under a fresh node of `production`, in the slot `label`.
    pub fn wrap(
        &mut self,
        id: NodeId<G>,
        production: G::Production,
        label: &'static str,
    ) -> Result<NodeId<G>> {
        let mut node = Node::new(NodeKind::Concrete(production));
        node.children = Some(Children::Labeled(LabeledContainer::new([(label, id)])));
        let wrapper = self.nodes.alloc(node);
        self.replace(id, wrapper)?;
        self.nodes[id].parent = Some(wrapper);
        Ok(wrapper)
    }

    pub fn children(&self, id: NodeId<G>) -> Vec<(Slot, NodeId<G>)> {
        self.nodes[id]
            .children
            .as_ref()
            .map(|c| c.enumerate().collect())
            .unwrap_or_default()
    }

    pub fn child(&self, id: NodeId<G>, label: &str) -> Result<NodeId<G>> {
        match &self.nodes[id].children {
            Some(Children::Labeled(c)) => c.get(label),
            _ => Err(MastError::UnknownLabel {
                label: label.to_string(),
            }),
        }
    }

    pub(crate) fn swap_slots(&mut self, id: NodeId<G>, a: &str, b: &str) -> Result<()> {
        match &mut self.nodes[id].children {
            Some(Children::Labeled(c)) => c.swap(a, b),
            _ => Err(MastError::UnknownLabel {
                label: a.to_string(),
            }),
        }
    }

    /// Reachable nodes, parents before children, children in slot order.
    pub fn preorder(&self) -> Vec<NodeId<G>> {
        self.preorder_from(self.root)
    }

    pub fn preorder_from(&self, start: NodeId<G>) -> Vec<NodeId<G>> {
        let mut out = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            out.push(id);
            let kids = self.children(id);
            stack.extend(kids.into_iter().rev().map(|(_, c)| c));
        }
        out
    }

    pub fn placeholders(&self) -> Vec<NodeId<G>> {
        self.preorder()
            .into_iter()
            .filter(|id| self.nodes[*id].is_masked())
            .collect()
    }

    pub fn is_concrete(&self) -> bool {
        self.placeholders().is_empty()
    }

    /// Number of nodes on the longest path from `id` down to a leaf.
    pub fn height(&self, id: NodeId<G>) -> usize {
        1 + self
            .children(id)
            .into_iter()
            .map(|(_, c)| self.height(c))
            .max()
            .unwrap_or(0)
    }

    pub fn size(&self) -> usize {
        self.preorder().len()
    }

    /// Structural equality of the reachable trees, ignoring node identities.
    pub fn same_shape(&self, other: &Tree<G>) -> bool {
        self.same_from(self.root, other, other.root)
    }

    fn same_from(&self, a: NodeId<G>, other: &Tree<G>, b: NodeId<G>) -> bool {
        let (x, y) = (&self.nodes[a], &other.nodes[b]);
        if x.kind != y.kind || x.value != y.value {
            return false;
        }
        let (xs, ys) = (self.children(a), other.children(b));
        xs.len() == ys.len()
            && xs
                .into_iter()
                .zip(ys)
                .all(|((sx, cx), (sy, cy))| sx == sy && self.same_from(cx, other, cy))
    }

    /// A fresh placeholder standing where a concrete node of `production` sits.
    pub(crate) fn paired_placeholder(&mut self, production: G::Production) -> NodeId<G> {
        self.placeholder(Mask::Production(production))
    }
}
