use std::fmt;

use rand::Rng;
use tracing::trace;

use crate::error::{MastError, Result};
use crate::lattice::{Grammar, Lattice, Mask, NodeKind, Shape};
use crate::terminal::{TerminalContext, TerminalGenerator};
use crate::tree::{NodeId, Tree};

/// Structural transitions between corruption states.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Kernel {
    Mask,
    Unmask,
    MaskUp,
    MaskDown,
    BinopSwap,
}

impl Kernel {
    pub const ALL: [Kernel; 5] = [
        Kernel::Mask,
        Kernel::Unmask,
        Kernel::MaskUp,
        Kernel::MaskDown,
        Kernel::BinopSwap,
    ];

    fn bit(self) -> u8 {
        1 << self as u8
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Kernel::Mask => "mask",
            Kernel::Unmask => "unmask",
            Kernel::MaskUp => "mask-up",
            Kernel::MaskDown => "mask-down",
            Kernel::BinopSwap => "binop-swap",
        })
    }
}

#[derive(Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct KernelSet(u8);

impl KernelSet {
    pub const EMPTY: KernelSet = KernelSet(0);
    /// The kernels used to grow a tree out of a placeholder.
    pub const GENERATION: KernelSet = KernelSet((1 << Kernel::Unmask as u8) | (1 << Kernel::MaskDown as u8));

    pub fn contains(self, kernel: Kernel) -> bool {
        self.0 & kernel.bit() != 0
    }

    pub fn insert(&mut self, kernel: Kernel) {
        self.0 |= kernel.bit()
    }

    pub fn remove(&mut self, kernel: Kernel) {
        self.0 &= !kernel.bit()
    }

    pub fn with(mut self, kernel: Kernel) -> Self {
        self.insert(kernel);
        self
    }

    pub fn intersection(self, other: KernelSet) -> KernelSet {
        KernelSet(self.0 & other.0)
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Kernel> {
        Kernel::ALL.into_iter().filter(move |k| self.contains(*k))
    }
}

impl FromIterator<Kernel> for KernelSet {
    fn from_iter<I: IntoIterator<Item = Kernel>>(iter: I) -> Self {
        iter.into_iter().fold(KernelSet::EMPTY, KernelSet::with)
    }
}

impl fmt::Display for KernelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, k) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{k}")?;
        }
        f.write_str("}")
    }
}

impl fmt::Debug for KernelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KernelSet{self}")
    }
}

/// Result of an unmask: the new concrete node and the placeholders it was built with.
#[derive(Clone, Debug)]
pub struct Unmasked<G: Grammar> {
    pub node: NodeId<G>,
    pub holes: Vec<NodeId<G>>,
}

impl<G: Grammar> Lattice<G> {
    /// Erase a concrete node back to its paired placeholder.
    pub fn mask(&self, tree: &mut Tree<G>, id: NodeId<G>) -> Result<NodeId<G>> {
        let kind = tree.kind(id);
        self.require(kind, Kernel::Mask)?;
        let NodeKind::Concrete(production) = kind else {
            return Err(MastError::Unsupported {
                kind: kind.to_string(),
                kernel: Kernel::Mask,
            });
        };
        let masked = tree.paired_placeholder(production);
        tree.replace(id, masked)?;
        trace!(%kind, "masked");
        Ok(masked)
    }

    /// Resolve a production-level placeholder into a concrete node. Non-terminals
    /// get fresh placeholders for their declared slots, terminals ask `terminals`
    /// for a value.
    pub fn unmask<T, R>(
        &self,
        tree: &mut Tree<G>,
        id: NodeId<G>,
        terminals: &mut T,
        rng: &mut R,
        ctx: Option<&TerminalContext>,
    ) -> Result<Unmasked<G>>
    where
        T: TerminalGenerator + ?Sized,
        R: Rng,
    {
        let kind = tree.kind(id);
        let NodeKind::Masked(mask) = kind else {
            return Err(MastError::Unsupported {
                kind: kind.to_string(),
                kernel: Kernel::Unmask,
            });
        };
        let production = self.unmask_target(mask)?;
        let shape = self
            .shape(production)
            .ok_or_else(|| MastError::CannotSynthesize(production.to_string()))?;

        let (node, holes) = match shape {
            Shape::Terminal(terminal) => {
                let literal = terminals.generate(ctx, *terminal)?;
                if literal.terminal() != *terminal {
                    return Err(MastError::LiteralMismatch {
                        production: production.to_string(),
                        expected: *terminal,
                        literal: literal.to_string(),
                    });
                }
                (tree.leaf(production, literal), Vec::new())
            }
            Shape::Labeled(slots) => {
                let holes: Vec<_> = slots.iter().map(|(_, m)| tree.placeholder(*m)).collect();
                let labels = slots.iter().map(|(l, _)| *l);
                (tree.labeled(production, labels.zip(holes.iter().copied())), holes)
            }
            Shape::Sequence { item, min, max } => {
                let n = rng.random_range(*min..=*max);
                let holes: Vec<_> = (0..n).map(|_| tree.placeholder(*item)).collect();
                (tree.sequence(production, holes.iter().copied()), holes)
            }
        };
        tree.replace(id, node)?;
        trace!(%production, holes = holes.len(), "unmasked");
        Ok(Unmasked { node, holes })
    }

    /// Generalize a production-level placeholder to one of its categories.
    pub fn mask_up(
        &self,
        tree: &mut Tree<G>,
        id: NodeId<G>,
        ancestor: G::Category,
    ) -> Result<NodeId<G>> {
        let kind = tree.kind(id);
        let NodeKind::Masked(Mask::Production(production)) = kind else {
            return Err(MastError::Unsupported {
                kind: kind.to_string(),
                kernel: Kernel::MaskUp,
            });
        };
        if !self.ancestors(production)?.contains(&ancestor) {
            return Err(MastError::IllegalTransition {
                kernel: Kernel::MaskUp,
                from: kind.to_string(),
                to: Mask::<G::Category, G::Production>::Category(ancestor).to_string(),
            });
        }
        let general = tree.placeholder(Mask::Category(ancestor));
        tree.replace(id, general)?;
        Ok(general)
    }

    /// Specialize a category-level placeholder to one of its productions.
    pub fn mask_down(
        &self,
        tree: &mut Tree<G>,
        id: NodeId<G>,
        descendant: G::Production,
    ) -> Result<NodeId<G>> {
        let kind = tree.kind(id);
        let NodeKind::Masked(Mask::Category(category)) = kind else {
            return Err(MastError::Unsupported {
                kind: kind.to_string(),
                kernel: Kernel::MaskDown,
            });
        };
        if !self.descendants(category)?.contains(&descendant) {
            return Err(MastError::IllegalTransition {
                kernel: Kernel::MaskDown,
                from: kind.to_string(),
                to: Mask::<G::Category, G::Production>::Production(descendant).to_string(),
            });
        }
        let special = tree.placeholder(Mask::Production(descendant));
        tree.replace(id, special)?;
        trace!(%category, %descendant, "masked down");
        Ok(special)
    }

    /// Exchange the two operands of a commutative binary node in place.
    pub fn binop_swap(&self, tree: &mut Tree<G>, id: NodeId<G>) -> Result<()> {
        let kind = tree.kind(id);
        self.require(kind, Kernel::BinopSwap)?;
        let labels = match kind {
            NodeKind::Concrete(p) => self.swap_labels(p),
            NodeKind::Masked(_) => None,
        };
        let (left, right) = labels.ok_or_else(|| MastError::Unsupported {
            kind: kind.to_string(),
            kernel: Kernel::BinopSwap,
        })?;
        tree.swap_slots(id, left, right)
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::lattice::tests::{abstract_neg, Cat, Prod, Toy};
    use crate::terminal::{FixedTerminals, Literal, Terminal};

    fn fixed() -> FixedTerminals {
        FixedTerminals::new().with(Literal::Identifier("x".into()))
    }

    #[test]
    fn kernel_set_basics() {
        let s: KernelSet = [Kernel::MaskDown, Kernel::Unmask].into_iter().collect();
        assert_eq!(s, KernelSet::GENERATION);
        assert_eq!(s.len(), 2);
        assert_eq!(s.to_string(), "{unmask, mask-down}");
        assert!(s.intersection(KernelSet::EMPTY.with(Kernel::Mask)).is_empty());
    }

    #[test]
    fn unmask_non_terminal_creates_placeholder_children() {
        let l = Toy::lattice().unwrap();
        let mut t = Tree::new(Mask::Production(Prod::Sum));
        let root = t.root();
        let mut rng = StdRng::seed_from_u64(0);
        let u = l.unmask(&mut t, root, &mut fixed(), &mut rng, None).unwrap();
        assert_eq!(t.root(), u.node);
        assert_eq!(u.holes.len(), 2);
        assert_eq!(t.placeholders(), u.holes);
        for h in &u.holes {
            assert_eq!(t.kind(*h), NodeKind::Masked(Mask::Category(Cat::Expr)));
            assert_eq!(t.node(*h).parent(), Some(u.node));
        }
    }

    #[test]
    fn unmask_terminal_asks_the_generator() {
        let l = Toy::lattice().unwrap();
        let mut t = Tree::new(Mask::Production(Prod::Var));
        let root = t.root();
        let mut rng = StdRng::seed_from_u64(0);
        let u = l.unmask(&mut t, root, &mut fixed(), &mut rng, None).unwrap();
        assert!(u.holes.is_empty());
        assert_eq!(
            t.node(u.node).value(),
            Some(&Literal::Identifier("x".into()))
        );
    }

    struct AlwaysNumber;

    impl TerminalGenerator for AlwaysNumber {
        fn generate(&mut self, _: Option<&TerminalContext>, _: Terminal) -> Result<Literal> {
            Ok(Literal::Number(1))
        }
    }

    #[test]
    fn unmask_rejects_mismatched_literal() {
        let l = Toy::lattice().unwrap();
        let mut t = Tree::new(Mask::Production(Prod::Var));
        let root = t.root();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            l.unmask(&mut t, root, &mut AlwaysNumber, &mut rng, None),
            Err(MastError::LiteralMismatch { expected: Terminal::Identifier, .. })
        ));
        assert!(t.kind(t.root()).is_masked());

        let mut empty = FixedTerminals::new();
        assert!(matches!(
            l.unmask(&mut t, root, &mut empty, &mut rng, None),
            Err(MastError::UnsupportedTerminal(Terminal::Identifier))
        ));
    }

    #[test]
    fn abstract_production_cannot_be_synthesized() {
        let l = abstract_neg();
        let mut t = Tree::new(Mask::Production(Prod::Neg));
        let root = t.root();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            l.unmask(&mut t, root, &mut fixed(), &mut rng, None),
            Err(MastError::CannotSynthesize(name)) if name == "Neg"
        ));
    }

    #[test]
    fn mask_down_rejects_foreign_descendant_without_mutation() {
        let l = Toy::lattice().unwrap();
        let mut t = Tree::new(Mask::Category(Cat::Expr));
        let root = t.root();
        let err = l.mask_down(&mut t, root, Prod::Print).unwrap_err();
        assert!(matches!(err, MastError::IllegalTransition { kernel: Kernel::MaskDown, .. }));
        assert_eq!(t.root(), root);
        assert_eq!(t.kind(root), NodeKind::Masked(Mask::Category(Cat::Expr)));
    }

    #[test]
    fn mask_up_then_down_round_trips() {
        let l = Toy::lattice().unwrap();
        let mut t = Tree::new(Mask::Production(Prod::Neg));
        let root = t.root();
        let up = l.mask_up(&mut t, root, Cat::Expr).unwrap();
        assert_eq!(t.kind(up), NodeKind::Masked(Mask::Category(Cat::Expr)));
        assert!(matches!(
            l.mask_up(&mut t, up, Cat::Expr),
            Err(MastError::Unsupported { .. })
        ));
        let down = l.mask_down(&mut t, up, Prod::Neg).unwrap();
        assert_eq!(t.kind(down), NodeKind::Masked(Mask::Production(Prod::Neg)));
        assert!(matches!(
            l.mask_up(&mut t, down, Cat::Stmt),
            Err(MastError::IllegalTransition { .. })
        ));
    }

    #[test]
    fn mask_restores_paired_placeholder() {
        let l = Toy::lattice().unwrap();
        let mut t = Tree::new(Mask::Production(Prod::Print));
        let root = t.root();
        let mut rng = StdRng::seed_from_u64(0);
        let u = l.unmask(&mut t, root, &mut fixed(), &mut rng, None).unwrap();
        let arg = u.holes[0];
        let u2 = l.mask_down(&mut t, arg, Prod::Var).unwrap();
        let leaf = l.unmask(&mut t, u2, &mut fixed(), &mut rng, None).unwrap().node;
        let masked = l.mask(&mut t, leaf).unwrap();
        assert_eq!(t.kind(masked), NodeKind::Masked(Mask::Production(Prod::Var)));
        assert_eq!(t.child(u.node, "arg"), Ok(masked));
        assert!(matches!(l.mask(&mut t, masked), Err(MastError::Unsupported { .. })));
    }

    #[test]
    fn binop_swap_exchanges_operands() {
        let l = Toy::lattice().unwrap();
        let mut t = Tree::new(Mask::Category(Cat::Expr));
        let a = t.leaf(Prod::Var, Literal::Identifier("a".into()));
        let b = t.leaf(Prod::Var, Literal::Identifier("b".into()));
        let sum = t.labeled(Prod::Sum, [("left", a), ("right", b)]);
        let root = t.root();
        t.replace(root, sum).unwrap();
        l.binop_swap(&mut t, sum).unwrap();
        assert_eq!(t.child(sum, "left"), Ok(b));
        assert_eq!(t.child(sum, "right"), Ok(a));
        assert!(matches!(l.binop_swap(&mut t, a), Err(MastError::Unsupported { .. })));
    }
}
