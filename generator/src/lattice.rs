use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::error::{ConfigError, MastError, Result};
use crate::kernel::{Kernel, KernelSet};
use crate::terminal::Terminal;

/// A toy language: its categories, its productions, and how they are wired.
pub trait Grammar: Copy + fmt::Debug + Sized + 'static {
    type Category: Copy + Eq + Hash + fmt::Debug + fmt::Display + 'static;
    type Production: Copy + Eq + Hash + fmt::Debug + fmt::Display + 'static;

    const NAME: &'static str;

    fn wire(builder: &mut LatticeBuilder<Self>);

    fn lattice() -> Result<Lattice<Self>> {
        let mut builder = LatticeBuilder::new();
        Self::wire(&mut builder);
        builder.build()
    }
}

/// Placeholder kinds: "some production of this category" or "this production".
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Mask<C, P> {
    Category(C),
    Production(P),
}

impl<C: fmt::Display, P: fmt::Display> fmt::Display for Mask<C, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mask::Category(c) => write!(f, "[{c} MASK]"),
            Mask::Production(p) => write!(f, "[{p} MASK]"),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum NodeKind<C, P> {
    Concrete(P),
    Masked(Mask<C, P>),
}

impl<C, P> NodeKind<C, P> {
    pub fn is_masked(&self) -> bool {
        matches!(self, NodeKind::Masked(_))
    }
}

impl<C: fmt::Display, P: fmt::Display> fmt::Display for NodeKind<C, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Concrete(p) => write!(f, "{p}"),
            NodeKind::Masked(m) => write!(f, "{m}"),
        }
    }
}

/// How a production builds its node when unmasked.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Shape<C, P> {
    Terminal(Terminal),
    Labeled(Vec<(&'static str, Mask<C, P>)>),
    Sequence {
        item: Mask<C, P>,
        min: usize,
        max: usize,
    },
}

pub type MaskOf<G> = Mask<<G as Grammar>::Category, <G as Grammar>::Production>;
pub type KindOf<G> = NodeKind<<G as Grammar>::Category, <G as Grammar>::Production>;
pub type ShapeOf<G> = Shape<<G as Grammar>::Category, <G as Grammar>::Production>;

/// Collects a language's declarations; `build` checks them for consistency.
pub struct LatticeBuilder<G: Grammar> {
    categories: IndexMap<G::Category, Vec<G::Production>>,
    shapes: HashMap<G::Production, ShapeOf<G>>,
    kernels: HashMap<KindOf<G>, KernelSet>,
    ancestors: IndexMap<G::Production, IndexSet<G::Category>>,
    descendants: IndexMap<G::Category, IndexSet<G::Production>>,
    swaps: HashMap<G::Production, (&'static str, &'static str)>,
    duplicates: Vec<ConfigError>,
}

impl<G: Grammar> Default for LatticeBuilder<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: Grammar> LatticeBuilder<G> {
    pub fn new() -> Self {
        Self {
            categories: IndexMap::new(),
            shapes: HashMap::new(),
            kernels: HashMap::new(),
            ancestors: IndexMap::new(),
            descendants: IndexMap::new(),
            swaps: HashMap::new(),
            duplicates: Vec::new(),
        }
    }

    /// Declare a category and its member productions, in selection order.
    pub fn category(
        &mut self,
        category: G::Category,
        productions: impl IntoIterator<Item = G::Production>,
    ) -> &mut Self {
        if self.categories.contains_key(&category) {
            self.duplicates
                .push(ConfigError::DuplicateCategory(category.to_string()));
        }
        self.categories
            .insert(category, productions.into_iter().collect());
        self
    }

    fn shape(&mut self, production: G::Production, shape: ShapeOf<G>) -> &mut Self {
        if self.shapes.insert(production, shape).is_some() {
            self.duplicates
                .push(ConfigError::DuplicateProduction(production.to_string()));
        }
        self
    }

    pub fn terminal(&mut self, production: G::Production, terminal: Terminal) -> &mut Self {
        self.shape(production, Shape::Terminal(terminal))
    }

    pub fn labeled(
        &mut self,
        production: G::Production,
        slots: impl IntoIterator<Item = (&'static str, MaskOf<G>)>,
    ) -> &mut Self {
        self.shape(production, Shape::Labeled(slots.into_iter().collect()))
    }

    pub fn sequence(
        &mut self,
        production: G::Production,
        item: MaskOf<G>,
        min: usize,
        max: usize,
    ) -> &mut Self {
        self.shape(production, Shape::Sequence { item, min, max })
    }

    /// Register `kernel` on `kind`.
    pub fn register(&mut self, kind: KindOf<G>, kernel: Kernel) -> &mut Self {
        self.kernels.entry(kind).or_default().insert(kernel);
        self
    }

    /// Let the production's placeholder unmask into it.
    pub fn pair(&mut self, production: G::Production) -> &mut Self {
        self.register(
            NodeKind::Masked(Mask::Production(production)),
            Kernel::Unmask,
        )
    }

    /// Let concrete nodes of this production be masked back to their placeholder.
    pub fn maskable(&mut self, production: G::Production) -> &mut Self {
        self.register(NodeKind::Concrete(production), Kernel::Mask)
    }

    pub fn mask_up(
        &mut self,
        production: G::Production,
        ancestors: impl IntoIterator<Item = G::Category>,
    ) -> &mut Self {
        self.register(
            NodeKind::Masked(Mask::Production(production)),
            Kernel::MaskUp,
        );
        self.ancestors
            .entry(production)
            .or_default()
            .extend(ancestors);
        self
    }

    pub fn mask_down(
        &mut self,
        category: G::Category,
        descendants: impl IntoIterator<Item = G::Production>,
    ) -> &mut Self {
        self.register(NodeKind::Masked(Mask::Category(category)), Kernel::MaskDown);
        self.descendants
            .entry(category)
            .or_default()
            .extend(descendants);
        self
    }

    /// Mark a commutative binary production whose operands may be exchanged.
    pub fn binop_swap(
        &mut self,
        production: G::Production,
        left: &'static str,
        right: &'static str,
    ) -> &mut Self {
        self.register(NodeKind::Concrete(production), Kernel::BinopSwap);
        self.swaps.insert(production, (left, right));
        self
    }

    pub fn build(self) -> Result<Lattice<G>> {
        if let Some(err) = self.duplicates.into_iter().next() {
            return Err(err.into());
        }

        let mut category_of: HashMap<G::Production, G::Category> = HashMap::new();
        for (category, members) in &self.categories {
            if members.is_empty() {
                return Err(ConfigError::EmptyCategory(category.to_string()).into());
            }
            for p in members {
                if let Some(first) = category_of.insert(*p, *category) {
                    let err = if first == *category {
                        ConfigError::DuplicateProduction(p.to_string())
                    } else {
                        ConfigError::SharedProduction {
                            production: p.to_string(),
                            first: first.to_string(),
                            second: category.to_string(),
                        }
                    };
                    return Err(err.into());
                }
            }
        }

        let declared = |kind: &KindOf<G>| match kind {
            NodeKind::Concrete(p) | NodeKind::Masked(Mask::Production(p)) => {
                category_of.contains_key(p)
            }
            NodeKind::Masked(Mask::Category(c)) => self.categories.contains_key(c),
        };
        for p in self.shapes.keys().chain(self.swaps.keys()) {
            if !category_of.contains_key(p) {
                return Err(ConfigError::OrphanProduction(p.to_string()).into());
            }
        }
        for (kind, kernels) in &self.kernels {
            if !declared(kind) {
                return Err(ConfigError::OrphanProduction(kind.to_string()).into());
            }
            if kernels.contains(Kernel::Unmask) && kernels.contains(Kernel::MaskDown) {
                return Err(ConfigError::AmbiguousGeneration(kind.to_string()).into());
            }
        }

        for (p, category) in &category_of {
            let placeholder = NodeKind::Masked(Mask::Production(*p));
            let paired = self
                .kernels
                .get(&placeholder)
                .is_some_and(|k| k.contains(Kernel::Unmask));
            if !paired {
                return Err(ConfigError::Unpaired(p.to_string()).into());
            }

            let ancestors = self.ancestors.get(p);
            let up_ok = ancestors.is_some_and(|a| a.len() == 1 && a.contains(category));
            if !up_ok {
                return Err(ConfigError::ForeignAncestor {
                    production: p.to_string(),
                    category: category.to_string(),
                }
                .into());
            }
        }

        for (p, ancestors) in &self.ancestors {
            for c in ancestors {
                let inverse = self.descendants.get(c).is_some_and(|d| d.contains(p));
                if !inverse {
                    return Err(ConfigError::MaskUpWithoutMaskDown {
                        production: p.to_string(),
                        category: c.to_string(),
                    }
                    .into());
                }
            }
        }
        for (c, descendants) in &self.descendants {
            for p in descendants {
                let inverse = self.ancestors.get(p).is_some_and(|a| a.contains(c));
                if !inverse {
                    return Err(ConfigError::MaskDownWithoutMaskUp {
                        category: c.to_string(),
                        production: p.to_string(),
                    }
                    .into());
                }
            }
        }

        for (p, shape) in &self.shapes {
            let masks: Vec<&MaskOf<G>> = match shape {
                Shape::Terminal(_) => Vec::new(),
                Shape::Labeled(slots) => slots.iter().map(|(_, m)| m).collect(),
                Shape::Sequence { item, min, max } => {
                    if min > max {
                        return Err(ConfigError::InvertedBounds {
                            production: p.to_string(),
                            min: *min,
                            max: *max,
                        }
                        .into());
                    }
                    vec![item]
                }
            };
            for m in masks {
                if !declared(&NodeKind::Masked(*m)) {
                    return Err(ConfigError::Undeclared {
                        kind: p.to_string(),
                        missing: m.to_string(),
                    }
                    .into());
                }
            }
        }

        for (p, (left, right)) in &self.swaps {
            let slots: &[(&'static str, MaskOf<G>)] = match self.shapes.get(p) {
                Some(Shape::Labeled(slots)) => slots,
                _ => &[],
            };
            for label in [left, right] {
                if !slots.iter().any(|(l, _)| l == label) {
                    return Err(ConfigError::SwapLabel {
                        production: p.to_string(),
                        label: label.to_string(),
                    }
                    .into());
                }
            }
        }

        let lattice = Lattice {
            categories: self.categories,
            category_of,
            shapes: self.shapes,
            kernels: self.kernels,
            ancestors: self.ancestors,
            descendants: self.descendants,
            swaps: self.swaps,
        };
        lattice.check_resolvable()?;
        debug!(
            grammar = G::NAME,
            categories = lattice.categories.len(),
            productions = lattice.category_of.len(),
            "lattice wired"
        );
        Ok(lattice)
    }
}

/// The validated node type lattice of one grammar.
#[derive(Clone, Debug)]
pub struct Lattice<G: Grammar> {
    categories: IndexMap<G::Category, Vec<G::Production>>,
    category_of: HashMap<G::Production, G::Category>,
    shapes: HashMap<G::Production, ShapeOf<G>>,
    kernels: HashMap<KindOf<G>, KernelSet>,
    ancestors: IndexMap<G::Production, IndexSet<G::Category>>,
    descendants: IndexMap<G::Category, IndexSet<G::Production>>,
    swaps: HashMap<G::Production, (&'static str, &'static str)>,
}

impl<G: Grammar> Lattice<G> {
    /// Fixpoint over "can this finish in finitely many unmasks".
    fn check_resolvable(&self) -> Result<()> {
        let mut resolvable: HashSet<G::Production> = HashSet::new();
        loop {
            let before = resolvable.len();
            for (p, shape) in &self.shapes {
                if resolvable.contains(p) {
                    continue;
                }
                let ok = match shape {
                    Shape::Terminal(_) => true,
                    Shape::Labeled(slots) => {
                        slots.iter().all(|(_, m)| self.mask_resolvable(m, &resolvable))
                    }
                    Shape::Sequence { item, min, .. } => {
                        *min == 0 || self.mask_resolvable(item, &resolvable)
                    }
                };
                if ok {
                    resolvable.insert(*p);
                }
            }
            if resolvable.len() == before {
                break;
            }
        }
        for (c, members) in &self.categories {
            if !members.iter().any(|p| resolvable.contains(p)) {
                return Err(ConfigError::Unresolvable(c.to_string()).into());
            }
        }
        Ok(())
    }

    fn mask_resolvable(&self, mask: &MaskOf<G>, resolvable: &HashSet<G::Production>) -> bool {
        match mask {
            Mask::Production(p) => resolvable.contains(p),
            Mask::Category(c) => self
                .descendants
                .get(c)
                .is_some_and(|d| d.iter().any(|p| resolvable.contains(p))),
        }
    }

    pub fn kernels(&self, kind: KindOf<G>) -> KernelSet {
        self.kernels.get(&kind).copied().unwrap_or_default()
    }

    pub fn supports(&self, kind: KindOf<G>, kernel: Kernel) -> bool {
        self.kernels(kind).contains(kernel)
    }

    pub(crate) fn require(&self, kind: KindOf<G>, kernel: Kernel) -> Result<()> {
        if self.supports(kind, kernel) {
            Ok(())
        } else {
            Err(MastError::Unsupported {
                kind: kind.to_string(),
                kernel,
            })
        }
    }

    /// The production a placeholder resolves to when unmasked.
    pub fn unmask_target(&self, mask: MaskOf<G>) -> Result<G::Production> {
        self.require(NodeKind::Masked(mask), Kernel::Unmask)?;
        match mask {
            Mask::Production(p) => Ok(p),
            Mask::Category(c) => Err(MastError::CannotSynthesize(c.to_string())),
        }
    }

    pub fn descendants(&self, category: G::Category) -> Result<&IndexSet<G::Production>> {
        self.require(NodeKind::Masked(Mask::Category(category)), Kernel::MaskDown)?;
        self.descendants
            .get(&category)
            .ok_or_else(|| MastError::Unsupported {
                kind: Mask::<G::Category, G::Production>::Category(category).to_string(),
                kernel: Kernel::MaskDown,
            })
    }

    pub fn ancestors(&self, production: G::Production) -> Result<&IndexSet<G::Category>> {
        self.require(
            NodeKind::Masked(Mask::Production(production)),
            Kernel::MaskUp,
        )?;
        self.ancestors
            .get(&production)
            .ok_or_else(|| MastError::Unsupported {
                kind: Mask::<G::Category, G::Production>::Production(production).to_string(),
                kernel: Kernel::MaskUp,
            })
    }

    pub fn category_of(&self, production: G::Production) -> Option<G::Category> {
        self.category_of.get(&production).copied()
    }

    /// `None` for abstract productions, which cannot be synthesized.
    pub fn shape(&self, production: G::Production) -> Option<&ShapeOf<G>> {
        self.shapes.get(&production)
    }

    pub(crate) fn swap_labels(&self, production: G::Production) -> Option<(&'static str, &'static str)> {
        self.swaps.get(&production).copied()
    }

    pub fn categories(&self) -> impl Iterator<Item = G::Category> + '_ {
        self.categories.keys().copied()
    }

    pub fn productions(&self, category: G::Category) -> &[G::Production] {
        self.categories
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn category_named(&self, name: &str) -> Option<G::Category> {
        self.categories().find(|c| c.to_string() == name)
    }

    pub fn production_named(&self, name: &str) -> Option<G::Production> {
        self.categories
            .values()
            .flatten()
            .copied()
            .find(|p| p.to_string() == name)
    }

    /// Whether a node of `production` may fill a slot declared as `slot`.
    pub fn accepts(&self, slot: MaskOf<G>, production: G::Production) -> bool {
        match slot {
            Mask::Production(p) => p == production,
            Mask::Category(c) => self.category_of(production) == Some(c),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
    pub(crate) enum Cat {
        Expr,
        Stmt,
    }

    #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
    pub(crate) enum Prod {
        Var,
        Neg,
        Sum,
        Print,
    }

    impl fmt::Display for Cat {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            fmt::Debug::fmt(self, f)
        }
    }

    impl fmt::Display for Prod {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            fmt::Debug::fmt(self, f)
        }
    }

    /// A small grammar whose wiring each test can break in one place.
    #[derive(Copy, Clone, Debug)]
    pub(crate) struct Toy;

    impl Grammar for Toy {
        type Category = Cat;
        type Production = Prod;
        const NAME: &'static str = "toy";

        fn wire(b: &mut LatticeBuilder<Self>) {
            wire_toy(b);
        }
    }

    pub(crate) fn wire_toy(b: &mut LatticeBuilder<Toy>) {
        use Prod::*;
        b.category(Cat::Expr, [Var, Neg, Sum])
            .category(Cat::Stmt, [Print]);
        b.terminal(Var, Terminal::Identifier)
            .labeled(Neg, [("expr", Mask::Category(Cat::Expr))])
            .labeled(
                Sum,
                [
                    ("left", Mask::Category(Cat::Expr)),
                    ("right", Mask::Category(Cat::Expr)),
                ],
            )
            .labeled(Print, [("arg", Mask::Category(Cat::Expr))]);
        for p in [Var, Neg, Sum] {
            b.pair(p).maskable(p).mask_up(p, [Cat::Expr]);
        }
        b.pair(Print).maskable(Print).mask_up(Print, [Cat::Stmt]);
        b.mask_down(Cat::Expr, [Var, Neg, Sum])
            .mask_down(Cat::Stmt, [Print]);
        b.binop_swap(Sum, "left", "right");
    }

    /// Toy with `Neg` left abstract: declared and paired, but without a shape.
    pub(crate) fn abstract_neg() -> Lattice<Toy> {
        let mut b = LatticeBuilder::new();
        wire_toy(&mut b);
        b.shapes.remove(&Prod::Neg);
        match b.build() {
            Ok(l) => l,
            Err(e) => panic!("abstract Neg should still wire: {e}"),
        }
    }

    fn config_error(b: LatticeBuilder<Toy>) -> ConfigError {
        match b.build() {
            Err(MastError::Config(e)) => e,
            other => panic!("expected a configuration error, got {other:?}"),
        }
    }

    #[test]
    fn toy_wires_cleanly() {
        let l = Toy::lattice().unwrap();
        assert_eq!(l.productions(Cat::Expr), &[Prod::Var, Prod::Neg, Prod::Sum]);
        assert_eq!(l.category_of(Prod::Print), Some(Cat::Stmt));
        assert_eq!(l.unmask_target(Mask::Production(Prod::Neg)), Ok(Prod::Neg));
        assert!(l.descendants(Cat::Expr).unwrap().contains(&Prod::Sum));
        assert!(l.ancestors(Prod::Var).unwrap().contains(&Cat::Expr));
        assert_eq!(l.category_named("Stmt"), Some(Cat::Stmt));
        assert_eq!(l.production_named("Sum"), Some(Prod::Sum));
        assert!(l.accepts(Mask::Category(Cat::Expr), Prod::Neg));
        assert!(!l.accepts(Mask::Category(Cat::Expr), Prod::Print));
    }

    #[test]
    fn capability_queries_fail_for_unregistered_relations() {
        let l = Toy::lattice().unwrap();
        assert!(matches!(
            l.unmask_target(Mask::Category(Cat::Expr)),
            Err(MastError::Unsupported { kernel: Kernel::Unmask, .. })
        ));
        assert!(matches!(
            l.ancestors(Prod::Print).map(|a| a.len()),
            Ok(1)
        ));
        assert!(l.kernels(NodeKind::Concrete(Prod::Var)).contains(Kernel::Mask));
        assert!(!l.supports(NodeKind::Concrete(Prod::Neg), Kernel::BinopSwap));
    }

    #[test]
    fn every_production_round_trips_through_its_placeholder() {
        let l = Toy::lattice().unwrap();
        for c in l.categories() {
            for p in l.productions(c) {
                let target = l.unmask_target(Mask::Production(*p)).unwrap();
                assert_eq!(target, *p);
                assert_eq!(l.category_of(target), Some(c));
                assert!(l.ancestors(*p).unwrap().contains(&c));
                assert!(l.descendants(c).unwrap().contains(p));
            }
        }
    }

    #[test]
    fn missing_mask_down_is_rejected() {
        let mut b = LatticeBuilder::new();
        wire_toy(&mut b);
        b.descendants.get_mut(&Cat::Expr).unwrap().shift_remove(&Prod::Neg);
        assert_eq!(
            config_error(b),
            ConfigError::MaskUpWithoutMaskDown {
                production: "Neg".into(),
                category: "Expr".into()
            }
        );
    }

    #[test]
    fn mask_down_into_foreign_category_is_rejected() {
        let mut b = LatticeBuilder::new();
        wire_toy(&mut b);
        b.mask_down(Cat::Stmt, [Prod::Var]);
        assert!(matches!(
            config_error(b),
            ConfigError::MaskDownWithoutMaskUp { .. }
        ));
    }

    #[test]
    fn unpaired_production_is_rejected() {
        let mut b = LatticeBuilder::new();
        wire_toy(&mut b);
        b.kernels
            .get_mut(&NodeKind::Masked(Mask::Production(Prod::Print)))
            .unwrap()
            .remove(Kernel::Unmask);
        assert_eq!(config_error(b), ConfigError::Unpaired("Print".into()));
    }

    #[test]
    fn shared_and_empty_categories_are_rejected() {
        let mut b = LatticeBuilder::new();
        wire_toy(&mut b);
        b.category(Cat::Stmt, [Prod::Print, Prod::Var]);
        assert!(matches!(config_error(b), ConfigError::DuplicateCategory(_)));

        let mut b = LatticeBuilder::<Toy>::new();
        b.category(Cat::Expr, Vec::new());
        assert_eq!(config_error(b), ConfigError::EmptyCategory("Expr".into()));
    }

    #[test]
    fn unresolvable_category_is_rejected() {
        use Prod::*;
        let mut b = LatticeBuilder::<Toy>::new();
        b.category(Cat::Expr, [Neg]);
        b.labeled(Neg, [("expr", Mask::Category(Cat::Expr))]);
        b.pair(Neg).mask_up(Neg, [Cat::Expr]);
        b.mask_down(Cat::Expr, [Neg]);
        assert_eq!(config_error(b), ConfigError::Unresolvable("Expr".into()));
    }

    #[test]
    fn swap_labels_must_name_operands() {
        let mut b = LatticeBuilder::new();
        wire_toy(&mut b);
        b.binop_swap(Prod::Neg, "expr", "other");
        assert_eq!(
            config_error(b),
            ConfigError::SwapLabel {
                production: "Neg".into(),
                label: "other".into()
            }
        );
    }

    #[test]
    fn resolving_and_specializing_the_same_kind_is_rejected() {
        let mut b = LatticeBuilder::new();
        wire_toy(&mut b);
        b.register(NodeKind::Masked(Mask::Category(Cat::Expr)), Kernel::Unmask);
        assert_eq!(
            config_error(b),
            ConfigError::AmbiguousGeneration("[Expr MASK]".into())
        );
    }

    #[test]
    fn inverted_sequence_bounds_are_rejected() {
        let mut b = LatticeBuilder::new();
        wire_toy(&mut b);
        b.shapes.remove(&Prod::Print);
        b.sequence(Prod::Print, Mask::Category(Cat::Expr), 3, 1);
        assert!(matches!(config_error(b), ConfigError::InvertedBounds { .. }));
    }
}
