//! Arithmetic over identifiers and integer literals: `+`, `/` and brackets.

use std::fmt;

use crate::emit::{emit_node, literal, Emitter, Render};
use crate::error::Result;
use crate::lang::{bracket_divisions, Language};
use crate::lattice::{Grammar, LatticeBuilder, Mask};
use crate::policy::{constant, decay, grow, MaskDownWeights};
use crate::terminal::Terminal;
use crate::tree::{NodeId, Tree};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Category {
    AExpr,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Production {
    Identifier,
    IntLiteral,
    DivExp,
    AddExp,
    BrcAExp,
}

impl Production {
    pub const ALL: [Production; 5] = [
        Production::Identifier,
        Production::IntLiteral,
        Production::DivExp,
        Production::AddExp,
        Production::BrcAExp,
    ];
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("aexpr")
    }
}

impl fmt::Display for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Production::Identifier => "identifier",
            Production::IntLiteral => "int_literal",
            Production::DivExp => "div_exp",
            Production::AddExp => "add_exp",
            Production::BrcAExp => "brc_a_exp",
        })
    }
}

#[derive(Copy, Clone, Debug)]
pub struct MinImp;

impl Grammar for MinImp {
    type Category = Category;
    type Production = Production;

    const NAME: &'static str = "minimp";

    fn wire(b: &mut LatticeBuilder<Self>) {
        use Production::*;
        let aexpr = Mask::Category(Category::AExpr);
        b.category(Category::AExpr, Production::ALL);
        b.terminal(Identifier, Terminal::Identifier)
            .terminal(IntLiteral, Terminal::Number)
            .labeled(DivExp, [("left", aexpr), ("right", aexpr)])
            .labeled(AddExp, [("left", aexpr), ("right", aexpr)])
            .labeled(BrcAExp, [("expr", aexpr)]);
        for p in Production::ALL {
            b.pair(p).maskable(p).mask_up(p, [Category::AExpr]);
        }
        b.mask_down(Category::AExpr, Production::ALL);
        b.binop_swap(AddExp, "left", "right");
    }
}

impl Render for MinImp {
    fn render(
        tree: &Tree<Self>,
        id: NodeId<Self>,
        production: Production,
        out: &mut Emitter,
    ) -> Result<()> {
        match production {
            Production::Identifier | Production::IntLiteral => {
                out.emit_literal(literal(tree, id)?);
            }
            Production::DivExp | Production::AddExp => {
                let op = if production == Production::DivExp { "/" } else { "+" };
                emit_node(tree, tree.child(id, "left")?, out)?;
                out.emit_spaced(op);
                emit_node(tree, tree.child(id, "right")?, out)?;
            }
            Production::BrcAExp => {
                out.emit_inline("(");
                emit_node(tree, tree.child(id, "expr")?, out)?;
                out.emit_inline(")");
            }
        }
        Ok(())
    }
}

impl Language for MinImp {
    fn root_category() -> Category {
        Category::AExpr
    }

    fn default_weights(steepness: f64) -> MaskDownWeights<Self> {
        use Production::*;
        MaskDownWeights::new()
            .with(Category::AExpr, AddExp, decay(steepness))
            .with(Category::AExpr, DivExp, decay(steepness))
            .with(Category::AExpr, BrcAExp, constant(0.0))
            .with(Category::AExpr, Identifier, grow(steepness))
            .with(Category::AExpr, IntLiteral, grow(steepness))
    }

    fn fix(tree: &mut Tree<Self>) -> Result<usize> {
        bracket_divisions(tree, Production::DivExp, Production::AddExp, Production::BrcAExp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::{to_source, to_tokens};
    use crate::terminal::Literal;

    fn leaf(t: &mut Tree<MinImp>, name: &str) -> NodeId<MinImp> {
        t.leaf(Production::Identifier, Literal::Identifier(name.into()))
    }

    fn binop(t: &mut Tree<MinImp>, p: Production, l: NodeId<MinImp>, r: NodeId<MinImp>) -> NodeId<MinImp> {
        t.labeled(p, [("left", l), ("right", r)])
    }

    fn rooted(mut t: Tree<MinImp>, node: NodeId<MinImp>) -> Tree<MinImp> {
        let root = t.root();
        t.replace(root, node).unwrap();
        t
    }

    #[test]
    fn lattice_wires() {
        let l = MinImp::lattice().unwrap();
        assert_eq!(l.productions(Category::AExpr).len(), 5);
        assert_eq!(l.production_named("brc_a_exp"), Some(Production::BrcAExp));
        assert_eq!(l.category_named("aexpr"), Some(Category::AExpr));
    }

    #[test]
    fn renders_source_and_tokens() {
        let mut t = Tree::new(Mask::Category(Category::AExpr));
        let (a, n) = (leaf(&mut t, "a"), t.leaf(Production::IntLiteral, Literal::Number(3)));
        let hole = t.placeholder(Mask::Category(Category::AExpr));
        let sum = binop(&mut t, Production::AddExp, a, n);
        let brc = t.labeled(Production::BrcAExp, [("expr", sum)]);
        let div = binop(&mut t, Production::DivExp, brc, hole);
        let t = rooted(t, div);
        assert_eq!(to_source(&t).unwrap(), "(a + 3) / [aexpr MASK]");
        assert_eq!(
            to_tokens(&t).unwrap(),
            vec!["(", "a", "+", "3", ")", "/", "<MASK>"]
        );
    }

    #[test]
    fn fix_brackets_operands_of_division() {
        let mut t = Tree::new(Mask::Category(Category::AExpr));
        let (a, b, c, d) = (leaf(&mut t, "a"), leaf(&mut t, "b"), leaf(&mut t, "c"), leaf(&mut t, "d"));
        let sum = binop(&mut t, Production::AddExp, a, b);
        let inner = binop(&mut t, Production::DivExp, c, d);
        let div = binop(&mut t, Production::DivExp, sum, inner);
        let mut t = rooted(t, div);
        assert_eq!(to_source(&t).unwrap(), "a + b / c / d");
        assert_eq!(MinImp::fix(&mut t).unwrap(), 2);
        assert_eq!(to_source(&t).unwrap(), "(a + b) / (c / d)");
        assert_eq!(t.height(t.root()), 4);
        assert_eq!(MinImp::fix(&mut t).unwrap(), 0);
    }

    #[test]
    fn fix_leaves_left_nested_division_alone() {
        let mut t = Tree::new(Mask::Category(Category::AExpr));
        let (a, b, c) = (leaf(&mut t, "a"), leaf(&mut t, "b"), leaf(&mut t, "c"));
        let inner = binop(&mut t, Production::DivExp, a, b);
        let div = binop(&mut t, Production::DivExp, inner, c);
        let mut t = rooted(t, div);
        assert_eq!(MinImp::fix(&mut t).unwrap(), 0);
        assert_eq!(to_source(&t).unwrap(), "a / b / c");
    }

    #[test]
    fn default_weights_keep_brackets_out() {
        let l = MinImp::lattice().unwrap();
        let w = MinImp::default_weights(0.15);
        for depth in 1..20 {
            let d = w.distribution(&l, Category::AExpr, depth).unwrap();
            let brc = d.iter().find(|(p, _)| *p == Production::BrcAExp).unwrap();
            assert_eq!(brc.1, 0.0);
        }
    }
}
