//! A small imperative language: arithmetic and boolean expressions,
//! assignments, conditionals, loops and blocks.

use std::fmt;

use crate::emit::{emit_node, literal, Emitter, Render};
use crate::error::Result;
use crate::lang::{bracket_divisions, Language};
use crate::lattice::{Grammar, LatticeBuilder, Mask, NodeKind};
use crate::policy::{constant, decay, grow, MaskDownWeights};
use crate::terminal::Terminal;
use crate::tree::{NodeId, Tree};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Category {
    AExpr,
    BExpr,
    Stmt,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Production {
    Identifier,
    IntLiteral,
    DivExp,
    AddExp,
    BrcAExp,
    Bool,
    LeqExp,
    NotExp,
    LandExp,
    BrcBExp,
    Block,
    AsnStmt,
    IfStmt,
    WhileStmt,
}

use Production::*;

const AEXPRS: [Production; 5] = [Identifier, IntLiteral, DivExp, AddExp, BrcAExp];
const BEXPRS: [Production; 5] = [Bool, LeqExp, NotExp, LandExp, BrcBExp];
const STMTS: [Production; 4] = [Block, AsnStmt, IfStmt, WhileStmt];

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Category::AExpr => "aexpr",
            Category::BExpr => "bexpr",
            Category::Stmt => "stmt",
        })
    }
}

impl fmt::Display for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Identifier => "identifier",
            IntLiteral => "int_literal",
            DivExp => "div_exp",
            AddExp => "add_exp",
            BrcAExp => "brc_a_exp",
            Bool => "bool",
            LeqExp => "leq_exp",
            NotExp => "not_exp",
            LandExp => "land_exp",
            BrcBExp => "brc_b_exp",
            Block => "block",
            AsnStmt => "asn_stmt",
            IfStmt => "if_stmt",
            WhileStmt => "while_stmt",
        })
    }
}

#[derive(Copy, Clone, Debug)]
pub struct Imp;

impl Grammar for Imp {
    type Category = Category;
    type Production = Production;

    const NAME: &'static str = "imp";

    fn wire(b: &mut LatticeBuilder<Self>) {
        let aexpr = Mask::Category(Category::AExpr);
        let bexpr = Mask::Category(Category::BExpr);
        let stmt = Mask::Category(Category::Stmt);

        b.category(Category::AExpr, AEXPRS)
            .category(Category::BExpr, BEXPRS)
            .category(Category::Stmt, STMTS);

        b.terminal(Identifier, Terminal::Identifier)
            .terminal(IntLiteral, Terminal::Number)
            .labeled(DivExp, [("left", aexpr), ("right", aexpr)])
            .labeled(AddExp, [("left", aexpr), ("right", aexpr)])
            .labeled(BrcAExp, [("expr", aexpr)]);

        b.terminal(Bool, Terminal::Bool)
            .labeled(LeqExp, [("left", aexpr), ("right", aexpr)])
            .labeled(NotExp, [("expr", bexpr)])
            .labeled(LandExp, [("left", bexpr), ("right", bexpr)])
            .labeled(BrcBExp, [("expr", bexpr)]);

        b.sequence(Block, stmt, 0, 3)
            .labeled(
                AsnStmt,
                [("target", Mask::Production(Identifier)), ("expr", aexpr)],
            )
            .labeled(
                IfStmt,
                [("cond", bexpr), ("body", stmt), ("else_body", stmt)],
            )
            .labeled(WhileStmt, [("cond", bexpr), ("body", stmt)]);

        for (category, members) in [
            (Category::AExpr, &AEXPRS[..]),
            (Category::BExpr, &BEXPRS[..]),
            (Category::Stmt, &STMTS[..]),
        ] {
            for p in members {
                b.pair(*p).maskable(*p).mask_up(*p, [category]);
            }
            b.mask_down(category, members.iter().copied());
        }
        b.binop_swap(AddExp, "left", "right")
            .binop_swap(LandExp, "left", "right");
    }
}

impl Imp {
    /// Loop and branch bodies: blocks print their own braces, anything else
    /// gets wrapped in one.
    fn emit_body(tree: &Tree<Self>, body: NodeId<Self>, out: &mut Emitter) -> Result<()> {
        if tree.kind(body) == NodeKind::Concrete(Block) {
            return emit_node(tree, body, out);
        }
        out.emit_inline("{");
        out.enter_block();
        out.newline();
        emit_node(tree, body, out)?;
        out.exit_block();
        out.emit_block("}");
        Ok(())
    }
}

impl Render for Imp {
    fn render(
        tree: &Tree<Self>,
        id: NodeId<Self>,
        production: Production,
        out: &mut Emitter,
    ) -> Result<()> {
        let child = |label| tree.child(id, label);
        match production {
            Identifier | IntLiteral | Bool => out.emit_literal(literal(tree, id)?),
            DivExp | AddExp | LeqExp | LandExp => {
                let op = match production {
                    DivExp => "/",
                    AddExp => "+",
                    LeqExp => "<=",
                    _ => "&&",
                };
                emit_node(tree, child("left")?, out)?;
                out.emit_spaced(op);
                emit_node(tree, child("right")?, out)?;
            }
            BrcAExp | BrcBExp => {
                out.emit_inline("(");
                emit_node(tree, child("expr")?, out)?;
                out.emit_inline(")");
            }
            NotExp => {
                out.emit_inline("!");
                out.emit_text("(");
                emit_node(tree, child("expr")?, out)?;
                out.emit_text(")");
            }
            Block => {
                out.emit_inline("{");
                out.enter_block();
                for (_, stmt) in tree.children(id) {
                    out.newline();
                    emit_node(tree, stmt, out)?;
                }
                out.exit_block();
                out.emit_block("}");
            }
            AsnStmt => {
                emit_node(tree, child("target")?, out)?;
                out.emit_spaced("=");
                emit_node(tree, child("expr")?, out)?;
                out.emit_inline(";");
            }
            IfStmt | WhileStmt => {
                out.emit_inline(if production == IfStmt { "if" } else { "while" });
                out.emit_text(" ");
                out.emit_inline("(");
                emit_node(tree, child("cond")?, out)?;
                out.emit_inline(")");
                out.emit_text(" ");
                Self::emit_body(tree, child("body")?, out)?;
                if production == IfStmt {
                    out.emit_spaced("else");
                    Self::emit_body(tree, child("else_body")?, out)?;
                }
            }
        }
        Ok(())
    }
}

impl Language for Imp {
    fn root_category() -> Category {
        Category::Stmt
    }

    fn default_weights(steepness: f64) -> MaskDownWeights<Self> {
        let (shrink, widen) = (decay(steepness), grow(steepness));
        let mut w = MaskDownWeights::new();
        for (c, p, f) in [
            (Category::AExpr, AddExp, &shrink),
            (Category::AExpr, DivExp, &shrink),
            (Category::AExpr, Identifier, &widen),
            (Category::AExpr, IntLiteral, &widen),
            (Category::BExpr, LeqExp, &shrink),
            (Category::BExpr, NotExp, &shrink),
            (Category::BExpr, LandExp, &shrink),
            (Category::BExpr, Bool, &widen),
            (Category::Stmt, Block, &shrink),
            (Category::Stmt, IfStmt, &shrink),
            (Category::Stmt, WhileStmt, &shrink),
            (Category::Stmt, AsnStmt, &widen),
        ] {
            w.set(c, p, f.clone());
        }
        w.set(Category::AExpr, BrcAExp, constant(0.0));
        w.set(Category::BExpr, BrcBExp, constant(0.0));
        w
    }

    fn fix(tree: &mut Tree<Self>) -> Result<usize> {
        bracket_divisions(tree, DivExp, AddExp, BrcAExp)
    }
}
