use crate::error::{MastError, Result};
use crate::lattice::{Grammar, NodeKind};
use crate::terminal::Literal;
use crate::tree::{NodeId, Tree};

/// Token a placeholder contributes to a token sequence.
pub const MASK_TOKEN: &str = "<MASK>";

/// Builds source text and the matching token sequence side by side.
#[derive(Clone, Debug, Default)]
pub struct Emitter {
    indent: usize,
    output: String,
    tokens: Vec<String>,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A token, written as is.
    pub fn emit_inline(&mut self, s: &str) {
        self.output.push_str(s);
        self.tokens.push(s.to_string());
    }

    /// A token with a space on either side, for infix operators.
    pub fn emit_spaced(&mut self, s: &str) {
        self.output.push(' ');
        self.emit_inline(s);
        self.output.push(' ');
    }

    /// Source-only text: punctuation that carries no token of its own.
    pub fn emit_text(&mut self, s: &str) {
        self.output.push_str(s);
    }

    /// A token at the start of a fresh, indented line.
    pub fn emit_block(&mut self, s: &str) {
        self.newline();
        self.emit_inline(s);
    }

    pub fn newline(&mut self) {
        self.output.push('\n');
        for _ in 0..self.indent {
            self.output.push_str("  ");
        }
    }

    pub fn enter_block(&mut self) {
        self.indent += 1
    }

    pub fn exit_block(&mut self) {
        self.indent = self.indent.saturating_sub(1)
    }

    pub fn emit_literal(&mut self, literal: &Literal) {
        self.emit_inline(&literal.to_string())
    }

    fn emit_masked(&mut self, source: &str) {
        self.output.push_str(source);
        self.tokens.push(MASK_TOKEN.to_string());
    }

    pub fn source(&self) -> &str {
        &self.output
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn finish(self) -> (String, Vec<String>) {
        (self.output, self.tokens)
    }
}

/// Concrete syntax of a language.
pub trait Render: Grammar {
    /// Emit the concrete node `id` of `production`; children go through `emit_node`.
    fn render(
        tree: &Tree<Self>,
        id: NodeId<Self>,
        production: Self::Production,
        out: &mut Emitter,
    ) -> Result<()>;
}

/// Emit any node: placeholders as `[kind MASK]`, concrete nodes through `Render`.
pub fn emit_node<G: Render>(tree: &Tree<G>, id: NodeId<G>, out: &mut Emitter) -> Result<()> {
    match tree.kind(id) {
        NodeKind::Masked(mask) => {
            out.emit_masked(&mask.to_string());
            Ok(())
        }
        NodeKind::Concrete(production) => G::render(tree, id, production, out),
    }
}

/// The literal of a terminal node.
pub fn literal<G: Grammar>(tree: &Tree<G>, id: NodeId<G>) -> Result<&Literal> {
    tree.node(id)
        .value()
        .ok_or_else(|| MastError::MissingLiteral(tree.kind(id).to_string()))
}

pub fn emit<G: Render>(tree: &Tree<G>) -> Result<Emitter> {
    let mut out = Emitter::new();
    emit_node(tree, tree.root(), &mut out)?;
    Ok(out)
}

pub fn to_source<G: Render>(tree: &Tree<G>) -> Result<String> {
    Ok(emit(tree)?.finish().0)
}

pub fn to_tokens<G: Render>(tree: &Tree<G>) -> Result<Vec<String>> {
    Ok(emit(tree)?.finish().1)
}
