use std::collections::HashMap;
use std::fmt;

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{MastError, Result};

/// Leaf categories a terminal production can be built from.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terminal {
    Identifier,
    Number,
    String,
    Bool,
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Terminal::Identifier => "identifier",
            Terminal::Number => "number",
            Terminal::String => "string",
            Terminal::Bool => "bool",
        })
    }
}

/// Value carried by a terminal node.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Literal {
    Identifier(String),
    Number(i64),
    String(String),
    Bool(bool),
}

impl Literal {
    pub fn terminal(&self) -> Terminal {
        match self {
            Literal::Identifier(_) => Terminal::Identifier,
            Literal::Number(_) => Terminal::Number,
            Literal::String(_) => Terminal::String,
            Literal::Bool(_) => Terminal::Bool,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Identifier(s) => f.write_str(s),
            Literal::Number(n) => write!(f, "{n}"),
            Literal::String(s) => write!(f, "{s:?}"),
            Literal::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// What the caller knows about the leaf being generated.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct TerminalContext {
    pub depth: usize,
}

pub trait TerminalGenerator {
    fn generate(&mut self, ctx: Option<&TerminalContext>, terminal: Terminal) -> Result<Literal>;
}

impl<T: TerminalGenerator + ?Sized> TerminalGenerator for &mut T {
    fn generate(&mut self, ctx: Option<&TerminalContext>, terminal: Terminal) -> Result<Literal> {
        (**self).generate(ctx, terminal)
    }
}

/// Single characters from an alphabet, integers in `0..=max_int`, fair bools.
pub struct RandomTerminals<R> {
    rng: R,
    alphabet: Vec<char>,
    max_int: i64,
}

impl<R: Rng> RandomTerminals<R> {
    pub fn new(rng: R, alphabet: &str, max_int: i64) -> Self {
        Self {
            rng,
            alphabet: alphabet.chars().collect(),
            max_int,
        }
    }

    fn letter(&mut self, terminal: Terminal) -> Result<String> {
        self.alphabet
            .choose(&mut self.rng)
            .map(|c| c.to_string())
            .ok_or(MastError::UnsupportedTerminal(terminal))
    }
}

impl<R: Rng> TerminalGenerator for RandomTerminals<R> {
    fn generate(&mut self, _ctx: Option<&TerminalContext>, terminal: Terminal) -> Result<Literal> {
        Ok(match terminal {
            Terminal::Identifier => Literal::Identifier(self.letter(terminal)?),
            Terminal::String => Literal::String(self.letter(terminal)?),
            Terminal::Number => Literal::Number(self.rng.random_range(0..=self.max_int.max(0))),
            Terminal::Bool => Literal::Bool(self.rng.random()),
        })
    }
}

/// Always hands back the same literal per terminal category.
#[derive(Clone, Debug, Default)]
pub struct FixedTerminals {
    values: HashMap<Terminal, Literal>,
}

impl FixedTerminals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, literal: Literal) -> Self {
        self.values.insert(literal.terminal(), literal);
        self
    }
}

impl TerminalGenerator for FixedTerminals {
    fn generate(&mut self, _ctx: Option<&TerminalContext>, terminal: Terminal) -> Result<Literal> {
        self.values
            .get(&terminal)
            .cloned()
            .ok_or(MastError::UnsupportedTerminal(terminal))
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn random_terminals_stay_in_range() {
        let mut g = RandomTerminals::new(StdRng::seed_from_u64(7), "xyz", 10);
        for _ in 0..200 {
            match g.generate(None, Terminal::Number).unwrap() {
                Literal::Number(n) => assert!((0..=10).contains(&n)),
                other => panic!("unexpected {other:?}"),
            }
            match g.generate(None, Terminal::Identifier).unwrap() {
                Literal::Identifier(s) => assert!(["x", "y", "z"].contains(&s.as_str())),
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn empty_alphabet_cannot_name_things() {
        let mut g = RandomTerminals::new(StdRng::seed_from_u64(7), "", 10);
        assert_eq!(
            g.generate(None, Terminal::Identifier),
            Err(MastError::UnsupportedTerminal(Terminal::Identifier))
        );
        assert!(g.generate(None, Terminal::Bool).is_ok());
    }

    #[test]
    fn fixed_terminals_reject_unknown_categories() {
        let mut g = FixedTerminals::new().with(Literal::Number(3));
        assert_eq!(g.generate(None, Terminal::Number), Ok(Literal::Number(3)));
        assert_eq!(
            g.generate(None, Terminal::String),
            Err(MastError::UnsupportedTerminal(Terminal::String))
        );
    }
}
