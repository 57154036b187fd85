use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::emit::Render;
use crate::error::{MastError, Result};
use crate::lattice::{Grammar, NodeKind};
use crate::policy::MaskDownWeights;
use crate::tree::Tree;

pub mod imp;
pub mod minimp;

pub use imp::Imp;
pub use minimp::MinImp;

/// A grammar the sampler can drive end to end.
pub trait Language: Render {
    /// Category of the placeholder a fresh sample starts from.
    fn root_category() -> Self::Category;

    /// Mask-down weights favoring operators near the root and leaves further down.
    fn default_weights(steepness: f64) -> MaskDownWeights<Self>;

    /// Post-processing that keeps the rendered source faithful to the tree.
    /// Returns the number of nodes inserted.
    fn fix(_tree: &mut Tree<Self>) -> Result<usize> {
        Ok(0)
    }
}

/// The languages known by name.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    MinImp,
    Imp,
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Lang::MinImp => MinImp::NAME,
            Lang::Imp => Imp::NAME,
        })
    }
}

impl FromStr for Lang {
    type Err = MastError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "minimp" => Ok(Lang::MinImp),
            "imp" => Ok(Lang::Imp),
            other => Err(MastError::InvalidSampler(format!("unknown language `{other}`"))),
        }
    }
}

/// Bracket division operands that would re-associate when printed: additions
/// on either side, divisions on the right.
pub(crate) fn bracket_divisions<G: Grammar>(
    tree: &mut Tree<G>,
    div: G::Production,
    add: G::Production,
    brackets: G::Production,
) -> Result<usize> {
    let divisions: Vec<_> = tree
        .preorder()
        .into_iter()
        .filter(|id| tree.kind(*id) == NodeKind::Concrete(div))
        .collect();
    let mut wrapped = 0;
    for d in divisions {
        for (label, offenders) in [("left", &[add][..]), ("right", &[add, div][..])] {
            let operand = tree.child(d, label)?;
            if offenders
                .iter()
                .any(|p| tree.kind(operand) == NodeKind::Concrete(*p))
            {
                tree.wrap(operand, brackets, "expr")?;
                wrapped += 1;
            }
        }
    }
    Ok(wrapped)
}
