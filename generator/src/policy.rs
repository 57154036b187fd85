use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{MastError, Result};
use crate::kernel::Kernel;
use crate::lattice::{Grammar, Lattice, Mask};

/// A selection weight as a function of tree depth.
pub type WeightFn = Arc<dyn Fn(usize) -> f64 + Send + Sync>;

pub fn constant(weight: f64) -> WeightFn {
    Arc::new(move |_| weight)
}

/// Starts near 1 and falls toward 0 as depth grows.
pub fn decay(steepness: f64) -> WeightFn {
    Arc::new(move |depth| 1.0 - (depth as f64 * steepness).tanh())
}

/// Mirror of `decay`: starts near 0 and rises toward 1.
pub fn grow(steepness: f64) -> WeightFn {
    Arc::new(move |depth| (depth as f64 * steepness).tanh())
}

/// Serializable description of a weight function.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "curve", rename_all = "snake_case")]
pub enum Curve {
    Constant { weight: f64 },
    Decay { steepness: f64 },
    Grow { steepness: f64 },
    /// `before` up to and including depth `until`, `after` below it.
    Step { until: usize, before: f64, after: f64 },
}

impl Curve {
    pub fn at(self, depth: usize) -> f64 {
        match self {
            Curve::Constant { weight } => weight,
            Curve::Decay { steepness } => 1.0 - (depth as f64 * steepness).tanh(),
            Curve::Grow { steepness } => (depth as f64 * steepness).tanh(),
            Curve::Step { until, before, after } => {
                if depth <= until {
                    before
                } else {
                    after
                }
            }
        }
    }

    pub fn weight_fn(self) -> WeightFn {
        Arc::new(move |depth| self.at(depth))
    }
}

/// Per category, the mask-down candidates and their depth-dependent weights.
/// Candidate order is insertion order and drives the weighted draw.
pub struct MaskDownWeights<G: Grammar> {
    table: HashMap<G::Category, IndexMap<G::Production, WeightFn>>,
}

impl<G: Grammar> Clone for MaskDownWeights<G> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
        }
    }
}

impl<G: Grammar> Default for MaskDownWeights<G> {
    fn default() -> Self {
        Self {
            table: HashMap::new(),
        }
    }
}

impl<G: Grammar> fmt::Debug for MaskDownWeights<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut m = f.debug_map();
        for (c, row) in &self.table {
            m.entry(c, &row.keys().collect::<Vec<_>>());
        }
        m.finish()
    }
}

impl<G: Grammar> MaskDownWeights<G> {
    /// Uniform weighting everywhere.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, category: G::Category, production: G::Production, weight: WeightFn) -> Self {
        self.set(category, production, weight);
        self
    }

    pub fn set(&mut self, category: G::Category, production: G::Production, weight: WeightFn) {
        self.table
            .entry(category)
            .or_default()
            .insert(production, weight);
    }

    pub fn is_configured(&self, category: G::Category) -> bool {
        self.table.contains_key(&category)
    }

    /// Every configured row must name a category that masks down, and only
    /// productions it masks down to.
    pub fn validate(&self, lattice: &Lattice<G>) -> Result<()> {
        for (category, row) in &self.table {
            let descendants = lattice.descendants(*category)?;
            if let Some(stranger) = row.keys().find(|p| !descendants.contains(*p)) {
                return Err(MastError::IllegalTransition {
                    kernel: Kernel::MaskDown,
                    from: Mask::<G::Category, G::Production>::Category(*category).to_string(),
                    to: Mask::<G::Category, G::Production>::Production(*stranger).to_string(),
                });
            }
        }
        Ok(())
    }

    /// Normalized selection probabilities at `depth`, in candidate order.
    /// Categories without an entry fall back to a uniform weight over every
    /// registered descendant.
    pub fn distribution(
        &self,
        lattice: &Lattice<G>,
        category: G::Category,
        depth: usize,
    ) -> Result<Vec<(G::Production, f64)>> {
        let raw: Vec<(G::Production, f64)> = match self.table.get(&category) {
            Some(row) => row.iter().map(|(p, w)| (*p, w(depth))).collect(),
            None => lattice
                .descendants(category)?
                .iter()
                .map(|p| (*p, 1.0))
                .collect(),
        };

        for (p, w) in &raw {
            if !w.is_finite() || *w < 0.0 {
                return Err(MastError::InvalidWeight {
                    production: p.to_string(),
                    depth,
                    weight: *w,
                });
            }
        }
        let total: f64 = raw.iter().map(|(_, w)| w).sum();
        if total <= 0.0 || !total.is_finite() {
            return Err(MastError::ZeroWeights {
                category: category.to_string(),
                depth,
            });
        }
        Ok(raw.into_iter().map(|(p, w)| (p, w / total)).collect())
    }
}
