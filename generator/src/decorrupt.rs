use std::collections::VecDeque;

use rand::Rng;
use tracing::{debug, trace};

use crate::error::{MastError, Result};
use crate::kernel::{Kernel, KernelSet};
use crate::lattice::{Grammar, Lattice, Mask, NodeKind};
use crate::policy::MaskDownWeights;
use crate::terminal::{TerminalContext, TerminalGenerator};
use crate::tree::{NodeId, Tree};

/// Drives a placeholder (and everything it grows into) to a concrete subtree, in place.
pub trait Decorruptor<G: Grammar> {
    fn decorrupt(&mut self, tree: &mut Tree<G>, node: NodeId<G>) -> Result<Report>;
}

#[derive(Clone, Debug)]
pub struct DecorruptorConfig<G: Grammar> {
    /// Kernels the run may apply. A node supporting none of them is left alone.
    pub allowed: KernelSet,
    pub weights: MaskDownWeights<G>,
    /// Cap on dequeued work items.
    pub max_steps: Option<usize>,
}

impl<G: Grammar> Default for DecorruptorConfig<G> {
    fn default() -> Self {
        Self {
            allowed: KernelSet::GENERATION,
            weights: MaskDownWeights::new(),
            max_steps: None,
        }
    }
}

impl<G: Grammar> DecorruptorConfig<G> {
    pub fn with_weights(weights: MaskDownWeights<G>) -> Self {
        Self {
            weights,
            ..Self::default()
        }
    }
}

/// What a run did.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Report {
    pub steps: usize,
    pub unmasked: usize,
    pub masked_down: usize,
    /// Largest queue depth reached.
    pub deepest: usize,
}

/// Breadth-first queue drain: unmask pushes the new holes one level deeper,
/// mask-down re-queues the specialized placeholder at the same depth with a
/// production drawn from the depth-dependent weights.
pub struct DepthWeighted<'a, G: Grammar, T, R> {
    lattice: &'a Lattice<G>,
    config: &'a DecorruptorConfig<G>,
    terminals: T,
    rng: R,
}

impl<'a, G, T, R> DepthWeighted<'a, G, T, R>
where
    G: Grammar,
    T: TerminalGenerator,
    R: Rng,
{
    pub fn new(lattice: &'a Lattice<G>, config: &'a DecorruptorConfig<G>, terminals: T, rng: R) -> Self {
        Self {
            lattice,
            config,
            terminals,
            rng,
        }
    }

    /// One draw from the normalized weights, walking candidates in table order.
    /// Zero-weight candidates are never picked.
    fn draw(&mut self, category: G::Category, depth: usize) -> Result<G::Production> {
        let distribution = self.config.weights.distribution(self.lattice, category, depth)?;
        let mut sample: f64 = self.rng.random();
        for (production, weight) in &distribution {
            if *weight > 0.0 && sample <= *weight {
                return Ok(*production);
            }
            sample -= weight;
        }
        Err(MastError::SamplingExhausted {
            category: category.to_string(),
            depth,
        })
    }
}

impl<G, T, R> Decorruptor<G> for DepthWeighted<'_, G, T, R>
where
    G: Grammar,
    T: TerminalGenerator,
    R: Rng,
{
    fn decorrupt(&mut self, tree: &mut Tree<G>, node: NodeId<G>) -> Result<Report> {
        let kind = tree.kind(node);
        if !kind.is_masked() {
            return Err(MastError::NotAPlaceholder(kind.to_string()));
        }
        self.config.weights.validate(self.lattice)?;

        let mut report = Report::default();
        let mut queue: VecDeque<(usize, NodeId<G>)> = VecDeque::from([(1, node)]);
        while let Some((depth, id)) = queue.pop_front() {
            if let Some(limit) = self.config.max_steps {
                if report.steps >= limit {
                    return Err(MastError::StepLimit { limit });
                }
            }
            report.steps += 1;
            report.deepest = report.deepest.max(depth);

            let kind = tree.kind(id);
            let kernels = self.lattice.kernels(kind).intersection(self.config.allowed);
            if kernels.len() > 1 {
                return Err(MastError::AmbiguousKernels {
                    kind: kind.to_string(),
                    kernels,
                });
            }
            let Some(kernel) = kernels.iter().next() else {
                trace!(%kind, depth, "no allowed kernel, leaving as is");
                continue;
            };

            match (kernel, kind) {
                (Kernel::Unmask, _) => {
                    let ctx = TerminalContext { depth };
                    let unmasked = self.lattice.unmask(
                        tree,
                        id,
                        &mut self.terminals,
                        &mut self.rng,
                        Some(&ctx),
                    )?;
                    trace!(%kind, depth, holes = unmasked.holes.len(), "unmask");
                    report.unmasked += 1;
                    queue.extend(unmasked.holes.into_iter().map(|hole| (depth + 1, hole)));
                }
                (Kernel::MaskDown, NodeKind::Masked(Mask::Category(category))) => {
                    let production = self.draw(category, depth)?;
                    let special = self.lattice.mask_down(tree, id, production)?;
                    trace!(%category, %production, depth, "mask-down");
                    report.masked_down += 1;
                    queue.push_back((depth, special));
                }
                (Kernel::MaskDown, _) => {
                    return Err(MastError::Unsupported {
                        kind: kind.to_string(),
                        kernel,
                    })
                }
                (other, _) => return Err(MastError::NotDriven(other)),
            }
        }

        debug!(
            grammar = G::NAME,
            steps = report.steps,
            unmasked = report.unmasked,
            deepest = report.deepest,
            "decorrupted"
        );
        Ok(report)
    }
}

/// Decorrupt `node` with a one-off `DepthWeighted` run.
pub fn decorrupt<G, T, R>(
    lattice: &Lattice<G>,
    tree: &mut Tree<G>,
    node: NodeId<G>,
    config: &DecorruptorConfig<G>,
    terminals: T,
    rng: R,
) -> Result<Report>
where
    G: Grammar,
    T: TerminalGenerator,
    R: Rng,
{
    DepthWeighted::new(lattice, config, terminals, rng).decorrupt(tree, node)
}
