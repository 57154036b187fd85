//! Grammar-typed masked syntax trees and their randomized completion.
//!
//! A language wires its categories and productions into a [`Lattice`]; a
//! [`Tree`] starts as a single placeholder and a [`Decorruptor`] resolves it
//! into a concrete program through the lattice's transition kernels.

mod config;
mod container;
mod decorrupt;
mod emit;
mod error;
mod generator;
mod kernel;
mod lattice;
mod policy;
mod terminal;
mod tree;

pub mod lang;

pub use crate::config::SamplerConfig;
pub use crate::container::{Children, LabeledContainer, SequenceContainer, Slot};
pub use crate::decorrupt::{decorrupt, Decorruptor, DecorruptorConfig, DepthWeighted, Report};
pub use crate::emit::{emit, emit_node, literal, to_source, to_tokens, Emitter, Render, MASK_TOKEN};
pub use crate::error::{ConfigError, MastError, Result};
pub use crate::generator::{generate, generate_with_config, sample, sample_trees, Sample};
pub use crate::kernel::{Kernel, KernelSet, Unmasked};
pub use crate::lattice::{
    Grammar, KindOf, Lattice, LatticeBuilder, Mask, MaskOf, NodeKind, Shape, ShapeOf,
};
pub use crate::policy::{constant, decay, grow, Curve, MaskDownWeights, WeightFn};
pub use crate::terminal::{
    FixedTerminals, Literal, RandomTerminals, Terminal, TerminalContext, TerminalGenerator,
};
pub use crate::tree::{Node, NodeId, Tree};
