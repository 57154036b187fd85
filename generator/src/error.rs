use thiserror::Error;

use crate::kernel::{Kernel, KernelSet};
use crate::terminal::Terminal;

/// Inconsistencies in a language's lattice wiring, reported by `LatticeBuilder::build`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("production {0} is declared twice")]
    DuplicateProduction(String),

    #[error("category {0} is declared twice")]
    DuplicateCategory(String),

    #[error("production {production} belongs to both {first} and {second}")]
    SharedProduction {
        production: String,
        first: String,
        second: String,
    },

    #[error("production {0} belongs to no category")]
    OrphanProduction(String),

    #[error("category {0} has no productions")]
    EmptyCategory(String),

    #[error("production {0} has no paired placeholder able to unmask")]
    Unpaired(String),

    #[error("{production} masks up to {category}, which does not mask down to it")]
    MaskUpWithoutMaskDown { production: String, category: String },

    #[error("{category} masks down to {production}, which does not mask up to it")]
    MaskDownWithoutMaskUp { category: String, production: String },

    #[error("{production} must mask up to exactly its own category {category}")]
    ForeignAncestor { production: String, category: String },

    #[error("{kind} references undeclared kind {missing}")]
    Undeclared { kind: String, missing: String },

    #[error("sequence {production} has min {min} greater than max {max}")]
    InvertedBounds {
        production: String,
        min: usize,
        max: usize,
    },

    #[error("{production} cannot swap `{label}`: no such operand slot")]
    SwapLabel { production: String, label: String },

    #[error("{0} is registered for both unmask and mask-down")]
    AmbiguousGeneration(String),

    #[error("category {0} has no terminal-reachable production")]
    Unresolvable(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MastError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("no slot labelled `{label}`")]
    UnknownLabel { label: String },

    #[error("{child} is not a current child")]
    NotAChild { child: String },

    #[error("{kind} does not support {kernel}")]
    Unsupported { kind: String, kernel: Kernel },

    #[error("cannot {kernel} {from} to {to}")]
    IllegalTransition {
        kernel: Kernel,
        from: String,
        to: String,
    },

    #[error("cannot synthesize {0}: neither a registered terminal nor non-terminal")]
    CannotSynthesize(String),

    #[error("terminal generator produced {literal} for {production}, expected a {expected}")]
    LiteralMismatch {
        production: String,
        expected: Terminal,
        literal: String,
    },

    #[error("{kind} supports several allowed kernels at once: {kernels}")]
    AmbiguousKernels { kind: String, kernels: KernelSet },

    #[error("{0} is not a decorruption kernel")]
    NotDriven(Kernel),

    #[error("weighted draw over {category} at depth {depth} left the sample unconsumed")]
    SamplingExhausted { category: String, depth: usize },

    #[error("weight of {production} at depth {depth} is {weight}; weights must be finite and non-negative")]
    InvalidWeight {
        production: String,
        depth: usize,
        weight: f64,
    },

    #[error("weights over {category} at depth {depth} sum to zero")]
    ZeroWeights { category: String, depth: usize },

    #[error("expected a placeholder node, got {0}")]
    NotAPlaceholder(String),

    #[error("terminal node {0} carries no literal")]
    MissingLiteral(String),

    #[error("unsupported terminal category: {0}")]
    UnsupportedTerminal(Terminal),

    #[error("decorruption exceeded {limit} steps")]
    StepLimit { limit: usize },

    #[error("invalid sampler configuration: {0}")]
    InvalidSampler(String),

    #[error("accepted {accepted} of {wanted} samples after {attempts} attempts")]
    AttemptsExhausted {
        accepted: usize,
        wanted: usize,
        attempts: usize,
    },
}

pub type Result<T> = std::result::Result<T, MastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_convert() {
        let err: MastError = ConfigError::EmptyCategory("aexpr".into()).into();
        assert_eq!(
            err.to_string(),
            "configuration error: category aexpr has no productions"
        );
    }

    #[test]
    fn transition_messages_name_both_kinds() {
        let err = MastError::IllegalTransition {
            kernel: Kernel::MaskDown,
            from: "[aexpr MASK]".into(),
            to: "[leq_exp MASK]".into(),
        };
        assert_eq!(err.to_string(), "cannot mask-down [aexpr MASK] to [leq_exp MASK]");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MastError>();
    }
}
