use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::config::SamplerConfig;
use crate::decorrupt::{Decorruptor, DecorruptorConfig, DepthWeighted};
use crate::emit::emit;
use crate::error::{MastError, Result};
use crate::kernel::KernelSet;
use crate::lang::{Imp, Lang, Language, MinImp};
use crate::lattice::{Grammar, Mask};
use crate::terminal::RandomTerminals;
use crate::tree::Tree;

/// One accepted program.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Sample {
    pub source: String,
    pub tokens: Vec<String>,
    /// Tree height.
    pub depth: usize,
    pub size: usize,
}

/// Sample `config.dataset_size` programs whose height falls within the
/// configured bounds. Seeded configs are reproducible.
pub fn generate_with_config(config: &SamplerConfig) -> Result<Vec<Sample>> {
    config.validate()?;
    match config.language {
        Lang::MinImp => sample::<MinImp>(config),
        Lang::Imp => sample::<Imp>(config),
    }
}

pub fn generate() -> Result<Vec<Sample>> {
    generate_with_config(&SamplerConfig::default())
}

/// Fully resolved trees of `G`, accepted by height.
pub fn sample_trees<G: Language>(config: &SamplerConfig) -> Result<Vec<Tree<G>>> {
    let lattice = G::lattice()?;
    let decorruption = DecorruptorConfig {
        allowed: KernelSet::GENERATION,
        weights: config.weights_for(&lattice)?,
        max_steps: config.max_steps,
    };

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let terminals = RandomTerminals::new(
        StdRng::seed_from_u64(rng.random()),
        &config.alphabet,
        config.max_int,
    );
    let mut decorruptor = DepthWeighted::new(&lattice, &decorruption, terminals, rng);

    let mut trees = Vec::with_capacity(config.dataset_size);
    let (mut attempts, mut rejected) = (0usize, 0usize);
    while trees.len() < config.dataset_size {
        if attempts >= config.max_attempts {
            return Err(MastError::AttemptsExhausted {
                accepted: trees.len(),
                wanted: config.dataset_size,
                attempts,
            });
        }
        attempts += 1;

        let mut tree = Tree::new(Mask::Category(G::root_category()));
        let root = tree.root();
        match decorruptor.decorrupt(&mut tree, root) {
            Ok(_) => {}
            Err(MastError::StepLimit { .. }) => {
                rejected += 1;
                continue;
            }
            Err(e) => return Err(e),
        }
        if config.fix_precedence {
            G::fix(&mut tree)?;
        }

        let depth = tree.height(tree.root());
        if !config.accepts_depth(depth) {
            rejected += 1;
            if rejected % 100_000 == 0 {
                warn!(
                    rejected,
                    accepted = trees.len(),
                    "most samples fall outside the depth bounds"
                );
            }
            continue;
        }
        trees.push(tree);
    }
    debug!(
        grammar = G::NAME,
        accepted = trees.len(),
        rejected,
        attempts,
        "sampled"
    );
    Ok(trees)
}

pub fn sample<G: Language>(config: &SamplerConfig) -> Result<Vec<Sample>> {
    sample_trees::<G>(config)?
        .iter()
        .map(|tree| {
            let (source, tokens) = emit(tree)?.finish();
            Ok(Sample {
                source,
                tokens,
                depth: tree.height(tree.root()),
                size: tree.size(),
            })
        })
        .collect()
}
