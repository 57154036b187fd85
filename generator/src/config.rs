use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{MastError, Result};
use crate::lang::{Lang, Language};
use crate::lattice::Lattice;
use crate::policy::{Curve, MaskDownWeights};

/// Knobs for sampling a dataset. Every field has a default, so a TOML file
/// only needs to name what it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SamplerConfig {
    pub language: Lang,
    pub dataset_size: usize,
    /// Smallest accepted tree height.
    pub min_depth: usize,
    /// Largest accepted tree height; unbounded when absent.
    pub max_depth: Option<usize>,
    pub alphabet: String,
    pub max_int: i64,
    pub steepness: f64,
    pub seed: Option<u64>,
    /// Run the language's fix-up pass before measuring and rendering.
    pub fix_precedence: bool,
    /// Per-tree decorruption step cap; trees that hit it are rejected.
    pub max_steps: Option<usize>,
    pub max_attempts: usize,
    /// Overrides on top of the language defaults, by category then production name.
    pub weights: BTreeMap<String, BTreeMap<String, Curve>>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            language: Lang::MinImp,
            dataset_size: 10_000,
            min_depth: 1,
            max_depth: None,
            alphabet: ('a'..='z').collect(),
            max_int: 10,
            steepness: 0.15,
            seed: None,
            fix_precedence: true,
            max_steps: Some(100_000),
            max_attempts: 1_000_000,
            weights: BTreeMap::new(),
        }
    }
}

impl SamplerConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: SamplerConfig =
            toml::from_str(s).map_err(|e| MastError::InvalidSampler(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(MastError::InvalidSampler(msg)) };
        if self.min_depth == 0 {
            return invalid("min_depth must be at least 1".into());
        }
        if let Some(max) = self.max_depth {
            if max < self.min_depth {
                return invalid(format!(
                    "max_depth {max} is below min_depth {}",
                    self.min_depth
                ));
            }
        }
        if self.alphabet.is_empty() {
            return invalid("alphabet is empty".into());
        }
        if self.max_int < 0 {
            return invalid(format!("max_int {} is negative", self.max_int));
        }
        if !self.steepness.is_finite() || self.steepness <= 0.0 {
            return invalid(format!("steepness {} must be finite and positive", self.steepness));
        }
        if self.max_steps == Some(0) {
            return invalid("max_steps must be positive".into());
        }
        Ok(())
    }

    pub fn accepts_depth(&self, depth: usize) -> bool {
        depth >= self.min_depth && self.max_depth.map_or(true, |max| depth <= max)
    }

    /// The language's default weights with this config's overrides applied.
    pub fn weights_for<G: Language>(&self, lattice: &Lattice<G>) -> Result<MaskDownWeights<G>> {
        let mut weights = G::default_weights(self.steepness);
        for (category_name, row) in &self.weights {
            let category = lattice.category_named(category_name).ok_or_else(|| {
                MastError::InvalidSampler(format!(
                    "{} has no category `{category_name}`",
                    G::NAME
                ))
            })?;
            for (production_name, curve) in row {
                let production = lattice
                    .production_named(production_name)
                    .filter(|p| lattice.category_of(*p) == Some(category))
                    .ok_or_else(|| {
                        MastError::InvalidSampler(format!(
                            "`{production_name}` is not a production of {category_name}"
                        ))
                    })?;
                weights.set(category, production, curve.weight_fn());
            }
        }
        Ok(weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::minimp::{Category, MinImp, Production};
    use crate::lattice::Grammar;

    #[test]
    fn empty_file_is_the_default() {
        assert_eq!(SamplerConfig::from_toml_str("").unwrap(), SamplerConfig::default());
    }

    #[test]
    fn parses_overrides() {
        let config = SamplerConfig::from_toml_str(
            r#"
            language = "imp"
            dataset_size = 5
            min_depth = 2
            max_depth = 6
            seed = 42

            [weights.aexpr]
            brc_a_exp = { curve = "constant", weight = 0.5 }
            add_exp = { curve = "step", until = 2, before = 1.0, after = 0.0 }
            "#,
        )
        .unwrap();
        assert_eq!(config.language, Lang::Imp);
        assert_eq!(config.max_depth, Some(6));
        assert_eq!(config.weights["aexpr"]["brc_a_exp"], Curve::Constant { weight: 0.5 });
        assert!(config.accepts_depth(6));
        assert!(!config.accepts_depth(1));
    }

    #[test]
    fn rejects_bad_values() {
        for bad in [
            "min_depth = 0",
            "min_depth = 4\nmax_depth = 3",
            "alphabet = \"\"",
            "max_int = -1",
            "steepness = -0.5",
            "steepness = 0",
            "steepness = 0.0",
            "depth = 3",
        ] {
            assert!(
                matches!(SamplerConfig::from_toml_str(bad), Err(MastError::InvalidSampler(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn overrides_replace_defaults_in_place() {
        let l = MinImp::lattice().unwrap();
        let mut config = SamplerConfig::default();
        config
            .weights
            .entry("aexpr".into())
            .or_default()
            .insert("brc_a_exp".into(), Curve::Constant { weight: 1.0 });
        let w = config.weights_for::<MinImp>(&l).unwrap();
        let d = w.distribution(&l, Category::AExpr, 1).unwrap();
        assert_eq!(d[2].0, Production::BrcAExp);
        assert!(d[2].1 > 0.0);
    }

    #[test]
    fn overrides_must_name_known_kinds() {
        let l = MinImp::lattice().unwrap();
        let mut config = SamplerConfig::default();
        config
            .weights
            .entry("bexpr".into())
            .or_default()
            .insert("bool".into(), Curve::Constant { weight: 1.0 });
        assert!(config.weights_for::<MinImp>(&l).is_err());

        let mut config = SamplerConfig::default();
        config
            .weights
            .entry("aexpr".into())
            .or_default()
            .insert("while_stmt".into(), Curve::Constant { weight: 1.0 });
        assert!(config.weights_for::<MinImp>(&l).is_err());
    }
}
