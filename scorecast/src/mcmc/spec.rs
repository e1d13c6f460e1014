//! Model specifications: named latent variables with their priors, and the potentials (typically
//! log-likelihoods) that tie them to data. A specification is assembled with a
//! [`ModelSpecBuilder`] and handed to the sampler by reference.

use std::fmt::{Debug, Formatter};
use std::ops::Range;

use anyhow::bail;
use rustc_hash::FxHashSet;
use tinyrand::Rand;

use crate::random;

/// Handle to a scalar latent variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Var(usize);
impl Var {
    pub fn index(&self) -> usize {
        self.0
    }

    #[inline]
    pub fn get(&self, values: &[f64]) -> f64 {
        values[self.0]
    }
}

/// Handle to a contiguous run of latent variables sharing a prior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarBlock {
    start: usize,
    len: usize,
}
impl VarBlock {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn var(&self, offset: usize) -> Var {
        assert!(offset < self.len, "offset {offset} outside a block of {}", self.len);
        Var(self.start + offset)
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.len
    }

    #[inline]
    pub fn slice<'v>(&self, values: &'v [f64]) -> &'v [f64] {
        &values[self.range()]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Precision {
    Fixed(f64),
    Of(Var),
}
impl Precision {
    #[inline]
    fn resolve(&self, values: &[f64]) -> f64 {
        match self {
            Precision::Fixed(precision) => *precision,
            Precision::Of(var) => var.get(values),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Prior {
    /// Improper uniform prior over the real line.
    Flat,
    Normal { mean: f64, precision: Precision },
    /// Gamma in the shape/rate parametrisation; support is the positive reals.
    Gamma { shape: f64, rate: f64 },
}
impl Prior {
    pub fn is_positive(&self) -> bool {
        matches!(self, Prior::Gamma { .. })
    }

    /// Log-density up to an additive constant that does not depend on `values`.
    #[inline]
    fn ln_density(&self, value: f64, values: &[f64]) -> f64 {
        match self {
            Prior::Flat => 0.0,
            Prior::Normal { mean, precision } => {
                let precision = precision.resolve(values);
                if precision > 0.0 {
                    0.5 * precision.ln() - 0.5 * precision * (value - mean).powi(2)
                } else {
                    f64::NEG_INFINITY
                }
            }
            Prior::Gamma { shape, rate } => {
                if value > 0.0 {
                    (shape - 1.0) * value.ln() - rate * value
                } else {
                    f64::NEG_INFINITY
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Latent {
    pub name: String,
    pub prior: Prior,
}

type Potential<'a> = Box<dyn Fn(&[f64]) -> f64 + Send + Sync + 'a>;

pub struct ModelSpec<'a> {
    latents: Vec<Latent>,
    potentials: Vec<Potential<'a>>,
}
impl<'a> ModelSpec<'a> {
    pub fn builder() -> ModelSpecBuilder<'a> {
        ModelSpecBuilder {
            latents: vec![],
            potentials: vec![],
        }
    }

    pub fn dim(&self) -> usize {
        self.latents.len()
    }

    pub fn latents(&self) -> &[Latent] {
        &self.latents
    }

    pub fn names(&self) -> Vec<String> {
        self.latents.iter().map(|latent| latent.name.clone()).collect()
    }

    pub fn ln_prior(&self, values: &[f64]) -> f64 {
        debug_assert_eq!(self.dim(), values.len());
        self.latents
            .iter()
            .zip(values)
            .map(|(latent, &value)| latent.prior.ln_density(value, values))
            .sum()
    }

    /// Unnormalised log posterior density.
    pub fn ln_density(&self, values: &[f64]) -> f64 {
        let ln_prior = self.ln_prior(values);
        if ln_prior == f64::NEG_INFINITY {
            return ln_prior;
        }
        ln_prior
            + self
                .potentials
                .iter()
                .map(|potential| potential(values))
                .sum::<f64>()
    }

    /// A jittered starting point: centres of the priors (zero for flat priors), perturbed by up
    /// to `jitter` on the real line or by a factor of up to `e^jitter` for positive latents.
    pub(crate) fn initial_point(&self, jitter: f64, rand: &mut impl Rand) -> Vec<f64> {
        self.latents
            .iter()
            .map(|latent| {
                let offset = jitter * (2.0 * random::uniform(rand) - 1.0);
                match &latent.prior {
                    Prior::Flat => offset,
                    Prior::Normal { mean, .. } => mean + offset,
                    Prior::Gamma { shape, rate } => shape / rate * offset.exp(),
                }
            })
            .collect()
    }
}

impl Debug for ModelSpec<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSpec")
            .field("latents", &self.latents)
            .field("potentials", &self.potentials.len())
            .finish()
    }
}

pub struct ModelSpecBuilder<'a> {
    latents: Vec<Latent>,
    potentials: Vec<Potential<'a>>,
}
impl<'a> ModelSpecBuilder<'a> {
    pub fn flat(&mut self, name: impl Into<String>) -> Var {
        self.declare(name.into(), Prior::Flat)
    }

    pub fn normal(&mut self, name: impl Into<String>, mean: f64, precision: Precision) -> Var {
        self.declare(name.into(), Prior::Normal { mean, precision })
    }

    /// Declares `len` independent normal latents named `name[0]`, `name[1]`, ...
    pub fn normal_vector(
        &mut self,
        name: &str,
        len: usize,
        mean: f64,
        precision: Precision,
    ) -> VarBlock {
        let start = self.latents.len();
        for offset in 0..len {
            self.declare(
                format!("{name}[{offset}]"),
                Prior::Normal {
                    mean,
                    precision: precision.clone(),
                },
            );
        }
        VarBlock { start, len }
    }

    pub fn gamma(&mut self, name: impl Into<String>, shape: f64, rate: f64) -> Var {
        self.declare(name.into(), Prior::Gamma { shape, rate })
    }

    /// Adds a log-potential over the full vector of latent values.
    pub fn potential(&mut self, potential: impl Fn(&[f64]) -> f64 + Send + Sync + 'a) {
        self.potentials.push(Box::new(potential));
    }

    pub fn build(self) -> Result<ModelSpec<'a>, anyhow::Error> {
        self.validate()?;
        Ok(ModelSpec {
            latents: self.latents,
            potentials: self.potentials,
        })
    }

    fn declare(&mut self, name: String, prior: Prior) -> Var {
        self.latents.push(Latent { name, prior });
        Var(self.latents.len() - 1)
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        if self.latents.is_empty() {
            bail!("at least one latent variable must be declared")
        }
        let mut names = FxHashSet::default();
        for latent in &self.latents {
            if !names.insert(latent.name.as_str()) {
                bail!("duplicate latent variable '{}'", latent.name)
            }
            match &latent.prior {
                Prior::Flat => {}
                Prior::Normal { mean, precision } => {
                    if !mean.is_finite() {
                        bail!("mean of '{}' must be finite", latent.name)
                    }
                    match precision {
                        Precision::Fixed(precision) => {
                            if !(precision.is_finite() && *precision > 0.0) {
                                bail!("precision of '{}' must be positive", latent.name)
                            }
                        }
                        Precision::Of(var) => {
                            let positive = self
                                .latents
                                .get(var.index())
                                .map(|hyper| hyper.prior.is_positive())
                                .unwrap_or(false);
                            if !positive {
                                bail!(
                                    "precision of '{}' must refer to a positive latent variable",
                                    latent.name
                                )
                            }
                        }
                    }
                }
                Prior::Gamma { shape, rate } => {
                    if !(shape.is_finite() && *shape > 0.0 && rate.is_finite() && *rate > 0.0) {
                        bail!("shape and rate of '{}' must be positive", latent.name)
                    }
                }
            }
        }
        Ok(())
    }
}
