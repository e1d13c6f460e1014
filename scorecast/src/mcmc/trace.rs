//! Post-warm-up draws collected from one or more chains.

use crate::mcmc::spec::{Var, VarBlock};
use crate::probs::SliceExt;

#[derive(Debug, Clone, PartialEq)]
pub struct ChainTrace {
    /// Draws in row-major order: one row of `dim` values per retained iteration.
    pub(crate) draws: Vec<f64>,
    pub(crate) acceptance: Vec<f64>,
    pub(crate) steps: Vec<f64>,
}
impl ChainTrace {
    pub fn acceptance(&self) -> &[f64] {
        &self.acceptance
    }

    pub fn steps(&self) -> &[f64] {
        &self.steps
    }

    fn rows(&self, dim: usize) -> impl Iterator<Item = &[f64]> {
        self.draws.chunks_exact(dim)
    }

    fn column(&self, dim: usize, index: usize) -> Vec<f64> {
        self.rows(dim).map(|row| row[index]).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    names: Vec<String>,
    chains: Vec<ChainTrace>,
}
impl Trace {
    pub(crate) fn new(names: Vec<String>, chains: Vec<ChainTrace>) -> Self {
        assert!(!names.is_empty(), "a trace must cover at least one latent");
        assert!(!chains.is_empty(), "a trace must hold at least one chain");
        for chain in &chains {
            assert_eq!(0, chain.draws.len() % names.len(), "ragged chain");
        }
        Self { names, chains }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn dim(&self) -> usize {
        self.names.len()
    }

    pub fn chains(&self) -> &[ChainTrace] {
        &self.chains
    }

    pub fn total_draws(&self) -> usize {
        self.chains
            .iter()
            .map(|chain| chain.draws.len() / self.dim())
            .sum()
    }

    /// Draws pooled across chains, in chain order.
    pub fn draws(&self) -> impl Iterator<Item = &[f64]> {
        let dim = self.dim();
        self.chains.iter().flat_map(move |chain| chain.rows(dim))
    }

    pub fn mean(&self, var: Var) -> f64 {
        let sum = self.draws().map(|draw| var.get(draw)).sum::<f64>();
        sum / self.total_draws() as f64
    }

    pub fn mean_block(&self, block: VarBlock) -> Vec<f64> {
        self.mean_of(block.len(), |draw, out| out.copy_from_slice(block.slice(draw)))
    }

    /// Averages a derived quantity of length `len` over the pooled draws. `derive` writes the
    /// quantity for one draw into its output slice.
    pub fn mean_of(&self, len: usize, mut derive: impl FnMut(&[f64], &mut [f64])) -> Vec<f64> {
        let mut sums = vec![0.0; len];
        let mut derived = vec![0.0; len];
        for draw in self.draws() {
            derive(draw, &mut derived);
            for (sum, value) in sums.iter_mut().zip(&derived) {
                *sum += value;
            }
        }
        sums.scale(1.0 / self.total_draws() as f64);
        sums
    }

    /// Mean acceptance rate of the latent at `index`, averaged over chains.
    pub fn acceptance(&self, index: usize) -> f64 {
        self.chains
            .iter()
            .map(|chain| chain.acceptance[index])
            .sum::<f64>()
            / self.chains.len() as f64
    }

    /// Gelman–Rubin potential scale reduction factor of the latent at `index`. Requires at least
    /// two chains of at least two draws, and some within-chain variation.
    pub fn rhat(&self, index: usize) -> Option<f64> {
        let dim = self.dim();
        let draws_per_chain = self.chains[0].draws.len() / dim;
        if self.chains.len() < 2 || draws_per_chain < 2 {
            return None;
        }

        let columns = self
            .chains
            .iter()
            .map(|chain| chain.column(dim, index))
            .collect::<Vec<_>>();
        let chain_means = columns.iter().map(|column| column.mean()).collect::<Vec<_>>();
        let within = columns
            .iter()
            .map(|column| column.variance())
            .collect::<Vec<_>>()
            .mean();
        if within <= 0.0 || !within.is_finite() {
            return None;
        }
        let n = draws_per_chain as f64;
        let between = n * chain_means.variance();
        let pooled = (n - 1.0) / n * within + between / n;
        Some((pooled / within).sqrt())
    }
}
