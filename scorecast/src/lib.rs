//! Numeric foundations for fitting goal-scoring models: Poisson mass functions, probability
//! helpers, derivative-free optimisers and a Markov-chain Monte Carlo engine driven by an explicit
//! model specification.

#![allow(clippy::too_many_arguments)]

pub mod csv;
pub mod factorial;
pub mod file;
pub mod hash_lookup;
pub mod linear;
pub mod mcmc;
pub mod opt;
pub mod poisson;
pub mod probs;
pub mod random;
pub mod timed;
