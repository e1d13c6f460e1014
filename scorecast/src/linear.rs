//! Support for linear algebra.

pub mod matrix;
