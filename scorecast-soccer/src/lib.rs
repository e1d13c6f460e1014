pub mod data;
pub mod domain;
pub mod fixtures;
pub mod model;
pub mod print;
pub mod scoregrid;

#[doc = include_str!("../README.md")]
#[cfg(doc)]
fn readme() {}
