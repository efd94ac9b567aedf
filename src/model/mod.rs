//! Defines the `FactorGraph`, which represents the factorization of a probability distribution
//! over discrete variables, and the probability and prediction queries it answers.

mod factor_graph;
mod prediction;

pub use self::factor_graph::FactorGraph;
