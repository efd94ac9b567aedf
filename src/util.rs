//! Defines the `Error` type for the belief library

use thiserror::Error;

use std::result;

pub type Result<T> = result::Result<T, BeliefError>;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum BeliefError {

    /// An edge or query referenced a marginal index that was never registered
    #[error("unknown marginal: {0}")]
    UnknownMarginal(usize),

    /// An edge or query referenced a factor index that was never registered
    #[error("unknown factor: {0}")]
    UnknownFactor(usize),

    /// A marginal is not connected to any factor
    #[error("marginal {0} has no incident edge")]
    IsolatedMarginal(usize),

    /// The number of edges attached to a factor differs from the arity of its distribution
    #[error("factor {factor} has {edges} incident edges but its distribution has arity {arity}")]
    ArityMismatch {
        factor: usize,
        arity: usize,
        edges: usize
    },

    /// A factor dimension does not have the domain size of the marginal attached at that position
    #[error("factor {factor} dimension {position} has {expected} categories, marginal {marginal} has {actual}")]
    CardinalityMismatch {
        factor: usize,
        position: usize,
        marginal: usize,
        expected: usize,
        actual: usize
    },

    /// The same marginal was connected to the same factor twice
    #[error("marginal {marginal} is already connected to factor {factor}")]
    DuplicateEdge {
        marginal: usize,
        factor: usize
    },

    /// Two marginals were registered under the same name
    #[error("a marginal named {0} already exists")]
    DuplicateName(String),

    /// The structure of the graph was modified after it was first used for inference or fitting
    #[error("graph structure is fixed once inference or fitting has started")]
    StructureFrozen,

    /// The evidence leaves a variable with no probability mass to renormalize
    #[error("degenerate evidence: belief over variable {variable} has no probability mass")]
    DegenerateEvidence {
        variable: usize
    },

    /// A category code outside of the domain of a variable
    #[error("category {value} is out of range for a domain of {categories} categories")]
    CategoryOutOfRange {
        value: usize,
        categories: usize
    },

    /// Input arrays did not have the expected shape
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>
    },

    /// Parameters that cannot represent a distribution (negative, non-finite or zero mass)
    #[error("invalid probabilities: {0}")]
    InvalidProbabilities(String),

    /// An attempt to initialize a distribution with an incompatible `Initialization`
    #[error("an invalid initialization was provided")]
    InvalidInitialization,

    /// An inference configuration value out of its valid range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Exact enumeration would visit more joint states than allowed
    #[error("enumeration over {states} joint states exceeds the limit of {limit}")]
    IntractableEnumeration {
        states: usize,
        limit: usize
    }

}


impl BeliefError {

    /// Attribute a `DegenerateEvidence` raised by a distribution to the variable that owns it.
    ///
    /// Distributions do not know which variable they belong to, so the graph fills in the index.
    pub fn for_variable(self, variable: usize) -> Self {
        match self {
            BeliefError::DegenerateEvidence { .. } => BeliefError::DegenerateEvidence { variable },
            e => e
        }
    }

}
