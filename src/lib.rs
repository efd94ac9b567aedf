//! Sum-product inference and parameter estimation on factor graphs over discrete variables.
//!
//! A `FactorGraph` joins one marginal distribution per variable to factor distributions over
//! ordered subsets of the variables. Complete rows of data are scored with the product rule,
//! partially observed rows are completed by loopy belief propagation (or exact enumeration on
//! small graphs), and factors are estimated from data through mergeable sufficient statistics.

pub mod util;
pub mod variable;
pub mod estimators;
pub mod distribution;
pub mod marginal;
pub mod factor;
pub mod init;
pub mod model;
pub mod inference;

pub use crate::util::{BeliefError, Result};
pub use crate::variable::Observation;
pub use crate::distribution::{Distribution, FactorDistribution, MarginalDistribution};
pub use crate::marginal::Categorical;
pub use crate::factor::JointCategorical;
pub use crate::model::FactorGraph;
pub use crate::inference::{BeliefPropagation, BeliefPropagationConfig, Enumeration, MarginalInference};
