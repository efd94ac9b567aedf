//! Defines a `MarginalInference` engine that computes exact posteriors by enumerating every
//! completion of the unobserved variables.
//!
//! The cost is the product of the domain sizes of the unobserved variables, so this engine is
//! only usable on small graphs. It serves as the reference answer for approximate engines.

use crate::distribution::{FactorDistribution, MarginalDistribution};
use crate::factor::JointCategorical;
use crate::marginal::Categorical;
use crate::model::FactorGraph;
use crate::util::{BeliefError, Result};
use crate::variable::Observation;
use super::MarginalInference;

use itertools::Itertools;
use ndarray::prelude as nd;

/// The default bound on the number of joint states visited for one row
pub const DEFAULT_MAX_STATES: usize = 1 << 20;


pub struct Enumeration<'a, M = Categorical, F = JointCategorical> {

    graph: &'a FactorGraph<M, F>,

    /// Rows requiring more joint states than this are rejected
    max_states: usize

}


impl<'a, M, F> Enumeration<'a, M, F>
    where M: MarginalDistribution,
          F: FactorDistribution
{

    /// Create a new engine over `graph`.
    ///
    /// # Errors
    /// any structural error raised by `FactorGraph::validate`
    pub fn new(graph: &'a FactorGraph<M, F>) -> Result<Self> {
        graph.validate()?;
        Ok(Enumeration { graph, max_states: DEFAULT_MAX_STATES })
    }


    /// Set the bound on the number of joint states visited for one row
    pub fn with_max_states(mut self, max_states: usize) -> Self {
        self.max_states = max_states;
        self
    }

}


impl<'a, M, F> MarginalInference for Enumeration<'a, M, F>
    where M: MarginalDistribution,
          F: FactorDistribution
{

    fn categories(&self) -> Vec<usize> {
        self.graph.marginals().iter().map(|m| m.n_categories()).collect()
    }


    /// # Errors
    /// * `BeliefError::ShapeMismatch` if `row` does not have one entry per variable
    /// * `BeliefError::CategoryOutOfRange` if an observed category is not in its domain
    /// * `BeliefError::IntractableEnumeration` if there are more completions than allowed
    /// * `BeliefError::DegenerateEvidence` if the evidence has probability zero
    fn infer(&self, row: &[Observation]) -> Result<Vec<nd::Array1<f64>>> {
        let categories = self.categories();
        if row.len() != categories.len() {
            return Err(BeliefError::ShapeMismatch {
                expected: vec![categories.len()],
                actual: vec![row.len()]
            });
        }

        for (obs, &k) in row.iter().zip(categories.iter()) {
            if let Some(v) = obs.value() {
                if v >= k {
                    return Err(BeliefError::CategoryOutOfRange { value: v, categories: k });
                }
            }
        }

        let unknown: Vec<usize> = (0..row.len()).filter(|&i| ! row[i].is_observed()).collect();
        let states = unknown.iter()
                            .try_fold(1usize, |acc, &i| acc.checked_mul(categories[i]))
                            .unwrap_or(usize::MAX);
        if states > self.max_states {
            return Err(BeliefError::IntractableEnumeration { states, limit: self.max_states });
        }

        // one row of complete data per completion of the unknown variables
        let completions: Vec<Vec<usize>> = if unknown.is_empty() {
            vec![Vec::new()]
        } else {
            unknown.iter().map(|&i| 0..categories[i]).multi_cartesian_product().collect()
        };

        let mut values = nd::Array2::from_shape_fn((completions.len(), row.len()), |(_, i)| {
            row[i].value().unwrap_or(0)
        });
        for (r, completion) in completions.iter().enumerate() {
            for (&i, &v) in unknown.iter().zip(completion.iter()) {
                values[[r, i]] = v;
            }
        }

        let weights = self.graph.probability(values.view())?;
        let z = weights.sum();
        if ! (z > 0.0) {
            let variable = (0..row.len()).find(|&i| row[i].is_observed());
            return Err(match variable {
                Some(variable) => BeliefError::DegenerateEvidence { variable },
                None => BeliefError::InvalidProbabilities(String::from("the graph has no probability mass"))
            });
        }

        let mut beliefs: Vec<nd::Array1<f64>> = categories.iter().map(|&k| nd::Array1::zeros(k)).collect();
        for (r, &w) in weights.iter().enumerate() {
            for (i, belief) in beliefs.iter_mut().enumerate() {
                belief[values[[r, i]]] += w / z;
            }
        }

        // observed variables are exactly one-hot
        for (i, obs) in row.iter().enumerate() {
            if let Some(v) = obs.value() {
                beliefs[i].fill(0.0);
                beliefs[i][v] = 1.0;
            }
        }

        Ok(beliefs)
    }

}
