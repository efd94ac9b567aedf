//! Defines the capabilities every distribution in a factor graph must provide.
//!
//! A `Distribution` can score fully observed data and estimate its own parameters from
//! accumulated sufficient statistics. A `MarginalDistribution` holds the belief over a single
//! variable; a `FactorDistribution` holds the joint potential over an ordered scope of variables
//! and provides the contraction at the heart of sum-product message passing.

use crate::estimators::Summary;
use crate::util::{BeliefError, Result};

use ndarray::prelude as nd;

use std::fmt::Debug;


/// The contract shared by marginal and factor distributions.
pub trait Distribution: Clone + Debug + Send + Sync {

    /// The sufficient statistics accumulated by `summarize`
    type Summary: Summary;

    /// The number of variables the distribution is defined over
    fn arity(&self) -> usize;

    /// The number of categories along each dimension, in scope order
    fn shape(&self) -> Vec<usize>;

    /// The log probability of each row of `values`.
    ///
    /// # Args
    /// * `values`: category codes, shape `(n_rows, self.arity())`
    ///
    /// # Errors
    /// * `BeliefError::ShapeMismatch` if `values` does not have `self.arity()` columns
    /// * `BeliefError::CategoryOutOfRange` if a code exceeds the domain of its dimension
    fn log_probability(&self, values: nd::ArrayView2<usize>) -> Result<nd::Array1<f64>>;

    /// The probability of each row of `values`
    fn probability(&self, values: nd::ArrayView2<usize>) -> Result<nd::Array1<f64>> {
        Ok(self.log_probability(values)?.mapv(f64::exp))
    }

    /// Compute the sufficient statistics of a batch without touching the accumulator.
    ///
    /// The result can be merged into any accumulator of this distribution, which is what allows
    /// independent workers to summarize disjoint batches.
    fn summarize_batch(
        &self,
        values: nd::ArrayView2<usize>,
        weights: nd::ArrayView1<f64>
    ) -> Result<Self::Summary>;

    /// The statistics accumulated since the last call to `from_summaries`
    fn summary(&self) -> &Self::Summary;

    fn summary_mut(&mut self) -> &mut Self::Summary;

    /// Accumulate the sufficient statistics of a weighted batch
    fn summarize(&mut self, values: nd::ArrayView2<usize>, weights: nd::ArrayView1<f64>) -> Result<()> {
        let batch = self.summarize_batch(values, weights)?;
        self.summary_mut().merge(&batch)
    }

    /// Replace the parameters with the estimate from the accumulated statistics and clear the
    /// accumulator. An empty accumulator leaves the parameters unchanged.
    fn from_summaries(&mut self) -> Result<()>;

}


/// A univariate distribution owned by a single variable of the graph.
pub trait MarginalDistribution: Distribution {

    /// The size of the domain of the variable
    fn n_categories(&self) -> usize {
        self.shape().first().cloned().unwrap_or(0)
    }

    /// The probability of each category
    fn probabilities(&self) -> nd::ArrayView1<f64>;

    /// A degenerate distribution putting all of its mass on `value`.
    ///
    /// # Errors
    /// * `BeliefError::CategoryOutOfRange` if `value` is not in the domain
    /// * `BeliefError::DegenerateEvidence` if `value` has no mass under this distribution
    fn clamp(&self, value: usize) -> Result<Self>;

    /// The normalized elementwise product of this distribution with the incoming messages.
    ///
    /// # Errors
    /// * `BeliefError::ShapeMismatch` if a message is not defined over the domain
    /// * `BeliefError::DegenerateEvidence` if the product has no mass
    fn combine(&self, messages: &[nd::ArrayView1<f64>]) -> Result<nd::Array1<f64>>;

}


/// A joint distribution over an ordered scope of variables.
pub trait FactorDistribution: Distribution {

    /// Compute the message sent to the variable at `position`.
    ///
    /// The joint potential is multiplied by each incoming message along its dimension and every
    /// dimension except `position` is summed out, one dimension at a time.
    ///
    /// # Args
    /// * `position`: the dimension of the receiving variable
    /// * `messages`: one message per dimension; the entry at `position` is ignored
    ///
    /// # Returns
    /// an unnormalized vector over the domain of `position`
    fn contract(&self, position: usize, messages: &[nd::ArrayView1<f64>]) -> Result<nd::Array1<f64>>;

}


/// Scale `values` to sum to one.
///
/// # Returns
/// `false`, leaving `values` untouched, if there is no positive finite mass to normalize
pub fn normalize(values: &mut nd::Array1<f64>) -> bool {
    let z = values.sum();
    if z > 0.0 && z.is_finite() {
        values.mapv_inplace(|v| v / z);
        true
    } else {
        false
    }
}


/// Check that parameters could describe a distribution and return their total mass.
pub(crate) fn check_mass<'a>(values: impl Iterator<Item = &'a f64>) -> Result<f64> {
    let mut z = 0.0;
    for &v in values {
        if v < 0.0 || ! v.is_finite() {
            return Err(BeliefError::InvalidProbabilities(
                format!("{} is not a valid probability", v)
            ));
        }
        z += v;
    }

    if z <= 0.0 {
        return Err(BeliefError::InvalidProbabilities(String::from("no probability mass")));
    }

    Ok(z)
}


/// Check that a matrix of data has one column per dimension of a distribution.
pub(crate) fn check_columns(values: &nd::ArrayView2<usize>, arity: usize) -> Result<()> {
    if values.ncols() != arity {
        return Err(BeliefError::ShapeMismatch {
            expected: vec![values.nrows(), arity],
            actual: values.shape().to_vec()
        });
    }

    Ok(())
}
