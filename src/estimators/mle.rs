//! Maximum likelihood estimation of the factors of a `FactorGraph` from complete data.
//!
//! Each factor is estimated from the columns of the data bound to its scope. Marginals are priors
//! of the graph and are never estimated here.

use crate::distribution::{check_columns, FactorDistribution, MarginalDistribution};
use crate::model::FactorGraph;
use crate::util::{BeliefError, Result};
use super::Summary;

use ndarray::prelude as nd;
use rayon::prelude::*;
use tracing::debug;


/// The sufficient statistics of every factor of a graph, in factor order.
///
/// Produced by `FactorGraph::summarize_batch`. Summaries of disjoint batches can be merged in any
/// order before being accumulated into the graph.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphSummary<S> {

    factors: Vec<S>

}


impl<S: Summary> GraphSummary<S> {

    /// The statistics of each factor
    pub fn factors(&self) -> &[S] {
        &self.factors
    }


    /// Add the statistics of `other` to this summary
    ///
    /// # Errors
    /// * `BeliefError::ShapeMismatch` if the summaries were computed over different graphs
    pub fn merge(&mut self, other: &Self) -> Result<()> {
        if self.factors.len() != other.factors.len() {
            return Err(BeliefError::ShapeMismatch {
                expected: vec![self.factors.len()],
                actual: vec![other.factors.len()]
            });
        }

        for (mine, theirs) in self.factors.iter_mut().zip(other.factors.iter()) {
            mine.merge(theirs)?;
        }

        Ok(())
    }

}


impl<M, F> FactorGraph<M, F>
    where M: MarginalDistribution,
          F: FactorDistribution
{

    /// Compute the sufficient statistics of every factor for a batch of complete data, without
    /// modifying the graph.
    ///
    /// # Args
    /// * `values`: category codes, shape `(n_rows, self.n_variables())`
    /// * `weights`: optional per-row weights, all ones if `None`
    ///
    /// # Errors
    /// * any structural error raised by `validate`
    /// * `BeliefError::ShapeMismatch` if `values` or `weights` have the wrong shape
    /// * `BeliefError::CategoryOutOfRange` if a code exceeds the domain of its variable
    pub fn summarize_batch(
        &self,
        values: nd::ArrayView2<usize>,
        weights: Option<nd::ArrayView1<f64>>
    ) -> Result<GraphSummary<F::Summary>> {
        self.validate()?;
        check_columns(&values, self.n_variables())?;

        let ones;
        let weights = match weights {
            Some(w) => w.reborrow(),
            None => {
                ones = nd::Array1::ones(values.nrows());
                ones.view()
            }
        };

        if weights.len() != values.nrows() {
            return Err(BeliefError::ShapeMismatch {
                expected: vec![values.nrows()],
                actual: vec![weights.len()]
            });
        }

        // collect before reducing so the reported error is always that of the first factor
        let factors = self.factors()
                          .par_iter()
                          .enumerate()
                          .map(|(f, factor)| {
                              let columns = values.select(nd::Axis(1), self.scope(f));
                              factor.summarize_batch(columns.view(), weights)
                          })
                          .collect::<Vec<_>>()
                          .into_iter()
                          .collect::<Result<Vec<_>>>()?;

        Ok(GraphSummary { factors })
    }


    /// Add previously computed statistics to the accumulators of the factors.
    ///
    /// # Errors
    /// * `BeliefError::ShapeMismatch` if `summary` was computed over a different graph
    pub fn accumulate(&mut self, summary: &GraphSummary<F::Summary>) -> Result<()> {
        self.validate()?;

        if summary.factors.len() != self.n_factors() {
            return Err(BeliefError::ShapeMismatch {
                expected: vec![self.n_factors()],
                actual: vec![summary.factors.len()]
            });
        }

        // merge into copies first so a failing factor leaves every accumulator untouched
        let merged = self.factors()
                         .iter()
                         .zip(summary.factors.iter())
                         .map(|(factor, stats)| {
                             let mut acc = factor.summary().clone();
                             acc.merge(stats)?;
                             Ok(acc)
                         })
                         .collect::<Result<Vec<_>>>()?;

        for (factor, acc) in self.factors_mut().iter_mut().zip(merged.into_iter()) {
            *factor.summary_mut() = acc;
        }

        Ok(())
    }


    /// Accumulate the sufficient statistics of a batch of complete data into every factor.
    ///
    /// Repeated calls accumulate; nothing changes until `from_summaries` is called.
    ///
    /// # Errors
    /// See `summarize_batch`
    pub fn summarize(&mut self, values: nd::ArrayView2<usize>, weights: Option<nd::ArrayView1<f64>>) -> Result<()> {
        let batch = self.summarize_batch(values, weights)?;
        self.accumulate(&batch)
    }


    /// Re-estimate every factor from its accumulated statistics and clear the accumulators.
    pub fn from_summaries(&mut self) -> Result<()> {
        self.validate()?;

        for factor in self.factors_mut().iter_mut() {
            factor.from_summaries()?;
        }

        debug!(factors = self.n_factors(), "refreshed factor parameters");
        Ok(())
    }


    /// Estimate every factor from a batch of complete data.
    ///
    /// Equivalent to `summarize` followed by `from_summaries`.
    pub fn fit(&mut self, values: nd::ArrayView2<usize>, weights: Option<nd::ArrayView1<f64>>) -> Result<()> {
        self.summarize(values, weights)?;
        self.from_summaries()
    }

}
