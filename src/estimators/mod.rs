//! Defines the sufficient statistics used to estimate the parameters of distributions from data.
//!
//! Statistics are plain running sums, so summaries of independent batches can be merged in any
//! order before a single parameter update.

use crate::util::{BeliefError, Result};

use ndarray::prelude as nd;

use std::fmt::Debug;

mod mle;
pub use self::mle::GraphSummary;


/// An accumulator of sufficient statistics.
///
/// `merge` must be associative and commutative.
pub trait Summary: Clone + Debug + Send + Sync {

    /// Add the statistics of `other` to this accumulator
    fn merge(&mut self, other: &Self) -> Result<()>;

    /// `true` if nothing has been accumulated
    fn is_empty(&self) -> bool;

    /// Reset to the empty accumulator
    fn clear(&mut self);

}


/// Weighted co-occurrence counts over the cells of a table.
#[derive(Clone, Debug, PartialEq)]
pub struct CountSummary {

    /// Total weight observed in each cell
    counts: nd::ArrayD<f64>,

    /// Total weight observed
    total: f64

}


impl CountSummary {

    /// An empty accumulator over a table of the given shape
    pub fn new(shape: &[usize]) -> Self {
        CountSummary {
            counts: nd::ArrayD::zeros(shape.to_vec()),
            total: 0.0
        }
    }

    pub fn counts(&self) -> &nd::ArrayD<f64> {
        &self.counts
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    /// Add the weighted occurrences of each row of `values`.
    ///
    /// # Args
    /// * `values`: category codes, one column per dimension of the table
    /// * `weights`: one non-negative weight per row
    ///
    /// # Errors
    /// * `BeliefError::ShapeMismatch` if the columns or weights do not line up
    /// * `BeliefError::CategoryOutOfRange` if a code exceeds its dimension
    /// * `BeliefError::InvalidProbabilities` if a weight is negative or not finite
    pub fn add(&mut self, values: nd::ArrayView2<usize>, weights: nd::ArrayView1<f64>) -> Result<()> {
        if values.ncols() != self.counts.ndim() || values.nrows() != weights.len() {
            return Err(BeliefError::ShapeMismatch {
                expected: vec![weights.len(), self.counts.ndim()],
                actual: values.shape().to_vec()
            });
        }

        // validate the whole batch first so a failure leaves the accumulator untouched
        if let Some(&w) = weights.iter().find(|&&w| w < 0.0 || ! w.is_finite()) {
            return Err(BeliefError::InvalidProbabilities(
                format!("{} is not a valid sample weight", w)
            ));
        }

        for (d, column) in values.axis_iter(nd::Axis(1)).enumerate() {
            let categories = self.counts.len_of(nd::Axis(d));
            if let Some(&value) = column.iter().find(|&&v| v >= categories) {
                return Err(BeliefError::CategoryOutOfRange { value, categories });
            }
        }

        let mut idx = vec![0; self.counts.ndim()];
        for (row, &w) in values.outer_iter().zip(weights.iter()) {
            for (i, &v) in idx.iter_mut().zip(row.iter()) {
                *i = v;
            }

            self.counts[nd::IxDyn(&idx)] += w;
            self.total += w;
        }

        Ok(())
    }

}


impl Summary for CountSummary {

    fn merge(&mut self, other: &Self) -> Result<()> {
        if self.counts.shape() != other.counts.shape() {
            return Err(BeliefError::ShapeMismatch {
                expected: self.counts.shape().to_vec(),
                actual: other.counts.shape().to_vec()
            });
        }

        self.counts += &other.counts;
        self.total += other.total;
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.total == 0.0
    }

    fn clear(&mut self) {
        self.counts.fill(0.0);
        self.total = 0.0;
    }

}
