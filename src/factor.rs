//! Definition of the factor module
//!
//! A `JointCategorical` is the potential of a factor node: a table over an ordered scope of
//! discrete variables, one table dimension per variable.

use crate::distribution::{check_columns, check_mass, Distribution, FactorDistribution};
use crate::estimators::{CountSummary, Summary};
use crate::util::{BeliefError, Result};

use ndarray::prelude as nd;

/// Alias f64 ndarray::Array as Table
pub type Table = nd::ArrayD<f64>;


/// A joint distribution (or, more generally, a non-negative potential) over discrete variables.
#[derive(Clone, Debug, PartialEq)]
pub struct JointCategorical {

    /// The values of the table. Dimension `i` ranges over the categories of the `i`th variable
    /// of the factor's scope.
    table: Table,

    /// Weight of the previous table when refreshing from summaries, in `[0, 1]`
    inertia: f64,

    /// Weighted co-occurrence counts accumulated since the last refresh
    summary: CountSummary

}


impl JointCategorical {

    /// Create a new `JointCategorical`.
    ///
    /// The table does not need to be normalized; tables estimated from data always are.
    ///
    /// # Errors
    /// * `BeliefError::InvalidProbabilities` if the table has no dimension, an empty dimension,
    ///   negative or non-finite values, or no mass at all
    pub fn new(table: Table) -> Result<Self> {
        if table.ndim() == 0 || table.is_empty() {
            return Err(BeliefError::InvalidProbabilities(
                String::from("a factor table needs at least one non-empty dimension")
            ));
        }

        check_mass(table.iter())?;

        let summary = CountSummary::new(table.shape());
        Ok(JointCategorical { table, inertia: 0.0, summary })
    }


    /// A uniform joint distribution over a table of the given shape
    pub fn uniform(shape: &[usize]) -> Result<Self> {
        let cells: usize = shape.iter().product();
        if shape.is_empty() || cells == 0 {
            return Err(BeliefError::InvalidProbabilities(
                String::from("a factor table needs at least one non-empty dimension")
            ));
        }

        JointCategorical::new(Table::from_elem(shape.to_vec(), 1.0 / cells as f64))
    }


    /// Set the weight the current table keeps when refreshed from summaries.
    ///
    /// # Errors
    /// * `BeliefError::InvalidConfig` if `inertia` is not in `[0, 1]`
    pub fn with_inertia(mut self, inertia: f64) -> Result<Self> {
        if ! (0.0..=1.0).contains(&inertia) {
            return Err(BeliefError::InvalidConfig(format!("inertia {} is not in [0, 1]", inertia)));
        }

        self.inertia = inertia;
        Ok(self)
    }


    pub fn inertia(&self) -> f64 {
        self.inertia
    }


    /// The values of the table
    pub fn table(&self) -> &Table {
        &self.table
    }


    /// Retrieve the value for a complete assignment to the scope of this factor
    ///
    /// # Args
    /// * `assignment`: one category per dimension, in scope order
    ///
    /// # Errors
    /// * `BeliefError::ShapeMismatch` if the assignment does not cover every dimension
    /// * `BeliefError::CategoryOutOfRange` if a category exceeds its dimension
    pub fn value(&self, assignment: &[usize]) -> Result<f64> {
        if assignment.len() != self.table.ndim() {
            return Err(BeliefError::ShapeMismatch {
                expected: vec![self.table.ndim()],
                actual: vec![assignment.len()]
            });
        }

        for (&v, &categories) in assignment.iter().zip(self.table.shape()) {
            if v >= categories {
                return Err(BeliefError::CategoryOutOfRange { value: v, categories });
            }
        }

        Ok(self.table[nd::IxDyn(assignment)])
    }


    /// Marginalize the factor over the variable at `position`
    ///
    /// Defined in Koller & Friedman 9.3.1
    ///
    /// # Returns
    /// a factor over the remaining dimensions, in their original order
    ///
    /// # Errors
    /// * `BeliefError::ShapeMismatch` if `position` is not a dimension, or is the only one
    pub fn marginalize(&self, position: usize) -> Result<Self> {
        if position >= self.table.ndim() || self.table.ndim() == 1 {
            return Err(BeliefError::ShapeMismatch {
                expected: vec![self.table.ndim()],
                actual: vec![position]
            });
        }

        let mut marginal = JointCategorical::new(self.table.sum_axis(nd::Axis(position)))?;
        marginal.inertia = self.inertia;
        Ok(marginal)
    }

}


/// Multiply `table` by `message` along `axis` and sum that axis out.
fn fold_axis(table: nd::ArrayViewD<f64>, axis: usize, message: nd::ArrayView1<f64>) -> Table {
    let mut shape = table.shape().to_vec();
    shape.remove(axis);

    let mut folded = Table::zeros(shape);
    for (slice, &m) in table.axis_iter(nd::Axis(axis)).zip(message.iter()) {
        if m != 0.0 {
            folded.scaled_add(m, &slice);
        }
    }

    folded
}


impl Distribution for JointCategorical {

    type Summary = CountSummary;

    fn arity(&self) -> usize {
        self.table.ndim()
    }

    fn shape(&self) -> Vec<usize> {
        self.table.shape().to_vec()
    }

    fn log_probability(&self, values: nd::ArrayView2<usize>) -> Result<nd::Array1<f64>> {
        check_columns(&values, self.arity())?;

        let mut idx = vec![0; self.arity()];
        values.outer_iter()
              .map(|row| {
                  for (i, &v) in idx.iter_mut().zip(row.iter()) {
                      *i = v;
                  }
                  self.value(&idx).map(f64::ln)
              })
              .collect()
    }

    fn summarize_batch(
        &self,
        values: nd::ArrayView2<usize>,
        weights: nd::ArrayView1<f64>
    ) -> Result<CountSummary> {
        let mut batch = CountSummary::new(self.table.shape());
        batch.add(values, weights)?;
        Ok(batch)
    }

    fn summary(&self) -> &CountSummary {
        &self.summary
    }

    fn summary_mut(&mut self) -> &mut CountSummary {
        &mut self.summary
    }

    fn from_summaries(&mut self) -> Result<()> {
        if self.summary.is_empty() {
            return Ok(());
        }

        // the joint estimate is the weighted co-occurrence count of each cell over the total weight
        let estimate = self.summary.counts() / self.summary.total();
        self.table = &self.table * self.inertia + estimate * (1.0 - self.inertia);
        self.summary.clear();
        Ok(())
    }

}


impl FactorDistribution for JointCategorical {

    fn contract(&self, position: usize, messages: &[nd::ArrayView1<f64>]) -> Result<nd::Array1<f64>> {
        let arity = self.arity();
        if position >= arity || messages.len() != arity {
            return Err(BeliefError::ShapeMismatch {
                expected: vec![arity],
                actual: vec![messages.len()]
            });
        }

        for (axis, m) in messages.iter().enumerate().filter(|&(axis, _)| axis != position) {
            if m.len() != self.table.len_of(nd::Axis(axis)) {
                return Err(BeliefError::ShapeMismatch {
                    expected: vec![self.table.len_of(nd::Axis(axis))],
                    actual: vec![m.len()]
                });
            }
        }

        // Fold one dimension at a time, from the last to the first, so the axis index of every
        // dimension still to be folded is unchanged.
        let mut folded: Option<Table> = None;
        for axis in (0..arity).rev().filter(|&axis| axis != position) {
            let next = match folded {
                Some(ref t) => fold_axis(t.view(), axis, messages[axis]),
                None => fold_axis(self.table.view(), axis, messages[axis])
            };
            folded = Some(next);
        }

        let message = folded.unwrap_or_else(|| self.table.clone());
        let len = message.len();
        message.into_dimensionality::<nd::Ix1>().map_err(|_| BeliefError::ShapeMismatch {
            expected: vec![self.table.len_of(nd::Axis(position))],
            actual: vec![len]
        })
    }

}
