//! Defines the interface to inference engines

use crate::util::{BeliefError, Result};
use crate::variable::Observation;

use ndarray::prelude as nd;
use rayon::prelude::*;

mod belief_propagation;
mod enumeration;

pub use self::belief_propagation::{BeliefPropagation, BeliefPropagationConfig, BeliefPropagationDiagnostics};
pub use self::enumeration::Enumeration;


/// A `MarginalInference` engine computes the posterior marginal of every variable of a graph
/// given the observed variables of one row of data:
///     ```P(X_i | E = e)``` for every variable `X_i`
///
/// Engines only borrow the graph, so a single engine can serve many rows concurrently.
pub trait MarginalInference {

    /// The number of categories of each variable, in variable order
    fn categories(&self) -> Vec<usize>;

    /// Infer the posterior marginals of a single row of (partially) observed data.
    ///
    /// # Args
    /// * `row`: one `Observation` per variable
    ///
    /// # Returns
    /// one probability vector per variable. Observed variables put all of their mass on the
    /// observed category.
    fn infer(&self, row: &[Observation]) -> Result<Vec<nd::Array1<f64>>>;

}


/// Run an engine over every row of a matrix of observations, in parallel.
///
/// # Returns
/// one matrix per variable, of shape `(n_rows, n_categories)`
///
/// # Errors
/// * `BeliefError::ShapeMismatch` if `observations` does not have one column per variable
/// * the error of the first row that fails
pub fn infer_rows<E>(engine: &E, observations: nd::ArrayView2<Observation>) -> Result<Vec<nd::Array2<f64>>>
    where E: MarginalInference + Sync
{
    let categories = engine.categories();
    if observations.ncols() != categories.len() {
        return Err(BeliefError::ShapeMismatch {
            expected: vec![observations.nrows(), categories.len()],
            actual: observations.shape().to_vec()
        });
    }

    let rows = (0..observations.nrows()).into_par_iter()
                                        .map(|r| engine.infer(&observations.row(r).to_vec()))
                                        .collect::<Vec<_>>()
                                        .into_iter()
                                        .collect::<Result<Vec<_>>>()?;

    let mut beliefs: Vec<nd::Array2<f64>> = categories.iter()
                                                      .map(|&k| nd::Array2::zeros((rows.len(), k)))
                                                      .collect();

    for (r, row) in rows.iter().enumerate() {
        for (out, belief) in beliefs.iter_mut().zip(row.iter()) {
            out.row_mut(r).assign(belief);
        }
    }

    Ok(beliefs)
}
