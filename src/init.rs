//! Module containing initialization routines for the parameters of the distributions of a graph.

use crate::factor::{JointCategorical, Table};
use crate::marginal::Categorical;
use crate::util::{BeliefError, Result};

use ndarray::prelude as nd;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Defines possible ways to initialize the parameters of a marginal or factor distribution.
pub enum Initialization<'a> {
    /// A uniform distribution over all possibilities
    Uniform,

    /// Random positive weights, normalized
    Random,

    /// Random positive weights drawn from a generator seeded with the given value, normalized
    Seeded(u64),

    /// Explicit probabilities, in row-major order over the table
    Probabilities(&'a [f64]),

    /// User defined table
    Table(Table)
}


impl<'a> Initialization<'a> {

    /// Construct a marginal distribution, initialized based on ```self```
    ///
    /// # Args
    /// * `categories`: the size of the domain of the variable
    ///
    /// # Errors
    /// * `BeliefError::InvalidInitialization` if explicit parameters do not have `categories`
    ///   entries
    /// * `BeliefError::InvalidProbabilities` if explicit parameters are not a distribution
    pub fn build_marginal(self, categories: usize) -> Result<Categorical> {
        if categories == 0 {
            return Err(BeliefError::InvalidInitialization);
        }

        match self {
            Initialization::Uniform => Categorical::uniform(categories),
            Initialization::Probabilities(p) if p.len() == categories => {
                Categorical::new(nd::Array1::from(p.to_vec()))
            },
            Initialization::Table(t) if t.shape() == [categories] => {
                let t = t.into_dimensionality::<nd::Ix1>()
                         .map_err(|_| BeliefError::InvalidInitialization)?;
                Categorical::new(t)
            },
            Initialization::Random => Categorical::new(random_table(&[categories], None).into_dimensionality()
                                                           .map_err(|_| BeliefError::InvalidInitialization)?),
            Initialization::Seeded(seed) => Categorical::new(random_table(&[categories], Some(seed)).into_dimensionality()
                                                                 .map_err(|_| BeliefError::InvalidInitialization)?),
            _ => Err(BeliefError::InvalidInitialization)
        }
    }


    /// Construct a factor distribution, initialized based on ```self```
    ///
    /// # Args
    /// * `shape`: the number of categories of each variable in the factor's scope, in scope order
    ///
    /// # Errors
    /// * `BeliefError::InvalidInitialization` if `shape` is empty or explicit parameters do not
    ///   match it
    /// * `BeliefError::InvalidProbabilities` if explicit parameters are not a valid table
    pub fn build_factor(self, shape: &[usize]) -> Result<JointCategorical> {
        ///////////////////////////////////////////////////////////////////////////////
        // Check for errors
        if shape.is_empty() || shape.contains(&0) {
            return Err(BeliefError::InvalidInitialization);
        }

        let cells: usize = shape.iter().product();

        ///////////////////////////////////////////////////////////////////////////////
        // now, build factor
        let tbl = match self {
            Initialization::Uniform => {
                return JointCategorical::uniform(shape);
            },
            Initialization::Random => random_table(shape, None),
            Initialization::Seeded(seed) => random_table(shape, Some(seed)),
            Initialization::Probabilities(p) if p.len() == cells => {
                Table::from_shape_vec(shape.to_vec(), p.to_vec())
                      .map_err(|_| BeliefError::InvalidInitialization)?
            },
            Initialization::Table(t) if t.shape() == shape => t,
            _ => return Err(BeliefError::InvalidInitialization)
        };

        JointCategorical::new(tbl)
    }
}


/// A table of random positive weights that sums to one
fn random_table(shape: &[usize], seed: Option<u64>) -> Table {
    let range = Uniform::new(1.0, 100.0);
    let mut tbl = match seed {
        Some(s) => Table::random_using(shape.to_vec(), range, &mut StdRng::seed_from_u64(s)),
        None => Table::random(shape.to_vec(), range)
    };

    let z = tbl.sum();
    tbl.mapv_inplace(|e| e / z);
    tbl
}
