//! Defines the `FactorGraph`, a bipartite graph of marginal nodes (one per variable) and factor
//! nodes (joint distributions over ordered subsets of the variables).
//!
//! # Ordering
//! The index returned when a marginal is registered is the column of the input data holding the
//! values of its variable. The order in which edges are attached to a factor is the order of the
//! dimensions of that factor's table: the first edge attached to a factor binds its first
//! dimension, and so on.

use crate::distribution::{FactorDistribution, MarginalDistribution};
use crate::factor::JointCategorical;
use crate::marginal::Categorical;
use crate::util::{BeliefError, Result};

use bidir_map::BidirMap;
use indexmap::IndexSet;
use tracing::debug;

use std::fmt;
use std::sync::OnceLock;

/// A factor graph over discrete variables.
///
/// The structure is mutable until the graph is first used for inference or fitting. At that point
/// it is validated, and every later attempt to add a node or an edge fails with
/// `BeliefError::StructureFrozen`.
pub struct FactorGraph<M = Categorical, F = JointCategorical> {

    /// The marginal of each variable, indexed by variable
    marginals: Vec<M>,

    /// The factor distributions, in registration order
    factors: Vec<F>,

    /// Every `(marginal, factor)` edge, in insertion order
    edges: Vec<(usize, usize)>,

    /// For each factor, the variables bound to its dimensions, in dimension order
    scopes: Vec<Vec<usize>>,

    /// For each marginal, the factors it is connected to
    neighbors: Vec<IndexSet<usize>>,

    /// Optional variable names
    names: BidirMap<usize, String>,

    /// The outcome of the structural checks, computed on first use
    validated: OnceLock<Result<()>>

}


impl<M, F> FactorGraph<M, F>
    where M: MarginalDistribution,
          F: FactorDistribution
{

    /// Create an empty `FactorGraph`
    pub fn new() -> Self {
        FactorGraph {
            marginals: Vec::new(),
            factors: Vec::new(),
            edges: Vec::new(),
            scopes: Vec::new(),
            neighbors: Vec::new(),
            names: BidirMap::new(),
            validated: OnceLock::new()
        }
    }


    /// Build a `FactorGraph` in one shot.
    ///
    /// Equivalent to registering every factor, then every marginal, then every edge, in the
    /// order given.
    ///
    /// # Args
    /// * `factors`: the factor distributions
    /// * `marginals`: the marginal distributions, one per variable, in data column order
    /// * `edges`: `(marginal, factor)` index pairs
    ///
    /// # Errors
    /// Any error raised by `add_edge`
    pub fn from_parts(factors: Vec<F>, marginals: Vec<M>, edges: &[(usize, usize)]) -> Result<Self> {
        let mut graph = FactorGraph::new();

        for factor in factors {
            graph.add_factor(factor)?;
        }

        for marginal in marginals {
            graph.add_marginal(marginal)?;
        }

        for &(marginal, factor) in edges {
            graph.add_edge(marginal, factor)?;
        }

        Ok(graph)
    }


    /// Register the marginal distribution of a new variable.
    ///
    /// # Returns
    /// the index of the variable, which is also its column in input data
    ///
    /// # Errors
    /// * `BeliefError::StructureFrozen` if the graph has already been used
    pub fn add_marginal(&mut self, marginal: M) -> Result<usize> {
        self.check_mutable()?;

        self.marginals.push(marginal);
        self.neighbors.push(IndexSet::new());
        Ok(self.marginals.len() - 1)
    }


    /// Register the marginal distribution of a new, named variable.
    ///
    /// # Errors
    /// * `BeliefError::DuplicateName` if another variable already has this name
    /// * `BeliefError::StructureFrozen` if the graph has already been used
    pub fn add_named_marginal(&mut self, name: &str, marginal: M) -> Result<usize> {
        let name = String::from(name);
        if self.names.get_by_second(&name).is_some() {
            return Err(BeliefError::DuplicateName(name));
        }

        let index = self.add_marginal(marginal)?;
        self.names.insert(index, name);
        Ok(index)
    }


    /// Register a new factor. Its scope is empty until edges are attached.
    ///
    /// # Returns
    /// the index of the factor
    ///
    /// # Errors
    /// * `BeliefError::StructureFrozen` if the graph has already been used
    pub fn add_factor(&mut self, factor: F) -> Result<usize> {
        self.check_mutable()?;

        self.factors.push(factor);
        self.scopes.push(Vec::new());
        Ok(self.factors.len() - 1)
    }


    /// Connect a marginal to a factor. The marginal's variable is bound to the next unbound
    /// dimension of the factor.
    ///
    /// # Errors
    /// * `BeliefError::UnknownMarginal` or `BeliefError::UnknownFactor` for unregistered indices
    /// * `BeliefError::DuplicateEdge` if the two nodes are already connected
    /// * `BeliefError::StructureFrozen` if the graph has already been used
    pub fn add_edge(&mut self, marginal: usize, factor: usize) -> Result<()> {
        self.check_mutable()?;

        if marginal >= self.marginals.len() {
            return Err(BeliefError::UnknownMarginal(marginal));
        }

        if factor >= self.factors.len() {
            return Err(BeliefError::UnknownFactor(factor));
        }

        if ! self.neighbors[marginal].insert(factor) {
            return Err(BeliefError::DuplicateEdge { marginal, factor });
        }

        self.scopes[factor].push(marginal);
        self.edges.push((marginal, factor));
        Ok(())
    }


    /// Check the structural invariants of the graph and freeze its structure.
    ///
    /// The checks run once. A failure is permanent: every later call returns the same error.
    ///
    /// # Errors
    /// * `BeliefError::IsolatedMarginal` if a marginal has no edge
    /// * `BeliefError::ArityMismatch` if a factor's edge count differs from its arity
    /// * `BeliefError::CardinalityMismatch` if a factor dimension and the marginal bound to it
    ///   disagree on the number of categories
    pub fn validate(&self) -> Result<()> {
        self.validated.get_or_init(|| {
            let status = self.check_structure();
            match status {
                Ok(()) => debug!(
                    marginals = self.marginals.len(),
                    factors = self.factors.len(),
                    edges = self.edges.len(),
                    "factor graph validated"
                ),
                Err(ref e) => debug!(error = %e, "factor graph failed validation")
            };
            status
        }).clone()
    }


    /// `true` once the structure can no longer change
    pub fn is_frozen(&self) -> bool {
        self.validated.get().is_some()
    }


    pub fn marginals(&self) -> &[M] {
        &self.marginals
    }


    pub fn factors(&self) -> &[F] {
        &self.factors
    }


    pub(crate) fn factors_mut(&mut self) -> &mut [F] {
        &mut self.factors
    }


    pub fn marginal(&self, index: usize) -> Option<&M> {
        self.marginals.get(index)
    }


    pub fn factor(&self, index: usize) -> Option<&F> {
        self.factors.get(index)
    }


    /// The variables bound to the dimensions of a factor, in dimension order
    ///
    /// # Panics
    /// if `factor` is not a registered factor
    pub fn scope(&self, factor: usize) -> &[usize] {
        &self.scopes[factor]
    }


    /// The factors connected to a marginal
    ///
    /// # Panics
    /// if `marginal` is not a registered marginal
    pub fn neighbors(&self, marginal: usize) -> &IndexSet<usize> {
        &self.neighbors[marginal]
    }


    /// Every `(marginal, factor)` edge, in insertion order
    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }


    pub fn n_variables(&self) -> usize {
        self.marginals.len()
    }


    pub fn n_factors(&self) -> usize {
        self.factors.len()
    }


    /// Lookup a variable based on its name
    pub fn lookup_variable(&self, name: &str) -> Option<usize> {
        self.names.get_by_second(&String::from(name)).cloned()
    }


    /// Lookup the name of a variable, if it was given one
    pub fn lookup_name(&self, variable: usize) -> Option<&String> {
        self.names.get_by_first(&variable)
    }


    fn check_mutable(&self) -> Result<()> {
        if self.is_frozen() {
            Err(BeliefError::StructureFrozen)
        } else {
            Ok(())
        }
    }


    fn check_structure(&self) -> Result<()> {
        if let Some(marginal) = self.neighbors.iter().position(|n| n.is_empty()) {
            return Err(BeliefError::IsolatedMarginal(marginal));
        }

        for (f, (factor, scope)) in self.factors.iter().zip(self.scopes.iter()).enumerate() {
            if factor.arity() != scope.len() {
                return Err(BeliefError::ArityMismatch {
                    factor: f,
                    arity: factor.arity(),
                    edges: scope.len()
                });
            }

            for (position, (&m, &expected)) in scope.iter().zip(factor.shape().iter()).enumerate() {
                let actual = self.marginals[m].n_categories();
                if actual != expected {
                    return Err(BeliefError::CardinalityMismatch {
                        factor: f,
                        position,
                        marginal: m,
                        expected,
                        actual
                    });
                }
            }
        }

        Ok(())
    }

}


impl<M, F> Default for FactorGraph<M, F>
    where M: MarginalDistribution,
          F: FactorDistribution
{
    fn default() -> Self {
        FactorGraph::new()
    }
}


impl<M: fmt::Debug, F: fmt::Debug> fmt::Debug for FactorGraph<M, F> {

    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("FactorGraph")
         .field("marginals", &self.marginals)
         .field("factors", &self.factors)
         .field("scopes", &self.scopes)
         .field("frozen", &self.validated.get().is_some())
         .finish()
    }

}
