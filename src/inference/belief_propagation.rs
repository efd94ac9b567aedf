//! Defines a `MarginalInference` engine using the sum-product algorithm (loopy belief
//! propagation) on a `FactorGraph`.
//!
//! Implementation of Koller & Friedman Section 11.3, run on the factor graph directly: messages
//! flow from marginals to factors and from factors to marginals, one round at a time. On a tree
//! the beliefs are exact once every message has crossed the graph. On a graph with cycles the
//! fixed point, when one is reached, is an approximation.
//!
//! Each round reads only the messages of the previous round:
//! 1. every factor sends `contract(position, incoming)` to each variable of its scope
//! 2. every unobserved variable updates its belief, the normalized product of its prior with all
//!    of its incoming factor messages
//! 3. every unobserved variable sends each of its factors the normalized product of its prior
//!    with the messages of all its *other* factors
//!
//! Observed variables are clamped to their observed category and send that clamp every round.

use crate::distribution::{normalize, FactorDistribution, MarginalDistribution};
use crate::factor::JointCategorical;
use crate::marginal::Categorical;
use crate::model::FactorGraph;
use crate::util::{BeliefError, Result};
use crate::variable::Observation;
use super::MarginalInference;

use ndarray::prelude as nd;
use tracing::{debug, trace};

use std::borrow::Cow;

/// Tuning knobs of belief propagation.
#[derive(Clone, Debug, PartialEq)]
pub struct BeliefPropagationConfig {

    /// The maximum number of rounds. Reaching it is not an error: the beliefs of the last round
    /// are returned.
    pub max_iterations: usize,

    /// Convergence threshold on the largest change of any belief or message between two rounds
    pub tolerance: f64,

    /// Weight of the previous message when updating a marginal to factor message, in `[0, 1)`
    pub damping: f64

}


impl Default for BeliefPropagationConfig {

    fn default() -> Self {
        BeliefPropagationConfig {
            max_iterations: 20,
            tolerance: 1e-6,
            damping: 0.0
        }
    }

}


impl BeliefPropagationConfig {

    /// # Errors
    /// * `BeliefError::InvalidConfig` if any value is out of range
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(BeliefError::InvalidConfig(String::from("max_iterations must be at least 1")));
        }

        if ! (self.tolerance > 0.0 && self.tolerance.is_finite()) {
            return Err(BeliefError::InvalidConfig(
                format!("tolerance must be positive and finite, got {}", self.tolerance)
            ));
        }

        if ! (0.0..1.0).contains(&self.damping) {
            return Err(BeliefError::InvalidConfig(
                format!("damping must be in [0, 1), got {}", self.damping)
            ));
        }

        Ok(())
    }

}


/// What happened during the inference of one row
#[derive(Clone, Debug, PartialEq)]
pub struct BeliefPropagationDiagnostics {

    /// The number of rounds run
    pub iterations_run: usize,

    /// `true` if no belief and no message changed by more than the tolerance in the last round
    pub converged: bool,

    /// The largest change of any belief in the last round
    pub final_delta: f64

}


/// The sum-product inference engine.
///
/// # Edge slots
/// Messages are stored in flat buffers with one slot per edge. The slots of a factor are
/// contiguous and laid out in scope order, so the slot of the variable at position `p` of
/// factor `f` is `offsets[f] + p`.
pub struct BeliefPropagation<'a, M = Categorical, F = JointCategorical> {

    graph: &'a FactorGraph<M, F>,

    config: BeliefPropagationConfig,

    /// The first slot of each factor, plus a final entry holding the number of slots
    offsets: Vec<usize>,

    /// For each marginal, the slots of its edges
    incident: Vec<Vec<usize>>

}


impl<'a, M, F> BeliefPropagation<'a, M, F>
    where M: MarginalDistribution,
          F: FactorDistribution
{

    /// Create a new engine over `graph`.
    ///
    /// # Errors
    /// * `BeliefError::InvalidConfig` if the configuration is out of range
    /// * any structural error raised by `FactorGraph::validate`
    pub fn new(graph: &'a FactorGraph<M, F>, config: BeliefPropagationConfig) -> Result<Self> {
        config.validate()?;
        graph.validate()?;

        let mut offsets = Vec::with_capacity(graph.n_factors() + 1);
        let mut incident = vec![Vec::new(); graph.n_variables()];

        let mut slot = 0;
        for f in 0..graph.n_factors() {
            offsets.push(slot);
            for &m in graph.scope(f) {
                incident[m].push(slot);
                slot += 1;
            }
        }
        offsets.push(slot);

        Ok(BeliefPropagation { graph, config, offsets, incident })
    }


    pub fn config(&self) -> &BeliefPropagationConfig {
        &self.config
    }


    /// Infer the posterior marginals of one row, reporting how the iteration went.
    ///
    /// # Args
    /// * `row`: one `Observation` per variable
    ///
    /// # Returns
    /// one belief per variable, and the diagnostics of the run
    ///
    /// # Errors
    /// * `BeliefError::ShapeMismatch` if `row` does not have one entry per variable
    /// * `BeliefError::CategoryOutOfRange` if an observed category is not in its domain
    /// * `BeliefError::DegenerateEvidence` if the evidence leaves a variable with no mass
    pub fn infer_with_diagnostics(
        &self,
        row: &[Observation]
    ) -> Result<(Vec<nd::Array1<f64>>, BeliefPropagationDiagnostics)> {
        let marginals = self.graph.marginals();
        if row.len() != marginals.len() {
            return Err(BeliefError::ShapeMismatch {
                expected: vec![marginals.len()],
                actual: vec![row.len()]
            });
        }

        // the prior of each variable, or its clamp if it was observed
        let effective = row.iter()
                           .zip(marginals.iter())
                           .enumerate()
                           .map(|(i, (obs, marginal))| match obs.value() {
                               Some(v) => marginal.clamp(v).map(Cow::Owned).map_err(|e| e.for_variable(i)),
                               None => Ok(Cow::Borrowed(marginal))
                           })
                           .collect::<Result<Vec<Cow<M>>>>()?;

        let slots = self.offsets[self.offsets.len() - 1];
        let mut to_factor: Vec<nd::Array1<f64>> = vec![nd::Array1::zeros(0); slots];
        let mut to_marginal: Vec<nd::Array1<f64>> = vec![nd::Array1::zeros(0); slots];

        for (dist, edges) in effective.iter().zip(self.incident.iter()) {
            for &s in edges {
                to_factor[s] = dist.probabilities().to_owned();
            }
        }

        let mut beliefs: Vec<nd::Array1<f64>> = effective.iter().map(|d| d.probabilities().to_owned()).collect();
        let mut diagnostics = BeliefPropagationDiagnostics {
            iterations_run: 0,
            converged: false,
            final_delta: f64::INFINITY
        };

        for iteration in 1..=self.config.max_iterations {
            // largest change of any message this round
            let mut moved = 0.0_f64;

            ///////////////////////////////////////////////////////////////////////////////
            // factor -> marginal
            for (f, factor) in self.graph.factors().iter().enumerate() {
                let (start, end) = (self.offsets[f], self.offsets[f + 1]);
                let incoming: Vec<nd::ArrayView1<f64>> = to_factor[start..end].iter().map(|m| m.view()).collect();

                for position in 0..(end - start) {
                    let mut message = factor.contract(position, &incoming)?;
                    // a message with no mass stays all zero and surfaces in the belief update
                    normalize(&mut message);
                    moved = moved.max(max_change(&to_marginal[start + position], &message));
                    to_marginal[start + position] = message;
                }
            }

            ///////////////////////////////////////////////////////////////////////////////
            // beliefs
            let mut next = Vec::with_capacity(beliefs.len());
            for (i, dist) in effective.iter().enumerate() {
                if row[i].is_observed() {
                    next.push(dist.probabilities().to_owned());
                    continue;
                }

                let incoming: Vec<nd::ArrayView1<f64>> = self.incident[i].iter().map(|&s| to_marginal[s].view()).collect();
                next.push(dist.combine(&incoming).map_err(|e| e.for_variable(i))?);
            }

            ///////////////////////////////////////////////////////////////////////////////
            // marginal -> factor, leaving out the destination's own message
            for (i, dist) in effective.iter().enumerate() {
                for &slot in self.incident[i].iter() {
                    let message = if row[i].is_observed() {
                        dist.probabilities().to_owned()
                    } else {
                        let others: Vec<nd::ArrayView1<f64>> = self.incident[i].iter()
                                                                               .filter(|&&s| s != slot)
                                                                               .map(|&s| to_marginal[s].view())
                                                                               .collect();
                        dist.combine(&others).map_err(|e| e.for_variable(i))?
                    };

                    let message = if self.config.damping > 0.0 {
                        message * (1.0 - self.config.damping) + &to_factor[slot] * self.config.damping
                    } else {
                        message
                    };
                    moved = moved.max(max_change(&to_factor[slot], &message));
                    to_factor[slot] = message;
                }
            }

            let delta = beliefs.iter()
                               .zip(next.iter())
                               .map(|(old, new)| max_change(old, new))
                               .fold(0.0, f64::max);
            beliefs = next;

            trace!(iteration, delta, moved, "belief propagation round");
            diagnostics = BeliefPropagationDiagnostics {
                iterations_run: iteration,
                // beliefs can stand still while evidence is still travelling through the messages
                converged: delta < self.config.tolerance && moved < self.config.tolerance,
                final_delta: delta
            };

            if diagnostics.converged {
                break;
            }
        }

        if ! diagnostics.converged {
            debug!(
                iterations = diagnostics.iterations_run,
                delta = diagnostics.final_delta,
                "belief propagation stopped before converging"
            );
        }

        Ok((beliefs, diagnostics))
    }

}


/// The largest absolute difference between two messages, infinite if they have different lengths
fn max_change(old: &nd::Array1<f64>, new: &nd::Array1<f64>) -> f64 {
    if old.len() != new.len() {
        return f64::INFINITY;
    }

    old.iter().zip(new.iter()).map(|(a, b)| (a - b).abs()).fold(0.0, f64::max)
}


impl<'a, M, F> MarginalInference for BeliefPropagation<'a, M, F>
    where M: MarginalDistribution,
          F: FactorDistribution
{

    fn categories(&self) -> Vec<usize> {
        self.graph.marginals().iter().map(|m| m.n_categories()).collect()
    }

    fn infer(&self, row: &[Observation]) -> Result<Vec<nd::Array1<f64>>> {
        self.infer_with_diagnostics(row).map(|(beliefs, _)| beliefs)
    }

}


#[cfg(test)]
mod tests {

    use super::*;
    use crate::inference::Enumeration;
    use approx::assert_abs_diff_eq;
    use itertools::iproduct;
    use ndarray::array;

    fn unknown(n: usize) -> Vec<Observation> {
        vec![Observation::Unknown; n]
    }

    /// Two variables joined by a single factor, with uniform priors
    fn single_factor(table: Table2) -> FactorGraph {
        FactorGraph::from_parts(
            vec![JointCategorical::new(table.into_dyn()).unwrap()],
            vec![Categorical::uniform(2).unwrap(), Categorical::uniform(3).unwrap()],
            &[(0, 0), (1, 0)]
        ).unwrap()
    }

    type Table2 = nd::Array2<f64>;

    fn kf_pair() -> Table2 {
        array![[0.05, 0.25, 0.10], [0.30, 0.20, 0.10]]
    }

    #[test]
    fn config() {
        assert!(BeliefPropagationConfig::default().validate().is_ok());

        let bad = [
            BeliefPropagationConfig { max_iterations: 0, ..Default::default() },
            BeliefPropagationConfig { tolerance: 0.0, ..Default::default() },
            BeliefPropagationConfig { tolerance: f64::NAN, ..Default::default() },
            BeliefPropagationConfig { damping: 1.0, ..Default::default() },
            BeliefPropagationConfig { damping: -0.1, ..Default::default() }
        ];

        let graph = single_factor(kf_pair());
        for config in bad.iter() {
            match BeliefPropagation::new(&graph, config.clone()) {
                Err(BeliefError::InvalidConfig(_)) => (),
                _ => panic!("accepted {:?}", config)
            };
        }
    }

    #[test]
    /// With one factor and uniform priors, the beliefs are the marginals of the factor's table
    fn single_factor_exact() {
        let graph = single_factor(kf_pair());
        let engine = BeliefPropagation::new(&graph, BeliefPropagationConfig::default()).unwrap();

        let (beliefs, diagnostics) = engine.infer_with_diagnostics(&unknown(2)).unwrap();
        assert!(diagnostics.converged);
        assert!(diagnostics.iterations_run <= 2);

        let table = kf_pair();
        let z = table.sum();
        for x in 0..2 {
            assert_abs_diff_eq!(table.row(x).sum() / z, beliefs[0][x], epsilon = 1e-12);
        }
        for y in 0..3 {
            assert_abs_diff_eq!(table.column(y).sum() / z, beliefs[1][y], epsilon = 1e-12);
        }
    }

    #[test]
    fn single_factor_observed() {
        let graph = single_factor(kf_pair());
        let engine = BeliefPropagation::new(&graph, BeliefPropagationConfig::default()).unwrap();

        let beliefs = engine.infer(&[Observation::Observed(1), Observation::Unknown]).unwrap();
        assert_eq!(array![0.0, 1.0], beliefs[0]);
        assert_abs_diff_eq!(0.5, beliefs[1][0], epsilon = 1e-12);
        assert_abs_diff_eq!(1.0 / 3.0, beliefs[1][1], epsilon = 1e-12);
        assert_abs_diff_eq!(1.0 / 6.0, beliefs[1][2], epsilon = 1e-12);
    }

    #[test]
    /// On a tree, belief propagation is exact, priors included
    fn chain_matches_enumeration() {
        let graph = FactorGraph::from_parts(
            vec![
                JointCategorical::new(array![[0.3, 0.1, 0.6], [0.2, 0.7, 0.1]].into_dyn()).unwrap(),
                JointCategorical::new(array![[1.0, 3.0], [2.0, 2.0], [5.0, 1.0]].into_dyn()).unwrap()
            ],
            vec![
                Categorical::new(array![0.3, 0.7]).unwrap(),
                Categorical::new(array![0.2, 0.5, 0.3]).unwrap(),
                Categorical::new(array![0.6, 0.4]).unwrap()
            ],
            &[(0, 0), (1, 0), (1, 1), (2, 1)]
        ).unwrap();

        let bp = BeliefPropagation::new(&graph, BeliefPropagationConfig::default()).unwrap();
        let exact = Enumeration::new(&graph).unwrap();

        let rows = vec![
            unknown(3),
            vec![Observation::Observed(1), Observation::Unknown, Observation::Unknown],
            vec![Observation::Unknown, Observation::Unknown, Observation::Observed(0)],
            vec![Observation::Observed(0), Observation::Unknown, Observation::Observed(1)]
        ];

        for row in rows.iter() {
            let (beliefs, diagnostics) = bp.infer_with_diagnostics(row).unwrap();
            assert!(diagnostics.converged);

            let expected = exact.infer(row).unwrap();
            for (b, e) in beliefs.iter().zip(expected.iter()) {
                for (x, y) in b.iter().zip(e.iter()) {
                    assert_abs_diff_eq!(*y, *x, epsilon = 1e-6);
                }
            }
        }
    }

    #[test]
    /// Beliefs that do not move in the first round must not stop the iteration while the
    /// messages carrying the far end of the chain are still changing
    fn still_beliefs_moving_messages() {
        let graph = FactorGraph::from_parts(
            vec![
                JointCategorical::new(array![[0.4, 0.1], [0.2, 0.3]].into_dyn()).unwrap(),
                JointCategorical::new(array![[0.1, 0.3], [0.4, 0.2]].into_dyn()).unwrap()
            ],
            vec![Categorical::uniform(2).unwrap(), Categorical::uniform(2).unwrap(), Categorical::uniform(2).unwrap()],
            &[(0, 0), (1, 0), (1, 1), (2, 1)]
        ).unwrap();

        let bp = BeliefPropagation::new(&graph, BeliefPropagationConfig::default()).unwrap();
        let (beliefs, diagnostics) = bp.infer_with_diagnostics(&unknown(3)).unwrap();
        assert!(diagnostics.converged);
        assert!(diagnostics.iterations_run > 1);

        let expected = Enumeration::new(&graph).unwrap().infer(&unknown(3)).unwrap();
        assert_abs_diff_eq!(11.0 / 24.0, expected[0][0], epsilon = 1e-12);
        for (b, e) in beliefs.iter().zip(expected.iter()) {
            for (x, y) in b.iter().zip(e.iter()) {
                assert_abs_diff_eq!(*y, *x, epsilon = 1e-9);
            }
        }
    }

    #[test]
    /// Hitting the round cap returns the current beliefs
    fn iteration_cap() {
        let graph = FactorGraph::from_parts(
            vec![
                JointCategorical::new(array![[0.3, 0.1, 0.6], [0.2, 0.7, 0.1]].into_dyn()).unwrap(),
                JointCategorical::new(array![[1.0, 3.0], [2.0, 2.0], [5.0, 1.0]].into_dyn()).unwrap()
            ],
            vec![
                Categorical::uniform(2).unwrap(),
                Categorical::uniform(3).unwrap(),
                Categorical::uniform(2).unwrap()
            ],
            &[(0, 0), (1, 0), (1, 1), (2, 1)]
        ).unwrap();

        let config = BeliefPropagationConfig { max_iterations: 1, ..Default::default() };
        let engine = BeliefPropagation::new(&graph, config).unwrap();

        let (beliefs, diagnostics) = engine.infer_with_diagnostics(&unknown(3)).unwrap();
        assert_eq!(1, diagnostics.iterations_run);
        assert!(! diagnostics.converged);
        assert!(diagnostics.final_delta > 0.0);
        for b in beliefs.iter() {
            assert_abs_diff_eq!(1.0, b.sum(), epsilon = 1e-12);
        }
    }

    #[test]
    /// Damping slows message updates but leaves the fixed point unchanged
    fn damping() {
        let graph = single_factor(kf_pair());
        let plain = BeliefPropagation::new(&graph, BeliefPropagationConfig::default()).unwrap();
        let damped = BeliefPropagation::new(
            &graph,
            BeliefPropagationConfig { damping: 0.5, max_iterations: 100, ..Default::default() }
        ).unwrap();

        let expected = plain.infer(&unknown(2)).unwrap();
        let (beliefs, diagnostics) = damped.infer_with_diagnostics(&unknown(2)).unwrap();
        assert!(diagnostics.converged);

        for (b, e) in beliefs.iter().zip(expected.iter()) {
            for (x, y) in b.iter().zip(e.iter()) {
                assert_abs_diff_eq!(*y, *x, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn degenerate_evidence() {
        // the second variable can only be 0 when the first is 1
        let graph = single_factor(array![[0.0, 0.5, 0.5], [1.0, 0.0, 0.0]]);
        let engine = BeliefPropagation::new(&graph, BeliefPropagationConfig::default()).unwrap();

        match engine.infer(&[Observation::Observed(1), Observation::Observed(1)]) {
            Ok(_) => (),
            r => panic!("observed variables are never renormalized: {:?}", r)
        };

        let beliefs = engine.infer(&[Observation::Observed(1), Observation::Unknown]).unwrap();
        assert_eq!(array![1.0, 0.0, 0.0], beliefs[1]);

        // a prior with no mass on the observed category
        let graph = FactorGraph::from_parts(
            vec![JointCategorical::uniform(&[2, 2]).unwrap()],
            vec![Categorical::new(array![1.0, 0.0]).unwrap(), Categorical::uniform(2).unwrap()],
            &[(0, 0), (1, 0)]
        ).unwrap();
        let engine = BeliefPropagation::new(&graph, BeliefPropagationConfig::default()).unwrap();

        match engine.infer(&[Observation::Observed(1), Observation::Unknown]) {
            Err(BeliefError::DegenerateEvidence { variable: 0 }) => (),
            r => panic!("unexpected result {:?}", r)
        };

        // evidence ruling out every category of an unobserved variable
        let graph = FactorGraph::from_parts(
            vec![JointCategorical::new(array![[1.0, 0.0], [1.0, 0.0]].into_dyn()).unwrap()],
            vec![Categorical::uniform(2).unwrap(), Categorical::new(array![0.0, 1.0]).unwrap()],
            &[(0, 0), (1, 0)]
        ).unwrap();
        let engine = BeliefPropagation::new(&graph, BeliefPropagationConfig::default()).unwrap();

        match engine.infer(&[Observation::Observed(0), Observation::Unknown]) {
            Err(BeliefError::DegenerateEvidence { variable: 1 }) => (),
            r => panic!("unexpected result {:?}", r)
        };
    }

    #[test]
    fn row_errors() {
        let graph = single_factor(kf_pair());
        let engine = BeliefPropagation::new(&graph, BeliefPropagationConfig::default()).unwrap();

        match engine.infer(&unknown(3)) {
            Err(BeliefError::ShapeMismatch { .. }) => (),
            r => panic!("unexpected result {:?}", r)
        };

        match engine.infer(&[Observation::Unknown, Observation::Observed(3)]) {
            Err(BeliefError::CategoryOutOfRange { value: 3, categories: 3 }) => (),
            r => panic!("unexpected result {:?}", r)
        };
    }

    #[test]
    /// Weakly coupled cycle: loopy belief propagation converges close to the exact marginals
    fn triangle() {
        let pair = || JointCategorical::new(array![[0.3, 0.2], [0.2, 0.3]].into_dyn()).unwrap();
        let graph = FactorGraph::from_parts(
            vec![pair(), pair(), pair()],
            vec![
                Categorical::new(array![0.7, 0.3]).unwrap(),
                Categorical::uniform(2).unwrap(),
                Categorical::uniform(2).unwrap()
            ],
            &[(0, 0), (1, 0), (1, 1), (2, 1), (2, 2), (0, 2)]
        ).unwrap();

        let config = BeliefPropagationConfig { max_iterations: 100, ..Default::default() };
        let engine = BeliefPropagation::new(&graph, config).unwrap();
        let exact = Enumeration::new(&graph).unwrap().infer(&unknown(3)).unwrap();
        let (beliefs, diagnostics) = engine.infer_with_diagnostics(&unknown(3)).unwrap();
        assert!(diagnostics.converged);

        for (i, x) in iproduct!(0..3, 0..2) {
            assert!(beliefs[i][x] > 0.0 && beliefs[i][x] < 1.0);
            assert!((beliefs[i][x] - exact[i][x]).abs() < 0.01);
        }
    }
}
