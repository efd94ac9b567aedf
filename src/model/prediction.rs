//! Probability and prediction queries on a `FactorGraph`.
//!
//! Complete rows are scored in closed form with the product rule: the product of every factor
//! evaluated on the columns of its scope and of every marginal evaluated on its own column.
//! Rows with unobserved cells go through a `MarginalInference` engine, loopy belief propagation
//! unless another engine is supplied.

use crate::distribution::{check_columns, FactorDistribution, MarginalDistribution};
use crate::inference::{infer_rows, BeliefPropagation, BeliefPropagationConfig, MarginalInference};
use crate::util::Result;
use crate::variable::Observation;
use super::FactorGraph;

use ndarray::prelude as nd;
use ndarray::s;


impl<M, F> FactorGraph<M, F>
    where M: MarginalDistribution,
          F: FactorDistribution
{

    /// The log probability of each row of complete data.
    ///
    /// The log terms of every factor and marginal are summed directly.
    ///
    /// # Args
    /// * `values`: category codes, shape `(n_rows, self.n_variables())`
    ///
    /// # Errors
    /// * any structural error raised by `validate`
    /// * `BeliefError::ShapeMismatch` if `values` does not have one column per variable
    /// * `BeliefError::CategoryOutOfRange` if a code exceeds the domain of its variable
    pub fn log_probability(&self, values: nd::ArrayView2<usize>) -> Result<nd::Array1<f64>> {
        self.validate()?;
        check_columns(&values, self.n_variables())?;

        let mut logp: nd::Array1<f64> = nd::Array1::zeros(values.nrows());

        for (f, factor) in self.factors().iter().enumerate() {
            let columns = values.select(nd::Axis(1), self.scope(f));
            logp += &factor.log_probability(columns.view())?;
        }

        for (i, marginal) in self.marginals().iter().enumerate() {
            logp += &marginal.log_probability(values.slice(s![.., i..i + 1]))?;
        }

        Ok(logp)
    }


    /// The probability of each row of complete data.
    ///
    /// # Errors
    /// See `log_probability`
    pub fn probability(&self, values: nd::ArrayView2<usize>) -> Result<nd::Array1<f64>> {
        Ok(self.log_probability(values)?.mapv(f64::exp))
    }


    /// The posterior marginal of every variable for each row, by belief propagation with the
    /// default configuration.
    ///
    /// # Returns
    /// one matrix per variable, of shape `(n_rows, n_categories)`. Observed cells are one-hot.
    ///
    /// # Errors
    /// * any error raised by `BeliefPropagation::new` or `BeliefPropagation::infer`
    pub fn predict_proba(&self, observations: nd::ArrayView2<Observation>) -> Result<Vec<nd::Array2<f64>>> {
        let engine = BeliefPropagation::new(self, BeliefPropagationConfig::default())?;
        infer_rows(&engine, observations)
    }


    /// The posterior marginal of every variable for each row, computed by `engine`.
    ///
    /// `engine` should have been built over this graph.
    pub fn predict_proba_with<E>(
        &self,
        engine: &E,
        observations: nd::ArrayView2<Observation>
    ) -> Result<Vec<nd::Array2<f64>>>
        where E: MarginalInference + Sync
    {
        self.validate()?;
        infer_rows(engine, observations)
    }


    /// The elementwise log of `predict_proba`. Impossible categories are negative infinity.
    pub fn predict_log_proba(&self, observations: nd::ArrayView2<Observation>) -> Result<Vec<nd::Array2<f64>>> {
        Ok(self.predict_proba(observations)?
               .into_iter()
               .map(|p| p.mapv(f64::ln))
               .collect())
    }


    /// The most probable category of every variable for each row.
    ///
    /// Ties go to the lowest category. Observed cells keep their observed category.
    ///
    /// # Returns
    /// a matrix of shape `(n_rows, self.n_variables())`
    pub fn predict(&self, observations: nd::ArrayView2<Observation>) -> Result<nd::Array2<usize>> {
        let proba = self.predict_proba(observations)?;

        let mut predicted: nd::Array2<usize> = nd::Array2::zeros((observations.nrows(), proba.len()));
        for (mut column, p) in predicted.axis_iter_mut(nd::Axis(1)).zip(proba.iter()) {
            for (cell, row) in column.iter_mut().zip(p.outer_iter()) {
                *cell = argmax(row);
            }
        }

        Ok(predicted)
    }

}


/// The index of the first largest value
fn argmax(values: nd::ArrayView1<f64>) -> usize {
    values.iter()
          .enumerate()
          .fold((0, f64::NEG_INFINITY), |(best, max), (i, &v)| if v > max { (i, v) } else { (best, max) })
          .0
}


#[cfg(test)]
mod tests {

    use super::*;
    use crate::factor::JointCategorical;
    use crate::marginal::Categorical;
    use crate::util::BeliefError;
    use crate::variable::fully_observed;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    /// Example taken from Koller & Friedman Figure 4.1: the pairwise factor between two students
    /// of the misconception example, with uniform priors
    fn misconception() -> FactorGraph {
        FactorGraph::from_parts(
            vec![JointCategorical::new(array![[30.0, 5.0], [1.0, 10.0]].into_dyn()).unwrap()],
            vec![Categorical::uniform(2).unwrap(), Categorical::uniform(2).unwrap()],
            &[(0, 0), (1, 0)]
        ).unwrap()
    }

    #[test]
    fn probability() {
        let graph = misconception();
        let values = array![[0, 0], [0, 1], [1, 0], [1, 1]];

        let p = graph.probability(values.view()).unwrap();
        let logp = graph.log_probability(values.view()).unwrap();

        let expected = array![30.0, 5.0, 1.0, 10.0] * 0.25;
        for r in 0..4 {
            assert_abs_diff_eq!(expected[r], p[r], epsilon = 1e-9);
            assert_abs_diff_eq!(expected[r].ln(), logp[r], epsilon = 1e-9);
        }
    }

    #[test]
    fn probability_errors() {
        let graph = misconception();

        match graph.probability(array![[0, 0, 0]].view()) {
            Err(BeliefError::ShapeMismatch { .. }) => (),
            r => panic!("unexpected result {:?}", r)
        };

        match graph.log_probability(array![[0, 2]].view()) {
            Err(BeliefError::CategoryOutOfRange { value: 2, categories: 2 }) => (),
            r => panic!("unexpected result {:?}", r)
        };
    }

    #[test]
    fn zero_probability() {
        let graph = FactorGraph::from_parts(
            vec![JointCategorical::new(array![[0.5, 0.0], [0.25, 0.25]].into_dyn()).unwrap()],
            vec![Categorical::uniform(2).unwrap(), Categorical::uniform(2).unwrap()],
            &[(0, 0), (1, 0)]
        ).unwrap();

        let logp = graph.log_probability(array![[0, 1]].view()).unwrap();
        assert_eq!(f64::NEG_INFINITY, logp[0]);
        assert_eq!(0.0, graph.probability(array![[0, 1]].view()).unwrap()[0]);
    }

    #[test]
    fn predict_proba() {
        let graph = misconception();
        let observations = array![
            [Observation::Unknown, Observation::Unknown],
            [Observation::Observed(1), Observation::Unknown]
        ];

        let proba = graph.predict_proba(observations.view()).unwrap();
        assert_eq!(2, proba.len());
        assert_eq!(&[2, 2], proba[0].shape());

        assert_abs_diff_eq!(35.0 / 46.0, proba[0][[0, 0]], epsilon = 1e-9);
        assert_abs_diff_eq!(31.0 / 46.0, proba[1][[0, 0]], epsilon = 1e-9);

        assert_eq!(array![0.0, 1.0], proba[0].row(1));
        assert_abs_diff_eq!(1.0 / 11.0, proba[1][[1, 0]], epsilon = 1e-9);

        for p in proba.iter() {
            for row in p.outer_iter() {
                assert_abs_diff_eq!(1.0, row.sum(), epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn predict_log_proba() {
        let graph = misconception();
        let observations = array![[Observation::Observed(0), Observation::Unknown]];

        let log_proba = graph.predict_log_proba(observations.view()).unwrap();
        assert_eq!(0.0, log_proba[0][[0, 0]]);
        assert_eq!(f64::NEG_INFINITY, log_proba[0][[0, 1]]);
        assert_abs_diff_eq!((30.0f64 / 35.0).ln(), log_proba[1][[0, 0]], epsilon = 1e-9);
    }

    #[test]
    fn predict() {
        let graph = misconception();
        let observations = array![
            [Observation::Unknown, Observation::Unknown],
            [Observation::Observed(1), Observation::Unknown],
            [Observation::Unknown, Observation::Observed(1)]
        ];

        let predicted = graph.predict(observations.view()).unwrap();
        assert_eq!(array![[0, 0], [1, 1], [1, 1]], predicted);

        let complete = fully_observed(array![[1, 0]].view());
        assert_eq!(array![[1, 0]], graph.predict(complete.view()).unwrap());
    }

    #[test]
    fn argmax_ties() {
        assert_eq!(0, argmax(array![0.5, 0.5].view()));
        assert_eq!(2, argmax(array![0.2, 0.3, 0.5].view()));
    }
}
