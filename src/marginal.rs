//! Defines `Categorical`, the univariate distribution attached to every variable of a graph.

use crate::distribution::{check_columns, check_mass, normalize, Distribution, MarginalDistribution};
use crate::estimators::{CountSummary, Summary};
use crate::util::{BeliefError, Result};

use ndarray::prelude as nd;


/// A distribution over the categories `0..n` of a single discrete variable.
#[derive(Clone, Debug, PartialEq)]
pub struct Categorical {

    /// The probability of each category. Always sums to one.
    probs: nd::Array1<f64>,

    /// Weight of the previous parameters when refreshing from summaries, in `[0, 1]`
    inertia: f64,

    /// Statistics accumulated since the last refresh
    summary: CountSummary

}


impl Categorical {

    /// Create a new `Categorical`.
    ///
    /// # Args
    /// * `probs`: the probability of each category. Must be non-negative and sum to one.
    ///
    /// # Errors
    /// * `BeliefError::InvalidProbabilities` if `probs` is empty, has negative or non-finite
    ///   entries, or does not sum to one
    pub fn new(probs: nd::Array1<f64>) -> Result<Self> {
        if probs.is_empty() {
            return Err(BeliefError::InvalidProbabilities(String::from("empty domain")));
        }

        let z = check_mass(probs.iter())?;
        if (z - 1.0).abs() > 0.001 {
            return Err(BeliefError::InvalidProbabilities(
                format!("probabilities sum to {}", z)
            ));
        }

        let summary = CountSummary::new(&[probs.len()]);
        Ok(Categorical { probs: probs / z, inertia: 0.0, summary })
    }


    /// A uniform distribution over `categories` categories
    pub fn uniform(categories: usize) -> Result<Self> {
        if categories == 0 {
            return Err(BeliefError::InvalidProbabilities(String::from("empty domain")));
        }

        Categorical::new(nd::Array1::from_elem(categories, 1.0 / categories as f64))
    }


    /// Set the weight the current parameters keep when refreshed from summaries.
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

}


impl Distribution for Categorical {

    type Summary = CountSummary;

    fn arity(&self) -> usize {
        1
    }

    fn shape(&self) -> Vec<usize> {
        vec![self.probs.len()]
    }

    fn log_probability(&self, values: nd::ArrayView2<usize>) -> Result<nd::Array1<f64>> {
        check_columns(&values, 1)?;

        values.column(0)
              .iter()
              .map(|&v| match self.probs.get(v) {
                  Some(p) => Ok(p.ln()),
                  None => Err(BeliefError::CategoryOutOfRange { value: v, categories: self.probs.len() })
              })
              .collect()
    }

    fn summarize_batch(
        &self,
        values: nd::ArrayView2<usize>,
        weights: nd::ArrayView1<f64>
    ) -> Result<CountSummary> {
        let mut batch = CountSummary::new(&[self.probs.len()]);
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

        // the maximum likelihood estimate is the relative frequency of each category
        let estimate = self.summary.counts() / self.summary.total();
        let estimate = estimate.into_dimensionality::<nd::Ix1>().map_err(|_| BeliefError::ShapeMismatch {
            expected: vec![self.probs.len()],
            actual: self.summary.counts().shape().to_vec()
        })?;

        self.probs = &self.probs * self.inertia + &estimate * (1.0 - self.inertia);
        self.summary.clear();
        Ok(())
    }

}


impl MarginalDistribution for Categorical {

    fn n_categories(&self) -> usize {
        self.probs.len()
    }

    fn probabilities(&self) -> nd::ArrayView1<f64> {
        self.probs.view()
    }

    fn clamp(&self, value: usize) -> Result<Self> {
        match self.probs.get(value) {
            None => Err(BeliefError::CategoryOutOfRange { value, categories: self.probs.len() }),
            // observing a category that is impossible a priori
            Some(&p) if p == 0.0 => Err(BeliefError::DegenerateEvidence { variable: 0 }),
            Some(_) => {
                let mut probs = nd::Array1::zeros(self.probs.len());
                probs[value] = 1.0;

                Ok(Categorical {
                    probs,
                    inertia: self.inertia,
                    summary: CountSummary::new(&[self.probs.len()])
                })
            }
        }
    }

    fn combine(&self, messages: &[nd::ArrayView1<f64>]) -> Result<nd::Array1<f64>> {
        let mut belief = self.probs.clone();
        for m in messages {
            if m.len() != belief.len() {
                return Err(BeliefError::ShapeMismatch {
                    expected: vec![belief.len()],
                    actual: vec![m.len()]
                });
            }
            belief *= m;
        }

        if normalize(&mut belief) {
            Ok(belief)
        } else {
            Err(BeliefError::DegenerateEvidence { variable: 0 })
        }
    }

}


#[cfg(test)]
mod tests {

    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn categorical() {
        let c = Categorical::new(array![0.2, 0.3, 0.5]).unwrap();
        assert_eq!(1, c.arity());
        assert_eq!(vec![3], c.shape());
        assert_eq!(3, c.n_categories());
        assert_eq!(array![0.2, 0.3, 0.5], c.probabilities());
    }

    #[test]
    fn categorical_errs() {
        assert!(Categorical::new(nd::Array1::zeros(0)).is_err());
        assert!(Categorical::new(array![0.5, 0.6]).is_err());
        assert!(Categorical::new(array![1.5, -0.5]).is_err());
        assert!(Categorical::uniform(0).is_err());
        assert!(Categorical::uniform(2).unwrap().with_inertia(1.5).is_err());
    }

    #[test]
    fn log_probability() {
        let c = Categorical::new(array![0.25, 0.75]).unwrap();
        let logp = c.log_probability(array![[0], [1], [1]].view()).unwrap();
        assert_abs_diff_eq!(0.25f64.ln(), logp[0]);
        assert_abs_diff_eq!(0.75f64.ln(), logp[2]);

        let p = c.probability(array![[1]].view()).unwrap();
        assert_abs_diff_eq!(0.75, p[0], epsilon = 1e-12);

        match c.log_probability(array![[2]].view()) {
            Err(BeliefError::CategoryOutOfRange { value: 2, categories: 2 }) => (),
            r => panic!("unexpected result {:?}", r)
        };
    }

    #[test]
    fn clamp() {
        let c = Categorical::new(array![0.1, 0.6, 0.3]).unwrap();
        let clamped = c.clamp(1).unwrap();
        assert_eq!(array![0.0, 1.0, 0.0], clamped.probabilities());

        assert!(c.clamp(3).is_err());

        let impossible = Categorical::new(array![0.0, 1.0]).unwrap();
        match impossible.clamp(0) {
            Err(BeliefError::DegenerateEvidence { .. }) => (),
            r => panic!("unexpected result {:?}", r)
        };
    }

    #[test]
    fn combine() {
        let c = Categorical::new(array![0.5, 0.5]).unwrap();
        let m1 = array![0.2, 0.6];
        let m2 = array![1.0, 0.5];

        let belief = c.combine(&[m1.view(), m2.view()]).unwrap();
        assert_abs_diff_eq!(0.4, belief[0], epsilon = 1e-12);
        assert_abs_diff_eq!(0.6, belief[1], epsilon = 1e-12);

        // no messages leaves the distribution as it is
        assert_eq!(array![0.5, 0.5], c.combine(&[]).unwrap());

        let zero = array![0.0, 0.0];
        assert!(c.combine(&[zero.view()]).is_err());

        let wrong = array![1.0, 1.0, 1.0];
        assert!(c.combine(&[wrong.view()]).is_err());
    }

    #[test]
    /// Test MLE of a single, binary variable (a weighted coin)
    fn coin_toss() {
        let mut c = Categorical::uniform(2).unwrap();

        let values = nd::Array2::from_shape_fn((100, 1), |(i, _)| if i < 30 { 0 } else { 1 });
        c.summarize(values.view(), nd::Array1::ones(100).view()).unwrap();
        assert_eq!(100.0, c.summary().total());

        c.from_summaries().unwrap();
        assert_abs_diff_eq!(0.3, c.probabilities()[0], epsilon = 1e-12);
        assert_abs_diff_eq!(0.7, c.probabilities()[1], epsilon = 1e-12);
        assert!(c.summary().is_empty());

        // nothing accumulated, nothing changes
        c.from_summaries().unwrap();
        assert_abs_diff_eq!(0.3, c.probabilities()[0], epsilon = 1e-12);
    }

    #[test]
    fn inertia() {
        let mut c = Categorical::uniform(2).unwrap().with_inertia(0.5).unwrap();
        c.summarize(array![[1], [1]].view(), array![1.0, 1.0].view()).unwrap();
        c.from_summaries().unwrap();

        assert_abs_diff_eq!(0.25, c.probabilities()[0], epsilon = 1e-12);
        assert_abs_diff_eq!(0.75, c.probabilities()[1], epsilon = 1e-12);
    }
}
