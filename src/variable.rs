//! Definition of the variable module
//!
//! A variable is identified by the index of the marginal that owns it, which is also the column
//! of the input data holding its values. An `Observation` is the value of one variable in one row
//! of data: either an observed category or unknown.

use crate::util::{BeliefError, Result};

use ndarray::prelude as nd;
use ndarray::Zip;

/// The state of a single cell of (possibly partially observed) data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Observation {

    /// The variable was observed to take the given category
    Observed(usize),

    /// The variable was not observed, its value is to be inferred
    Unknown

}


impl Observation {

    /// The observed category, if any
    pub fn value(&self) -> Option<usize> {
        match *self {
            Observation::Observed(v) => Some(v),
            Observation::Unknown => None
        }
    }

    pub fn is_observed(&self) -> bool {
        self.value().is_some()
    }

}


impl From<Option<usize>> for Observation {

    fn from(value: Option<usize>) -> Self {
        match value {
            Some(v) => Observation::Observed(v),
            None => Observation::Unknown
        }
    }

}


/// Convert a dense matrix of category codes and a parallel mask into `Observation`s.
///
/// # Args
/// * `values`: the category codes, shape `(n_rows, n_variables)`
/// * `mask`: `true` where the value is observed. Values at masked-off cells are ignored.
///
/// # Errors
/// * `BeliefError::ShapeMismatch` if `values` and `mask` do not have the same shape
pub fn observations_from_mask(
    values: nd::ArrayView2<usize>,
    mask: nd::ArrayView2<bool>
) -> Result<nd::Array2<Observation>> {
    if values.shape() != mask.shape() {
        return Err(BeliefError::ShapeMismatch {
            expected: values.shape().to_vec(),
            actual: mask.shape().to_vec()
        });
    }

    Ok(Zip::from(&values).and(&mask).map_collect(|&v, &observed| {
        if observed { Observation::Observed(v) } else { Observation::Unknown }
    }))
}


/// Convert a complete matrix of category codes into `Observation`s.
pub fn fully_observed(values: nd::ArrayView2<usize>) -> nd::Array2<Observation> {
    values.mapv(Observation::Observed)
}


#[cfg(test)]
mod tests {

    use super::*;
    use ndarray::array;

    #[test]
    fn observation() {
        let o = Observation::Observed(3);
        assert!(o.is_observed());
        assert_eq!(Some(3), o.value());

        let u = Observation::Unknown;
        assert!(! u.is_observed());
        assert_eq!(None, u.value());

        assert_eq!(Observation::Observed(1), Observation::from(Some(1)));
        assert_eq!(Observation::Unknown, Observation::from(None));
    }

    #[test]
    /// Values under a `false` mask are ignored, whatever they are
    fn from_mask() {
        let values = array![[0, 7], [1, 1]];
        let mask = array![[true, false], [false, true]];

        let obs = observations_from_mask(values.view(), mask.view()).unwrap();
        assert_eq!(Observation::Observed(0), obs[[0, 0]]);
        assert_eq!(Observation::Unknown, obs[[0, 1]]);
        assert_eq!(Observation::Unknown, obs[[1, 0]]);
        assert_eq!(Observation::Observed(1), obs[[1, 1]]);
    }

    #[test]
    fn from_mask_shape() {
        let values = array![[0, 1], [1, 1]];
        let mask = array![[true, false, true]];

        match observations_from_mask(values.view(), mask.view()) {
            Err(BeliefError::ShapeMismatch { .. }) => (),
            _ => panic!("expected a shape mismatch")
        };
    }

    #[test]
    fn complete() {
        let obs = fully_observed(array![[0, 1], [2, 1]].view());
        assert_eq!(Observation::Observed(2), obs[[1, 0]]);
        assert!(obs.iter().all(|o| o.is_observed()));
    }
}
