use std::fmt::{ Debug, Display };

use num_traits::{ Float, NumAssignOps };
use rand::distributions::uniform::SampleUniform;
use serde::{ Serialize, de::DeserializeOwned };

use crate::tensor::Cops;


/// All types that may be used in a [Tensor](crate::Tensor).
///
/// Implemented for `f32` and `f64`. Comparison and logical
/// operations encode their results as `1` and `0` of the same type,
/// and argmax/argmin store indices as whole numbers.

pub trait Real:
  Float + NumAssignOps + std::iter::Sum + SampleUniform + Cops
  + Default + Debug + Display + Send + Sync + Serialize + DeserializeOwned + 'static
{
  /// Interpret as a boolean. Anything but zero is true.

  fn truthy(self) -> bool {
    self != Self::zero()
  }

  fn from_bool(value: bool) -> Self {
    if value { Self::one() } else { Self::zero() }
  }

  fn from_usize(value: usize) -> Self {
    <Self as num_traits::NumCast>::from(value).unwrap_or_else(Self::nan)
  }

  fn from_f64(value: f64) -> Self {
    <Self as num_traits::NumCast>::from(value).unwrap_or_else(Self::nan)
  }
}

impl Real for f32 {}
impl Real for f64 {}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn truthiness() {
    assert!(2.5f64.truthy());
    assert!((-1.0f32).truthy());
    assert!(!0.0f64.truthy());
    assert!(f64::NAN.truthy());
    assert_eq!(f64::from_bool(true), 1.0);
    assert_eq!(f32::from_bool(false), 0.0);
  }

  #[test]
  fn conversion() {
    assert_eq!(f64::from_usize(7), 7.0);
    assert_eq!(f32::from_f64(0.5), 0.5);
  }
}
