use rand::Rng;

use crate::scalar::Real;


// Polar Box-Muller transformation

pub fn randn<T: Real>() -> (T, T) {
  let mut rng = rand::thread_rng();
  loop {
    let u = rng.gen_range(-T::one(), T::one());
    let v = rng.gen_range(-T::one(), T::one());
    let r = u * u + v * v;
    // Try again if outside interval
    if r == T::zero() || r >= T::one() { continue }
    let c = (T::from_f64(-2.0) * r.ln() / r).sqrt();
    return (u * c, v * c)
  }
}
