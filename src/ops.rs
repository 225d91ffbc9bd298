use std::fmt;

use serde::{ Serialize, Deserialize };

use crate::scalar::Real;


/// Shape preserving operations on a single tensor.
///
/// Everything but [UnaryOp::Softmax] works element by element.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
  Neg,
  Abs,
  Sign,
  Sqrt,
  Square,
  Exp,
  Log,
  Sin,
  Cos,
  Tan,
  Floor,
  Ceil,
  Round,
  Reciprocal,
  Not,
  Relu,
  LeakyRelu,
  Elu,
  Selu,
  Gelu,
  Sigmoid,
  Tanh,
  Softplus,
  Softsign,
  Swish,
  Softmax,
}

impl UnaryOp {
  pub fn apply<T: Real>(self, a: T) -> T {
    let zero = T::zero();
    let one = T::one();
    match self {
      Self::Neg => -a,
      Self::Abs => a.abs(),
      Self::Sign => if a.is_nan() || a == zero { a } else { a.signum() },
      Self::Sqrt => a.sqrt(),
      Self::Square => a * a,
      Self::Exp => a.exp(),
      Self::Log => a.ln(),
      Self::Sin => a.sin(),
      Self::Cos => a.cos(),
      Self::Tan => a.tan(),
      Self::Floor => a.floor(),
      Self::Ceil => a.ceil(),
      Self::Round => a.round(),
      Self::Reciprocal => one / a,
      Self::Not => T::from_bool(!a.truthy()),
      Self::Relu => if a > zero { a } else { zero },
      Self::LeakyRelu => if a > zero { a } else { a * T::from_f64(0.01) },
      Self::Elu => if a > zero { a } else { a.exp() - one },
      Self::Selu => {
        let alpha = T::from_f64(1.673_263_242_354_377_3);
        let scale = T::from_f64(1.050_700_987_355_480_5);
        scale * if a > zero { a } else { alpha * (a.exp() - one) }
      },
      Self::Gelu => {
        // Tanh approximation
        let c = T::from_f64((2.0 / std::f64::consts::PI).sqrt());
        let half = T::from_f64(0.5);
        half * a * (one + (c * (a + T::from_f64(0.044715) * a * a * a)).tanh())
      },
      Self::Sigmoid => one / (one + (-a).exp()),
      Self::Tanh => a.tanh(),
      Self::Softplus => (one + a.exp()).ln(),
      Self::Softsign => a / (one + a.abs()),
      Self::Swish => a / (one + (-a).exp()),
      Self::Softmax => a,
    }
  }
}


/// Element-wise operations on two tensors of matching (or broadcasted) shape.
///
/// Comparisons and logical operations yield `1` for true and `0` for false.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
  Pow,
  Rem,
  Maximum,
  Minimum,
  Equal,
  NotEqual,
  Less,
  LessEqual,
  Greater,
  GreaterEqual,
  And,
  Or,
  Xor,
}

impl BinaryOp {
  pub fn apply<T: Real>(self, a: T, b: T) -> T {
    match self {
      Self::Add => a + b,
      Self::Sub => a - b,
      Self::Mul => a * b,
      Self::Div => a / b,
      Self::Pow => a.powf(b),
      Self::Rem => a % b,
      Self::Maximum => if a.is_nan() || b.is_nan() { T::nan() } else { a.max(b) },
      Self::Minimum => if a.is_nan() || b.is_nan() { T::nan() } else { a.min(b) },
      Self::Equal => T::from_bool(a == b),
      Self::NotEqual => T::from_bool(a != b),
      Self::Less => T::from_bool(a < b),
      Self::LessEqual => T::from_bool(a <= b),
      Self::Greater => T::from_bool(a > b),
      Self::GreaterEqual => T::from_bool(a >= b),
      Self::And => T::from_bool(a.truthy() && b.truthy()),
      Self::Or => T::from_bool(a.truthy() || b.truthy()),
      Self::Xor => T::from_bool(a.truthy() != b.truthy()),
    }
  }
}


/// Reductions over one or more axes.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReduceOp {
  Sum,
  Mean,
  Max,
  Min,
  Var,
  Std,
  ArgMax,
  ArgMin,
}

impl ReduceOp {
  /// Index reductions collapse exactly one axis instead of all inner axes.

  pub fn is_index(self) -> bool {
    matches!(self, Self::ArgMax | Self::ArgMin)
  }
}


/// Losses comparing a prediction with a target, producing a single element.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LossOp {
  MeanSquared,
  MeanAbsolute,
  CrossEntropy,
  BinaryCrossEntropy,
}


/// An instruction's operation, as dispatched by a [Session](crate::Session).

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Op {
  Unary(UnaryOp),
  Binary(BinaryOp),
  /// Reduction with its axis. `-1` reduces all elements.
  Reduce(ReduceOp, isize),
  Loss(LossOp),
  Dot,
  /// `x · w + b`
  Affine,
  Reshape(Vec<usize>),
  Flatten,
  /// Swap the last two axes.
  Transpose,
}

impl Op {
  /// Number of operands the operation consumes.

  pub fn arity(&self) -> usize {
    match self {
      Self::Unary(_) | Self::Reduce(..) | Self::Reshape(_) | Self::Flatten | Self::Transpose => 1,
      Self::Binary(_) | Self::Loss(_) | Self::Dot => 2,
      Self::Affine => 3,
    }
  }
}

fn snake_case(name: &str) -> String {
  let mut out = String::with_capacity(name.len() + 4);
  for (i, c) in name.chars().enumerate() {
    if c.is_uppercase() {
      if i > 0 { out.push('_') }
      out.extend(c.to_lowercase());
    } else {
      out.push(c);
    }
  }
  out
}

macro_rules! snake_display {
  ($($ty:ty),*) => {
    $(
      impl fmt::Display for $ty {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
          write!(f, "{}", snake_case(&format!("{:?}", self)))
        }
      }
    )*
  };
}

snake_display!(UnaryOp, BinaryOp, ReduceOp, LossOp);

impl fmt::Display for Op {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Self::Unary(op) => write!(f, "{op}"),
      Self::Binary(op) => write!(f, "{op}"),
      Self::Reduce(op, axis) => write!(f, "{op}(axis={axis})"),
      Self::Loss(op) => write!(f, "{op}"),
      Self::Dot => write!(f, "dot"),
      Self::Affine => write!(f, "affine"),
      Self::Reshape(dims) => write!(f, "reshape({dims:?})"),
      Self::Flatten => write!(f, "flatten"),
      Self::Transpose => write!(f, "transpose"),
    }
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn names() {
    assert_eq!(Op::Binary(BinaryOp::GreaterEqual).to_string(), "greater_equal");
    assert_eq!(Op::Unary(UnaryOp::LeakyRelu).to_string(), "leaky_relu");
    assert_eq!(Op::Reduce(ReduceOp::ArgMax, 1).to_string(), "arg_max(axis=1)");
    assert_eq!(Op::Reshape(vec![2, 3]).to_string(), "reshape([2, 3])");
  }

  #[test]
  fn index_reductions() {
    assert!(ReduceOp::ArgMin.is_index());
    assert!(!ReduceOp::Max.is_index());
  }

  #[test]
  fn arity() {
    assert_eq!(Op::Unary(UnaryOp::Relu).arity(), 1);
    assert_eq!(Op::Loss(LossOp::MeanSquared).arity(), 2);
    assert_eq!(Op::Affine.arity(), 3);
  }

  #[test]
  fn activations() {
    assert_eq!(UnaryOp::Relu.apply(-2.0), 0.0);
    assert_eq!(UnaryOp::Relu.apply(3.0), 3.0);
    assert_eq!(UnaryOp::Sigmoid.apply(0.0), 0.5);
    assert_eq!(UnaryOp::Softsign.apply(1.0), 0.5);
    assert_eq!(UnaryOp::Gelu.apply(0.0), 0.0);
    assert!((UnaryOp::LeakyRelu.apply(-1.0) + 0.01f64).abs() < 1e-12);
  }

  #[test]
  fn ieee_edge_cases() {
    assert!(UnaryOp::Log.apply(-1.0f64).is_nan());
    assert_eq!(BinaryOp::Div.apply(1.0f64, 0.0), f64::INFINITY);
    assert!(BinaryOp::Maximum.apply(f64::NAN, 1.0).is_nan());
  }

  #[test]
  fn logic() {
    assert_eq!(BinaryOp::And.apply(2.0, -1.0), 1.0);
    assert_eq!(BinaryOp::Xor.apply(0.0, 0.0), 0.0);
    assert_eq!(BinaryOp::Greater.apply(1.0, 2.0), 0.0);
    assert_eq!(UnaryOp::Not.apply(0.0), 1.0);
  }
}
