use std::fmt::Debug;

use thiserror::Error;

mod cpu;

pub use cpu::Cpu;

use crate::{
  error::Result,
  scalar::Real,
  tensor::Tensor,
  ops::{ UnaryOp, BinaryOp, ReduceOp, LossOp },
};


#[derive(Debug, Error)]
pub enum BackendError {
  #[error("{backend} backend does not support {op}")]
  Unsupported { backend: String, op: String },
  #[error("{0}: resources exhausted")]
  ResourceExhausted(String),
  #[error("device error: {0}")]
  Device(String),
}


/// Executes the numeric kernels of an instruction.
///
/// Operands arrive already resolved and shape-reconciled: binary and
/// loss kernels receive tensors of identical dims, dot products receive
/// operands satisfying [contraction](crate::broadcast::contraction).
/// Shape errors may still be reported for reduction axes.

pub trait Backend<T: Real>: Debug + Send + Sync {
  fn name(&self) -> &str;
  fn unary(&self, op: UnaryOp, input: &Tensor<T>) -> Result<Tensor<T>>;
  fn binary(&self, op: BinaryOp, lhs: &Tensor<T>, rhs: &Tensor<T>) -> Result<Tensor<T>>;
  fn reduce(&self, op: ReduceOp, input: &Tensor<T>, axis: isize) -> Result<Tensor<T>>;
  fn dot(&self, lhs: &Tensor<T>, rhs: &Tensor<T>) -> Result<Tensor<T>>;
  fn loss(&self, op: LossOp, prediction: &Tensor<T>, target: &Tensor<T>) -> Result<Tensor<T>>;
}
