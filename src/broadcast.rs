//! Shape reconciliation for instructions taking two tensors.
//!
//! Operands of differing shape only meet if exactly one of them was
//! staged as broadcastable. That one gets expanded, as a zero-stride view,
//! to the dims of its partner. Contractions (dot, affine) follow their own
//! rule and never broadcast.

use crate::{
  error::{ Error, Result },
  shape::Shape,
  scalar::Real,
  store::Operand,
  tensor::Tensor,
};


/// Bring two operands to identical dims.

pub fn reconcile<T: Real>(lhs: &Operand<T>, rhs: &Operand<T>) -> Result<(Tensor<T>, Tensor<T>)> {
  let (l, r) = (&lhs.tensor, &rhs.tensor);
  if l.dims() == r.dims() {
    return Ok((l.clone(), r.clone()))
  }
  match (lhs.broadcast, rhs.broadcast) {
    (true, false) => Ok((expand(l, r.dims())?, r.clone())),
    (false, true) => Ok((l.clone(), expand(r, l.dims())?)),
    (true, true) => Err(Error::Shape(format!(
      "{} and {} are both broadcastable, can't tell which one to expand", l.shape(), r.shape()))),
    (false, false) => Err(Error::Shape(format!(
      "{} and {} differ and neither is broadcastable", l.shape(), r.shape()))),
  }
}

fn expand<T: Real>(tensor: &Tensor<T>, dims: &[usize]) -> Result<Tensor<T>> {
  tensor.broadcast(dims).ok_or_else(|| Error::Shape(format!(
    "cannot broadcast {} to {:?}", tensor.shape(), dims)))
}

/// Check the operands of a (batched) matrix product and return its dims.
///
/// The last axis of `lhs` has to match the second to last of `rhs`, and
/// all leading axes have to be identical.

pub fn contraction(lhs: &Shape, rhs: &Shape) -> Result<Vec<usize>> {
  if lhs.rank() < 2 || rhs.rank() < 2 {
    return Err(Error::Shape(format!(
      "{} · {}: both operands need at least two axes, reshape vectors into rows or columns", lhs, rhs)))
  }
  if lhs.rank() != rhs.rank() {
    return Err(Error::Shape(format!("{} · {}: ranks differ", lhs, rhs)))
  }
  let rank = lhs.rank();
  if lhs[rank - 1] != rhs[rank - 2] {
    return Err(Error::Shape(format!("{} · {}: inner axes don't match", lhs, rhs)))
  }
  if lhs.dims[..rank - 2] != rhs.dims[..rank - 2] {
    return Err(Error::Shape(format!("{} · {}: leading axes don't match", lhs, rhs)))
  }
  let mut dims = lhs.dims[..rank - 1].to_vec();
  dims.push(rhs[rank - 1]);
  Ok(dims)
}
