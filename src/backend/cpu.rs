use crate::{
  backend::Backend,
  error::Result,
  scalar::Real,
  tensor::Tensor,
  ops::{ UnaryOp, BinaryOp, ReduceOp, LossOp },
};


/// Reference backend running every kernel on the host.

#[derive(Debug, Clone, Copy, Default)]
pub struct Cpu;

impl<T: Real> Backend<T> for Cpu {
  fn name(&self) -> &str {
    "cpu"
  }

  fn unary(&self, op: UnaryOp, input: &Tensor<T>) -> Result<Tensor<T>> {
    Ok(input.unary(op))
  }

  fn binary(&self, op: BinaryOp, lhs: &Tensor<T>, rhs: &Tensor<T>) -> Result<Tensor<T>> {
    lhs.binary(rhs, op)
  }

  fn reduce(&self, op: ReduceOp, input: &Tensor<T>, axis: isize) -> Result<Tensor<T>> {
    input.reduce(op, axis)
  }

  fn dot(&self, lhs: &Tensor<T>, rhs: &Tensor<T>) -> Result<Tensor<T>> {
    lhs.matmul(rhs)
  }

  fn loss(&self, op: LossOp, prediction: &Tensor<T>, target: &Tensor<T>) -> Result<Tensor<T>> {
    prediction.loss(target, op)
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn kernels() {
    let cpu = Cpu;
    let a = Tensor::vec(&[1.0, 4.0]);
    let b = Tensor::vec(&[2.0, 2.0]);
    assert_eq!(Backend::<f64>::name(&cpu), "cpu");
    assert_eq!(cpu.unary(UnaryOp::Sqrt, &a).unwrap(), Tensor::vec(&[1.0, 2.0]));
    assert_eq!(cpu.binary(BinaryOp::Sub, &a, &b).unwrap(), Tensor::vec(&[-1.0, 2.0]));
    assert_eq!(cpu.reduce(ReduceOp::Sum, &a, -1).unwrap(), Tensor::scalar(5.0));
    assert_eq!(cpu.loss(LossOp::MeanAbsolute, &a, &b).unwrap(), Tensor::scalar(1.5));
  }

  #[test]
  fn division_by_zero() {
    let out = Cpu.binary(BinaryOp::Div, &Tensor::<f64>::vec(&[1.0, 0.0]), &Tensor::vec(&[0.0, 0.0])).unwrap();
    let out = out.to_vec();
    assert_eq!(out[0], f64::INFINITY);
    assert!(out[1].is_nan());
  }
}
