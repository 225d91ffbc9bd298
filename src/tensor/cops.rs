use num_traits::{ Float, NumAssignOps };

use crate::{
  error::Result,
  tensor::Tensor,
  scalar::Real,
  broadcast,
};


/// Low-level compute operations.

pub trait Cops: Float + NumAssignOps {
  /// Multiply row major `[m, k]` and `[k, n]` matrices into a row major `[m, n]` buffer.

  fn gemm(m: usize, k: usize, n: usize, lhs: &[Self], rhs: &[Self]) -> Vec<Self> {
    let mut data = vec![Self::zero(); m * n];
    for i in 0..m {
      for j in 0..n {
        for l in 0..k {
          data[i * n + j] += lhs[i * k + l] * rhs[l * n + j];
        }
      }
    }
    data
  }
}

#[cfg(not(feature = "unsafe"))]
impl Cops for f32 {}

#[cfg(not(feature = "unsafe"))]
impl Cops for f64 {}

#[cfg(feature = "unsafe")]
impl Cops for f32 {
  fn gemm(m: usize, k: usize, n: usize, lhs: &[f32], rhs: &[f32]) -> Vec<f32> {
    let mut data = vec![0.0; m * n];
    if m * k * n == 0 { return data }
    unsafe {
      matrixmultiply::sgemm(
        m, k, n,
        1.0,
        lhs.as_ptr(), k as isize, 1,
        rhs.as_ptr(), n as isize, 1,
        0.0,
        data.as_mut_ptr(), n as isize, 1,
      );
    };
    data
  }
}

#[cfg(feature = "unsafe")]
impl Cops for f64 {
  fn gemm(m: usize, k: usize, n: usize, lhs: &[f64], rhs: &[f64]) -> Vec<f64> {
    let mut data = vec![0.0; m * n];
    if m * k * n == 0 { return data }
    unsafe {
      matrixmultiply::dgemm(
        m, k, n,
        1.0,
        lhs.as_ptr(), k as isize, 1,
        rhs.as_ptr(), n as isize, 1,
        0.0,
        data.as_mut_ptr(), n as isize, 1,
      );
    };
    data
  }
}

impl<T: Real> Tensor<T> {
  /// Batched matrix product over the last two axes.
  ///
  /// Leading axes must match exactly. Vectors have to be reshaped
  /// into row or column form beforehand.

  pub fn matmul(&self, rhs: &Self) -> Result<Self> {
    let dims = broadcast::contraction(self.shape(), rhs.shape())?;
    let rank = self.rank();
    let m = self.dims()[rank - 2];
    let k = self.dims()[rank - 1];
    let n = rhs.dims()[rank - 1];
    let batches: usize = self.dims()[..rank - 2].iter().product();

    let lhs = self.to_vec();
    let rhs = rhs.to_vec();
    let data = (0..batches)
      .flat_map(|b| T::gemm(
        m, k, n,
        &lhs[b * m * k..(b + 1) * m * k],
        &rhs[b * k * n..(b + 1) * k * n],
      ))
      .collect();

    Ok(Self::new(&dims, data))
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::Error;

  #[test]
  fn matmul() {
    let x = Tensor::new(&[2,3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let y = Tensor::new(&[3,2], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    assert_eq!(x.matmul(&y).unwrap(), Tensor::new(&[2,2], vec![22.0, 28.0, 49.0, 64.0]));
  }

  #[test]
  fn matmul_column() {
    let x = Tensor::new(&[2,3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let y = Tensor::new(&[3,1], vec![1.0, 2.0, 3.0]);
    assert_eq!(x.matmul(&y).unwrap(), Tensor::new(&[2,1], vec![14.0, 32.0]));
  }

  #[test]
  fn matmul_batched() {
    let x = Tensor::arrange(&[2,2,3], 1.0, 1.0);
    let y = Tensor::new(&[2,3,1], vec![1.0, 2.0, 3.0, 1.0, 2.0, 3.0]);
    assert_eq!(x.matmul(&y).unwrap(), Tensor::new(&[2,2,1], vec![14.0, 32.0, 50.0, 68.0]));
  }

  #[test]
  fn matmul_transposed_view() {
    let x = Tensor::new(&[3,2], vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]).transpose().unwrap();
    let y = Tensor::new(&[3,1], vec![1.0, 2.0, 3.0]);
    assert_eq!(x.matmul(&y).unwrap(), Tensor::new(&[2,1], vec![14.0, 32.0]));
  }

  #[test]
  fn matmul_rejects_vectors() {
    let x = Tensor::vec(&[1.0, 2.0, 3.0]);
    let y = Tensor::new(&[3,1], vec![1.0, 2.0, 3.0]);
    assert!(matches!(x.matmul(&y), Err(Error::Shape(_))));
  }

  #[test]
  fn gemm_single_row() {
    let data = <f64 as Cops>::gemm(1, 2, 1, &[2.0, 3.0], &[4.0, 5.0]);
    assert_eq!(data, vec![23.0]);
  }
}
