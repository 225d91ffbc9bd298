use std::sync::Arc;

use itertools::Itertools;
use rand::Rng;
use serde::{ Serialize, Deserialize };

mod cops;
mod lops;

pub use cops::Cops;

use crate::{
  internal::*,
  error::{ Error, Result },
  shape::Shape,
  scalar::Real,
};


/// Multidimensional array of [Real] numbers.
///
/// Tensors behave as values. Their buffer is never written to after
/// construction, so clones and views may share it freely without one copy
/// ever observing changes made through another.
///
/// Every tensor has at least one dimension; single numbers are shaped `[1]`.

#[derive(Debug, Clone)]
pub struct Tensor<T: Real> {
  shape: Shape,
  data: Arc<Vec<T>>,
}

impl<T: Real> PartialEq for Tensor<T> {
  fn eq(&self, rhs: &Self) -> bool {
    self.shape.dims == rhs.shape.dims && self.iter().eq(rhs.iter())
  }
}

impl<T: Real> Tensor<T> {
  fn from_shape(shape: Shape, data: Vec<T>) -> Self {
    debug_assert_eq!(shape.size(), data.len());
    Self { shape, data: Arc::new(data) }
  }

  /// Create a tensor from its dimensions and row major data.
  ///
  /// Mismatched pairs don't fail. The data gets shaped as a
  /// single dimension of its own length instead.

  pub fn new(dims: &[usize], data: Vec<T>) -> Self {
    let size: usize = dims.iter().product();
    if dims.is_empty() || size != data.len() {
      log::warn!("dims {:?} don't match data length {}, using [{}]", dims, data.len(), data.len());
      return Self::from_shape(Shape::new(&[data.len()]), data)
    }
    Self::from_shape(Shape::new(dims), data)
  }

  pub fn scalar(item: T) -> Self {
    Self::new(&[1], vec![item])
  }

  pub fn vec(vec: &[T]) -> Self {
    Self::new(&[vec.len()], vec.to_vec())
  }

  pub fn from_vec(vec: Vec<T>) -> Self {
    Self::new(&[vec.len()], vec)
  }

  pub fn fill(dims: &[usize], filler: T) -> Self {
    Self::new(dims, vec![filler; dims.iter().product()])
  }

  pub fn zeros(dims: &[usize]) -> Self {
    Self::fill(dims, T::zero())
  }

  pub fn ones(dims: &[usize]) -> Self {
    Self::fill(dims, T::one())
  }

  pub fn arrange(dims: &[usize], start: T, step: T) -> Self {
    Self::new(dims, (0..dims.iter().product::<usize>())
      .map(|i| T::from_usize(i) * step + start )
      .collect())
  }

  /// Evenly spaced values from `start` to `end`, both inclusive.

  pub fn linspace(dims: &[usize], start: T, end: T) -> Self {
    let size: usize = dims.iter().product();
    if size <= 1 { return Self::fill(dims, start) }
    Self::arrange(dims, start, (end - start) / (T::from_usize(size) - T::one()))
  }

  pub fn rand(dims: &[usize]) -> Self {
    let mut rng = rand::thread_rng();
    Self::new(dims, (0..dims.iter().product::<usize>())
      .map(|_| rng.gen_range(T::zero(), T::one()) )
      .collect())
  }

  pub fn randn(dims: &[usize]) -> Self {
    let len: usize = dims.iter().product();
    let mut data = vec![T::zero(); len];
    for i in 0..(len as f64 / 2.0).ceil() as usize {
      let j = i * 2;
      let (r1, r2): (T, T) = randn();
      data[j] = r1;
      data[(j + 1) % len] = r2;
    }
    Self::new(dims, data)
  }

  pub fn shape(&self) -> &Shape {
    &self.shape
  }

  pub fn dims(&self) -> &[usize] {
    &self.shape.dims
  }

  pub fn size(&self) -> usize {
    self.shape.size()
  }

  pub fn rank(&self) -> usize {
    self.shape.rank()
  }

  /// The single element of a one-element tensor.

  pub fn item(&self) -> Option<T> {
    if self.size() != 1 { return None }
    self.iter().next()
  }

  /// Elements in logical order.

  pub fn iter(&self) -> impl Iterator<Item=T> + '_ {
    self.shape.iter().map(move |i| self.data[i] )
  }

  pub fn to_vec(&self) -> Vec<T> {
    if self.shape.contiguous() {
      let start = self.shape.offset;
      self.data[start..start + self.size()].to_vec()
    } else {
      self.iter().collect()
    }
  }

  /// Copy into a fresh buffer of exactly this tensor's size.

  pub fn detach(&self) -> Self {
    Self::from_shape(Shape::new(&self.shape.dims), self.to_vec())
  }

  pub fn contiguous(&self) -> Self {
    if self.shape.contiguous() && self.shape.offset == 0 && self.data.len() == self.size() {
      self.clone()
    } else {
      self.detach()
    }
  }

  /// View of this tensor expanded to `dims`, sharing its buffer.

  pub fn broadcast(&self, dims: &[usize]) -> Option<Self> {
    let shape = self.shape.broadcast(dims)?;
    Some(Self { shape, data: self.data.clone() })
  }

  pub fn reshape(&self, dims: &[usize]) -> Result<Self> {
    let size: usize = dims.iter().product();
    if dims.is_empty() || size != self.size() {
      return Err(Error::Shape(format!("cannot reshape {} into {:?}", self.shape, dims)))
    }
    let this = self.contiguous();
    Ok(Self { shape: Shape::new(dims), data: this.data })
  }

  pub fn flatten(&self) -> Self {
    let this = self.contiguous();
    Self { shape: Shape::new(&[self.size()]), data: this.data }
  }

  /// Swap the last two axes.

  pub fn transpose(&self) -> Result<Self> {
    let rank = self.rank();
    if rank < 2 {
      return Err(Error::Shape(format!("cannot transpose {}, reshape it into a matrix first", self.shape)))
    }
    Ok(Self { shape: self.shape.transpose(rank - 2, rank - 1), data: self.data.clone() })
  }

  pub fn vectorize<F>(&self, cb: F) -> Self
  where
    F: Fn(T) -> T + Send + Sync,
  {
    #[cfg(not(feature = "rayon"))]
    let data = self.iter().map(cb).collect();

    #[cfg(feature = "rayon")]
    let data = {
      use rayon::prelude::*;
      self.to_vec().into_par_iter().map(cb).collect()
    };

    Self::from_shape(Shape::new(&self.shape.dims), data)
  }

  /// Combine two tensors of identical dimensions element by element.

  pub fn zip<F>(&self, rhs: &Self, cb: F) -> Result<Self>
  where
    F: Fn(T, T) -> T + Send + Sync,
  {
    if self.shape.dims != rhs.shape.dims {
      return Err(Error::Shape(format!("{} and {} differ", self.shape, rhs.shape)))
    }

    #[cfg(not(feature = "rayon"))]
    let data = self.iter()
      .zip(rhs.iter())
      .map(|(a, b)| cb(a, b) )
      .collect();

    #[cfg(feature = "rayon")]
    let data = {
      use rayon::prelude::*;
      self.to_vec().into_par_iter()
        .zip(rhs.to_vec().into_par_iter())
        .map(|(a, b)| cb(a, b) )
        .collect()
    };

    Ok(Self::from_shape(Shape::new(&self.shape.dims), data))
  }

  /// Serialize into a compact byte representation.

  pub fn to_bytes(&self) -> Result<Vec<u8>> {
    let dump = TensorDump { dims: self.shape.dims.clone(), data: self.to_vec() };
    Ok(postcard::to_allocvec(&dump)?)
  }

  pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
    let dump: TensorDump<T> = postcard::from_bytes(bytes)?;
    Ok(Self::new(&dump.dims, dump.data))
  }
}

#[derive(Serialize, Deserialize)]
#[serde(bound = "T: Real")]
struct TensorDump<T> {
  dims: Vec<usize>,
  data: Vec<T>,
}

impl<T: Real> std::fmt::Display for Tensor<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(f, "Tensor{:?} ", self.shape.dims)?;
    print_chunks(0, &self.shape.dims, &self.to_vec(), f)
  }
}

fn print_chunks<T: std::fmt::Display>(idx: usize, dims: &[usize], vec: &[T], f: &mut std::fmt::Formatter) -> std::fmt::Result {
  let indent = "  ".repeat(idx);
  if idx == dims.len() - 1 {
    writeln!(f, "{indent}[{}]", vec.iter().join(", "))?;
  } else if dims[idx] > 0 && !vec.is_empty() {
    writeln!(f, "{indent}[")?;
    for chunk in vec.chunks(vec.len() / dims[idx]) {
      print_chunks(idx + 1, dims, chunk, f)?;
    }
    writeln!(f, "{indent}]")?;
  } else {
    writeln!(f, "{indent}[]")?;
  }
  Ok(())
}
