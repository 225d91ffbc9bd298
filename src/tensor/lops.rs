use crate::{
  error::{ Error, Result },
  tensor::Tensor,
  scalar::Real,
  ops::{ UnaryOp, BinaryOp, ReduceOp, LossOp },
};


/// Result dims of a reduction. Reducing everything leaves a single element.

fn collapsed(dims: &[usize]) -> Vec<usize> {
  if dims.is_empty() { vec![1] } else { dims.to_vec() }
}

fn sum<T: Real>(values: &[T]) -> T {
  values.iter().copied().sum()
}

fn mean<T: Real>(values: &[T]) -> T {
  sum(values) / T::from_usize(values.len())
}

fn variance<T: Real>(values: &[T]) -> T {
  let mean = mean(values);
  values.iter().map(|&a| (a - mean) * (a - mean) ).sum::<T>() / T::from_usize(values.len())
}

// NaN wins over every number
fn extreme<T: Real>(values: &[T], pick: fn(T, T) -> bool) -> T {
  let start = if pick(T::one(), T::zero()) { T::neg_infinity() } else { T::infinity() };
  values.iter().copied().fold(start, |acc, a| {
    if acc.is_nan() || !(a.is_nan() || pick(a, acc)) { acc } else { a }
  })
}

fn position<T: Real>(values: impl Iterator<Item=T>, pick: fn(T, T) -> bool) -> usize {
  let mut best: Option<T> = None;
  let mut index = 0;
  for (i, a) in values.enumerate() {
    match best {
      Some(b) if b.is_nan() || !(a.is_nan() || pick(a, b)) => {},
      _ => {
        best = Some(a);
        index = i;
      },
    }
  }
  index
}

impl<T: Real> Tensor<T> {
  pub fn unary(&self, op: UnaryOp) -> Self {
    match op {
      UnaryOp::Softmax => self.softmax(),
      op => self.vectorize(move |a| op.apply(a) ),
    }
  }

  pub fn binary(&self, rhs: &Self, op: BinaryOp) -> Result<Self> {
    self.zip(rhs, move |a, b| op.apply(a, b) )
  }

  /// Normalized exponentials along the last axis.

  pub fn softmax(&self) -> Self {
    let data = self.to_vec();
    let width = self.dims()[self.rank() - 1];
    if width == 0 { return self.detach() }
    let data = data.chunks(width)
      .flat_map(|row| {
        let max = extreme(row, |a, b| a > b );
        let exp: Vec<T> = row.iter().map(|&a| (a - max).exp() ).collect();
        let total = sum(&exp);
        exp.into_iter().map(move |e| e / total )
      })
      .collect();
    Self::new(self.dims(), data)
  }

  /// Reduce the tensor along `axis`.
  ///
  /// An axis of `-1` reduces all elements. Otherwise all axes from `axis` to the
  /// innermost one are reduced together, leaving the dims in front of `axis`.
  /// Index reductions don't accept `-1` and remove only `axis` itself.

  pub fn reduce(&self, op: ReduceOp, axis: isize) -> Result<Self> {
    if op.is_index() && axis == -1 {
      return Err(Error::Shape(format!("{op} needs an explicit axis")))
    }
    match op {
      ReduceOp::Sum => self.collapse(axis, sum),
      ReduceOp::Mean => self.collapse(axis, mean),
      ReduceOp::Max => self.collapse(axis, |values| extreme(values, |a, b| a > b )),
      ReduceOp::Min => self.collapse(axis, |values| extreme(values, |a, b| a < b )),
      ReduceOp::Var => self.collapse(axis, variance),
      ReduceOp::Std => self.collapse(axis, |values| variance(values).sqrt() ),
      ReduceOp::ArgMax => self.collapse_only(axis, |values| position(values, |a, b| a > b )),
      ReduceOp::ArgMin => self.collapse_only(axis, |values| position(values, |a, b| a < b )),
    }
  }

  pub fn sum(&self, axis: isize) -> Result<Self> {
    self.reduce(ReduceOp::Sum, axis)
  }

  pub fn mean(&self, axis: isize) -> Result<Self> {
    self.reduce(ReduceOp::Mean, axis)
  }

  fn collapse<F>(&self, axis: isize, cb: F) -> Result<Self>
  where
    F: Fn(&[T]) -> T,
  {
    let data = self.to_vec();
    if axis == -1 {
      return Ok(Self::new(&[1], vec![cb(&data)]))
    }
    let axis = self.check_axis(axis)?;
    let outer: usize = self.dims()[..axis].iter().product();
    let inner: usize = self.dims()[axis..].iter().product();
    let data = (0..outer)
      .map(|o| cb(&data[o * inner..(o + 1) * inner]) )
      .collect();
    Ok(Self::new(&collapsed(&self.dims()[..axis]), data))
  }

  fn collapse_only<F>(&self, axis: isize, cb: F) -> Result<Self>
  where
    F: Fn(&mut dyn Iterator<Item=T>) -> usize,
  {
    let axis = self.check_axis(axis)?;
    let dims = self.dims();
    let len = dims[axis];
    if len == 0 {
      return Err(Error::Shape(format!("cannot take an index over empty axis {axis} of {}", self.shape())))
    }
    let outer: usize = dims[..axis].iter().product();
    let inner: usize = dims[axis + 1..].iter().product();
    let source = self.to_vec();
    let mut data = Vec::with_capacity(outer * inner);
    for o in 0..outer {
      for i in 0..inner {
        let mut lane = (0..len).map(|k| source[(o * len + k) * inner + i] );
        data.push(T::from_usize(cb(&mut lane)));
      }
    }
    let remaining: Vec<usize> = dims.iter()
      .enumerate()
      .filter(|&(d, _)| d != axis )
      .map(|(_, &n)| n )
      .collect();
    Ok(Self::new(&collapsed(&remaining), data))
  }

  fn check_axis(&self, axis: isize) -> Result<usize> {
    if axis < 0 || axis as usize >= self.rank() {
      return Err(Error::Shape(format!("axis {axis} out of range for {}", self.shape())))
    }
    Ok(axis as usize)
  }

  /// Compare a prediction with a target of the same dims.

  pub fn loss(&self, target: &Self, op: LossOp) -> Result<Self> {
    let value = match op {
      LossOp::MeanSquared => {
        let diff = self.zip(target, |p, t| (p - t) * (p - t) )?;
        mean(&diff.to_vec())
      },
      LossOp::MeanAbsolute => {
        let diff = self.zip(target, |p, t| (p - t).abs() )?;
        mean(&diff.to_vec())
      },
      LossOp::CrossEntropy => {
        let rows = if self.rank() > 1 { self.dims()[0] } else { 1 };
        let terms = self.zip(target, |p, t| t * p.ln() )?;
        -sum(&terms.to_vec()) / T::from_usize(rows)
      },
      LossOp::BinaryCrossEntropy => {
        let one = T::one();
        let terms = self.zip(target, move |p, t| t * p.ln() + (one - t) * (one - p).ln() )?;
        -mean(&terms.to_vec())
      },
    };
    Ok(Self::scalar(value))
  }
}
