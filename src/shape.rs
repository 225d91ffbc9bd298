use serde::{ Serialize, Deserialize };


/// The shape of a [Tensor](crate::Tensor).
///
/// Besides the logical dimensions, a shape carries strides and an offset
/// into the tensor's buffer, which lets broadcasted and transposed
/// tensors share storage with the tensor they were derived from.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
  pub dims: Vec<usize>,
  pub(crate) strides: Vec<isize>,
  pub(crate) offset: usize,
}

impl Shape {
  pub fn new(dims: &[usize]) -> Self {
    let strides = Self::make_strides(dims);
    Self {
      dims: dims.to_vec(),
      strides,
      offset: 0,
    }
  }

  fn make_strides(dims: &[usize]) -> Vec<isize> {
    if dims.len() == 0 { return vec![] }
    let mut strides = vec![0; dims.len()];
    strides[dims.len() - 1] = 1;
    for i in (1..dims.len()).rev() {
      strides[i - 1] = dims[i] as isize * strides[i];
    }
    strides
  }

  pub fn size(&self) -> usize {
    self.dims.iter().product()
  }

  pub fn rank(&self) -> usize {
    self.dims.len()
  }

  pub fn contiguous(&self) -> bool {
    self.strides == Self::make_strides(&self.dims)
  }

  /// Buffer indices in logical (row major) order.

  pub fn iter(&self) -> Box<dyn Iterator<Item=usize> + '_> {
    if self.size() == 0 {
      Box::new(std::iter::empty())
    } else if self.contiguous() {
      Box::new(self.offset..self.offset + self.size())
    } else {
      Box::new(ShapeIterator::new(self))
    }
  }

  /// Check whether this shape can be expanded to `dims`, aligning trailing dimensions.

  pub fn broadcastable_to(&self, dims: &[usize]) -> bool {
    if self.size() == 1 { return true }
    self.rank() <= dims.len() && self.dims.iter()
      .rev()
      .zip(dims.iter().rev())
      .all(|(&a, &b)| a == b || a == 1 )
  }

  /// View of this shape expanded to `dims`.
  ///
  /// Expanded dimensions get a stride of zero, so no data is copied.

  pub fn broadcast(&self, dims: &[usize]) -> Option<Self> {
    if !self.broadcastable_to(dims) { return None }
    let mut strides = vec![0; dims.len()];
    if self.size() != 1 {
      self.dims.iter()
        .rev()
        .zip(self.strides.iter().rev())
        .zip(strides.iter_mut().rev())
        .for_each(|((&n, &stride), out)| {
          *out = if n == 1 { 0 } else { stride };
        });
    }
    // Single elements may sit anywhere in the buffer
    let offset = self.iter().next().unwrap_or(self.offset);
    Some(Self { dims: dims.to_vec(), strides, offset })
  }

  pub fn transpose(&self, dim1: usize, dim2: usize) -> Self {
    let mut shape = self.clone();
    shape.dims.swap(dim1, dim2);
    shape.strides.swap(dim1, dim2);
    shape
  }
}

impl std::ops::Index<usize> for Shape {
  type Output = usize;

  fn index(&self, i: usize) -> &usize {
    &self.dims[i]
  }
}

impl std::fmt::Display for Shape {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(f, "Shape{:?}", self.dims)
  }
}


/// Iterate through a [Shape]'s indices.

pub struct ShapeIterator<'a> {
  shape: &'a Shape,
  counter: Vec<usize>,
  idx: isize,
  finished: bool,
}

impl<'a> ShapeIterator<'a> {
  fn new(shape: &'a Shape) -> Self {
    Self {
      counter: vec![0; shape.rank()],
      idx: shape.offset as isize,
      shape,
      finished: shape.rank() == 0,
    }
  }
}

impl<'a> Iterator for ShapeIterator<'a> {
  type Item = usize;

  fn next(&mut self) -> Option<Self::Item> {
    if self.finished { return None }
    let out = self.idx as usize;
    let len = self.counter.len();
    // Walk backward through dimensions
    for cd in (0..len).rev() {
      // Increment counter on full turn of right hand dimension
      if cd == len - 1 || self.counter[cd + 1] == 0 {
        let count = &mut self.counter[cd];
        // Full turn?
        if *count == self.shape.dims[cd] - 1 {
          if cd == 0 { self.finished = true; break }
          *count = 0;
          let backstride = (self.shape.dims[cd] as isize - 1) * self.shape.strides[cd];
          self.idx -= backstride;
        } else {
          *count += 1;
          self.idx += self.shape.strides[cd];
        }
      } else {
        break
      }
    }
    Some(out)
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn strides() {
    let shape = Shape::new(&[3,2,2]);
    assert_eq!(shape.strides, vec![4,2,1]);

    let shape = Shape::new(&[2,3,2]);
    assert_eq!(shape.strides, vec![6,2,1]);
  }

  #[test]
  fn broadcastable() {
    let target = [3, 4];
    assert!(Shape::new(&[1]).broadcastable_to(&target));
    assert!(Shape::new(&[4]).broadcastable_to(&target));
    assert!(Shape::new(&[1,4]).broadcastable_to(&target));
    assert!(Shape::new(&[3,1]).broadcastable_to(&target));
    assert!(!Shape::new(&[3]).broadcastable_to(&target));
    assert!(!Shape::new(&[2,3,4]).broadcastable_to(&target));
  }

  #[test]
  fn broadcast() {
    let shape = Shape::new(&[3]).broadcast(&[2,3]).unwrap();
    assert_eq!(shape.dims, vec![2,3]);
    assert_eq!(shape.strides, vec![0,1]);
    let indices: Vec<_> = shape.iter().collect();
    assert_eq!(indices, vec![0, 1, 2, 0, 1, 2]);

    let shape = Shape::new(&[2,1]).broadcast(&[2,3]).unwrap();
    assert_eq!(shape.strides, vec![1,0]);
    let indices: Vec<_> = shape.iter().collect();
    assert_eq!(indices, vec![0, 0, 0, 1, 1, 1]);

    assert_eq!(Shape::new(&[2]).broadcast(&[2,3]), None);
  }

  #[test]
  fn broadcast_scalar() {
    let shape = Shape::new(&[1,1]).broadcast(&[2,2]).unwrap();
    assert_eq!(shape.strides, vec![0,0]);
    assert_eq!(shape.iter().collect::<Vec<_>>(), vec![0, 0, 0, 0]);
  }

  #[test]
  fn iterate_transposed() {
    let shape = Shape::new(&[2,3]).transpose(0, 1);
    assert_eq!(shape.dims, vec![3,2]);
    let indices: Vec<_> = shape.iter().collect();
    assert_eq!(indices, vec![0, 3, 1, 4, 2, 5]);
  }

  #[test]
  fn empty() {
    let shape = Shape::new(&[2,0,3]);
    assert_eq!(shape.size(), 0);
    assert_eq!(shape.iter().count(), 0);
  }
}
