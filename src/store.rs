//! Staged tensors and their lifetimes.
//!
//! The [OperandStore] is part queue, part map. Tensors staged without a name
//! line up in insertion order and are resolved front first. Named tensors are
//! looked up directly. Either kind carries a number of remaining [Uses] and
//! leaves the store when the last one is consumed.
//!
//! Instructions don't consume operands directly. They open a [Claim], resolve
//! all inputs through it and only [commit](Claim::commit) once the whole
//! instruction went through. A dropped claim leaves the store untouched.

use std::collections::{ HashMap, VecDeque };

use serde::{ Serialize, Deserialize };

use crate::{
  error::{ Error, Result },
  scalar::Real,
  tensor::Tensor,
};


/// How often an entry may still be resolved.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Uses {
  Limited(u32),
  Unlimited,
}

impl Uses {
  /// Count used to signal [Uses::Unlimited] in integer form.
  pub const UNLIMITED: i64 = -1;

  pub fn from_count(count: i64) -> Result<Self> {
    match count {
      Self::UNLIMITED => Ok(Self::Unlimited),
      n if n > 0 && n <= u32::MAX as i64 => Ok(Self::Limited(n as u32)),
      n => Err(Error::InvalidUsageCount(n)),
    }
  }

  pub fn validate(self) -> Result<Self> {
    match self {
      Self::Limited(0) => Err(Error::InvalidUsageCount(0)),
      uses => Ok(uses),
    }
  }

  /// Whether this many uses survive `taken` more resolutions.

  fn outlives(self, taken: u32) -> bool {
    match self {
      Self::Limited(n) => n > taken,
      Self::Unlimited => true,
    }
  }
}

impl Default for Uses {
  fn default() -> Self {
    Self::Limited(1)
  }
}


/// A staged tensor.

#[derive(Debug, Clone)]
pub struct Entry<T: Real> {
  pub tensor: Tensor<T>,
  pub name: String,
  pub uses: Uses,
  pub broadcast: bool,
}


/// A resolved instruction input.

#[derive(Debug, Clone, PartialEq)]
pub struct Operand<T: Real> {
  pub tensor: Tensor<T>,
  pub broadcast: bool,
}

impl<T: Real> Operand<T> {
  pub fn new(tensor: Tensor<T>, broadcast: bool) -> Self {
    Self { tensor, broadcast }
  }
}

impl<T: Real> From<&Entry<T>> for Operand<T> {
  fn from(entry: &Entry<T>) -> Self {
    Self::new(entry.tensor.clone(), entry.broadcast)
  }
}


#[derive(Debug, Clone)]
pub struct OperandStore<T: Real> {
  queue: VecDeque<Entry<T>>,
  memory: HashMap<String, Entry<T>>,
}

impl<T: Real> Default for OperandStore<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: Real> OperandStore<T> {
  pub fn new() -> Self {
    Self {
      queue: VecDeque::new(),
      memory: HashMap::new(),
    }
  }

  /// Stage a tensor. An empty `name` appends it to the anonymous queue.
  ///
  /// Fails without touching the store if `uses` is zero or
  /// `name` already belongs to a live entry.

  pub fn push(&mut self, tensor: Tensor<T>, name: &str, uses: Uses, broadcast: bool) -> Result<()> {
    let uses = uses.validate()?;
    if self.is_live(name) {
      return Err(Error::DuplicateName(name.to_string()))
    }
    log::trace!("push `{name}` {} uses={uses:?} broadcast={broadcast}", tensor.shape());
    let entry = Entry { tensor, name: name.to_string(), uses, broadcast };
    if name.is_empty() {
      self.queue.push_back(entry);
    } else {
      self.memory.insert(name.to_string(), entry);
    }
    Ok(())
  }

  /// Resolve a single operand and consume one of its uses.

  pub fn consume(&mut self, name: &str) -> Result<Tensor<T>> {
    let mut claim = self.claim();
    let operand = claim.take(name)?;
    claim.commit();
    Ok(operand.tensor)
  }

  pub fn claim(&mut self) -> Claim<'_, T> {
    Claim {
      store: self,
      front: 0,
      front_taken: 0,
      named: HashMap::new(),
    }
  }

  /// Grant a named entry additional uses. Unlimited entries stay unlimited.

  pub fn extend(&mut self, name: &str, additional: u32) -> Result<()> {
    let invalid = || Error::InvalidUsageExtension { name: name.to_string(), count: additional };
    if additional == 0 { return Err(invalid()) }
    let entry = self.memory.get_mut(name).ok_or_else(invalid)?;
    if let Uses::Limited(n) = entry.uses {
      entry.uses = Uses::Limited(n.checked_add(additional).ok_or_else(invalid)?);
    }
    log::trace!("extend `{name}` by {additional}, now {:?}", entry.uses);
    Ok(())
  }

  /// The entry `name` would currently resolve to, without consuming it.

  pub fn peek(&self, name: &str) -> Option<&Entry<T>> {
    if name.is_empty() {
      self.queue.front()
    } else {
      self.memory.get(name)
    }
  }

  pub fn is_live(&self, name: &str) -> bool {
    !name.is_empty() && self.memory.contains_key(name)
  }

  /// Drop every entry, including unlimited ones.

  pub fn clear(&mut self) {
    log::trace!("clear {} queued, {} named", self.queue.len(), self.memory.len());
    self.queue.clear();
    self.memory.clear();
  }

  /// Number of anonymous entries.

  pub fn queue_len(&self) -> usize {
    self.queue.len()
  }

  /// Number of named entries.

  pub fn memory_len(&self) -> usize {
    self.memory.len()
  }
}


/// Pending consumption of operands from an [OperandStore].
///
/// Resolution inside a claim sees the store as if every previous
/// [take](Claim::take) had already been applied. Nothing changes in the
/// store until [commit](Claim::commit) is called.

#[must_use]
pub struct Claim<'a, T: Real> {
  store: &'a mut OperandStore<T>,
  // Anonymous entries used up entirely
  front: usize,
  // Uses taken from the first anonymous entry still standing
  front_taken: u32,
  named: HashMap<String, u32>,
}

impl<'a, T: Real> Claim<'a, T> {
  pub fn take(&mut self, name: &str) -> Result<Operand<T>> {
    let missing = || Error::OperandNotFound(name.to_string());
    if name.is_empty() {
      let entry = self.store.queue.get(self.front).ok_or_else(missing)?;
      if let Uses::Limited(n) = entry.uses {
        self.front_taken += 1;
        if self.front_taken == n {
          self.front += 1;
          self.front_taken = 0;
        }
      }
      Ok(entry.into())
    } else {
      let entry = self.store.memory.get(name).ok_or_else(missing)?;
      let taken = self.named.entry(name.to_string()).or_insert(0);
      if !entry.uses.outlives(*taken) {
        return Err(missing())
      }
      *taken += 1;
      Ok(entry.into())
    }
  }

  /// Whether `name` still refers to a live entry once this claim is committed.

  pub fn is_live_after(&self, name: &str) -> bool {
    match self.store.memory.get(name) {
      Some(entry) => entry.uses.outlives(self.named.get(name).copied().unwrap_or(0)),
      None => false,
    }
  }

  /// Apply all consumption, evicting entries without remaining uses.

  pub fn commit(self) {
    let store = self.store;
    store.queue.drain(..self.front);
    if self.front_taken > 0 {
      if let Some(entry) = store.queue.front_mut() {
        if let Uses::Limited(n) = entry.uses {
          entry.uses = Uses::Limited(n - self.front_taken);
        }
      }
    }
    for (name, taken) in self.named {
      let exhausted = match store.memory.get_mut(&name) {
        Some(Entry { uses: Uses::Limited(n), .. }) if *n <= taken => true,
        Some(Entry { uses: Uses::Limited(n), .. }) => {
          *n -= taken;
          false
        },
        _ => false,
      };
      if exhausted {
        log::trace!("evict `{name}`");
        store.memory.remove(&name);
      }
    }
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  fn store() -> OperandStore<f64> {
    OperandStore::new()
  }

  #[test]
  fn push_and_resolve() {
    let mut s = store();
    let x = Tensor::arrange(&[2,2], 1.0, 1.0);
    s.push(x.clone(), "x", Uses::Limited(1), false).unwrap();
    assert_eq!(s.memory_len(), 1);
    assert_eq!(s.consume("x").unwrap(), x);
    assert_eq!(s.memory_len(), 0);
  }

  #[test]
  fn usage_counts() {
    assert_eq!(Uses::from_count(-1).unwrap(), Uses::Unlimited);
    assert_eq!(Uses::from_count(3).unwrap(), Uses::Limited(3));
    assert!(matches!(Uses::from_count(0), Err(Error::InvalidUsageCount(0))));
    assert!(matches!(Uses::from_count(-2), Err(Error::InvalidUsageCount(-2))));

    let mut s = store();
    let res = s.push(Tensor::scalar(1.0), "x", Uses::Limited(0), false);
    assert!(matches!(res, Err(Error::InvalidUsageCount(0))));
    assert_eq!(s.memory_len(), 0);
  }

  #[test]
  fn duplicate_name() {
    let mut s = store();
    s.push(Tensor::scalar(1.0), "x", Uses::Limited(2), false).unwrap();
    let res = s.push(Tensor::scalar(2.0), "x", Uses::Unlimited, true);
    assert!(matches!(res, Err(Error::DuplicateName(ref name)) if name == "x"));
    let entry = s.peek("x").unwrap();
    assert_eq!(entry.tensor, Tensor::scalar(1.0));
    assert_eq!(entry.uses, Uses::Limited(2));
    assert!(!entry.broadcast);
    assert_eq!(s.memory_len(), 1);
  }

  #[test]
  fn name_reusable_after_eviction() {
    let mut s = store();
    s.push(Tensor::scalar(1.0), "x", Uses::Limited(1), false).unwrap();
    s.consume("x").unwrap();
    s.push(Tensor::scalar(2.0), "x", Uses::Limited(1), false).unwrap();
    assert_eq!(s.consume("x").unwrap(), Tensor::scalar(2.0));
  }

  #[test]
  fn limited_uses() {
    let mut s = store();
    s.push(Tensor::scalar(4.0), "x", Uses::Limited(3), false).unwrap();
    for _ in 0..3 {
      assert_eq!(s.consume("x").unwrap(), Tensor::scalar(4.0));
    }
    assert!(matches!(s.consume("x"), Err(Error::OperandNotFound(_))));
  }

  #[test]
  fn unlimited_uses() {
    let mut s = store();
    s.push(Tensor::scalar(4.0), "x", Uses::Unlimited, false).unwrap();
    for _ in 0..10_000 {
      assert_eq!(s.consume("x").unwrap(), Tensor::scalar(4.0));
    }
    assert_eq!(s.memory_len(), 1);
  }

  #[test]
  fn fifo() {
    let mut s = store();
    s.push(Tensor::scalar(1.0), "", Uses::Limited(1), false).unwrap();
    s.push(Tensor::scalar(2.0), "", Uses::Limited(1), false).unwrap();
    assert_eq!(s.queue_len(), 2);
    assert_eq!(s.consume("").unwrap(), Tensor::scalar(1.0));
    assert_eq!(s.consume("").unwrap(), Tensor::scalar(2.0));
    assert!(matches!(s.consume(""), Err(Error::OperandNotFound(ref name)) if name.is_empty()));
  }

  #[test]
  fn anonymous_unlimited_stays_in_front() {
    let mut s = store();
    s.push(Tensor::scalar(1.0), "", Uses::Unlimited, false).unwrap();
    s.push(Tensor::scalar(2.0), "", Uses::Limited(1), false).unwrap();
    for _ in 0..5 {
      assert_eq!(s.consume("").unwrap(), Tensor::scalar(1.0));
    }
    assert_eq!(s.queue_len(), 2);
  }

  #[test]
  fn anonymous_limited_stays_until_exhausted() {
    let mut s = store();
    s.push(Tensor::scalar(1.0), "", Uses::Limited(2), false).unwrap();
    s.push(Tensor::scalar(2.0), "", Uses::Limited(1), false).unwrap();
    assert_eq!(s.consume("").unwrap(), Tensor::scalar(1.0));
    assert_eq!(s.peek("").unwrap().uses, Uses::Limited(1));
    assert_eq!(s.consume("").unwrap(), Tensor::scalar(1.0));
    assert_eq!(s.consume("").unwrap(), Tensor::scalar(2.0));
    assert_eq!(s.queue_len(), 0);
  }

  #[test]
  fn claim_sees_pending_consumption() {
    let mut s = store();
    s.push(Tensor::scalar(1.0), "", Uses::Limited(1), false).unwrap();
    s.push(Tensor::scalar(2.0), "", Uses::Limited(1), false).unwrap();
    s.push(Tensor::scalar(3.0), "x", Uses::Limited(1), false).unwrap();

    let mut claim = s.claim();
    assert_eq!(claim.take("").unwrap().tensor, Tensor::scalar(1.0));
    assert_eq!(claim.take("").unwrap().tensor, Tensor::scalar(2.0));
    assert!(claim.take("").is_err());
    assert!(claim.take("x").is_ok());
    assert!(!claim.is_live_after("x"));
    assert!(claim.take("x").is_err());
    claim.commit();

    assert_eq!(s.queue_len(), 0);
    assert_eq!(s.memory_len(), 0);
  }

  #[test]
  fn dropped_claim_changes_nothing() {
    let mut s = store();
    s.push(Tensor::scalar(1.0), "", Uses::Limited(1), false).unwrap();
    s.push(Tensor::scalar(3.0), "x", Uses::Limited(2), false).unwrap();
    {
      let mut claim = s.claim();
      claim.take("").unwrap();
      claim.take("x").unwrap();
      claim.take("x").unwrap();
      assert!(claim.take("missing").is_err());
    }
    assert_eq!(s.queue_len(), 1);
    assert_eq!(s.peek("x").unwrap().uses, Uses::Limited(2));
  }

  #[test]
  fn extend() {
    let mut s = store();
    s.push(Tensor::scalar(1.0), "x", Uses::Limited(1), false).unwrap();
    s.extend("x", 2).unwrap();
    assert_eq!(s.peek("x").unwrap().uses, Uses::Limited(3));
    assert!(matches!(s.extend("x", 0), Err(Error::InvalidUsageExtension { .. })));
    assert!(matches!(s.extend("y", 1), Err(Error::InvalidUsageExtension { .. })));
    assert!(matches!(s.extend("", 1), Err(Error::InvalidUsageExtension { .. })));
    for _ in 0..3 { s.consume("x").unwrap(); }
    assert!(s.consume("x").is_err());

    s.push(Tensor::scalar(1.0), "u", Uses::Unlimited, false).unwrap();
    s.extend("u", 5).unwrap();
    assert_eq!(s.peek("u").unwrap().uses, Uses::Unlimited);
  }

  #[test]
  fn clear() {
    let mut s = store();
    s.push(Tensor::scalar(1.0), "", Uses::Unlimited, false).unwrap();
    s.push(Tensor::scalar(1.0), "x", Uses::Unlimited, false).unwrap();
    s.clear();
    assert_eq!(s.queue_len(), 0);
    assert_eq!(s.memory_len(), 0);
    assert!(matches!(s.consume(""), Err(Error::OperandNotFound(_))));
    assert!(matches!(s.consume("x"), Err(Error::OperandNotFound(_))));
  }

  #[test]
  fn stored_copy_is_independent() {
    let mut s = store();
    let mut x = Tensor::vec(&[1.0, 2.0]);
    s.push(x.clone(), "x", Uses::Limited(1), false).unwrap();
    x = x.unary(crate::ops::UnaryOp::Neg);
    assert_eq!(x, Tensor::vec(&[-1.0, -2.0]));
    assert_eq!(s.consume("x").unwrap(), Tensor::vec(&[1.0, 2.0]));
  }
}
