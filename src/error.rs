use thiserror::Error;

use crate::backend::BackendError;


#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid usage count {0}: expected a positive count or unlimited")]
  InvalidUsageCount(i64),
  #[error("operand `{0}` is already live")]
  DuplicateName(String),
  #[error("{}", describe_missing(.0))]
  OperandNotFound(String),
  #[error("shape error: {0}")]
  Shape(String),
  #[error("cannot extend usage of `{name}` by {count}")]
  InvalidUsageExtension { name: String, count: u32 },
  #[error("expected {expected} operands, got {actual}")]
  Arity { expected: usize, actual: usize },
  #[error(transparent)]
  Backend(#[from] BackendError),
  #[error("tensor codec error: {0}")]
  Codec(#[from] postcard::Error),
}

fn describe_missing(name: &str) -> String {
  if name.is_empty() {
    "anonymous operand queue is empty".to_string()
  } else {
    format!("operand `{name}` not found")
  }
}

pub type Result<T> = std::result::Result<T, Error>;
