//! Instruction-driven tensor computation over a store of staged operands.
//!
//! # Features
//!
//! - **Operand store** — Tensors get staged either anonymously, lining up in
//! a queue, or under a name. Each one carries a number of uses, limited or
//! unlimited, and disappears once they are spent.
//!
//! - **All or nothing** — An instruction resolves its inputs, computes and
//! publishes its result, or leaves the store exactly as it found it.
//!
//! - **Explicit broadcasting** — Operands of differing shape only combine
//! if one of them was staged as broadcastable.
//!
//! - **Pluggable backends** — Kernels run on the host by default. An
//! accelerator can be registered and gets selected by the session [Mode].
//!
//! # Examples
//!
//! ```
//! use tensorqueue::{ Session, Tensor, Uses };
//!
//! let mut session: Session = Session::default();
//!
//! // Stage a matrix, a row of weights and a broadcastable bias
//! session.push(Tensor::arrange(&[2, 3], 1.0, 1.0), "x", Uses::Limited(1), false).unwrap();
//! session.push(Tensor::vec(&[1.0, 0.0, -1.0]), "w", Uses::Limited(1), true).unwrap();
//! session.push(Tensor::scalar(0.5), "b", Uses::Unlimited, true).unwrap();
//!
//! session
//!   .mul("x", "w", "")
//!   .sum("", 0, "")
//!   .add("", "b", "y");
//!
//! assert!(session.failures().is_empty());
//! assert_eq!(session.pop("y").unwrap().item(), Some(-3.5));
//! ```
//!
//! Failed instructions are recorded and leave the store untouched:
//! ```
//! use tensorqueue::{ Session, Tensor, Error };
//!
//! let mut session: Session<f32> = Session::default();
//! session.push_anonymous(Tensor::zeros(&[2, 3])).unwrap();
//! session.push_anonymous(Tensor::zeros(&[3, 2])).unwrap();
//!
//! session.add("", "", "");
//! assert!(matches!(session.failures()[0].source, Error::Shape(_)));
//! assert_eq!(session.queue_len(), 2);
//! ```
//!
//! ## More examples
//! Check the `/demos` folder for more example code.
//!
//!
//! # Optional features
//!
//! Some features can be toggled in your `Cargo.toml`.
//!
//! - `unsafe` *(default)* — Accelerated matrix math using [matrixmultiply] crate.
//! - `rayon` — Multi-threaded element-wise kernels.

mod internal;
mod shape;
mod tensor;
mod error;
mod store;
mod mode;
mod session;

pub mod ops;
pub mod scalar;
pub mod broadcast;
pub mod backend;

pub use shape::Shape;
pub use tensor::Tensor;
pub use error::{ Error, Result };
pub use store::{ OperandStore, Claim, Entry, Operand, Uses };
pub use mode::{ Mode, Device };
pub use session::{ Session, SessionConfig, Instruction, Failure };
pub use backend::{ Backend, BackendError, Cpu };
pub use ops::{ Op, UnaryOp, BinaryOp, ReduceOp, LossOp };
