use serde::{ Serialize, Deserialize };
use thiserror::Error;

use crate::{
  broadcast,
  backend::{ Backend, Cpu },
  error::{ Error, Result },
  mode::{ Device, Mode },
  ops::{ Op, UnaryOp, BinaryOp, ReduceOp, LossOp },
  scalar::Real,
  store::{ OperandStore, Operand, Entry, Uses },
  tensor::Tensor,
};


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
  pub mode: Mode,
  /// Uses granted to instruction results that don't specify their own.
  pub output_uses: Uses,
}

impl Default for SessionConfig {
  fn default() -> Self {
    Self {
      mode: Mode::default(),
      output_uses: Uses::Limited(1),
    }
  }
}


/// A single operation together with the operands it consumes.
///
/// Empty input names resolve from the anonymous queue, an empty
/// output name appends the result to it.

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
  pub op: Op,
  pub inputs: Vec<String>,
  pub output: String,
  pub uses: Option<Uses>,
}

impl Instruction {
  pub fn new(op: Op, inputs: &[&str], output: &str) -> Self {
    Self {
      op,
      inputs: inputs.iter().map(|name| name.to_string() ).collect(),
      output: output.to_string(),
      uses: None,
    }
  }

  /// Override the number of uses granted to the result.

  pub fn uses(mut self, uses: Uses) -> Self {
    self.uses = Some(uses);
    self
  }
}


/// An instruction that didn't go through, tagged with its operation.

#[derive(Debug, Error)]
#[error("{op}: {source}")]
pub struct Failure {
  pub op: String,
  #[source]
  pub source: Error,
}


/// Explicit handle to an operand store and the backends executing on it.
///
/// Instructions either complete entirely or leave the store as it was.
/// The per-operation methods record failures instead of returning them,
/// so chained calls keep going after one of them failed.

#[derive(Debug)]
pub struct Session<T: Real = f64> {
  store: OperandStore<T>,
  config: SessionConfig,
  cpu: Cpu,
  accelerator: Option<Box<dyn Backend<T>>>,
  failures: Vec<Failure>,
}

impl<T: Real> Default for Session<T> {
  fn default() -> Self {
    Self::new(SessionConfig::default())
  }
}

impl<T: Real> Session<T> {
  pub fn new(config: SessionConfig) -> Self {
    Self {
      store: OperandStore::new(),
      config,
      cpu: Cpu,
      accelerator: None,
      failures: vec![],
    }
  }

  /// Register a backend to be used when the mode selects the accelerator.

  pub fn with_accelerator(mut self, backend: Box<dyn Backend<T>>) -> Self {
    log::debug!("registered accelerator backend `{}`", backend.name());
    self.accelerator = Some(backend);
    self
  }

  pub fn config(&self) -> &SessionConfig {
    &self.config
  }

  pub fn mode(&self) -> Mode {
    self.config.mode
  }

  pub fn set_mode(&mut self, mode: Mode) -> &mut Self {
    self.config.mode = mode;
    self
  }

  pub fn set_auto_detect(&mut self, enabled: bool) -> &mut Self {
    self.config.mode.auto_detect = enabled;
    self
  }

  pub fn set_compute(&mut self, device: Device) -> &mut Self {
    self.config.mode.compute = device;
    self
  }

  pub fn set_storage(&mut self, device: Device) -> &mut Self {
    self.config.mode.storage = device;
    self
  }

  /// Human readable summary of the compute environment.

  pub fn environment(&self) -> String {
    self.config.mode.summary(self.accelerator.as_ref().map(|backend| backend.name() ))
  }

  pub fn store(&self) -> &OperandStore<T> {
    &self.store
  }

  // Staging

  pub fn push(&mut self, tensor: Tensor<T>, name: &str, uses: Uses, broadcast: bool) -> Result<()> {
    self.store.push(tensor, name, uses, broadcast)
  }

  /// Append a single-use tensor to the anonymous queue.

  pub fn push_anonymous(&mut self, tensor: Tensor<T>) -> Result<()> {
    self.push(tensor, "", Uses::Limited(1), false)
  }

  pub fn push_named(&mut self, tensor: Tensor<T>, name: &str, uses: Uses) -> Result<()> {
    self.push(tensor, name, uses, false)
  }

  pub fn pop(&mut self, name: &str) -> Result<Tensor<T>> {
    self.store.consume(name)
  }

  pub fn peek(&self, name: &str) -> Option<&Entry<T>> {
    self.store.peek(name)
  }

  pub fn extend(&mut self, name: &str, additional: u32) -> Result<()> {
    self.store.extend(name, additional)
  }

  pub fn clear(&mut self) -> &mut Self {
    self.store.clear();
    self
  }

  pub fn queue_len(&self) -> usize {
    self.store.queue_len()
  }

  pub fn memory_len(&self) -> usize {
    self.store.memory_len()
  }

  // Execution

  /// Run an instruction to completion or not at all.

  pub fn execute(&mut self, instruction: &Instruction) -> std::result::Result<(), Failure> {
    self.dispatch(instruction).map_err(|source| Failure { op: instruction.op.to_string(), source })
  }

  /// Execute, recording a failure instead of returning it.
  ///
  /// Recorded failures pile up until drained with [take_failures](Self::take_failures).

  pub fn run(&mut self, instruction: Instruction) -> &mut Self {
    if let Err(failure) = self.execute(&instruction) {
      log::error!("{failure}");
      self.failures.push(failure);
    }
    self
  }

  /// Failures recorded so far, oldest first.

  pub fn failures(&self) -> &[Failure] {
    &self.failures
  }

  /// Drain the recorded failures, leaving the list empty.

  pub fn take_failures(&mut self) -> Vec<Failure> {
    std::mem::take(&mut self.failures)
  }

  fn dispatch(&mut self, instruction: &Instruction) -> Result<()> {
    let Instruction { op, inputs, output, uses } = instruction;
    if inputs.len() != op.arity() {
      return Err(Error::Arity { expected: op.arity(), actual: inputs.len() })
    }
    let uses = uses.unwrap_or(self.config.output_uses).validate()?;
    let backend = select(&self.config.mode, &self.cpu, self.accelerator.as_deref());
    log::debug!("{op}: inputs {inputs:?} -> `{output}` on {}", backend.name());

    let mut claim = self.store.claim();
    let operands = inputs.iter()
      .map(|name| claim.take(name) )
      .collect::<Result<Vec<_>>>()?;
    let result = invoke(backend, op, &operands)?;
    if claim.is_live_after(output) {
      return Err(Error::DuplicateName(output.clone()))
    }
    claim.commit();

    self.store.push(result, output, uses, false)
  }
}

fn select<'a, T: Real>(mode: &Mode, cpu: &'a Cpu, accelerator: Option<&'a dyn Backend<T>>) -> &'a dyn Backend<T> {
  match (mode.select(accelerator.is_some()), accelerator) {
    (Device::Accelerator, Some(backend)) => backend,
    _ => cpu,
  }
}

fn invoke<T: Real>(backend: &dyn Backend<T>, op: &Op, operands: &[Operand<T>]) -> Result<Tensor<T>> {
  match (op, operands) {
    (Op::Unary(op), [input]) => backend.unary(*op, &input.tensor),
    (Op::Binary(op), [lhs, rhs]) => {
      let (lhs, rhs) = broadcast::reconcile(lhs, rhs)?;
      backend.binary(*op, &lhs, &rhs)
    },
    (Op::Reduce(op, axis), [input]) => backend.reduce(*op, &input.tensor, *axis),
    (Op::Loss(op), [prediction, target]) => {
      let (prediction, target) = broadcast::reconcile(prediction, target)?;
      backend.loss(*op, &prediction, &target)
    },
    (Op::Dot, [lhs, rhs]) => {
      broadcast::contraction(lhs.tensor.shape(), rhs.tensor.shape())?;
      backend.dot(&lhs.tensor, &rhs.tensor)
    },
    (Op::Affine, [input, weights, bias]) => {
      broadcast::contraction(input.tensor.shape(), weights.tensor.shape())?;
      let product = Operand::new(backend.dot(&input.tensor, &weights.tensor)?, false);
      let (product, bias) = broadcast::reconcile(&product, bias)?;
      backend.binary(BinaryOp::Add, &product, &bias)
    },
    (Op::Reshape(dims), [input]) => input.tensor.reshape(dims),
    (Op::Flatten, [input]) => Ok(input.tensor.flatten()),
    (Op::Transpose, [input]) => input.tensor.transpose(),
    (op, operands) => Err(Error::Arity { expected: op.arity(), actual: operands.len() }),
  }
}


macro_rules! unary_instructions {
  ($($meth:ident => $op:ident),* $(,)?) => {
    impl<T: Real> Session<T> {
      $(
        pub fn $meth(&mut self, input: &str, output: &str) -> &mut Self {
          self.run(Instruction::new(Op::Unary(UnaryOp::$op), &[input], output))
        }
      )*
    }
  };
}

macro_rules! binary_instructions {
  ($($meth:ident => $op:ident),* $(,)?) => {
    impl<T: Real> Session<T> {
      $(
        pub fn $meth(&mut self, lhs: &str, rhs: &str, output: &str) -> &mut Self {
          self.run(Instruction::new(Op::Binary(BinaryOp::$op), &[lhs, rhs], output))
        }
      )*
    }
  };
}

macro_rules! reduce_instructions {
  ($($meth:ident => $op:ident),* $(,)?) => {
    impl<T: Real> Session<T> {
      $(
        pub fn $meth(&mut self, input: &str, axis: isize, output: &str) -> &mut Self {
          self.run(Instruction::new(Op::Reduce(ReduceOp::$op, axis), &[input], output))
        }
      )*
    }
  };
}

macro_rules! loss_instructions {
  ($($meth:ident => $op:ident),* $(,)?) => {
    impl<T: Real> Session<T> {
      $(
        pub fn $meth(&mut self, prediction: &str, target: &str, output: &str) -> &mut Self {
          self.run(Instruction::new(Op::Loss(LossOp::$op), &[prediction, target], output))
        }
      )*
    }
  };
}

unary_instructions! {
  neg => Neg, abs => Abs, sign => Sign, sqrt => Sqrt, square => Square,
  exp => Exp, log => Log, sin => Sin, cos => Cos, tan => Tan,
  floor => Floor, ceil => Ceil, round => Round, reciprocal => Reciprocal, not => Not,
  relu => Relu, leaky_relu => LeakyRelu, elu => Elu, selu => Selu, gelu => Gelu,
  sigmoid => Sigmoid, tanh => Tanh, softplus => Softplus, softsign => Softsign,
  swish => Swish, softmax => Softmax,
}

binary_instructions! {
  add => Add, sub => Sub, mul => Mul, div => Div, pow => Pow, rem => Rem,
  maximum => Maximum, minimum => Minimum,
  equal => Equal, not_equal => NotEqual, less => Less, less_equal => LessEqual,
  greater => Greater, greater_equal => GreaterEqual,
  and => And, or => Or, xor => Xor,
}

reduce_instructions! {
  sum => Sum, mean => Mean, max => Max, min => Min, var => Var, std => Std,
  argmax => ArgMax, argmin => ArgMin,
}

loss_instructions! {
  mse => MeanSquared, mae => MeanAbsolute,
  cross_entropy => CrossEntropy, binary_cross_entropy => BinaryCrossEntropy,
}

impl<T: Real> Session<T> {
  pub fn dot(&mut self, lhs: &str, rhs: &str, output: &str) -> &mut Self {
    self.run(Instruction::new(Op::Dot, &[lhs, rhs], output))
  }

  pub fn affine(&mut self, input: &str, weights: &str, bias: &str, output: &str) -> &mut Self {
    self.run(Instruction::new(Op::Affine, &[input, weights, bias], output))
  }

  pub fn reshape(&mut self, input: &str, dims: &[usize], output: &str) -> &mut Self {
    self.run(Instruction::new(Op::Reshape(dims.to_vec()), &[input], output))
  }

  pub fn flatten(&mut self, input: &str, output: &str) -> &mut Self {
    self.run(Instruction::new(Op::Flatten, &[input], output))
  }

  pub fn transpose(&mut self, input: &str, output: &str) -> &mut Self {
    self.run(Instruction::new(Op::Transpose, &[input], output))
  }
}
