use std::fmt;

use serde::{ Serialize, Deserialize };


/// Where computation happens or buffers live.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Device {
  Host,
  Accelerator,
}

impl fmt::Display for Device {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Self::Host => write!(f, "host"),
      Self::Accelerator => write!(f, "accelerator"),
    }
  }
}


/// Compute and storage placement of a [Session](crate::Session).
///
/// Only decides which backend executes kernels. The operand store
/// behaves the same regardless.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mode {
  /// Use an accelerator whenever one is available.
  pub auto_detect: bool,
  pub compute: Device,
  pub storage: Device,
}

impl Default for Mode {
  fn default() -> Self {
    Self {
      auto_detect: true,
      compute: Device::Host,
      storage: Device::Host,
    }
  }
}

impl Mode {
  /// The device kernels actually run on, given whether an accelerator is present.

  pub fn select(&self, accelerator: bool) -> Device {
    let wanted = if self.auto_detect {
      if accelerator { Device::Accelerator } else { Device::Host }
    } else {
      self.compute
    };
    if wanted == Device::Accelerator && !accelerator {
      log::warn!("no accelerator available, computing on host");
      return Device::Host
    }
    wanted
  }

  /// Human readable description of the environment.

  pub fn summary(&self, accelerator: Option<&str>) -> String {
    let active = self.select(accelerator.is_some());
    format!(
      "auto-detect: {}, compute: {} (requested {}), storage: {}, accelerator: {}",
      if self.auto_detect { "on" } else { "off" },
      active,
      self.compute,
      self.storage,
      accelerator.unwrap_or("none"),
    )
  }
}
