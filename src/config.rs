use crate::constants;
use crate::spi_drv::{FrameFormat, WorkMode};

/// How long a master busy-wait may poll before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
  /// wait forever on a silent bus partner
  Never,
  /// give up after this many polls without progress
  Polls(u32),
}

impl Default for Timeout {
  fn default() -> Self {
    Timeout::Polls(constants::DEFAULT_POLL_LIMIT)
  }
}

#[derive(Debug, Clone, Copy)]
pub struct MasterConfig {
  pub work_mode: WorkMode,
  pub frame_format: FrameFormat,
  pub data_bit_length: u8,
  pub endian: u32,
  pub timeout: Timeout,
}

impl MasterConfig {
  pub fn new(work_mode: WorkMode, frame_format: FrameFormat, data_bit_length: u8) -> Self {
    MasterConfig {
      work_mode,
      frame_format,
      data_bit_length,
      endian: 0,
      timeout: Timeout::default(),
    }
  }

  pub fn endian(mut self, endian: u32) -> Self {
    self.endian = endian;
    self
  }

  pub fn timeout(mut self, timeout: Timeout) -> Self {
    self.timeout = timeout;
    self
  }
}

impl Default for MasterConfig {
  fn default() -> Self {
    MasterConfig::new(WorkMode::Mode0, FrameFormat::Standard, 8)
  }
}

#[derive(Debug, Clone, Copy)]
pub struct SlaveConfig {
  pub int_pin: u8,
  pub ready_pin: u8,
  pub dma_channel: u8,
  pub data_bit_length: u8,
  pub irq: u32,
  pub irq_priority: u32,
  pub edge_priority: u32,
}

impl SlaveConfig {
  pub fn new(int_pin: u8, ready_pin: u8, dma_channel: u8, data_bit_length: u8) -> Self {
    SlaveConfig {
      int_pin,
      ready_pin,
      dma_channel,
      data_bit_length,
      irq: constants::SLAVE_IRQ,
      irq_priority: constants::SLAVE_IRQ_PRIORITY,
      edge_priority: constants::SLAVE_EDGE_PRIORITY,
    }
  }

  /// bytes moved per fifo entry
  pub fn data_width(&self) -> u32 {
    u32::from(self.data_bit_length) / 8
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_timeout_is_bounded() {
    assert_eq!(Timeout::default(), Timeout::Polls(constants::DEFAULT_POLL_LIMIT));
    assert_eq!(MasterConfig::default().timeout, Timeout::default());
  }

  #[test]
  fn slave_data_width() {
    assert_eq!(SlaveConfig::new(0, 1, 2, 8).data_width(), 1);
    assert_eq!(SlaveConfig::new(0, 1, 2, 16).data_width(), 2);
    assert_eq!(SlaveConfig::new(0, 1, 2, 32).data_width(), 4);
  }
}
