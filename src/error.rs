//! Driver error types
//!
//! Misconfiguration is a programming error and panics. Only conditions a
//! correctly configured driver can still run into at runtime show up here.

use core::fmt;

pub type Result<T> = core::result::Result<T, Error>;

/// Master transfer errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
  /// A busy-wait on the FIFO or status register ran out of polls
  Timeout,
}

impl fmt::Display for Error {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Error::Timeout => write!(f, "spi transfer timed out"),
    }
  }
}

/// Completion code carried in a slave command descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorCode {
  None = 0,
  /// receive fifo held fewer units than the command declared
  RxShortfall = 1,
  /// transmit fifo was not drained by the remote master
  TxNotDrained = 2,
  /// dma channel did not report block completion
  DmaIncomplete = 3,
}

impl ErrorCode {
  pub fn code(self) -> u8 {
    self as u8
  }

  pub fn is_ok(self) -> bool {
    self == ErrorCode::None
  }
}

impl fmt::Display for ErrorCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      ErrorCode::None => "ok",
      ErrorCode::RxShortfall => "receive fifo underfilled",
      ErrorCode::TxNotDrained => "transmit fifo not drained",
      ErrorCode::DmaIncomplete => "dma block not complete",
    };
    write!(f, "{} ({})", s, self.code())
  }
}
