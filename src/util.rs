use crate::config::Timeout;
use crate::error::{Error, Result};

/// Poll budget for one busy-wait.
///
/// The budget counts consecutive polls that made no progress; moving data
/// through the fifo refills it.
pub struct Deadline {
  limit: Option<u32>,
  remaining: u32,
}

impl Deadline {
  pub fn new(timeout: Timeout) -> Self {
    match timeout {
      Timeout::Never => Deadline { limit: None, remaining: 0 },
      Timeout::Polls(n) => Deadline { limit: Some(n), remaining: n },
    }
  }

  pub fn poll(&mut self) -> Result<()> {
    if self.limit.is_some() {
      if self.remaining == 0 {
        return Err(Error::Timeout);
      }
      self.remaining -= 1;
    }
    core::hint::spin_loop();
    Ok(())
  }

  pub fn progress(&mut self) {
    if let Some(n) = self.limit {
      self.remaining = n;
    }
  }
}

/// Semihosting log sink for cortex-m debug probes.
///
/// Only ARM targets get the sink and the probe check. Elsewhere, including
/// the K210 itself, `init` returns false and the board installs its own
/// `log` backend.
pub mod debugger {
  use log::{LevelFilter, Log, Metadata, Record};

  struct Semihosting;

  static LOGGER: Semihosting = Semihosting;

  impl Log for Semihosting {
    fn enabled(&self, _metadata: &Metadata) -> bool {
      true
    }

    fn log(&self, record: &Record) {
      write(record);
    }

    fn flush(&self) {}
  }

  #[cfg(target_arch = "arm")]
  fn write(record: &Record) {
    use cortex_m_semihosting::hprintln;
    // nothing useful to do if the host went away
    hprintln!("[{}] {}", record.level(), record.args()).ok();
  }

  #[cfg(not(target_arch = "arm"))]
  fn write(_record: &Record) {}

  #[cfg(target_arch = "arm")]
  fn is_connected() -> bool {
    // C_DEBUGEN in DHCSR
    unsafe { (*cortex_m::peripheral::DCB::ptr()).dhcsr.read() & 1 == 1 }
  }

  #[cfg(not(target_arch = "arm"))]
  fn is_connected() -> bool {
    false
  }

  /// Route driver logs to the debug probe. Semihosting halts the core when no
  /// probe is attached, so without one logging stays off.
  pub fn init(level: LevelFilter) -> bool {
    if !is_connected() {
      return false;
    }
    log::set_logger(&LOGGER)
      .map(|()| log::set_max_level(level))
      .is_ok()
  }
}
