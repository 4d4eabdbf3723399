//! Blocking master transfers.
//!
//! Every transfer runs to completion in the caller: the fifo is topped up
//! and drained by polling its occupancy registers. Each poll loop is bounded
//! by the configured [`Timeout`]; on expiry chip select is released, the
//! controller disabled and [`Error::Timeout`] returned.

use crate::config::{MasterConfig, Timeout};
use crate::constants::{
  DEFAULT_BAUDR, FIFO_DEPTH, MASTER_DMATDLR, MAX_BAUDR, MIN_BAUDR, SR_BUSY, SR_TFE,
};
use crate::error::{Error, Result};
use crate::hal::{ClockControl, Reg, Ssi};
use crate::spi_drv::frame::{self, FrameWidth};
use crate::spi_drv;
use crate::spi_drv::{ChipSelect, FrameFormat, InstructionAddressMode, SpiBus, TransferMode};
use crate::util::Deadline;

/// What goes out before the data phase.
#[derive(Clone, Copy)]
enum Prefix<'a> {
  None,
  /// command bytes packed at the frame width
  Bytes(&'a [u8]),
  /// full 32-bit command words
  Words(&'a [u32]),
}

pub struct Master<R> {
  bus: SpiBus,
  regs: R,
  timeout: Timeout,
}

impl<R: Ssi> Master<R> {
  pub fn new(bus: SpiBus, regs: R) -> Self {
    assert!(!bus.is_slave(), "spi bus 2 only supports slave mode");
    Master {
      bus,
      regs,
      timeout: Timeout::default(),
    }
  }

  pub fn bus(&self) -> SpiBus {
    self.bus
  }

  pub fn release(self) -> R {
    self.regs
  }

  pub fn set_timeout(&mut self, timeout: Timeout) {
    self.timeout = timeout;
  }

  pub fn init<C: ClockControl>(&mut self, clock: &mut C, config: &MasterConfig) {
    let bits = u32::from(config.data_bit_length);
    assert!(bits >= 4 && bits <= 32, "data bit length {} unsupported", bits);
    match config.frame_format {
      FrameFormat::Dual => assert!(bits % 2 == 0, "dual frames need an even bit length"),
      FrameFormat::Quad => assert!(bits % 4 == 0, "quad frames need a bit length divisible by 4"),
      FrameFormat::Octal => assert!(bits % 8 == 0, "octal frames need a bit length divisible by 8"),
      FrameFormat::Standard => (),
    }

    if self.bus == SpiBus::Spi3 {
      clock.select_source(self.bus, 1);
    }
    clock.enable(self.bus);
    clock.set_divider_threshold(self.bus, 0);

    let layout = self.bus.layout();
    if self.regs.read(Reg::Baudr) == 0 {
      self.regs.write(Reg::Baudr, DEFAULT_BAUDR);
    }
    self.regs.write(Reg::Imr, 0);
    self.regs.write(Reg::Dmacr, 0);
    self.regs.write(Reg::Dmatdlr, MASTER_DMATDLR);
    self.regs.write(Reg::Dmardlr, 0);
    self.regs.write(Reg::Ser, 0);
    self.regs.write(Reg::Ssienr, 0);
    self.regs.write(
      Reg::Ctrlr0,
      ((config.work_mode as u32) << layout.work_mode)
        | ((config.frame_format as u32) << layout.frame_format)
        | ((bits - 1) << layout.dfs),
    );
    self.regs.write(Reg::SpiCtrlr0, 0);
    self.regs.write(Reg::Endian, config.endian);

    self.timeout = config.timeout;
    log::debug!("spi{} init, {} bit frames", self.bus.index(), bits);
  }

  /// Instruction and address phases for dual/quad/octal framing.
  pub fn init_non_standard(
    &mut self,
    instruction_length: u32,
    address_length: u32,
    wait_cycles: u32,
    mode: InstructionAddressMode,
  ) {
    assert!(wait_cycles < (1 << 5), "{} wait cycles unsupported", wait_cycles);
    let inst_l = match instruction_length {
      0 => 0,
      4 => 1,
      8 => 2,
      16 => 3,
      _ => panic!("invalid instruction length {}", instruction_length),
    };
    assert!(
      address_length % 4 == 0 && address_length <= 60,
      "invalid address length {}",
      address_length
    );
    let addr_l = address_length / 4;

    self.regs.write(
      Reg::SpiCtrlr0,
      (wait_cycles << 11) | (inst_l << 8) | (addr_l << 2) | mode as u32,
    );
  }

  /// Program the baud divider for `hz` and return the rate actually achieved.
  pub fn set_clk_rate<C: ClockControl>(&mut self, clock: &C, hz: u32) -> u32 {
    assert!(hz > 0, "spi clock rate must be non-zero");
    let source = clock.frequency(self.bus);
    let baudr = (source / hz).max(MIN_BAUDR).min(MAX_BAUDR);
    self.regs.write(Reg::Baudr, baudr);
    source / baudr
  }

  pub fn frame_width(&mut self) -> FrameWidth {
    let dfs = (self.regs.read(Reg::Ctrlr0) >> self.bus.layout().dfs) & 0x1f;
    FrameWidth::from_dfs(dfs)
  }

  pub fn send(&mut self, cs: ChipSelect, tx: &[u8]) -> Result<()> {
    self.transmit(cs, Prefix::None, tx)
  }

  /// Send 32-bit command words followed by `tx`, under one chip select.
  pub fn send_multiple(&mut self, cs: ChipSelect, words: &[u32], tx: &[u8]) -> Result<()> {
    self.transmit(cs, Prefix::Words(words), tx)
  }

  /// Clock in `rx.len()` bytes. With an empty `command` the controller runs
  /// receive-only, started by one filler word; otherwise the command goes out
  /// first in read-after-write mode. An empty `rx` only sends the command.
  pub fn receive(&mut self, cs: ChipSelect, command: &[u8], rx: &mut [u8]) -> Result<()> {
    let prefix = if command.is_empty() {
      Prefix::None
    } else {
      Prefix::Bytes(command)
    };
    self.exchange(cs, prefix, rx)
  }

  /// Like [`Master::receive`] with 32-bit command words. No filler is sent
  /// when `words` is empty.
  pub fn receive_multiple(&mut self, cs: ChipSelect, words: &[u32], rx: &mut [u8]) -> Result<()> {
    self.exchange(cs, Prefix::Words(words), rx)
  }

  fn set_transfer_mode(&mut self, mode: TransferMode) {
    spi_drv::set_transfer_mode(&mut self.regs, self.bus, mode);
  }

  fn transmit(&mut self, cs: ChipSelect, prefix: Prefix<'_>, tx: &[u8]) -> Result<()> {
    self.set_transfer_mode(TransferMode::Transmit);
    let width = self.frame_width();
    assert!(
      tx.len() % width.bytes() == 0,
      "{} bytes is not a whole number of {:?} frames",
      tx.len(),
      width
    );

    self.regs.write(Reg::Ssienr, 1);
    self.regs.write(Reg::Ser, cs.mask());

    let mut deadline = Deadline::new(self.timeout);
    let result = self
      .push_prefix(prefix, width, None, &mut deadline)
      .and_then(|_| self.push_bytes(width, tx, None, &mut deadline))
      .and_then(|_| self.wait_idle(&mut deadline));
    self.finish(result)
  }

  fn exchange(&mut self, cs: ChipSelect, prefix: Prefix<'_>, rx: &mut [u8]) -> Result<()> {
    // nothing to read back, only the command phase goes out
    if rx.is_empty() {
      return match prefix {
        Prefix::None | Prefix::Words(&[]) => Ok(()),
        _ => self.transmit(cs, prefix, &[]),
      };
    }

    let mode = match prefix {
      Prefix::None | Prefix::Words(&[]) => TransferMode::Receive,
      _ => TransferMode::Eeprom,
    };
    self.set_transfer_mode(mode);
    let width = self.frame_width();
    let units = width.units(rx.len());
    assert!(
      rx.len() % width.bytes() == 0,
      "{} bytes is not a whole number of {:?} frames",
      rx.len(),
      width
    );

    self.regs.write(Reg::Ctrlr1, (units - 1) as u32);
    self.regs.write(Reg::Ssienr, 1);

    let mut deadline = Deadline::new(self.timeout);
    let mask = cs.mask();
    let result = match prefix {
      Prefix::None => {
        self.regs.write(Reg::Dr, 0xffff_ffff);
        self.regs.write(Reg::Ser, mask);
        Ok(())
      }
      Prefix::Words(&[]) => {
        self.regs.write(Reg::Ser, mask);
        Ok(())
      }
      _ => self.push_prefix(prefix, width, Some(mask), &mut deadline),
    }
    .and_then(|_| self.drain(width, rx, &mut deadline));
    self.finish(result)
  }

  fn push_prefix(
    &mut self,
    prefix: Prefix<'_>,
    width: FrameWidth,
    cs: Option<u32>,
    deadline: &mut Deadline,
  ) -> Result<()> {
    match prefix {
      Prefix::None => Ok(()),
      Prefix::Bytes(bytes) => self.push_bytes(width, bytes, cs, deadline),
      Prefix::Words(words) => self.feed(words.len(), cs, deadline, |regs, range| {
        words[range].iter().for_each(|w| regs.write(Reg::Dr, *w))
      }),
    }
  }

  fn push_bytes(
    &mut self,
    width: FrameWidth,
    bytes: &[u8],
    cs: Option<u32>,
    deadline: &mut Deadline,
  ) -> Result<()> {
    let unit = width.bytes();
    self.feed(width.units(bytes.len()), cs, deadline, |regs, range| {
      let chunk = &bytes[range.start * unit..range.end * unit];
      frame::for_each_unit(width, chunk, |u| regs.write(Reg::Dr, u));
    })
  }

  /// Top up the transmit fifo until `count` units went in. `push` writes the
  /// units in the given range; `cs` is asserted after every top-up when set.
  fn feed<F>(&mut self, count: usize, cs: Option<u32>, deadline: &mut Deadline, mut push: F) -> Result<()>
  where
    F: FnMut(&mut R, core::ops::Range<usize>),
  {
    let mut sent = 0;
    while sent < count {
      let level = self.regs.read(Reg::Txflr).min(FIFO_DEPTH);
      let n = ((FIFO_DEPTH - level) as usize).min(count - sent);
      if n == 0 {
        deadline.poll()?;
        continue;
      }
      push(&mut self.regs, sent..sent + n);
      if let Some(mask) = cs {
        self.regs.write(Reg::Ser, mask);
      }
      sent += n;
      deadline.progress();
    }
    Ok(())
  }

  fn drain(&mut self, width: FrameWidth, rx: &mut [u8], deadline: &mut Deadline) -> Result<()> {
    let unit = width.bytes();
    let total = width.units(rx.len());
    let mut received = 0;
    while received < total {
      let n = (self.regs.read(Reg::Rxflr) as usize).min(total - received);
      if n == 0 {
        deadline.poll()?;
        continue;
      }
      let regs = &mut self.regs;
      frame::fill_units(width, &mut rx[received * unit..(received + n) * unit], || {
        regs.read(Reg::Dr)
      });
      received += n;
      deadline.progress();
    }
    Ok(())
  }

  fn wait_idle(&mut self, deadline: &mut Deadline) -> Result<()> {
    while self.regs.read(Reg::Sr) & (SR_TFE | SR_BUSY) != SR_TFE {
      deadline.poll()?;
    }
    Ok(())
  }

  fn finish(&mut self, result: Result<()>) -> Result<()> {
    self.regs.write(Reg::Ser, 0);
    self.regs.write(Reg::Ssienr, 0);
    if let Err(Error::Timeout) = result {
      log::warn!("spi{} transfer timed out", self.bus.index());
    }
    result
  }
}
