//! Hardware models for unit tests.

use std::collections::VecDeque;

use crate::constants::{FIFO_DEPTH, SR_BUSY, SR_TFE};
use crate::hal::{
  Access, ClockControl, Dma, DriveMode, Edge, Gpio, InterruptController, Level, Memory, Reg,
  SingleBlock, Ssi,
};
use crate::spi_drv::{FrameWidth, SpiBus, TransferMode};

pub const DR_ADDRESS: usize = 0x5024_0060;

/// Plain register file with software fifos. Nothing moves unless a test
/// moves it.
pub struct RegFile {
  regs: [u32; 0x120 / 4],
  pub rx: VecDeque<u32>,
  pub tx: VecDeque<u32>,
  pub writes: Vec<(Reg, u32)>,
  pub icr_reads: usize,
}

impl RegFile {
  pub fn new() -> Self {
    RegFile {
      regs: [0; 0x120 / 4],
      rx: VecDeque::new(),
      tx: VecDeque::new(),
      writes: Vec::new(),
      icr_reads: 0,
    }
  }

  pub fn get(&self, reg: Reg) -> u32 {
    self.regs[reg.offset() / 4]
  }

  /// what a remote master would clock out of the transmit fifo
  pub fn drain_tx(&mut self) -> Vec<u32> {
    self.tx.drain(..).collect()
  }

  /// queue `bytes` as received units
  pub fn receive_bytes(&mut self, width: FrameWidth, bytes: &[u8]) {
    crate::spi_drv::frame::for_each_unit(width, bytes, |u| self.rx.push_back(u));
  }
}

impl Ssi for RegFile {
  fn read(&mut self, reg: Reg) -> u32 {
    match reg {
      Reg::Dr => self.rx.pop_front().unwrap_or(0),
      Reg::Rxflr => self.rx.len() as u32,
      Reg::Txflr => self.tx.len() as u32,
      Reg::Icr => {
        self.icr_reads += 1;
        0
      }
      _ => self.get(reg),
    }
  }

  fn write(&mut self, reg: Reg, value: u32) {
    self.writes.push((reg, value));
    match reg {
      Reg::Dr => self.tx.push_back(value),
      _ => self.regs[reg.offset() / 4] = value,
    }
  }

  fn data_register_address(&self) -> usize {
    DR_ADDRESS
  }
}

/// Controller whose transmit side feeds a wire log and whose receive side is
/// fed from `incoming`, with both fifos bounded to the hardware depth.
pub struct Loopback {
  regs: RegFile,
  bus: SpiBus,
  /// units moved per status poll
  pub rate: usize,
  /// never clock anything and report busy forever
  pub stuck: bool,
  pub wire: Vec<u32>,
  pub incoming: VecDeque<u32>,
  pub max_tx_level: usize,
  pub cs_asserted: Vec<u32>,
}

impl Loopback {
  pub fn new(bus: SpiBus) -> Self {
    Loopback {
      regs: RegFile::new(),
      bus,
      rate: 5,
      stuck: false,
      wire: Vec::new(),
      incoming: VecDeque::new(),
      max_tx_level: 0,
      cs_asserted: Vec::new(),
    }
  }

  pub fn get(&self, reg: Reg) -> u32 {
    self.regs.get(reg)
  }

  pub fn dr_writes(&self) -> usize {
    self.regs.writes.iter().filter(|(r, _)| *r == Reg::Dr).count()
  }

  fn transfer_mode(&self) -> TransferMode {
    match (self.regs.get(Reg::Ctrlr0) >> self.bus.layout().tmod) & 0x3 {
      0 => TransferMode::TransmitReceive,
      1 => TransferMode::Transmit,
      2 => TransferMode::Receive,
      _ => TransferMode::Eeprom,
    }
  }

  fn active(&self) -> bool {
    !self.stuck && self.regs.get(Reg::Ssienr) == 1 && self.regs.get(Reg::Ser) != 0
  }

  fn clock(&mut self) {
    if !self.active() {
      return;
    }
    let mode = self.transfer_mode();
    for _ in 0..self.rate {
      match self.regs.tx.pop_front() {
        Some(u) if mode != TransferMode::Receive => self.wire.push(u),
        Some(_) => (),
        None => break,
      }
    }
    if mode == TransferMode::Receive || mode == TransferMode::Eeprom {
      if !self.regs.tx.is_empty() {
        return;
      }
      for _ in 0..self.rate {
        if self.regs.rx.len() >= FIFO_DEPTH as usize {
          break;
        }
        match self.incoming.pop_front() {
          Some(u) => self.regs.rx.push_back(u),
          None => break,
        }
      }
    }
  }
}

impl Ssi for Loopback {
  fn read(&mut self, reg: Reg) -> u32 {
    match reg {
      Reg::Txflr | Reg::Rxflr => {
        self.clock();
        self.regs.read(reg)
      }
      Reg::Sr => {
        self.clock();
        if self.stuck || !self.regs.tx.is_empty() {
          SR_BUSY
        } else {
          SR_TFE
        }
      }
      _ => self.regs.read(reg),
    }
  }

  fn write(&mut self, reg: Reg, value: u32) {
    if reg == Reg::Ser && value != 0 {
      self.cs_asserted.push(value);
    }
    self.regs.write(reg, value);
    // disabling the controller flushes both fifos
    if reg == Reg::Ssienr && value == 0 {
      self.regs.tx.clear();
      self.regs.rx.clear();
    }
    if reg == Reg::Dr {
      assert!(self.regs.tx.len() <= FIFO_DEPTH as usize, "transmit fifo overflow");
      self.max_tx_level = self.max_tx_level.max(self.regs.tx.len());
    }
  }

  fn data_register_address(&self) -> usize {
    DR_ADDRESS
  }
}

#[derive(Default)]
pub struct MockGpio {
  pub levels: Vec<(u8, Level)>,
  pub modes: Vec<(u8, DriveMode)>,
  pub edges: Vec<(u8, Edge)>,
  pub callbacks: Vec<(u8, u32)>,
}

impl MockGpio {
  pub fn level(&self, pin: u8) -> Option<Level> {
    self.levels.iter().rev().find(|(p, _)| *p == pin).map(|(_, l)| *l)
  }
}

impl Gpio for MockGpio {
  fn set_drive_mode(&mut self, pin: u8, mode: DriveMode) {
    self.modes.push((pin, mode));
  }

  fn set_pin(&mut self, pin: u8, level: Level) {
    self.levels.push((pin, level));
  }

  fn set_edge_trigger(&mut self, pin: u8, edge: Edge) {
    self.edges.push((pin, edge));
  }

  fn register_edge_callback(&mut self, pin: u8, priority: u32, _handler: fn()) {
    self.callbacks.push((pin, priority));
  }
}

#[derive(Default)]
pub struct MockDma {
  pub selected: Vec<(u8, u8)>,
  pub armed: Vec<(u8, SingleBlock)>,
  pub status: u32,
}

impl Dma for MockDma {
  fn select_request_line(&mut self, channel: u8, line: u8) {
    self.selected.push((channel, line));
  }

  fn arm_single_block(&mut self, channel: u8, block: &SingleBlock) {
    self.armed.push((channel, *block));
  }

  fn interrupt_status(&self, _channel: u8) -> u32 {
    self.status
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockCall {
  Enable(SpiBus),
  Reset(SpiBus),
  Source(SpiBus, u8),
  Threshold(SpiBus, u32),
}

pub struct MockClock {
  pub hz: u32,
  pub calls: Vec<ClockCall>,
}

impl MockClock {
  pub fn new(hz: u32) -> Self {
    MockClock { hz, calls: Vec::new() }
  }
}

impl ClockControl for MockClock {
  fn enable(&mut self, bus: SpiBus) {
    self.calls.push(ClockCall::Enable(bus));
  }

  fn reset(&mut self, bus: SpiBus) {
    self.calls.push(ClockCall::Reset(bus));
  }

  fn select_source(&mut self, bus: SpiBus, option: u8) {
    self.calls.push(ClockCall::Source(bus, option));
  }

  fn set_divider_threshold(&mut self, bus: SpiBus, value: u32) {
    self.calls.push(ClockCall::Threshold(bus, value));
  }

  fn frequency(&self, _bus: SpiBus) -> u32 {
    self.hz
  }
}

#[derive(Default)]
pub struct MockPlic {
  pub priorities: Vec<(u32, u32)>,
  pub registered: Vec<u32>,
  pub enabled: Vec<u32>,
}

impl InterruptController for MockPlic {
  fn set_priority(&mut self, irq: u32, level: u32) {
    self.priorities.push((irq, level));
  }

  fn register(&mut self, irq: u32, _handler: fn()) {
    self.registered.push(irq);
  }

  fn enable(&mut self, irq: u32) {
    self.enabled.push(irq);
  }
}

/// A window of memory at `base`; everything outside it is refused.
pub struct MockMemory {
  pub base: u32,
  pub bytes: Vec<u8>,
}

impl MockMemory {
  pub fn new(base: u32, len: usize) -> Self {
    MockMemory { base, bytes: vec![0; len] }
  }

  fn offset(&self, address: u32) -> usize {
    (address - self.base) as usize
  }
}

impl Memory for MockMemory {
  fn allows(&self, address: u32, len: usize, _access: Access) -> bool {
    address >= self.base && self.offset(address) + len <= self.bytes.len()
  }

  fn read_unit(&mut self, address: u32, width: FrameWidth) -> u32 {
    let at = self.offset(address);
    let mut scratch = [0u8; 4];
    scratch[..width.bytes()].copy_from_slice(&self.bytes[at..at + width.bytes()]);
    u32::from_le_bytes(scratch)
  }

  fn write_unit(&mut self, address: u32, width: FrameWidth, value: u32) {
    let at = self.offset(address);
    self.bytes[at..at + width.bytes()].copy_from_slice(&value.to_le_bytes()[..width.bytes()]);
  }
}
