//! Collaborator interfaces
//!
//! The driver only speaks to hardware through these traits: the controller
//! register file, the clock tree, GPIO, the platform interrupt controller, the
//! DMA engine and raw memory. `Mmio` and `RawMemory` are the on-target
//! implementations.

use core::ptr;

use crate::constants;
use crate::spi_drv::{FrameWidth, SpiBus};

/// Controller registers used by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg {
  Ctrlr0,
  Ctrlr1,
  Ssienr,
  Ser,
  Baudr,
  Txftlr,
  Rxftlr,
  Txflr,
  Rxflr,
  Sr,
  Imr,
  Icr,
  Dmacr,
  Dmatdlr,
  Dmardlr,
  Dr,
  SpiCtrlr0,
  Endian,
}

impl Reg {
  pub const fn offset(self) -> usize {
    match self {
      Reg::Ctrlr0 => 0x00,
      Reg::Ctrlr1 => 0x04,
      Reg::Ssienr => 0x08,
      Reg::Ser => 0x10,
      Reg::Baudr => 0x14,
      Reg::Txftlr => 0x18,
      Reg::Rxftlr => 0x1c,
      Reg::Txflr => 0x20,
      Reg::Rxflr => 0x24,
      Reg::Sr => 0x28,
      Reg::Imr => 0x2c,
      Reg::Icr => 0x48,
      Reg::Dmacr => 0x4c,
      Reg::Dmatdlr => 0x50,
      Reg::Dmardlr => 0x54,
      Reg::Dr => 0x60,
      Reg::SpiCtrlr0 => 0xf4,
      Reg::Endian => 0x118,
    }
  }
}

/// Register file of one controller instance.
///
/// Reads take `&mut self` since reading `Dr` pops the receive fifo and reading
/// `Icr` clears interrupts.
pub trait Ssi {
  fn read(&mut self, reg: Reg) -> u32;
  fn write(&mut self, reg: Reg, value: u32);

  /// bus address of the data register, used as the fixed end of dma transfers
  fn data_register_address(&self) -> usize;

  /// replace the bits selected by `mask`
  fn modify(&mut self, reg: Reg, mask: u32, value: u32) {
    let old = self.read(reg);
    self.write(reg, (old & !mask) | (value & mask));
  }
}

/// Memory-mapped controller.
pub struct Mmio {
  base: usize,
}

impl Mmio {
  /// # Safety
  /// `base` must be the address of a controller register block that nothing
  /// else accesses for the lifetime of the value.
  pub const unsafe fn new(base: usize) -> Self {
    Mmio { base }
  }

  /// # Safety
  /// See [`Mmio::new`].
  pub unsafe fn for_bus(bus: SpiBus) -> Self {
    Mmio::new(constants::SSI_BASE[bus.index()])
  }
}

impl Ssi for Mmio {
  fn read(&mut self, reg: Reg) -> u32 {
    unsafe { ptr::read_volatile((self.base + reg.offset()) as *const u32) }
  }

  fn write(&mut self, reg: Reg, value: u32) {
    unsafe { ptr::write_volatile((self.base + reg.offset()) as *mut u32, value) }
  }

  fn data_register_address(&self) -> usize {
    self.base + Reg::Dr.offset()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveMode {
  Input,
  InputPullDown,
  InputPullUp,
  Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
  Low,
  High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
  None,
  Falling,
  Rising,
  Both,
}

pub trait Gpio {
  fn set_drive_mode(&mut self, pin: u8, mode: DriveMode);
  fn set_pin(&mut self, pin: u8, level: Level);
  fn set_edge_trigger(&mut self, pin: u8, edge: Edge);
  fn register_edge_callback(&mut self, pin: u8, priority: u32, handler: fn());
}

pub trait ClockControl {
  fn enable(&mut self, bus: SpiBus);
  fn reset(&mut self, bus: SpiBus);
  fn select_source(&mut self, bus: SpiBus, option: u8);
  fn set_divider_threshold(&mut self, bus: SpiBus, value: u32);
  /// source clock feeding the controller, in Hz
  fn frequency(&self, bus: SpiBus) -> u32;
}

pub trait InterruptController {
  fn set_priority(&mut self, irq: u32, level: u32);
  fn register(&mut self, irq: u32, handler: fn());
  fn enable(&mut self, irq: u32);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressMode {
  Increment,
  NoChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferWidth {
  Bits8,
  Bits16,
  Bits32,
  Bits64,
}

/// One single-block transfer as handed to the dma engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingleBlock {
  pub src: usize,
  pub dst: usize,
  pub src_mode: AddressMode,
  pub dst_mode: AddressMode,
  /// beats per burst
  pub burst: u8,
  pub width: TransferWidth,
  /// total bytes
  pub length: usize,
}

pub trait Dma {
  fn select_request_line(&mut self, channel: u8, line: u8);
  fn arm_single_block(&mut self, channel: u8, block: &SingleBlock);
  /// raw interrupt status field of the channel
  fn interrupt_status(&self, channel: u8) -> u32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
  Read,
  Write,
}

/// Raw address space reachable through the slave byte and block commands.
///
/// Addresses come straight off the wire. `allows` is checked before any
/// access or dma transfer is set up; a refused command is dropped like a
/// malformed header.
pub trait Memory {
  fn allows(&self, _address: u32, _len: usize, _access: Access) -> bool {
    true
  }

  fn read_unit(&mut self, address: u32, width: FrameWidth) -> u32;
  fn write_unit(&mut self, address: u32, width: FrameWidth, value: u32);
}

/// Unrestricted access to the whole address space.
///
/// Only meant for a trusted link: the remote master can read and write any
/// address.
pub struct RawMemory {
  _private: (),
}

impl RawMemory {
  /// # Safety
  /// Every address the remote master sends must be valid for the access it
  /// requests.
  pub unsafe fn new() -> Self {
    RawMemory { _private: () }
  }
}

impl Memory for RawMemory {
  fn read_unit(&mut self, address: u32, width: FrameWidth) -> u32 {
    unsafe { load(address as usize, width) }
  }

  fn write_unit(&mut self, address: u32, width: FrameWidth, value: u32) {
    unsafe { store(address as usize, width, value) }
  }
}

/// Volatile little-endian read of one unit. Misaligned units are assembled
/// byte by byte.
///
/// # Safety
/// `addr..addr + width.bytes()` must be readable.
unsafe fn load(addr: usize, width: FrameWidth) -> u32 {
  if !width.is_aligned(addr) {
    return (0..width.bytes()).fold(0, |acc, i| {
      acc | u32::from(ptr::read_volatile((addr + i) as *const u8)) << (8 * i)
    });
  }
  match width {
    FrameWidth::Byte => u32::from(ptr::read_volatile(addr as *const u8)),
    FrameWidth::HalfWord => u32::from(u16::from_le(ptr::read_volatile(addr as *const u16))),
    FrameWidth::Word => u32::from_le(ptr::read_volatile(addr as *const u32)),
  }
}

/// Volatile little-endian write of one unit, byte by byte when misaligned.
///
/// # Safety
/// `addr..addr + width.bytes()` must be writable.
unsafe fn store(addr: usize, width: FrameWidth, value: u32) {
  if !width.is_aligned(addr) {
    for i in 0..width.bytes() {
      ptr::write_volatile((addr + i) as *mut u8, (value >> (8 * i)) as u8);
    }
    return;
  }
  match width {
    FrameWidth::Byte => ptr::write_volatile(addr as *mut u8, value as u8),
    FrameWidth::HalfWord => ptr::write_volatile(addr as *mut u16, (value as u16).to_le()),
    FrameWidth::Word => ptr::write_volatile(addr as *mut u32, value.to_le()),
  }
}
