pub mod command;
pub mod dma;
pub mod frame;
pub mod handshake;
pub mod master;
pub mod slave;

use crate::hal::{Reg, Ssi};

pub use command::{Command, Header, Opcode};
pub use frame::FrameWidth;
pub use master::Master;
pub use slave::{Completion, Slave, Status};

/// Controller instance. `SpiSlave` only supports the slave role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpiBus {
  Spi0,
  Spi1,
  SpiSlave,
  Spi3,
}

/// Bit offsets of the ctrlr0 fields, which differ between instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
  pub work_mode: u8,
  pub frame_format: u8,
  pub dfs: u8,
  pub tmod: u8,
}

impl SpiBus {
  pub fn from_index(index: u8) -> SpiBus {
    match index {
      0 => SpiBus::Spi0,
      1 => SpiBus::Spi1,
      2 => SpiBus::SpiSlave,
      3 => SpiBus::Spi3,
      _ => panic!("spi bus {} does not exist", index),
    }
  }

  pub fn index(self) -> usize {
    match self {
      SpiBus::Spi0 => 0,
      SpiBus::Spi1 => 1,
      SpiBus::SpiSlave => 2,
      SpiBus::Spi3 => 3,
    }
  }

  pub fn is_slave(self) -> bool {
    self == SpiBus::SpiSlave
  }

  pub fn layout(self) -> Layout {
    match self {
      SpiBus::Spi0 | SpiBus::Spi1 | SpiBus::SpiSlave => Layout {
        work_mode: 6,
        frame_format: 21,
        dfs: 16,
        tmod: 8,
      },
      SpiBus::Spi3 => Layout {
        work_mode: 8,
        frame_format: 22,
        dfs: 0,
        tmod: 10,
      },
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipSelect {
  Cs0,
  Cs1,
  Cs2,
  Cs3,
}

impl ChipSelect {
  /// value for the slave enable register
  pub fn mask(self) -> u32 {
    1 << (self as u32)
  }
}

/// Clock polarity and phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkMode {
  Mode0 = 0,
  Mode1 = 1,
  Mode2 = 2,
  Mode3 = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
  Standard = 0,
  Dual = 1,
  Quad = 2,
  Octal = 3,
}

/// Transfer direction, the tmod field of ctrlr0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
  TransmitReceive = 0,
  Transmit = 1,
  Receive = 2,
  Eeprom = 3,
}

/// Program the transfer direction; the controller must be disabled.
pub fn set_transfer_mode<R: Ssi>(regs: &mut R, bus: SpiBus, mode: TransferMode) {
  let offset = bus.layout().tmod;
  regs.modify(Reg::Ctrlr0, 3 << offset, (mode as u32) << offset);
}

/// How instruction and address phases are clocked in non-standard formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionAddressMode {
  Standard = 0,
  AddressStandard = 1,
  AsFrameFormat = 2,
}
