//! Slave command header and the descriptor handed back after each cycle.
//!
//! Wire format, 8 bytes, multi-byte fields little-endian:
//! `[opcode:1][address:4][length:2][checksum:1]` where the checksum is the sum
//! of the first 7 bytes modulo 256.

use core::fmt;

use crate::constants::{HEADER_LEN, MAX_BYTE_COMMAND_LEN};
use crate::error::ErrorCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
  WriteConfig = 0,
  ReadConfig = 1,
  WriteDataByte = 2,
  ReadDataByte = 3,
  WriteDataBlock = 4,
  ReadDataBlock = 5,
}

impl Opcode {
  pub fn from_u8(raw: u8) -> Option<Opcode> {
    match raw {
      0 => Some(Opcode::WriteConfig),
      1 => Some(Opcode::ReadConfig),
      2 => Some(Opcode::WriteDataByte),
      3 => Some(Opcode::ReadDataByte),
      4 => Some(Opcode::WriteDataBlock),
      5 => Some(Opcode::ReadDataBlock),
      _ => None,
    }
  }

  /// block commands go through the dma engine
  pub fn is_block(self) -> bool {
    match self {
      Opcode::WriteDataBlock | Opcode::ReadDataBlock => true,
      _ => false,
    }
  }

  /// data flows from the remote master into this device
  pub fn is_write(self) -> bool {
    match self {
      Opcode::WriteConfig | Opcode::WriteDataByte | Opcode::WriteDataBlock => true,
      _ => false,
    }
  }
}

/// Why a header was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reject {
  Checksum { expected: u8, found: u8 },
  UnknownOpcode(u8),
  Length { opcode: Opcode, length: u32 },
  /// range refused by the config buffer bounds or the memory hook
  Address { address: u32, length: u32 },
}

impl fmt::Display for Reject {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Reject::Checksum { expected, found } => {
        write!(f, "checksum {:#04x}, expected {:#04x}", found, expected)
      }
      Reject::UnknownOpcode(op) => write!(f, "unknown opcode {}", op),
      Reject::Length { opcode, length } => write!(f, "{:?} with length {}", opcode, length),
      Reject::Address { address, length } => {
        write!(f, "address {:#010x} length {} out of range", address, length)
      }
    }
  }
}

pub fn checksum(bytes: &[u8]) -> u8 {
  bytes.iter().fold(0u8, |sum, b| sum.wrapping_add(*b))
}

/// A header that passed the checksum, before opcode validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
  pub opcode: u8,
  pub address: u32,
  /// 1..=65536, a zero length field means 65536
  pub length: u32,
}

impl Header {
  pub fn parse(raw: &[u8; HEADER_LEN]) -> Result<Header, Reject> {
    let expected = checksum(&raw[..HEADER_LEN - 1]);
    if raw[HEADER_LEN - 1] != expected {
      return Err(Reject::Checksum { expected, found: raw[HEADER_LEN - 1] });
    }

    let address = u32::from_le_bytes([raw[1], raw[2], raw[3], raw[4]]);
    let length = match u16::from_le_bytes([raw[5], raw[6]]) {
      0 => 65536,
      n => u32::from(n),
    };

    Ok(Header {
      opcode: raw[0],
      address,
      length,
    })
  }

  /// Build the 8 header bytes a remote master sends. A `length` of 0 asks
  /// for 65536.
  pub fn encode(opcode: Opcode, address: u32, length: u16) -> [u8; HEADER_LEN] {
    let mut raw = [0u8; HEADER_LEN];
    raw[0] = opcode as u8;
    raw[1..5].copy_from_slice(&address.to_le_bytes());
    raw[5..7].copy_from_slice(&length.to_le_bytes());
    raw[7] = checksum(&raw[..HEADER_LEN - 1]);
    raw
  }

  /// Check the opcode and its length limit and start a descriptor.
  pub fn command(&self) -> Result<Command, Reject> {
    let opcode = Opcode::from_u8(self.opcode).ok_or(Reject::UnknownOpcode(self.opcode))?;
    if !opcode.is_block() && self.length > MAX_BYTE_COMMAND_LEN {
      return Err(Reject::Length { opcode, length: self.length });
    }
    Ok(Command {
      opcode,
      address: self.address,
      length: self.length,
      error: ErrorCode::None,
    })
  }
}

/// One protocol cycle as reported to the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
  pub opcode: Opcode,
  pub address: u32,
  pub length: u32,
  pub error: ErrorCode,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_little_endian_fields() {
    let raw = Header::encode(Opcode::ReadConfig, 0x1234_5678, 0x0102);
    assert_eq!(&raw[..7], &[1, 0x78, 0x56, 0x34, 0x12, 0x02, 0x01]);
    let header = Header::parse(&raw).unwrap();
    assert_eq!(header, Header { opcode: 1, address: 0x1234_5678, length: 0x0102 });
  }

  #[test]
  fn checksum_wraps() {
    assert_eq!(checksum(&[0xff, 0x02]), 0x01);
    let raw = Header::encode(Opcode::WriteDataBlock, 0xffff_ffff, 0xffff);
    assert_eq!(raw[7], (4u32 + 0xff * 6) as u8);
  }

  #[test]
  fn bad_checksum_is_rejected() {
    let mut raw = Header::encode(Opcode::WriteConfig, 0, 4);
    raw[7] = raw[7].wrapping_add(1);
    match Header::parse(&raw) {
      Err(Reject::Checksum { .. }) => (),
      other => panic!("unexpected {:?}", other),
    }
  }

  #[test]
  fn zero_length_means_65536() {
    let raw = Header::encode(Opcode::WriteDataBlock, 0x8000_0000, 0);
    assert_eq!(Header::parse(&raw).unwrap().length, 65536);
  }

  #[test]
  fn byte_commands_are_limited_to_8() {
    let ok = Header::parse(&Header::encode(Opcode::WriteDataByte, 0, 8)).unwrap();
    assert!(ok.command().is_ok());

    let long = Header::parse(&Header::encode(Opcode::ReadConfig, 0, 9)).unwrap();
    assert_eq!(long.command(), Err(Reject::Length { opcode: Opcode::ReadConfig, length: 9 }));

    let wrapped = Header::parse(&Header::encode(Opcode::WriteConfig, 0, 0)).unwrap();
    assert!(wrapped.command().is_err());

    let block = Header::parse(&Header::encode(Opcode::ReadDataBlock, 0, 1024)).unwrap();
    assert_eq!(block.command().unwrap().length, 1024);
  }

  #[test]
  fn unknown_opcode() {
    let mut raw = [6u8, 0, 0, 0, 0, 1, 0, 0];
    raw[7] = checksum(&raw[..7]);
    let header = Header::parse(&raw).unwrap();
    assert_eq!(header.command(), Err(Reject::UnknownOpcode(6)));
  }

  #[test]
  fn opcode_classes() {
    assert!(Opcode::ReadDataBlock.is_block());
    assert!(!Opcode::ReadDataByte.is_block());
    assert!(Opcode::WriteConfig.is_write());
    assert!(!Opcode::ReadConfig.is_write());
    assert_eq!(Opcode::from_u8(3), Some(Opcode::ReadDataByte));
  }
}
