//! DMA hand-off for the block commands.
//!
//! One single-block transfer per command between the controller data register
//! and memory. Completion is not signalled by interrupt; the slave polls the
//! channel status when the cycle ends.

use crate::constants::{DMA_BLOCK_ALIGN_MASK, DMA_BLOCK_DONE, DMA_BURST_BEATS};
use crate::hal::{AddressMode, Dma, SingleBlock, TransferWidth};
use crate::spi_drv::SpiBus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
  /// fifo to memory, the remote master writes
  FromFifo,
  /// memory to fifo, the remote master reads
  ToFifo,
}

/// Request line of a controller: receive lines are even, transmit lines odd.
pub fn request_line(bus: SpiBus, direction: Direction) -> u8 {
  let rx = (bus.index() * 2) as u8;
  match direction {
    Direction::FromFifo => rx,
    Direction::ToFifo => rx + 1,
  }
}

/// Describe a block of `words` 32-bit words. The memory side is rounded down
/// to a 16-byte boundary.
pub fn block(direction: Direction, fifo: usize, address: u32, words: u32) -> SingleBlock {
  let memory = (address & DMA_BLOCK_ALIGN_MASK) as usize;
  let length = words as usize * 4;

  match direction {
    Direction::FromFifo => SingleBlock {
      src: fifo,
      dst: memory,
      src_mode: AddressMode::NoChange,
      dst_mode: AddressMode::Increment,
      burst: DMA_BURST_BEATS,
      width: TransferWidth::Bits32,
      length,
    },
    Direction::ToFifo => SingleBlock {
      src: memory,
      dst: fifo,
      src_mode: AddressMode::Increment,
      dst_mode: AddressMode::NoChange,
      burst: DMA_BURST_BEATS,
      width: TransferWidth::Bits32,
      length,
    },
  }
}

pub fn arm<D: Dma>(dma: &mut D, channel: u8, bus: SpiBus, direction: Direction, transfer: &SingleBlock) {
  dma.select_request_line(channel, request_line(bus, direction));
  dma.arm_single_block(channel, transfer);
  log::debug!(
    "dma ch{} armed {:?}, {} bytes {:#x} -> {:#x}",
    channel,
    direction,
    transfer.length,
    transfer.src,
    transfer.dst
  );
}

pub fn is_complete<D: Dma>(dma: &D, channel: u8) -> bool {
  dma.interrupt_status(channel) & DMA_BLOCK_DONE != 0
}
