// controller base addresses, indexed by bus
pub const SSI_BASE: [usize; 4] = [
  0x5200_0000, // spi0
  0x5300_0000, // spi1
  0x5024_0000, // spi slave
  0x5400_0000, // spi3
];

pub const FIFO_DEPTH: u32 = 32;

// status register
pub const SR_BUSY: u32 = 0x01;
pub const SR_TFE: u32 = 0x04;

// interrupt mask register, receive fifo full
pub const IMR_RXFIM: u32 = 0x10;

// dma control register
pub const DMACR_RDMAE: u32 = 0x01;
pub const DMACR_TDMAE: u32 = 0x02;

// master defaults
pub const DEFAULT_BAUDR: u32 = 0x14;
pub const MASTER_DMATDLR: u32 = 0x10;
pub const MIN_BAUDR: u32 = 2;
pub const MAX_BAUDR: u32 = 65534;

// slave defaults
pub const SLAVE_CLOCK_THRESHOLD: u32 = 9;
pub const SLAVE_DMATDLR: u32 = 0x04;
pub const SLAVE_DMARDLR: u32 = 0x03;
pub const SLAVE_WORK_MODE_OFFSET: u8 = 6;
pub const SLAVE_OE_OFFSET: u8 = 10;
pub const SLAVE_DFS_OFFSET: u8 = 16;
pub const SLAVE_IRQ: u32 = 3;
pub const SLAVE_IRQ_PRIORITY: u32 = 4;
pub const SLAVE_EDGE_PRIORITY: u32 = 3;

// dma channel interrupt status, block transfer done
pub const DMA_BLOCK_DONE: u32 = 0x02;
pub const DMA_BURST_BEATS: u8 = 4;
pub const DMA_BLOCK_ALIGN_MASK: u32 = 0xFFFF_FFF0;

pub const HEADER_LEN: usize = 8;
pub const MAX_BYTE_COMMAND_LEN: u32 = 8;

// polls before a master busy-wait gives up
pub const DEFAULT_POLL_LIMIT: u32 = 1_000_000;
