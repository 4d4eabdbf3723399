//! Frame-width classification and the chunked copies shared by every
//! transfer path.
//!
//! Units are little-endian in the byte buffers. Buffers whose address is a
//! multiple of the unit size are read and written as wide words, anything
//! else goes through a scratch word.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameWidth {
  Byte = 1,
  HalfWord = 2,
  Word = 4,
}

impl FrameWidth {
  pub fn from_bit_length(bits: u32) -> FrameWidth {
    if bits < 8 {
      FrameWidth::Byte
    } else if bits < 16 {
      FrameWidth::HalfWord
    } else {
      FrameWidth::Word
    }
  }

  /// Classify the dfs field of ctrlr0, which holds the bit length minus one.
  pub fn from_dfs(dfs: u32) -> FrameWidth {
    FrameWidth::from_bit_length(dfs)
  }

  pub fn bytes(self) -> usize {
    self as usize
  }

  /// whole units in `len` bytes
  pub fn units(self, len: usize) -> usize {
    len / self.bytes()
  }

  pub fn is_aligned(self, addr: usize) -> bool {
    addr % self.bytes() == 0
  }

  fn load(self, chunk: &[u8]) -> u32 {
    let mut scratch = [0u8; 4];
    scratch[..chunk.len()].copy_from_slice(chunk);
    u32::from_le_bytes(scratch)
  }

  fn store(self, value: u32, chunk: &mut [u8]) {
    let n = chunk.len();
    chunk.copy_from_slice(&value.to_le_bytes()[..n]);
  }
}

/// Hand every whole unit of `bytes` to `sink`, in order.
pub fn for_each_unit<F>(width: FrameWidth, bytes: &[u8], mut sink: F)
where
  F: FnMut(u32),
{
  if width.is_aligned(bytes.as_ptr() as usize) {
    match width {
      FrameWidth::Word => {
        let (head, words, _) = unsafe { bytes.align_to::<u32>() };
        if head.is_empty() {
          words.iter().for_each(|w| sink(u32::from_le(*w)));
          return;
        }
      }
      FrameWidth::HalfWord => {
        let (head, halves, _) = unsafe { bytes.align_to::<u16>() };
        if head.is_empty() {
          halves.iter().for_each(|h| sink(u32::from(u16::from_le(*h))));
          return;
        }
      }
      FrameWidth::Byte => {
        bytes.iter().for_each(|b| sink(u32::from(*b)));
        return;
      }
    }
  }

  for chunk in bytes.chunks_exact(width.bytes()) {
    sink(width.load(chunk));
  }
}

/// Fill every whole unit of `bytes` from `source`, in order. Upper bits of a
/// source word beyond the unit size are dropped.
pub fn fill_units<F>(width: FrameWidth, bytes: &mut [u8], mut source: F)
where
  F: FnMut() -> u32,
{
  if width.is_aligned(bytes.as_ptr() as usize) {
    match width {
      FrameWidth::Word => {
        let (head, words, _) = unsafe { bytes.align_to_mut::<u32>() };
        if head.is_empty() {
          words.iter_mut().for_each(|w| *w = source().to_le());
          return;
        }
      }
      FrameWidth::HalfWord => {
        let (head, halves, _) = unsafe { bytes.align_to_mut::<u16>() };
        if head.is_empty() {
          halves.iter_mut().for_each(|h| *h = (source() as u16).to_le());
          return;
        }
      }
      FrameWidth::Byte => {
        bytes.iter_mut().for_each(|b| *b = source() as u8);
        return;
      }
    }
  }

  for chunk in bytes.chunks_exact_mut(width.bytes()) {
    width.store(source(), chunk);
  }
}
