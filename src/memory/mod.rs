//! External serial-bus memory: drivers, slots, and the allocator.
//!
//! Off-chip SPI SRAM holds the long delay lines. The pieces, bottom up:
//!
//! - [`SpiSram`]: blocking driver over an `embedded-hal` SPI bus and a
//!   chip-select pin; [`SpiSramDma`]: the same contract over a queued-DMA
//!   hardware seam ([`SpiDmaBus`]).
//! - [`SramCell`]: shares one driver between several delay lines on the
//!   same device (the audio update context is the only caller).
//! - [`MemSlot`]: a contiguous, exclusively-owned byte range of one device
//!   with word-addressed random and circular access.
//! - [`MemoryManager`]: bump-pointer allocator that carves devices into
//!   disjoint slots. Nothing is ever freed: the audio graph is built once
//!   and runs until power-off, so fragmentation cannot arise.

mod serial;
mod dma;
mod slot;
mod manager;

#[cfg(test)]
pub(crate) mod sim;

pub use dma::{SpiDmaBus, SpiSramDma, MAX_DMA_XFER_BYTES};
pub use manager::{MemDevice, MemoryManager, MAX_MEMORY_DEVICES};
pub use serial::{SharedSram, SpiSram, SramBus, SramCell, SramSpec};
pub use slot::{MemSlot, SlotError};
