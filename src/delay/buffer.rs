use crate::block::BlockRef;
use crate::constants::{AUDIO_BLOCK_SAMPLES, POOL_SIZE};
use crate::memory::MemSlot;

/// Ring of shared block handles for pool-backed delay lines.
///
/// Index 0 is the newest block; the ring only ever holds `len` handles and
/// evicts the oldest once full.
struct BlockRing {
    blocks: [Option<BlockRef>; POOL_SIZE],
    len: usize,
    head: usize,
}

impl BlockRing {
    fn new(max_samples: usize) -> Self {
        let len = (max_samples / AUDIO_BLOCK_SAMPLES + 1).clamp(1, POOL_SIZE);
        BlockRing {
            blocks: core::array::from_fn(|_| None),
            len,
            head: 0,
        }
    }

    /// Block `age` blocks back from the newest, if it has been filled.
    fn block(&self, age: usize) -> Option<&BlockRef> {
        self.blocks[(self.head + age) % self.len].as_ref()
    }

    fn push(&mut self, block: BlockRef) -> Option<BlockRef> {
        self.head = (self.head + self.len - 1) % self.len;
        self.blocks[self.head].replace(block)
    }

    fn purge(&mut self) {
        for slot in self.blocks.iter_mut() {
            *slot = None;
        }
        self.head = 0;
    }
}

enum Backing<'d> {
    Internal(BlockRing),
    External(MemSlot<'d>),
}

/// A delay line holding at least `max_delay_samples()` of signal history.
///
/// Internal lines share pool blocks by refcount, so pushing costs nothing
/// but a handle. External lines stream every block out to a serial SRAM
/// slot and fetch delayed blocks back, possibly via DMA; callers that push
/// or fetch must respect [`wait_read`](AudioDelayBuffer::wait_read) and
/// hold pushed blocks until the write has drained.
pub struct AudioDelayBuffer<'d> {
    backing: Backing<'d>,
}

impl<'d> AudioDelayBuffer<'d> {
    /// A pool-backed line able to reach `max_samples` into the past
    /// (subject to the pool-size cap; check
    /// [`max_delay_samples`](AudioDelayBuffer::max_delay_samples)).
    pub fn internal(max_samples: usize) -> Self {
        AudioDelayBuffer {
            backing: Backing::Internal(BlockRing::new(max_samples)),
        }
    }

    /// A line backed by an exclusively-owned external memory slot. The
    /// slot arrives zeroed from the allocator, so unwritten history reads
    /// as silence.
    pub fn external(slot: MemSlot<'d>) -> Self {
        AudioDelayBuffer {
            backing: Backing::External(slot),
        }
    }

    /// Push the newest block of signal.
    ///
    /// Internal lines keep the handle and hand back the one they evicted,
    /// if any. External lines copy the samples out to memory and hand the
    /// pushed block straight back; with a DMA backing the transfer may
    /// still be in flight, so the caller keeps that handle alive until the
    /// next update.
    pub fn add_block(&mut self, block: BlockRef) -> Option<BlockRef> {
        match &mut self.backing {
            Backing::Internal(ring) => ring.push(block),
            Backing::External(slot) => {
                // Cannot fail: the slot is at least one block long per
                // max_delay_samples, and circular writes need no bounds.
                let _ = slot.write_advance16(&block[..]);
                Some(block)
            }
        }
    }

    /// Fetch the block of signal ending `offset_samples` in the past, so
    /// offset 0 is the block most recently pushed. History that was never
    /// written reads as zeros. Returns false (and writes silence) when the
    /// offset exceeds [`max_delay_samples`](Self::max_delay_samples).
    ///
    /// External fetches may leave a DMA read in flight; call
    /// [`wait_read`](Self::wait_read) before using `dst`.
    pub fn get_samples(&mut self, dst: &mut [i16; AUDIO_BLOCK_SAMPLES], offset_samples: usize) -> bool {
        if offset_samples > self.max_delay_samples() {
            dst.fill(0);
            return false;
        }
        match &mut self.backing {
            Backing::Internal(ring) => {
                let age = offset_samples / AUDIO_BLOCK_SAMPLES;
                let rem = offset_samples % AUDIO_BLOCK_SAMPLES;
                if rem == 0 {
                    copy_or_zero(dst, ring.block(age), 0);
                } else {
                    // The fetched span straddles two stored blocks: the
                    // tail of the older one, then the head of the newer.
                    let (older_part, newer_part) = dst.split_at_mut(rem);
                    copy_or_zero(older_part, ring.block(age + 1), AUDIO_BLOCK_SAMPLES - rem);
                    copy_or_zero(newer_part, ring.block(age), 0);
                }
                true
            }
            Backing::External(slot) => {
                let size = slot.size_words();
                let back = (offset_samples + AUDIO_BLOCK_SAMPLES) as u32 % size;
                slot.set_read_pos((slot.write_pos() + size - back) % size);
                // In range by construction.
                let _ = slot.read_advance16(&mut dst[..]);
                true
            }
        }
    }

    /// Deepest reachable offset, in samples.
    pub fn max_delay_samples(&self) -> usize {
        match &self.backing {
            Backing::Internal(ring) => (ring.len - 1) * AUDIO_BLOCK_SAMPLES,
            Backing::External(slot) => {
                // One guard block keeps the fetch clear of the region the
                // next push will overwrite.
                slot.size_words() as usize - AUDIO_BLOCK_SAMPLES
            }
        }
    }

    /// Spin until an outstanding fetch has fully landed in its buffer.
    pub fn wait_read(&mut self) {
        if let Backing::External(slot) = &mut self.backing {
            while slot.is_read_busy() {
                core::hint::spin_loop();
            }
        }
    }

    /// Drop every held block handle (the disable path gives the pool its
    /// blocks back).
    pub fn purge(&mut self) {
        if let Backing::Internal(ring) = &mut self.backing {
            ring.purge();
        }
    }
}

fn copy_or_zero(dst: &mut [i16], src: Option<&BlockRef>, from: usize) {
    match src {
        Some(block) => dst.copy_from_slice(&block[from..from + dst.len()]),
        None => dst.fill(0),
    }
}

/// Linear fractional-delay interpolation.
///
/// `src` holds one sample more than `dst`; each output is the Q15 blend
/// `(1-frac)·src[i] + frac·src[i+1]` with `frac` in `0..=32768`, so a
/// modulated effect can sit between two integer delay taps.
pub fn interpolate_fraction(src: &[i16], dst: &mut [i16], frac: i32) {
    debug_assert_eq!(src.len(), dst.len() + 1);
    let inverse = 32768 - frac;
    for (out, pair) in dst.iter_mut().zip(src.windows(2)) {
        let acc = inverse * i32::from(pair[0]) + frac * i32::from(pair[1]);
        *out = (acc >> 15) as i16;
    }
}
