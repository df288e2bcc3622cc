use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use crate::constants::{AUDIO_BLOCK_SAMPLES, POOL_SIZE};

/// Backing storage for one audio block, 4-byte aligned so a DMA engine can
/// read or write it directly.
#[repr(C, align(4))]
pub struct BlockStorage {
    pub samples: [i16; AUDIO_BLOCK_SAMPLES],
}

/// Global lock-free audio block allocator.
///
/// An atomic bitmap marks which slots are live; each slot carries an atomic
/// reference count for shared ownership. All operations are lock-free and
/// may be called from the audio ISR.
pub struct BlockPool {
    /// Bit N set = slot N allocated.
    live: AtomicU32,
    refcounts: [AtomicU8; POOL_SIZE],
    storage: UnsafeCell<[BlockStorage; POOL_SIZE]>,
}

// SAFETY: all shared bookkeeping is atomic. The storage array is only
// reached through slot indices that are either exclusively claimed (bitmap
// CAS) or shared read-only through a live refcount.
unsafe impl Sync for BlockPool {}

impl BlockPool {
    #[allow(clippy::declare_interior_mut_const)]
    const fn new() -> Self {
        const NO_REFS: AtomicU8 = AtomicU8::new(0);
        const ZERO_BLOCK: BlockStorage = BlockStorage {
            samples: [0; AUDIO_BLOCK_SAMPLES],
        };
        BlockPool {
            live: AtomicU32::new(0),
            refcounts: [NO_REFS; POOL_SIZE],
            storage: UnsafeCell::new([ZERO_BLOCK; POOL_SIZE]),
        }
    }

    /// Claim a free slot, zero it, and set its refcount to 1.
    ///
    /// Returns `None` when every slot is in use.
    pub fn acquire(&self) -> Option<u8> {
        loop {
            let live = self.live.load(Ordering::Acquire);
            let free = !live;
            let slot = free.trailing_zeros();
            if slot >= POOL_SIZE as u32 {
                return None;
            }
            if self
                .live
                .compare_exchange_weak(
                    live,
                    live | (1 << slot),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_err()
            {
                // Raced with another context, retry.
                continue;
            }
            self.refcounts[slot as usize].store(1, Ordering::Release);
            // SAFETY: the CAS above gave this context exclusive claim.
            unsafe {
                (*self.storage.get())[slot as usize].samples = [0; AUDIO_BLOCK_SAMPLES];
            }
            return Some(slot as u8);
        }
    }

    /// Bump the refcount of a live slot (shared-handle clone).
    pub fn retain(&self, slot: u8) {
        let prev = self.refcounts[slot as usize].fetch_add(1, Ordering::AcqRel);
        debug_assert!(prev > 0, "retain on a dead slot");
        debug_assert!(prev < u8::MAX, "refcount overflow");
    }

    /// Drop one reference; frees the slot when the count hits zero.
    pub fn release(&self, slot: u8) {
        let prev = self.refcounts[slot as usize].fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0, "release on a dead slot");
        if prev == 1 {
            self.live.fetch_and(!(1 << u32::from(slot)), Ordering::Release);
        }
    }

    /// Current reference count of a slot.
    pub fn refcount(&self, slot: u8) -> u8 {
        self.refcounts[slot as usize].load(Ordering::Acquire)
    }

    /// Number of slots currently allocated.
    pub fn in_use(&self) -> u32 {
        self.live.load(Ordering::Acquire).count_ones()
    }

    /// Pointer to a slot's sample storage.
    ///
    /// # Safety
    /// The slot must be live, and mutable access requires refcount == 1.
    pub unsafe fn samples_ptr(&self, slot: u8) -> *mut [i16; AUDIO_BLOCK_SAMPLES] {
        unsafe { &mut (*self.storage.get())[slot as usize].samples }
    }

    /// Drop all allocations. For testing only.
    #[cfg(test)]
    pub fn reset(&self) {
        self.live.store(0, Ordering::Release);
        for rc in &self.refcounts {
            rc.store(0, Ordering::Release);
        }
    }
}

/// The one pool instance shared by the whole audio graph.
pub static POOL: BlockPool = BlockPool::new();

/// Serialize tests that inspect global pool state (the test harness runs
/// tests on multiple threads).
#[cfg(test)]
pub(crate) fn test_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
