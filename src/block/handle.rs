use core::ops::{Deref, DerefMut};

use crate::constants::AUDIO_BLOCK_SAMPLES;

use super::pool::POOL;

/// Exclusive handle to a pool block.
///
/// Exactly one `BlockHandle` exists per live slot; it derefs mutably to the
/// `[i16; 128]` samples. Dropping it releases the slot.
pub struct BlockHandle {
    slot: u8,
}

impl BlockHandle {
    pub(crate) fn from_slot(slot: u8) -> Self {
        BlockHandle { slot }
    }

    /// Allocate a zeroed block from the global pool, or `None` when the
    /// pool is exhausted.
    pub fn acquire() -> Option<Self> {
        POOL.acquire().map(BlockHandle::from_slot)
    }

    /// Pool slot index.
    pub fn slot(&self) -> u8 {
        self.slot
    }

    /// Convert into a shared reference without copying or touching the
    /// refcount.
    pub fn share(self) -> BlockRef {
        let slot = self.slot;
        core::mem::forget(self); // hand the refcount to the BlockRef
        BlockRef { slot }
    }
}

impl Deref for BlockHandle {
    type Target = [i16; AUDIO_BLOCK_SAMPLES];

    fn deref(&self) -> &Self::Target {
        // SAFETY: exclusive handle, refcount == 1.
        unsafe { &*POOL.samples_ptr(self.slot) }
    }
}

impl DerefMut for BlockHandle {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: exclusive handle, refcount == 1.
        unsafe { &mut *POOL.samples_ptr(self.slot) }
    }
}

impl Drop for BlockHandle {
    fn drop(&mut self) {
        POOL.release(self.slot);
    }
}

/// Shared read-only handle to a pool block.
///
/// Cloning bumps the refcount; the slot is freed when the last reference
/// drops.
pub struct BlockRef {
    slot: u8,
}

impl BlockRef {
    /// Pool slot index.
    pub fn slot(&self) -> u8 {
        self.slot
    }

    /// Reclaim exclusive access.
    ///
    /// Converts in place when this is the last reference; otherwise copies
    /// into a fresh block (`None` if the pool is exhausted).
    pub fn try_unshare(self) -> Option<BlockHandle> {
        if POOL.refcount(self.slot) == 1 {
            let slot = self.slot;
            core::mem::forget(self);
            return Some(BlockHandle::from_slot(slot));
        }
        let mut copy = BlockHandle::acquire()?;
        copy.copy_from_slice(&self[..]);
        Some(copy)
    }
}

impl Deref for BlockRef {
    type Target = [i16; AUDIO_BLOCK_SAMPLES];

    fn deref(&self) -> &Self::Target {
        // SAFETY: slot is live while a reference exists; shared handles
        // never write.
        unsafe { &*POOL.samples_ptr(self.slot) }
    }
}

impl Clone for BlockRef {
    fn clone(&self) -> Self {
        POOL.retain(self.slot);
        BlockRef { slot: self.slot }
    }
}

impl Drop for BlockRef {
    fn drop(&mut self) {
        POOL.release(self.slot);
    }
}

#[cfg(test)]
mod tests {
    use super::super::pool::{test_lock, POOL};
    use super::*;

    #[test]
    fn drop_releases() {
        let _guard = test_lock();
        POOL.reset();
        {
            let block = BlockHandle::acquire().unwrap();
            assert_eq!(POOL.refcount(block.slot()), 1);
        }
        assert_eq!(POOL.in_use(), 0);
    }

    #[test]
    fn share_keeps_one_reference() {
        let _guard = test_lock();
        POOL.reset();
        let mut block = BlockHandle::acquire().unwrap();
        block[0] = 77;
        let slot = block.slot();
        let shared = block.share();
        assert_eq!(shared.slot(), slot);
        assert_eq!(shared[0], 77);
        assert_eq!(POOL.refcount(slot), 1);
    }

    #[test]
    fn clone_counts_references() {
        let _guard = test_lock();
        POOL.reset();
        let shared = BlockHandle::acquire().unwrap().share();
        let slot = shared.slot();
        let second = shared.clone();
        assert_eq!(POOL.refcount(slot), 2);
        drop(shared);
        assert_eq!(POOL.refcount(slot), 1);
        drop(second);
        assert_eq!(POOL.in_use(), 0);
    }

    #[test]
    fn try_unshare_sole_owner_in_place() {
        let _guard = test_lock();
        POOL.reset();
        let mut block = BlockHandle::acquire().unwrap();
        block[3] = -9;
        let slot = block.slot();
        let back = block.share().try_unshare().unwrap();
        assert_eq!(back.slot(), slot);
        assert_eq!(back[3], -9);
    }

    #[test]
    fn try_unshare_copies_when_shared() {
        let _guard = test_lock();
        POOL.reset();
        let mut block = BlockHandle::acquire().unwrap();
        block[0] = 55;
        let shared = block.share();
        let keeper = shared.clone();
        let copy = shared.try_unshare().unwrap();
        assert_ne!(copy.slot(), keeper.slot());
        assert_eq!(copy[0], 55);
        assert_eq!(POOL.refcount(keeper.slot()), 1);
    }
}
