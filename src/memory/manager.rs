use crate::constants::{AUDIO_SAMPLE_RATE_EXACT, BYTES_PER_SAMPLE};

use super::serial::SharedSram;
use super::slot::MemSlot;

/// Number of external memory devices the allocator tracks.
pub const MAX_MEMORY_DEVICES: usize = 2;

/// Selects one of the installed external memory devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MemDevice {
    Zero,
    One,
}

impl MemDevice {
    fn index(self) -> usize {
        match self {
            MemDevice::Zero => 0,
            MemDevice::One => 1,
        }
    }
}

/// Bump-pointer allocator over the external memory devices.
///
/// Devices are installed once at graph-build time and carved into disjoint
/// [`MemSlot`]s from the bottom up. There is no free: the graph is wired
/// once and runs until power-off, so an allocator that can only grow never
/// fragments and needs no bookkeeping beyond one watermark per device.
pub struct MemoryManager<'d> {
    devices: [Option<&'d dyn SharedSram>; MAX_MEMORY_DEVICES],
    next_free: [u32; MAX_MEMORY_DEVICES],
}

impl<'d> MemoryManager<'d> {
    pub const fn new() -> Self {
        MemoryManager {
            devices: [None; MAX_MEMORY_DEVICES],
            next_free: [0; MAX_MEMORY_DEVICES],
        }
    }

    /// Install a device driver and initialize the hardware.
    pub fn add_device(&mut self, which: MemDevice, dev: &'d dyn SharedSram) {
        dev.begin();
        self.devices[which.index()] = Some(dev);
    }

    /// Unallocated bytes remaining on `which`.
    pub fn available_bytes(&self, which: MemDevice) -> u32 {
        match self.devices[which.index()] {
            Some(dev) => dev.spec().size_bytes - self.next_free[which.index()],
            None => 0,
        }
    }

    /// Carve a slot of `num_bytes` (rounded up to a whole word) out of
    /// `which`, zeroed and with its cursors rewound.
    ///
    /// Returns `None` for a zero-byte request, a missing device, or a
    /// request that does not fit in what is left; the watermark is
    /// untouched on failure, so a refused request never shrinks what a
    /// later, smaller one can get.
    pub fn request_memory(&mut self, which: MemDevice, num_bytes: u32) -> Option<MemSlot<'d>> {
        let index = which.index();
        let Some(dev) = self.devices[index] else {
            #[cfg(feature = "defmt")]
            defmt::warn!("memory request on missing device {}", which);
            return None;
        };
        let bytes = num_bytes.saturating_add(1) & !1;
        if bytes == 0 {
            // A zero-length slot has no words to address.
            return None;
        }
        let start = self.next_free[index];
        if u64::from(start) + u64::from(bytes) > u64::from(dev.spec().size_bytes) {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "memory exhausted: {} bytes requested, {} left",
                bytes,
                dev.spec().size_bytes - start
            );
            return None;
        }
        self.next_free[index] = start + bytes;
        let mut slot = MemSlot::new(dev, start, bytes);
        slot.clear();
        Some(slot)
    }

    /// Carve a slot sized to hold `millis` of audio at the codec rate.
    pub fn request_memory_ms(&mut self, which: MemDevice, millis: f32) -> Option<MemSlot<'d>> {
        let samples = libm::roundf(millis * AUDIO_SAMPLE_RATE_EXACT / 1000.0) as u32;
        self.request_memory(which, samples * BYTES_PER_SAMPLE as u32)
    }
}

impl Default for MemoryManager<'_> {
    fn default() -> Self {
        Self::new()
    }
}
