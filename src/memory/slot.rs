use super::serial::SharedSram;

/// Random-access request fell outside the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlotError {
    OutOfRange,
}

/// A contiguous, exclusively-owned range of one external memory device.
///
/// All addressing is in 16-bit words relative to the start of the slot.
/// Random access is bounds-checked; a failed request touches nothing. The
/// circular operations maintain independent read and write cursors that
/// wrap at the end of the slot, splitting a straddling burst in two, which
/// is what a delay line ring wants.
pub struct MemSlot<'d> {
    dev: &'d dyn SharedSram,
    start: u32,
    size_bytes: u32,
    write_pos: u32,
    read_pos: u32,
}

impl<'d> MemSlot<'d> {
    pub(crate) fn new(dev: &'d dyn SharedSram, start: u32, size_bytes: u32) -> Self {
        MemSlot {
            dev,
            start,
            size_bytes,
            write_pos: 0,
            read_pos: 0,
        }
    }

    /// Slot capacity in 16-bit words.
    pub fn size_words(&self) -> u32 {
        self.size_bytes / 2
    }

    fn addr_of(&self, offset_words: u32) -> u32 {
        self.start + offset_words * 2
    }

    fn check(&self, offset_words: u32, num_words: usize) -> Result<(), SlotError> {
        if u64::from(offset_words) + num_words as u64 > u64::from(self.size_words()) {
            return Err(SlotError::OutOfRange);
        }
        Ok(())
    }

    /// Write words at a fixed offset.
    pub fn write16(&mut self, offset_words: u32, src: &[i16]) -> Result<(), SlotError> {
        self.check(offset_words, src.len())?;
        self.dev.write16(self.addr_of(offset_words), src);
        Ok(())
    }

    /// Read words from a fixed offset.
    pub fn read16(&mut self, offset_words: u32, dst: &mut [i16]) -> Result<(), SlotError> {
        self.check(offset_words, dst.len())?;
        self.dev.read16(self.addr_of(offset_words), dst);
        Ok(())
    }

    /// Zero words at a fixed offset.
    pub fn zero16(&mut self, offset_words: u32, num_words: usize) -> Result<(), SlotError> {
        self.check(offset_words, num_words)?;
        self.dev.zero16(self.addr_of(offset_words), num_words);
        Ok(())
    }

    /// Words until the wrap point, for a burst of `num_words` at `pos`.
    fn head_len(&self, pos: u32, num_words: usize) -> usize {
        ((self.size_words() - pos) as usize).min(num_words)
    }

    /// Write words at the write cursor and advance it.
    pub fn write_advance16(&mut self, src: &[i16]) -> Result<(), SlotError> {
        let size = self.size_words();
        if src.len() > size as usize {
            return Err(SlotError::OutOfRange);
        }
        let head = self.head_len(self.write_pos, src.len());
        let (first, rest) = src.split_at(head);
        self.dev.write16(self.addr_of(self.write_pos), first);
        if !rest.is_empty() {
            self.dev.write16(self.addr_of(0), rest);
        }
        self.write_pos = (self.write_pos + src.len() as u32) % size;
        Ok(())
    }

    /// Zero words at the write cursor and advance it.
    pub fn zero_advance16(&mut self, num_words: usize) -> Result<(), SlotError> {
        let size = self.size_words();
        if num_words > size as usize {
            return Err(SlotError::OutOfRange);
        }
        let head = self.head_len(self.write_pos, num_words);
        self.dev.zero16(self.addr_of(self.write_pos), head);
        if head < num_words {
            self.dev.zero16(self.addr_of(0), num_words - head);
        }
        self.write_pos = (self.write_pos + num_words as u32) % size;
        Ok(())
    }

    /// Read words at the read cursor and advance it.
    pub fn read_advance16(&mut self, dst: &mut [i16]) -> Result<(), SlotError> {
        let size = self.size_words();
        let num_words = dst.len();
        if num_words > size as usize {
            return Err(SlotError::OutOfRange);
        }
        let head = self.head_len(self.read_pos, num_words);
        let (first, rest) = dst.split_at_mut(head);
        self.dev.read16(self.addr_of(self.read_pos), first);
        if !rest.is_empty() {
            self.dev.read16(self.addr_of(0), rest);
        }
        self.read_pos = (self.read_pos + num_words as u32) % size;
        Ok(())
    }

    /// Current write cursor, in words from the start of the slot.
    pub fn write_pos(&self) -> u32 {
        self.write_pos
    }

    /// Current read cursor, in words from the start of the slot.
    pub fn read_pos(&self) -> u32 {
        self.read_pos
    }

    /// Move the write cursor; wraps into range.
    pub fn set_write_pos(&mut self, offset_words: u32) {
        self.write_pos = offset_words % self.size_words();
    }

    /// Move the read cursor; wraps into range.
    pub fn set_read_pos(&mut self, offset_words: u32) {
        self.read_pos = offset_words % self.size_words();
    }

    /// Zero the whole slot and rewind both cursors.
    pub fn clear(&mut self) {
        self.dev.zero(self.start, self.size_bytes as usize);
        self.write_pos = 0;
        self.read_pos = 0;
    }

    /// True while a queued write against this slot's device is in flight.
    pub fn is_write_busy(&self) -> bool {
        self.dev.is_write_busy()
    }

    /// True while a queued read against this slot's device is in flight.
    pub fn is_read_busy(&self) -> bool {
        self.dev.is_read_busy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::serial::{SpiSram, SramCell, SramSpec};
    use crate::memory::sim::{SimCsPin, SimSpiBus, SramModel};

    fn device(spec: SramSpec) -> SramCell<SpiSram<SimSpiBus, SimCsPin>> {
        let model = SramModel::shared(spec);
        SramCell::new(SpiSram::new(
            SimSpiBus::new(&model),
            SimCsPin::new(&model),
            spec,
        ))
    }

    fn slot(dev: &SramCell<SpiSram<SimSpiBus, SimCsPin>>, words: u32) -> MemSlot<'_> {
        dev.begin();
        MemSlot::new(dev, 0, words * 2)
    }

    #[test]
    fn random_access_round_trip() {
        let dev = device(SramSpec::MC_23LC1024);
        let mut slot = slot(&dev, 256);
        let src: [i16; 32] = core::array::from_fn(|i| -(i as i16) * 41);
        slot.write16(100, &src).unwrap();
        let mut dst = [0i16; 32];
        slot.read16(100, &mut dst).unwrap();
        assert_eq!(dst, src);
    }

    #[test]
    fn out_of_range_has_no_side_effects() {
        let dev = device(SramSpec::MC_23LC1024);
        let mut slot = slot(&dev, 64);
        slot.write16(0, &[0x7FFF; 64]).unwrap();
        // One word too long; nothing may be written.
        assert_eq!(slot.write16(1, &[0i16; 64]), Err(SlotError::OutOfRange));
        assert_eq!(slot.read16(60, &mut [0i16; 8]), Err(SlotError::OutOfRange));
        assert_eq!(slot.zero16(64, 1), Err(SlotError::OutOfRange));
        let mut dst = [0i16; 64];
        slot.read16(0, &mut dst).unwrap();
        assert_eq!(dst, [0x7FFF; 64]);
    }

    #[test]
    fn circular_write_wraps_and_splits() {
        let dev = device(SramSpec::MC_23LC1024);
        let mut slot = slot(&dev, 100);
        slot.set_write_pos(90);
        let src: [i16; 20] = core::array::from_fn(|i| 1 + i as i16);
        slot.write_advance16(&src).unwrap();
        assert_eq!(slot.write_pos(), 10);
        let mut tail = [0i16; 10];
        slot.read16(90, &mut tail).unwrap();
        assert_eq!(tail, src[..10]);
        let mut head = [0i16; 10];
        slot.read16(0, &mut head).unwrap();
        assert_eq!(head, src[10..]);
    }

    #[test]
    fn circular_read_follows_writes() {
        let dev = device(SramSpec::MC_23LC1024);
        let mut slot = slot(&dev, 96);
        for round in 0..4i16 {
            let src: [i16; 40] = core::array::from_fn(|i| round * 100 + i as i16);
            slot.write_advance16(&src).unwrap();
            let mut dst = [0i16; 40];
            slot.read_advance16(&mut dst).unwrap();
            assert_eq!(dst, src);
            assert_eq!(slot.read_pos(), slot.write_pos());
        }
    }

    // Landing exactly on the end of the slot must snap the cursor to the
    // start, not leave it one-past-the-end.
    #[test]
    fn exact_end_snaps_to_start() {
        let dev = device(SramSpec::MC_23LC1024);
        let mut slot = slot(&dev, 128);
        slot.write_advance16(&[5i16; 128]).unwrap();
        assert_eq!(slot.write_pos(), 0);
        slot.set_read_pos(64);
        let mut dst = [0i16; 64];
        slot.read_advance16(&mut dst).unwrap();
        assert_eq!(slot.read_pos(), 0);
    }

    #[test]
    fn full_lap_then_partial_overwrite() {
        let dev = device(SramSpec::MC_23LC1024);
        let mut slot = slot(&dev, 256);
        let lap: [i16; 256] = core::array::from_fn(|i| i as i16);
        slot.write_advance16(&lap).unwrap();
        slot.set_read_pos(0);
        let mut dst = [0i16; 256];
        slot.read_advance16(&mut dst).unwrap();
        assert_eq!(dst, lap);
        // The cursor snapped to the start, so the next write lands on the
        // oldest two words.
        slot.write_advance16(&[256, 257]).unwrap();
        slot.set_read_pos(0);
        slot.read_advance16(&mut dst).unwrap();
        assert_eq!(&dst[..2], &[256, 257]);
        assert_eq!(&dst[2..], &lap[2..]);
    }

    #[test]
    fn zero_advance_moves_write_cursor() {
        let dev = device(SramSpec::MC_23LC1024);
        let mut slot = slot(&dev, 50);
        slot.write_advance16(&[123i16; 50]).unwrap();
        slot.set_write_pos(40);
        slot.zero_advance16(20).unwrap();
        assert_eq!(slot.write_pos(), 10);
        let mut dst = [0i16; 50];
        slot.read16(0, &mut dst).unwrap();
        assert_eq!(&dst[..10], &[0i16; 10]);
        assert_eq!(&dst[10..40], &[123i16; 30]);
        assert_eq!(&dst[40..], &[0i16; 10]);
    }

    #[test]
    fn clear_rewinds_and_zeroes() {
        let dev = device(SramSpec::MC_23LC1024);
        let mut slot = slot(&dev, 64);
        slot.write_advance16(&[42i16; 30]).unwrap();
        slot.clear();
        assert_eq!(slot.write_pos(), 0);
        assert_eq!(slot.read_pos(), 0);
        let mut dst = [1i16; 64];
        slot.read16(0, &mut dst).unwrap();
        assert_eq!(dst, [0i16; 64]);
    }
}
