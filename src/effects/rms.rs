use crate::block::BlockRef;
use crate::constants::AUDIO_BLOCK_SAMPLES;
use crate::node::AudioNode;

/// RMS level meter: one input, no outputs.
///
/// Accumulates sum-of-squares across updates; `read` returns the level
/// since the previous read, normalized to `0.0..=1.0`, and restarts the
/// measurement. Blocks pass through untouched (the node holds no handles),
/// so metering a tap point costs one refcount clone at the graph level.
pub struct AnalyzeRms {
    accum: u64,
    count: u32,
}

impl AnalyzeRms {
    pub const fn new() -> Self {
        AnalyzeRms { accum: 0, count: 0 }
    }

    /// True once at least one block has been accumulated.
    pub fn available(&self) -> bool {
        self.count > 0
    }

    /// The RMS level since the last read, in `0.0..=1.0` of full scale.
    pub fn read(&mut self) -> f32 {
        if self.count == 0 {
            return 0.0;
        }
        let mean = self.accum as f32 / self.count as f32;
        self.accum = 0;
        self.count = 0;
        libm::sqrtf(mean) / 32767.0
    }
}

impl Default for AnalyzeRms {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioNode for AnalyzeRms {
    const NUM_INPUTS: usize = 1;
    const NUM_OUTPUTS: usize = 0;

    fn update(&mut self, inputs: &[Option<BlockRef>], _outputs: &mut [Option<BlockRef>]) {
        if let Some(block) = inputs.first().and_then(Option::as_ref) {
            for &sample in block.iter() {
                let wide = i64::from(sample);
                self.accum += (wide * wide) as u64;
            }
            self.count += AUDIO_BLOCK_SAMPLES as u32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::pool::{test_lock, POOL};
    use crate::block::BlockHandle;

    fn block_of(value: i16) -> BlockRef {
        let mut block = BlockHandle::acquire().unwrap();
        block.fill(value);
        block.share()
    }

    #[test]
    fn silence_reads_zero() {
        let _guard = test_lock();
        POOL.reset();
        let mut meter = AnalyzeRms::new();
        assert!(!meter.available());
        assert_eq!(meter.read(), 0.0);
        let mut outputs = [];
        meter.update(&[Some(block_of(0))], &mut outputs);
        assert!(meter.available());
        assert_eq!(meter.read(), 0.0);
    }

    #[test]
    fn dc_level_reads_its_amplitude() {
        let _guard = test_lock();
        POOL.reset();
        let mut meter = AnalyzeRms::new();
        let mut outputs = [];
        for _ in 0..4 {
            meter.update(&[Some(block_of(16384))], &mut outputs);
        }
        let level = meter.read();
        assert!((level - 16384.0 / 32767.0).abs() < 1e-3, "level {level}");
        // Reading restarts the measurement.
        assert!(!meter.available());
    }

    #[test]
    fn missing_input_accumulates_nothing() {
        let _guard = test_lock();
        POOL.reset();
        let mut meter = AnalyzeRms::new();
        let mut outputs = [];
        meter.update(&[None], &mut outputs);
        assert!(!meter.available());
    }
}
