/// Number of 16-bit samples per audio block.
pub const AUDIO_BLOCK_SAMPLES: usize = 128;

/// Number of audio blocks in the global pool.
pub const POOL_SIZE: usize = 32;

/// Exact audio sample rate in Hz (set by the codec master-clock PLL).
pub const AUDIO_SAMPLE_RATE_EXACT: f32 = 44_117.647;

/// Bytes of external memory consumed per delayed sample.
pub const BYTES_PER_SAMPLE: usize = 2;
