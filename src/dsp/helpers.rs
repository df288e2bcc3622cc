//! Block-level Q15 helper functions.
//!
//! Mix coefficients are Q15 values carried in an `i32` so that unity is
//! exactly [`Q15_UNITY`] (32768); an `i16` tops out one LSB short of 1.0,
//! which would make "mix = 100% wet" and "volume = 1.0" lossy.

use crate::constants::AUDIO_BLOCK_SAMPLES;
use crate::dsp::intrinsics::saturate16;

/// Exact unity for Q15 coefficients held in `i32`.
pub const Q15_UNITY: i32 = 32768;

/// Convert a `0.0..=1.0` float control value to an exact-unity Q15 `i32`.
pub fn q15_from_float(value: f32) -> i32 {
    let clamped = value.clamp(0.0, 1.0);
    (clamped * Q15_UNITY as f32 + 0.5) as i32
}

/// Crossfade `dry` and `wet` into `dst`: `(dry·(1−α) + wet·α)`.
///
/// `alpha` is Q15 in `0..=Q15_UNITY`; the endpoints reproduce the inputs
/// bit-exactly.
pub fn alpha_blend(
    dst: &mut [i16; AUDIO_BLOCK_SAMPLES],
    dry: &[i16; AUDIO_BLOCK_SAMPLES],
    wet: &[i16; AUDIO_BLOCK_SAMPLES],
    alpha: i32,
) {
    let inv = Q15_UNITY - alpha;
    for i in 0..AUDIO_BLOCK_SAMPLES {
        let acc = i32::from(dry[i]) * inv + i32::from(wet[i]) * alpha;
        dst[i] = saturate16(acc >> 15);
    }
}

/// Scale every sample by a Q15 gain (values above `Q15_UNITY` boost).
pub fn apply_gain(block: &mut [i16; AUDIO_BLOCK_SAMPLES], gain: i32) {
    if gain == Q15_UNITY {
        return;
    }
    for sample in block.iter_mut() {
        *sample = saturate16((i32::from(*sample) * gain) >> 15);
    }
}

/// Saturating `dst[i] += src[i] · gain`, the delay feedback regeneration.
pub fn add_scaled(
    dst: &mut [i16; AUDIO_BLOCK_SAMPLES],
    src: &[i16; AUDIO_BLOCK_SAMPLES],
    gain: i32,
) {
    if gain == 0 {
        return;
    }
    for (d, &s) in dst.iter_mut().zip(src.iter()) {
        let scaled = (i32::from(s) * gain) >> 15;
        *d = saturate16(i32::from(*d) + scaled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn q15_endpoints_are_exact() {
        assert_eq!(q15_from_float(0.0), 0);
        assert_eq!(q15_from_float(1.0), Q15_UNITY);
        assert_eq!(q15_from_float(2.0), Q15_UNITY);
        assert_eq!(q15_from_float(0.5), 16384);
    }

    #[test]
    fn alpha_blend_full_wet_is_exact() {
        let dry = [1234i16; AUDIO_BLOCK_SAMPLES];
        let mut wet = [0i16; AUDIO_BLOCK_SAMPLES];
        wet[0] = 1;
        wet[1] = -32768;
        let mut dst = [0i16; AUDIO_BLOCK_SAMPLES];
        alpha_blend(&mut dst, &dry, &wet, Q15_UNITY);
        assert_eq!(dst, wet);
    }

    #[test]
    fn alpha_blend_full_dry_is_exact() {
        let mut dry = [0i16; AUDIO_BLOCK_SAMPLES];
        dry[7] = -1;
        let wet = [9999i16; AUDIO_BLOCK_SAMPLES];
        let mut dst = [0i16; AUDIO_BLOCK_SAMPLES];
        alpha_blend(&mut dst, &dry, &wet, 0);
        assert_eq!(dst, dry);
    }

    #[test]
    fn alpha_blend_midpoint() {
        let dry = [1000i16; AUDIO_BLOCK_SAMPLES];
        let wet = [3000i16; AUDIO_BLOCK_SAMPLES];
        let mut dst = [0i16; AUDIO_BLOCK_SAMPLES];
        alpha_blend(&mut dst, &dry, &wet, 16384);
        assert_eq!(dst[0], 2000);
    }

    #[test]
    fn apply_gain_unity_is_identity() {
        let mut block = [0i16; AUDIO_BLOCK_SAMPLES];
        block[0] = 1; // would be destroyed by a 32767 multiply
        block[1] = -32768;
        let reference = block;
        apply_gain(&mut block, Q15_UNITY);
        assert_eq!(block, reference);
    }

    #[test]
    fn apply_gain_half_and_boost() {
        let mut block = [10000i16; AUDIO_BLOCK_SAMPLES];
        apply_gain(&mut block, 16384);
        assert_eq!(block[0], 5000);
        apply_gain(&mut block, 4 * Q15_UNITY);
        assert_eq!(block[0], 20000);
    }

    #[test]
    fn add_scaled_saturates() {
        let mut dst = [32000i16; AUDIO_BLOCK_SAMPLES];
        let src = [32000i16; AUDIO_BLOCK_SAMPLES];
        add_scaled(&mut dst, &src, 16384);
        assert_eq!(dst[0], 32767);
    }

    #[test]
    fn add_scaled_half_gain() {
        let mut dst = [100i16; AUDIO_BLOCK_SAMPLES];
        let src = [2000i16; AUDIO_BLOCK_SAMPLES];
        add_scaled(&mut dst, &src, 16384);
        assert_eq!(dst[0], 1100);
    }
}
