use crate::dsp::intrinsics::{saturate16, saturate32};

use super::presets::FilterPreset;

/// Largest supported cascade: four biquads = an 8th-order filter.
pub const MAX_BIQUAD_STAGES: usize = 4;

/// Fixed-point cascaded biquad, direct form 1.
///
/// Coefficients and state are Q31; each per-sample accumulation runs in a
/// 64-bit accumulator, so this single implementation covers both the plain
/// and the high-quality fixed flavors. Audio samples enter and leave as
/// `i16` PCM. In-place processing is the normal mode of operation.
pub struct BiquadCascadeQ31 {
    num_stages: usize,
    post_shift: u8,
    coeffs: [i32; 5 * MAX_BIQUAD_STAGES],
    /// Per stage: `x[n-1], x[n-2], y[n-1], y[n-2]`, Q31.
    state: [i32; 4 * MAX_BIQUAD_STAGES],
}

impl BiquadCascadeQ31 {
    /// Build a cascade from `num_stages × 5` Q31 coefficients.
    ///
    /// `post_shift` scales every coefficient by `2^post_shift`. Stage count
    /// is clamped to [`MAX_BIQUAD_STAGES`], the shift to 30.
    pub fn new(num_stages: usize, coeffs: &[i32], post_shift: u8) -> Self {
        let num_stages = num_stages.min(MAX_BIQUAD_STAGES);
        let post_shift = post_shift.min(30);
        let mut table = [0i32; 5 * MAX_BIQUAD_STAGES];
        table[..5 * num_stages].copy_from_slice(&coeffs[..5 * num_stages]);
        BiquadCascadeQ31 {
            num_stages,
            post_shift,
            coeffs: table,
            state: [0; 4 * MAX_BIQUAD_STAGES],
        }
    }

    /// Build one of the built-in BBD voicings.
    pub fn from_preset(preset: FilterPreset) -> Self {
        let (coeffs, stages, shift) = preset.table();
        Self::new(stages, coeffs, shift)
    }

    /// Number of active stages.
    pub fn num_stages(&self) -> usize {
        self.num_stages
    }

    /// Zero the filter history.
    pub fn reset(&mut self) {
        self.state = [0; 4 * MAX_BIQUAD_STAGES];
    }

    /// Filter a block of samples in place.
    pub fn process_block(&mut self, samples: &mut [i16]) {
        let shift = 31 - u32::from(self.post_shift);
        for sample in samples.iter_mut() {
            let mut x = i32::from(*sample) << 16;
            for stage in 0..self.num_stages {
                let c = &self.coeffs[5 * stage..5 * stage + 5];
                let s = &mut self.state[4 * stage..4 * stage + 4];
                let acc = i64::from(c[0]) * i64::from(x)
                    + i64::from(c[1]) * i64::from(s[0])
                    + i64::from(c[2]) * i64::from(s[1])
                    + i64::from(c[3]) * i64::from(s[2])
                    + i64::from(c[4]) * i64::from(s[3]);
                let y = saturate32(acc >> shift);
                s[1] = s[0];
                s[0] = x;
                s[3] = s[2];
                s[2] = y;
                x = y;
            }
            // Round on the way back down to Q15; widen so a saturated
            // stage output cannot overflow the rounding add.
            *sample = saturate16(((i64::from(x) + (1 << 15)) >> 16) as i32);
        }
    }
}

/// Single-precision cascaded biquad, direct form 1.
///
/// Same layout and shift convention as [`BiquadCascadeQ31`]; useful on
/// FPU-equipped cores and for validating fixed-point voicings.
pub struct BiquadCascadeF32 {
    num_stages: usize,
    coeffs: [f32; 5 * MAX_BIQUAD_STAGES],
    state: [f32; 4 * MAX_BIQUAD_STAGES],
}

impl BiquadCascadeF32 {
    /// Build a cascade from `num_stages × 5` coefficients.
    pub fn new(num_stages: usize, coeffs: &[f32]) -> Self {
        let num_stages = num_stages.min(MAX_BIQUAD_STAGES);
        let mut table = [0f32; 5 * MAX_BIQUAD_STAGES];
        table[..5 * num_stages].copy_from_slice(&coeffs[..5 * num_stages]);
        BiquadCascadeF32 {
            num_stages,
            coeffs: table,
            state: [0.0; 4 * MAX_BIQUAD_STAGES],
        }
    }

    /// Build from Q31 tables, undoing the post-shift.
    pub fn from_q31(num_stages: usize, coeffs: &[i32], post_shift: u8) -> Self {
        let num_stages = num_stages.min(MAX_BIQUAD_STAGES);
        let scale = (1u32 << post_shift.min(30)) as f32 / 2_147_483_648.0;
        let mut table = [0f32; 5 * MAX_BIQUAD_STAGES];
        for (dst, &src) in table.iter_mut().zip(coeffs.iter().take(5 * num_stages)) {
            *dst = src as f32 * scale;
        }
        BiquadCascadeF32 {
            num_stages,
            coeffs: table,
            state: [0.0; 4 * MAX_BIQUAD_STAGES],
        }
    }

    /// Zero the filter history.
    pub fn reset(&mut self) {
        self.state = [0.0; 4 * MAX_BIQUAD_STAGES];
    }

    /// Filter a block of samples in place.
    pub fn process_block(&mut self, samples: &mut [i16]) {
        for sample in samples.iter_mut() {
            let mut x = f32::from(*sample);
            for stage in 0..self.num_stages {
                let c = &self.coeffs[5 * stage..5 * stage + 5];
                let s = &mut self.state[4 * stage..4 * stage + 4];
                let y = c[0] * x + c[1] * s[0] + c[2] * s[1] + c[3] * s[2] + c[4] * s[3];
                s[1] = s[0];
                s[0] = x;
                s[3] = s[2];
                s[2] = y;
                x = y;
            }
            *sample = saturate16(x as i32);
        }
    }
}
