//! Cascaded biquad (second-order IIR) filters.
//!
//! These color the feedback path of the analog-modeled delay to emulate the
//! bandwidth of a bucket-brigade device. The coefficient layout follows the
//! CMSIS-DSP `arm_biquad_cascade_df1` convention: five coefficients per
//! stage `{b0, b1, b2, a1, a2}` with the denominator terms negated, plus a
//! post-shift so that `actual = stored × 2^shift` (fixed-point coefficients
//! larger than 1.0 stay representable).

mod biquad;
mod presets;

pub use biquad::{BiquadCascadeF32, BiquadCascadeQ31, MAX_BIQUAD_STAGES};
pub use presets::FilterPreset;
