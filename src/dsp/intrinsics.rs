//! ARM DSP instruction wrappers with pure-Rust fallbacks.
//!
//! On `thumbv7em` targets (Cortex-M4/M7 with the DSP extension) these
//! compile to single instructions; elsewhere (host tests, Cortex-M0) an
//! equivalent pure-Rust form is used.

/// Saturate an `i32` to `i16` range (`-32768..=32767`).
///
/// Maps to ARM `SSAT #16`.
#[inline(always)]
pub fn saturate16(val: i32) -> i16 {
    #[cfg(all(target_arch = "arm", target_feature = "dsp"))]
    {
        let out: i32;
        unsafe {
            core::arch::asm!(
                "ssat {out}, #16, {val}",
                out = out(reg) out,
                val = in(reg) val,
            );
        }
        out as i16
    }
    #[cfg(not(all(target_arch = "arm", target_feature = "dsp")))]
    {
        if val > 32767 {
            32767
        } else if val < -32768 {
            -32768
        } else {
            val as i16
        }
    }
}

/// Saturate an `i64` accumulator to `i32` range.
///
/// The Q31 biquad cascade narrows its 64-bit accumulator through this.
#[inline(always)]
pub fn saturate32(val: i64) -> i32 {
    if val > i64::from(i32::MAX) {
        i32::MAX
    } else if val < i64::from(i32::MIN) {
        i32::MIN
    } else {
        val as i32
    }
}
