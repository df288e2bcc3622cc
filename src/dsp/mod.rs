//! Fixed-point DSP primitives shared by the effects.

pub mod intrinsics;
pub mod helpers;
