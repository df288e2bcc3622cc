//! Built-in feedback-path voicings for the analog-modeled delay.
//!
//! Each table is CMSIS layout (`b0 b1 b2 a1 a2` per stage, denominator
//! negated) in Q31 with a per-table post-shift. All three are lowpass
//! cascades designed at the codec sample rate; they differ in how hard and
//! how early they roll off, which is what separates one BBD pedal's repeats
//! from another's.

/// Selects one of the built-in feedback coefficient tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FilterPreset {
    /// 8th-order Chebyshev-I voicing, ~3.2 kHz: present, slightly mid-forward
    /// repeats in the style of the DM-3.
    Dm3,
    /// 8th-order Butterworth, ~2.0 kHz: smooth, rounded repeats.
    Warm,
    /// 6th-order Chebyshev-II, ~1.3 kHz: murky, fast-dying repeats.
    Dark,
}

impl FilterPreset {
    /// Coefficient table, stage count, and post-shift for this preset.
    pub fn table(self) -> (&'static [i32], usize, u8) {
        match self {
            FilterPreset::Dm3 => (&DM3[..], 4, 2),
            FilterPreset::Warm => (&WARM[..], 4, 2),
            FilterPreset::Dark => (&DARK[..], 3, 1),
        }
    }
}

/// Chebyshev-I (0.5 dB ripple), 8th order, fc ≈ 3.2 kHz, shift 2.
static DM3: [i32; 20] = [
    27186175, 54372350, 27186175, 944783395, -516657183, //
    19502090, 39004179, 19502090, 939367082, -480504528, //
    9366387, 18732773, 9366387, 952530864, -453125499, //
    2297606, 4595213, 2297606, 965850171, -438169684,
];

/// Butterworth, 8th order, fc ≈ 2.0 kHz, shift 2.
static WARM: [i32; 20] = [
    10253875, 20507749, 10253875, 976922248, -481066834, //
    9355461, 18710921, 9355461, 891327213, -391878143, //
    8767518, 17535036, 8767518, 835311884, -333511044, //
    8479131, 16958262, 8479131, 807836251, -304881862,
];

/// Chebyshev-II (35 dB stopband), 6th order, fc ≈ 1.3 kHz, shift 1.
static DARK: [i32; 15] = [
    46602580, -71955064, 46602580, 2074637816, -1022146089, //
    395320629, -763845568, 395320629, 1942939184, -895993050, //
    1020957085, -2004534592, 1020957085, 1771388752, -735026505,
];
