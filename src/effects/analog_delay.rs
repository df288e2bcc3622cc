use crate::block::{BlockHandle, BlockRef};
use crate::constants::{AUDIO_BLOCK_SAMPLES, AUDIO_SAMPLE_RATE_EXACT};
use crate::delay::AudioDelayBuffer;
use crate::dsp::helpers::{add_scaled, alpha_blend, apply_gain, q15_from_float, Q15_UNITY};
use crate::filters::{BiquadCascadeQ31, FilterPreset};
use crate::midi::{switch_on, unit_value, ControlMap};
use crate::node::AudioNode;

/// MIDI-controllable parameters of [`AnalogDelay`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DelayParam {
    Bypass,
    Delay,
    Feedback,
    Mix,
    Volume,
}

const NUM_DELAY_PARAMS: usize = 5;

/// Bucket-brigade style delay with a filtered feedback path.
///
/// One input, one output. Each update fetches the signal `delay` samples
/// back from the line, colors it with the feedback filter, regenerates the
/// line input as `dry + feedback·wet` with saturating Q15 arithmetic, and
/// blends `dry`/`wet` by `mix` into the output. All blend coefficients are
/// Q15 held in `i32`, so `mix = 1.0` and `volume = 1.0` are bit-exact
/// passthroughs of the wet and blended signal respectively.
///
/// The fetch happens before the push, which costs one block of inherent
/// pipeline latency; `delay` therefore clamps to no less than one block.
pub struct AnalogDelay<'d> {
    line: AudioDelayBuffer<'d>,
    filter: Option<BiquadCascadeQ31>,
    controls: ControlMap<DelayParam, NUM_DELAY_PARAMS>,
    /// Block pushed last update, held while a DMA write may be in flight.
    pending_release: Option<BlockRef>,
    delay_samples: usize,
    feedback: i32,
    mix: i32,
    volume: i32,
    enabled: bool,
    bypass: bool,
}

impl<'d> AnalogDelay<'d> {
    /// Wrap a delay line. The effect starts disabled with a one-block
    /// delay, no feedback, a half-wet mix, and unity volume.
    pub fn new(line: AudioDelayBuffer<'d>) -> Self {
        AnalogDelay {
            line,
            filter: None,
            controls: ControlMap::new(),
            pending_release: None,
            delay_samples: AUDIO_BLOCK_SAMPLES,
            feedback: 0,
            mix: Q15_UNITY / 2,
            volume: Q15_UNITY,
            enabled: false,
            bypass: false,
        }
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn bypass(&mut self, bypass: bool) {
        self.bypass = bypass;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypass
    }

    /// Set the delay in milliseconds at the codec sample rate.
    pub fn delay(&mut self, millis: f32) {
        let samples = libm::roundf(millis * AUDIO_SAMPLE_RATE_EXACT / 1000.0) as usize;
        self.delay_samples(samples);
    }

    /// Set the delay in samples, clamped to one block at the short end and
    /// the line's reach at the long end.
    pub fn delay_samples(&mut self, samples: usize) {
        let max = self.line.max_delay_samples().max(AUDIO_BLOCK_SAMPLES);
        self.delay_samples = samples.clamp(AUDIO_BLOCK_SAMPLES, max);
    }

    /// Set the delay as a fraction `0.0..=1.0` of the line's maximum.
    pub fn delay_fraction_max(&mut self, fraction: f32) {
        let max = self.line.max_delay_samples() as f32;
        let samples = libm::roundf(fraction.clamp(0.0, 1.0) * max) as usize;
        self.delay_samples(samples);
    }

    /// Feedback amount, `0.0..=1.0`. Values at 1.0 self-oscillate.
    pub fn feedback(&mut self, feedback: f32) {
        self.feedback = q15_from_float(feedback);
    }

    /// Dry/wet balance: 0.0 is all dry, 1.0 all wet.
    pub fn mix(&mut self, mix: f32) {
        self.mix = q15_from_float(mix);
    }

    /// Output level, `0.0..=1.0`.
    pub fn volume(&mut self, volume: f32) {
        self.volume = q15_from_float(volume);
    }

    /// Color the repeats with a built-in voicing.
    pub fn set_filter(&mut self, preset: FilterPreset) {
        self.filter = Some(BiquadCascadeQ31::from_preset(preset));
    }

    /// Color the repeats with caller-supplied coefficients (CMSIS layout).
    pub fn set_filter_coeffs(&mut self, num_stages: usize, coeffs: &[i32], post_shift: u8) {
        self.filter = Some(BiquadCascadeQ31::new(num_stages, coeffs, post_shift));
    }

    /// Remove the feedback filter; repeats pass unfiltered.
    pub fn clear_filter(&mut self) {
        self.filter = None;
    }

    /// Bind `param` to control changes on `(channel, control)`.
    pub fn map_midi_control(&mut self, param: DelayParam, channel: u8, control: u8) {
        self.controls.assign(channel, control, param);
    }

    /// Apply one incoming MIDI control change, if it is mapped.
    pub fn process_midi(&mut self, channel: u8, control: u8, value: u8) {
        let Some(param) = self.controls.lookup(channel, control) else {
            return;
        };
        match param {
            DelayParam::Bypass => self.bypass(switch_on(value)),
            DelayParam::Delay => self.delay_fraction_max(unit_value(value)),
            DelayParam::Feedback => self.feedback(unit_value(value)),
            DelayParam::Mix => self.mix(unit_value(value)),
            DelayParam::Volume => self.volume(unit_value(value)),
        }
    }
}

impl AudioNode for AnalogDelay<'_> {
    const NUM_INPUTS: usize = 1;
    const NUM_OUTPUTS: usize = 1;

    fn update(&mut self, inputs: &[Option<BlockRef>], outputs: &mut [Option<BlockRef>]) {
        // Whatever was pushed last update has cleared the bus by now.
        self.pending_release = None;

        if !self.enabled {
            self.line.purge();
            outputs[0] = None;
            return;
        }

        let input = inputs.first().and_then(Option::as_ref);

        if self.bypass {
            outputs[0] = match input {
                Some(block) => Some(block.clone()),
                None => BlockHandle::acquire().map(BlockHandle::share),
            };
            return;
        }

        // No signal this cycle: transmit silence and leave the line alone
        // rather than letting the tail keep ringing out of it.
        let Some(input) = input else {
            outputs[0] = BlockHandle::acquire().map(BlockHandle::share);
            return;
        };

        let Some(mut wet) = BlockHandle::acquire() else {
            outputs[0] = Some(input.clone());
            return;
        };
        // The block pushed below lands at offset 0, so a delay of
        // `delay_samples` means fetching one block less far back.
        let fetch_offset = self.delay_samples - AUDIO_BLOCK_SAMPLES;
        self.line.get_samples(&mut wet, fetch_offset);
        self.line.wait_read();
        if let Some(filter) = self.filter.as_mut() {
            filter.process_block(&mut wet[..]);
        }

        let Some(mut line_in) = BlockHandle::acquire() else {
            outputs[0] = Some(input.clone());
            return;
        };
        let dry: &[i16; AUDIO_BLOCK_SAMPLES] = input;
        *line_in = *dry;
        add_scaled(&mut line_in, &wet, self.feedback);
        self.pending_release = self.line.add_block(line_in.share());

        let Some(mut out) = BlockHandle::acquire() else {
            outputs[0] = Some(input.clone());
            return;
        };
        alpha_blend(&mut out, dry, &wet, self.mix);
        apply_gain(&mut out, self.volume);
        outputs[0] = Some(out.share());
    }
}
