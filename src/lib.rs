//! # bbd-audio
//!
//! A `no_std`, zero-allocation library of guitar-style audio effects for
//! ARM Cortex-M targets, built around one hard problem: serving
//! sample-accurate delay lines of arbitrary length from slow off-chip SPI
//! SRAM without stalling a hard-realtime audio callback.
//!
//! ## Architecture
//!
//! | Layer | Module | Purpose |
//! |-------|--------|---------|
//! | Memory | [`block`] | Fixed-size audio block pool with refcounted handles |
//! | Trait | [`node`] | `AudioNode`: one `update()` per audio block |
//! | External RAM | [`memory`] | SPI SRAM drivers (blocking + DMA), slots, manager |
//! | Delay | [`delay`] | Circular delay buffer over the block pool or a slot |
//! | DSP | [`dsp`] / [`filters`] | Q15 block math, cascaded biquad filters |
//! | Effects | [`effects`] | Analog-modeled delay, RMS meter |
//! | Control | [`midi`] | Per-effect MIDI CC parameter maps |
//!
//! ## Audio parameters
//!
//! - **Block size:** 128 samples ([`constants::AUDIO_BLOCK_SAMPLES`])
//! - **Sample rate:** 44 117.647 Hz ([`constants::AUDIO_SAMPLE_RATE_EXACT`])
//! - **Sample format:** `i16` (signed 16-bit)
//! - **Block pool:** 32 blocks ([`constants::POOL_SIZE`])
//!
//! ## The external-memory delay path
//!
//! An [`effects::AnalogDelay`] owns an [`delay::AudioDelayBuffer`] backed
//! either by pool blocks (short delays, no bus traffic) or by a
//! [`memory::MemSlot`] carved out of an off-chip SRAM by the
//! [`memory::MemoryManager`]. Per audio block the effect fetches the delayed
//! signal, regenerates the feedback path through a BBD-voiced biquad
//! cascade, pushes the result back into the line, and mixes the output,
//! with DMA transfers overlapping the arithmetic where the hardware allows.

#![no_std]

#[cfg(test)]
extern crate std;

pub mod constants;
pub mod block;
pub mod node;
pub mod dsp;
pub mod filters;
pub mod memory;
pub mod delay;
pub mod midi;

#[cfg(feature = "effects")]
pub mod effects;
