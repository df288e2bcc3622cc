//! Delay-line storage for time-based effects.
//!
//! Short delays keep whole audio blocks in the on-chip pool; long delays
//! stream through a slot of external serial SRAM. [`AudioDelayBuffer`]
//! hides the difference behind one push/fetch surface so an effect is
//! written once and sized at build time.

mod buffer;

pub use buffer::{interpolate_fraction, AudioDelayBuffer};
