//! Effect and analyzer nodes built on the delay and filter layers.

mod analog_delay;
mod rms;


pub use analog_delay::{AnalogDelay, DelayParam};
pub use rms::AnalyzeRms;
