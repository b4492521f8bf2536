//! Reference effects built on the canvas contract.
//!
//! - [`StaticColor`]: generative, single pass
//! - [`BrightnessPulse`]: post-process, single pass
//! - [`Bloom`]: post-process, two private blur passes before the composite

mod bloom;
mod brightness_pulse;
mod static_color;

pub use bloom::Bloom;
pub use brightness_pulse::BrightnessPulse;
pub use static_color::StaticColor;
