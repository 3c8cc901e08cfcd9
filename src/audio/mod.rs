#[cfg(feature = "playback")]
pub mod device;
pub mod playback;
pub mod synth;
