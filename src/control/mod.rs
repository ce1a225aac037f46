//! Control-loop-owned state.

pub mod volume;

pub use volume::VolumeAccumulator;
