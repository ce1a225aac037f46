//! Flow sensor subsystem.
//!
//! [`pulse_counter`] is the only state shared with the edge context;
//! [`flow`] turns a drained count into rate and volume.

pub mod flow;
pub mod pulse_counter;

pub use flow::FlowSample;
pub use pulse_counter::PulseCounter;
