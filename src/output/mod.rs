//! JSON stream output.
//!
//! - `sink` - bounded, explicitly flushed byte destination
//! - `json` - structural JSON writer on top of the sink

pub mod json;
pub mod sink;

pub use json::{JsonError, JsonWriter};
pub use sink::{DEFAULT_CAPACITY, OutputSink};
