//! statstream - streaming Linux metrics sampler.
//!
//! Provides:
//! - `collector` - metric sources, entity discovery and the sampling cycle
//! - `sampler` - counter-to-rate conversion with per-entity baselines
//! - `output` - streaming JSON writer and buffered sink
//! - `config` - sampler configuration
//!
//! The `statstreamd` binary drives these in a fixed-interval loop.

pub mod collector;
pub mod config;
pub mod output;
pub mod sampler;
