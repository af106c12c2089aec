//! Cadena - end-to-end latency analysis for publish/subscribe callback traces
//!
//! This library builds a typed graph model of a declared callback-driven
//! application, derives every causal path from its start nodes to its end
//! nodes, correlates a captured trace into per-edge latency samples, and
//! composes per-path latency distributions by histogram convolution.

pub mod arch;
pub mod cli;
pub mod config;
pub mod correlation;
pub mod dot_output;
pub mod flame_output;
pub mod json_output;
pub mod model;
pub mod path_search;
pub mod stats;
pub mod trace_event;
pub mod transient;
