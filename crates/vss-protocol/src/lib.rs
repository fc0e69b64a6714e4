//! # vss-protocol
//!
//! Wire-level protocol for the VSS telemetry feed: newline-delimited
//! UTF-8 text, one `path=value` message per line.
//!
//! This crate provides:
//! - `LineFramer`: reassembles discrete messages from a byte stream
//! - `parse_signal`: splits a framed message into path and raw value

pub mod framer;
pub mod message;

pub use framer::{FrameError, LineFramer};
pub use message::{parse_signal, ParseError, ParsedSignal};
