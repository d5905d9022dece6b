//! Channel layer for pattern matching and PTY operations.
//!
//! Output from the device is accumulated in a [`PatternBuffer`], ANSI
//! escapes are stripped, and only the tail is searched for the awaited
//! prompt.

mod buffer;
pub mod patterns;
mod pty;

pub use buffer::PatternBuffer;
pub use patterns::{any_of, compile_expect};
pub use pty::PtyChannel;
