//! Recorder backends.

pub mod memory;

pub use memory::MemRecorder;
