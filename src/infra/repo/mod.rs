//! Repo backends.

pub mod memory;

pub use memory::MemRepo;
