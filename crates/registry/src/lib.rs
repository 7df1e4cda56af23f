//! `campusledger-registry` — collision-free registration number allocation.

pub mod allocator;

pub use allocator::{REGISTRATION_COUNTERS, SequenceAllocator};
