//! Media bridge adapters

pub mod memory;

pub use memory::MemoryMediaBridge;
