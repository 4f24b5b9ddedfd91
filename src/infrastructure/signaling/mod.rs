//! Signaling adapters

pub mod memory;

pub use memory::{MemorySignaling, MemorySignalingHub};
