//! Infrastructure layer - adapter implementations of the domain ports

pub mod media;
pub mod signaling;
