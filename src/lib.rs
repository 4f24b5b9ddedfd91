//! peercall - a peer-to-peer voice-call session core
//!
//! One endpoint shows a sharing code, the other enters it, and the two
//! establish a direct audio connection mediated only for initial
//! signaling. This crate owns the call lifecycle: the phase machine, the
//! session orchestrator and the ports through which external signaling
//! and media capabilities are consumed.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interface;

// Re-export commonly used types
pub use application::SessionManager;
pub use domain::shared::error::DomainError;
pub use domain::shared::result::Result;
