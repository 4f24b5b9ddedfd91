//! Application layer - orchestrates domain objects to fulfill use cases
//!
//! This layer is responsible for:
//! - Serializing intents and signaling events onto the session
//! - Coordinating the signaling and media ports
//! - Publishing notices to the UI layer

pub mod session_manager;

pub use session_manager::SessionManager;
