//! Domain layer - Core call-session logic and rules
//!
//! This layer contains:
//! - Aggregates: Consistency boundaries
//! - Entities: Objects with identity
//! - Value Objects: Immutable objects without identity
//! - Port Interfaces: Traits the infrastructure implements
//! - Domain Events: Things that happened in the session

pub mod session;
pub mod shared;

// Re-export commonly used types
pub use shared::{DomainError, Result};
