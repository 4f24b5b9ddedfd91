//! Session bounded context - the peer call lifecycle

pub mod aggregate;
pub mod attempt;
pub mod event;
pub mod identity;
pub mod media;
pub mod signaling;
pub mod value_object;

pub use aggregate::PeerSession;
pub use attempt::CallAttempt;
pub use event::SessionEvent;
pub use identity::IdentityProvider;
pub use media::MediaPort;
pub use signaling::{SignalingEvent, SignalingPort};
pub use value_object::{CallPhase, CallRole, EndReason, PhaseInput};
