//! Interface layer - events published to the UI

pub mod events;

pub use events::{NoticeBroadcaster, NoticeErrorKind, SessionNotice};
