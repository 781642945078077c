//! octavia-services: Session store, materialization cache, and render service

pub mod cache;
pub mod error;
pub mod render;
pub mod session;

pub use cache::MaterializeCache;
pub use error::{Result, SessionError};
pub use render::{Renderer, TrackChord};
pub use session::{Project, Session};
