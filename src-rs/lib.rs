//! Sprite-sheet metadata viewer and converter.
//!
//! Frame metadata arrives in one of two JSON shapes and is normalized into a
//! [`normalize::CanonicalFrameSet`]. A [`session::Session`] pairs it with the
//! sheet image, [`render`] draws the frame boundaries for inspection, and
//! sprite-list input can be exported in the hash-atlas shape.

pub mod error;
pub mod loader;
pub mod normalize;
pub mod prefs;
pub mod render;
pub mod session;

pub use error::{ViewerError, ViewerResult};
pub use normalize::{detect, to_canonical, to_export_document, CanonicalFrameSet, SchemaTag};
pub use session::{Session, SessionEvent, SessionPhase};
