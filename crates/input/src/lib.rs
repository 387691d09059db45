//! Input state: which keys and mouse buttons are held, and how far the mouse
//! moved this frame.
//!
//! # Invariants
//! - The windowing layer translates its events into [`Key`] and
//!   [`MouseButton`]; nothing here depends on a windowing crate.
//! - Per-frame values (presses, mouse delta) reset in [`InputState::end_frame`].

pub mod state;

pub use state::{InputState, Key, MouseButton};
