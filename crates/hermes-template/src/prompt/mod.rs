//! ChatML prompt rendering.
//!
//! - [`markers`] holds the literal wire vocabulary: turn delimiters, tag
//!   pairs, and the fixed tool-use preamble.
//! - [`render()`] turns a [`Conversation`](crate::Conversation) into a prompt
//!   string; [`render_for_generation`] additionally opens an assistant turn.

pub mod markers;
pub mod render;

pub use render::{RenderMode, render, render_for_generation};
