//! In-memory child collections

pub mod tracked;

pub use tracked::{Binding, TrackedCollection};
