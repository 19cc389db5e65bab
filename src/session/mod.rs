//! Session-oriented image API.

/// The [`graphics::Graphics`] image layer.
pub mod graphics;
