//! Texture backend boundary.
//!
//! [`backend::TextureBackend`] is the resource the buffering layer sits on; [`cpu::CpuBackend`] is
//! its reference implementation on `vello_cpu` pixmaps.

/// Backend trait and the value types passed across it.
pub mod backend;
pub(crate) mod blend;
/// CPU reference backend.
pub mod cpu;
pub mod vertices;
