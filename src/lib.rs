//! texstage buffers writes to GPU-backed 2D images and defers the calls made before the first
//! frame.
//!
//! Callers mutate images through a [`Graphics`] session at any time. Fills and pixel writes only
//! update per-image pending state; the backend is touched when a result becomes observable:
//!
//! - a pixel read with no local answer
//! - a draw that samples the image or draws onto it
//! - an explicit [`Graphics::resolve`]
//!
//! Until the first [`Graphics::begin_frame`] every mutating call is captured in a
//! [`CommandQueue`] and replayed in order when that frame begins.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub mod buffered;
pub mod render;
pub mod script;
pub mod session;

pub use crate::foundation::color::ColorMatrix;
pub use crate::foundation::core::{
    AddressMode, Affine, BlendMode, Filter, Point, Region, Rgba8Premul, Vec2,
};
pub use crate::foundation::error::{TexstageError, TexstageResult};

pub use crate::buffered::queue::{CommandQueue, DeferredCommand};
pub use crate::buffered::shader::{Shader, ShaderProgram};
pub use crate::render::backend::{
    DrawImageOptions, DrawTrianglesOptions, ShaderId, TextureBackend, TextureId, TrianglesCall,
    UniformValue,
};
pub use crate::render::cpu::{BackendOp, BackendStats, CpuBackend, CpuBackendOpts, FailPoint};
pub use crate::render::vertices;
pub use crate::script::model::{ImageDecl, ImageKindDecl, Script, ScriptOp};
pub use crate::script::run::run_script;
pub use crate::session::graphics::{DrawTriangles, Graphics, GraphicsOpts, ImageId, Uniform};
