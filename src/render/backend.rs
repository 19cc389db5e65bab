use crate::buffered::shader::ShaderProgram;
use crate::foundation::color::ColorMatrix;
use crate::foundation::core::{AddressMode, Affine, BlendMode, Filter, Region, Rgba8Premul};
use crate::foundation::error::TexstageResult;

/// Backend-allocated texture handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

/// Backend-allocated compiled shader handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderId(pub u32);

/// Parameters for drawing one image region onto another.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawImageOptions {
    /// Source sub-rectangle to sample.
    pub region: Region,
    /// Maps region-local coordinates (`0..region.width`, `0..region.height`) into the destination.
    pub transform: Affine,
    /// Color transform applied to source texels.
    pub color_matrix: ColorMatrix,
    /// Compositing operator.
    pub blend: BlendMode,
    /// Sampling filter.
    pub filter: Filter,
}

impl DrawImageOptions {
    /// Draw `region` untransformed with source-over blending.
    pub fn new(region: Region) -> Self {
        Self {
            region,
            transform: Affine::IDENTITY,
            color_matrix: ColorMatrix::IDENTITY,
            blend: BlendMode::SourceOver,
            filter: Filter::Nearest,
        }
    }

    /// Replace the geometry transform.
    pub fn with_transform(mut self, transform: Affine) -> Self {
        self.transform = transform;
        self
    }

    /// Replace the color transform.
    pub fn with_color_matrix(mut self, color_matrix: ColorMatrix) -> Self {
        self.color_matrix = color_matrix;
        self
    }

    /// Replace the blend mode.
    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }

    /// Replace the sampling filter.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }
}

/// Fixed-function state for a triangle draw.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DrawTrianglesOptions {
    /// Color transform applied to sampled texels.
    pub color_matrix: ColorMatrix,
    /// Compositing operator.
    pub blend: BlendMode,
    /// Sampling filter.
    pub filter: Filter,
    /// Addressing outside the source region.
    pub address: AddressMode,
}

/// A shader uniform as seen by the backend: images are already resolved to textures.
#[derive(Clone, Debug, PartialEq)]
pub enum UniformValue {
    /// Scalar.
    Float(f32),
    /// Vector or matrix, flattened.
    Floats(Vec<f32>),
    /// Additional texture input.
    Texture(TextureId),
}

/// Everything a backend needs to submit one triangle mesh.
///
/// Slices are borrowed for the duration of the call only.
#[derive(Clone, Copy, Debug)]
pub struct TrianglesCall<'a> {
    /// Texture sampled by the fixed-function path, if any.
    pub src: Option<TextureId>,
    /// Packed vertices, [`crate::render::vertices::VERTEX_FLOAT_NUM`] floats each.
    pub vertices: &'a [f32],
    /// Triangle list indices into `vertices`.
    pub indices: &'a [u16],
    /// Custom shader replacing the fixed-function path.
    pub shader: Option<ShaderId>,
    /// Shader uniforms.
    pub uniforms: &'a [UniformValue],
    /// Fixed-function state.
    pub opts: DrawTrianglesOptions,
}

/// The GPU-resident texture resource the buffering layer sits on.
///
/// Implementations own authoritative pixel data once an image has been resolved into them. Every
/// method here is considered expensive; the buffering layer calls them only when a result is
/// observable. Errors are propagated unchanged to the caller of the buffering layer.
pub trait TextureBackend {
    /// Start a render pass.
    fn begin_frame(&mut self) -> TexstageResult<()>;

    /// Finish the current render pass.
    fn end_frame(&mut self) -> TexstageResult<()>;

    /// Allocate an offscreen texture. Contents start transparent.
    fn create_texture(&mut self, width: u32, height: u32, volatile: bool)
    -> TexstageResult<TextureId>;

    /// Allocate a texture bound to the screen framebuffer.
    fn create_screen_target(&mut self, width: u32, height: u32) -> TexstageResult<TextureId>;

    /// Set every texel to `color`.
    fn fill(&mut self, texture: TextureId, color: Rgba8Premul) -> TexstageResult<()>;

    /// Upload a full-size RGBA8 buffer.
    fn replace_pixels(&mut self, texture: TextureId, pixels: &[u8]) -> TexstageResult<()>;

    /// Read a region back into a freshly allocated RGBA8 buffer.
    fn read_pixels(&mut self, texture: TextureId, region: Region) -> TexstageResult<Vec<u8>>;

    /// Composite `src` onto `dst`.
    fn draw_image(
        &mut self,
        dst: TextureId,
        src: TextureId,
        opts: &DrawImageOptions,
    ) -> TexstageResult<()>;

    /// Submit a triangle mesh targeting `dst`.
    fn draw_triangles(&mut self, dst: TextureId, call: TrianglesCall<'_>) -> TexstageResult<()>;

    /// Release a texture. The id must not be used afterwards.
    fn dispose_texture(&mut self, texture: TextureId);

    /// Compile a shader program.
    fn compile_shader(&mut self, program: &ShaderProgram) -> TexstageResult<ShaderId>;

    /// Release a compiled shader.
    fn dispose_shader(&mut self, shader: ShaderId);
}

impl<T: TextureBackend + ?Sized> TextureBackend for Box<T> {
    fn begin_frame(&mut self) -> TexstageResult<()> {
        (**self).begin_frame()
    }

    fn end_frame(&mut self) -> TexstageResult<()> {
        (**self).end_frame()
    }

    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        volatile: bool,
    ) -> TexstageResult<TextureId> {
        (**self).create_texture(width, height, volatile)
    }

    fn create_screen_target(&mut self, width: u32, height: u32) -> TexstageResult<TextureId> {
        (**self).create_screen_target(width, height)
    }

    fn fill(&mut self, texture: TextureId, color: Rgba8Premul) -> TexstageResult<()> {
        (**self).fill(texture, color)
    }

    fn replace_pixels(&mut self, texture: TextureId, pixels: &[u8]) -> TexstageResult<()> {
        (**self).replace_pixels(texture, pixels)
    }

    fn read_pixels(&mut self, texture: TextureId, region: Region) -> TexstageResult<Vec<u8>> {
        (**self).read_pixels(texture, region)
    }

    fn draw_image(
        &mut self,
        dst: TextureId,
        src: TextureId,
        opts: &DrawImageOptions,
    ) -> TexstageResult<()> {
        (**self).draw_image(dst, src, opts)
    }

    fn draw_triangles(&mut self, dst: TextureId, call: TrianglesCall<'_>) -> TexstageResult<()> {
        (**self).draw_triangles(dst, call)
    }

    fn dispose_texture(&mut self, texture: TextureId) {
        (**self).dispose_texture(texture)
    }

    fn compile_shader(&mut self, program: &ShaderProgram) -> TexstageResult<ShaderId> {
        (**self).compile_shader(program)
    }

    fn dispose_shader(&mut self, shader: ShaderId) {
        (**self).dispose_shader(shader)
    }
}
