use crate::buffered::image::{BufferedImage, check_pixel_len};
use crate::buffered::queue::{CommandQueue, DeferredCommand};
use crate::buffered::shader::{Shader, ShaderProgram};
use crate::foundation::core::{Region, Rgba8Premul};
use crate::foundation::error::{TexstageError, TexstageResult};
use crate::render::backend::{
    DrawImageOptions, DrawTrianglesOptions, ShaderId, TextureBackend, TrianglesCall,
    UniformValue,
};
use crate::render::vertices::check_mesh;

/// Handle to an image owned by a [`Graphics`] session.
///
/// Ids are allocated eagerly, even while creation itself is deferred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(pub(crate) u32);

impl ImageId {
    /// Position of the image in its session, in creation order.
    pub fn index(self) -> u32 {
        self.0
    }
}

/// A draw-time shader parameter.
#[derive(Clone, Debug, PartialEq)]
pub enum Uniform {
    /// Scalar.
    Float(f32),
    /// Vector or matrix, flattened.
    Floats(Vec<f32>),
    /// Additional image input; resolved like the draw source.
    Image(ImageId),
}

/// Input for [`Graphics::draw_triangles`].
///
/// Slices are borrowed for the duration of the call only.
#[derive(Clone, Copy, Debug)]
pub struct DrawTriangles<'a> {
    /// Image sampled by the fixed-function path.
    pub src: Option<ImageId>,
    /// Packed vertices, [`crate::vertices::VERTEX_FLOAT_NUM`] floats each.
    pub vertices: &'a [f32],
    /// Triangle list indices into `vertices`.
    pub indices: &'a [u16],
    /// Custom shader replacing the fixed-function path.
    pub shader: Option<&'a Shader>,
    /// Shader uniforms.
    pub uniforms: &'a [Uniform],
    /// Fixed-function state.
    pub opts: DrawTrianglesOptions,
}

impl<'a> DrawTriangles<'a> {
    /// A mesh with no source, shader, or uniforms.
    pub fn new(vertices: &'a [f32], indices: &'a [u16]) -> Self {
        Self {
            src: None,
            vertices,
            indices,
            shader: None,
            uniforms: &[],
            opts: DrawTrianglesOptions::default(),
        }
    }

    /// Sample `src` on the fixed-function path.
    pub fn with_src(mut self, src: ImageId) -> Self {
        self.src = Some(src);
        self
    }

    /// Draw with a custom shader and its uniforms.
    pub fn with_shader(mut self, shader: &'a Shader, uniforms: &'a [Uniform]) -> Self {
        self.shader = Some(shader);
        self.uniforms = uniforms;
        self
    }

    /// Replace the fixed-function state.
    pub fn with_opts(mut self, opts: DrawTrianglesOptions) -> Self {
        self.opts = opts;
        self
    }
}

/// Options controlling a [`Graphics`] session.
#[derive(Clone, Copy, Debug)]
pub struct GraphicsOpts {
    /// Capture mutating calls until the first [`Graphics::begin_frame`].
    pub defer_until_first_frame: bool,
}

impl Default for GraphicsOpts {
    fn default() -> Self {
        Self {
            defer_until_first_frame: true,
        }
    }
}

impl GraphicsOpts {
    /// Defaults overridden by `TEXSTAGE_DEFER_UNTIL_FIRST_FRAME` (`0` or `false` disables).
    pub fn from_env() -> Self {
        let defer_until_first_frame = match std::env::var("TEXSTAGE_DEFER_UNTIL_FIRST_FRAME") {
            Ok(v) => !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false"),
            Err(_) => true,
        };
        Self {
            defer_until_first_frame,
        }
    }
}

#[derive(Debug)]
struct ImageEntry {
    width: u32,
    height: u32,
    /// Set at call time, so later calls are rejected even while the release is deferred.
    disposed: bool,
    /// `None` until the texture exists, and again after release.
    image: Option<BufferedImage>,
}

/// The image layer: a backend, its deferral queue, and the images living on it.
///
/// Mutations only touch per-image pending state. The backend is reached when a result is
/// observable: [`Graphics::pixels`], a draw that uses an image as source or destination, or an
/// explicit [`Graphics::resolve`]. Until the first [`Graphics::begin_frame`] every mutating call is
/// captured and replayed in order when that frame begins.
pub struct Graphics<B: TextureBackend> {
    backend: B,
    queue: CommandQueue,
    images: Vec<ImageEntry>,
    in_frame: bool,
    frame_count: u64,
    opts: GraphicsOpts,
}

impl<B: TextureBackend> Graphics<B> {
    /// Create a session over `backend`.
    pub fn new(backend: B, opts: GraphicsOpts) -> Self {
        let mut queue = CommandQueue::new();
        if opts.defer_until_first_frame {
            queue.enter_deferred_mode();
        }
        Self {
            backend,
            queue,
            images: Vec::new(),
            in_frame: false,
            frame_count: 0,
            opts,
        }
    }

    /// Session options.
    pub fn opts(&self) -> GraphicsOpts {
        self.opts
    }

    /// The wrapped backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable access to the wrapped backend.
    ///
    /// Writing texture memory directly bypasses the local mirrors kept by this session.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Unwrap the backend.
    pub fn into_backend(self) -> B {
        self.backend
    }

    /// The deferral queue.
    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    /// Start capturing mutating calls until the next frame begins.
    ///
    /// # Panics
    ///
    /// Panics once a frame has drained the queue.
    pub fn enter_deferred_mode(&mut self) {
        self.queue.enter_deferred_mode();
    }

    /// Frames begun so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Return `true` between [`Graphics::begin_frame`] and [`Graphics::end_frame`].
    pub fn in_frame(&self) -> bool {
        self.in_frame
    }

    /// Allocate an offscreen image. Contents start transparent.
    pub fn new_image(&mut self, width: u32, height: u32) -> TexstageResult<ImageId> {
        self.create(width, height, ImageKind::Offscreen { volatile: false })
    }

    /// Allocate an offscreen image whose contents may be discarded between frames.
    pub fn new_volatile_image(&mut self, width: u32, height: u32) -> TexstageResult<ImageId> {
        self.create(width, height, ImageKind::Offscreen { volatile: true })
    }

    /// Allocate an image bound to the screen framebuffer.
    pub fn new_screen_image(&mut self, width: u32, height: u32) -> TexstageResult<ImageId> {
        self.create(width, height, ImageKind::Screen)
    }

    fn create(&mut self, width: u32, height: u32, kind: ImageKind) -> TexstageResult<ImageId> {
        if width == 0 || height == 0 {
            return Err(TexstageError::validation(format!(
                "image size must be non-zero, got {width}x{height}"
            )));
        }
        let id = ImageId(
            u32::try_from(self.images.len())
                .map_err(|_| TexstageError::validation("too many images in one session"))?,
        );

        let deferred = self.queue.try_defer(|| match kind {
            ImageKind::Offscreen { volatile } => DeferredCommand::CreateImage {
                image: id,
                width,
                height,
                volatile,
            },
            ImageKind::Screen => DeferredCommand::CreateScreenImage {
                image: id,
                width,
                height,
            },
        });
        let image = if deferred {
            None
        } else {
            Some(self.alloc_texture(id, width, height, kind)?)
        };
        self.images.push(ImageEntry {
            width,
            height,
            disposed: false,
            image,
        });
        Ok(id)
    }

    fn alloc_texture(
        &mut self,
        id: ImageId,
        width: u32,
        height: u32,
        kind: ImageKind,
    ) -> TexstageResult<BufferedImage> {
        let texture = match kind {
            ImageKind::Offscreen { volatile } => {
                self.backend.create_texture(width, height, volatile)?
            }
            ImageKind::Screen => self.backend.create_screen_target(width, height)?,
        };
        tracing::debug!(image = id.0, texture = texture.0, width, height, ?kind, "texture created");
        Ok(BufferedImage::new(texture, width, height))
    }

    /// Image size in pixels.
    ///
    /// # Panics
    ///
    /// Panics for a disposed or unknown image.
    pub fn size(&self, id: ImageId) -> (u32, u32) {
        let e = self.entry(id);
        (e.width, e.height)
    }

    /// Make the whole image `color`. Repeated fills coalesce; only the last one reaches the
    /// backend.
    pub fn fill(&mut self, id: ImageId, color: Rgba8Premul) {
        self.entry(id);
        if self
            .queue
            .try_defer(|| DeferredCommand::Fill { image: id, color })
        {
            return;
        }
        live_mut(&mut self.images, id).fill(color);
    }

    /// Replace `region` with `pixels` (row-major premultiplied RGBA8).
    ///
    /// # Panics
    ///
    /// Panics unless `pixels.len()` is `4 * region.width * region.height`.
    pub fn replace_pixels(
        &mut self,
        id: ImageId,
        pixels: &[u8],
        region: Region,
    ) -> TexstageResult<()> {
        let (w, h) = self.size(id);
        check_pixel_len(pixels.len(), region);
        check_within(region, w, h, "replace_pixels")?;
        if self.queue.try_defer(|| DeferredCommand::ReplacePixels {
            image: id,
            pixels: pixels.to_vec(),
            region,
        }) {
            return Ok(());
        }
        live_mut(&mut self.images, id).replace_pixels(&mut self.backend, pixels, region)
    }

    /// Read `region` into a fresh buffer.
    ///
    /// # Panics
    ///
    /// Panics when called before the first frame while mutations are still deferred.
    pub fn pixels(&mut self, id: ImageId, region: Region) -> TexstageResult<Vec<u8>> {
        self.entry(id);
        self.queue.ensure_flushed("pixels");
        live_mut(&mut self.images, id).pixels(&mut self.backend, region)
    }

    /// Copy `region` of `src` into `dst` at the origin.
    ///
    /// # Panics
    ///
    /// Panics when `dst == src`.
    pub fn copy_pixels(&mut self, dst: ImageId, src: ImageId, region: Region) -> TexstageResult<()> {
        if dst == src {
            panic!("texstage: copy_pixels dst and src must be different images");
        }
        let (sw, sh) = self.size(src);
        let (dw, dh) = self.size(dst);
        check_within(region, sw, sh, "copy_pixels source")?;
        check_within(
            Region::new(0, 0, region.width, region.height),
            dw,
            dh,
            "copy_pixels destination",
        )?;
        if self
            .queue
            .try_defer(|| DeferredCommand::CopyPixels { dst, src, region })
        {
            return Ok(());
        }
        self.exec_copy_pixels(dst, src, region)
    }

    fn exec_copy_pixels(&mut self, dst: ImageId, src: ImageId, region: Region) -> TexstageResult<()> {
        let bytes = live_mut(&mut self.images, src).pixels(&mut self.backend, region)?;
        live_mut(&mut self.images, dst).replace_pixels(
            &mut self.backend,
            &bytes,
            Region::new(0, 0, region.width, region.height),
        )
    }

    /// Composite `src` onto `dst`.
    ///
    /// `src` is resolved keeping its local copy, `dst` is resolved and its mirror dropped.
    ///
    /// # Panics
    ///
    /// Panics when `dst == src`, before anything is resolved.
    ///
    /// # Errors
    ///
    /// `OutOfRange` when `opts.region` is not within `src`, checked before the call is deferred.
    pub fn draw_image(
        &mut self,
        dst: ImageId,
        src: ImageId,
        opts: &DrawImageOptions,
    ) -> TexstageResult<()> {
        if dst == src {
            panic!("texstage: draw_image dst and src must be different images");
        }
        self.entry(dst);
        let (sw, sh) = self.size(src);
        check_within(opts.region, sw, sh, "draw_image source")?;
        if self.queue.try_defer(|| DeferredCommand::DrawImage {
            dst,
            src,
            opts: *opts,
        }) {
            return Ok(());
        }
        self.exec_draw_image(dst, src, opts)
    }

    fn exec_draw_image(
        &mut self,
        dst: ImageId,
        src: ImageId,
        opts: &DrawImageOptions,
    ) -> TexstageResult<()> {
        let src_img = live_mut(&mut self.images, src);
        src_img.resolve(&mut self.backend, true)?;
        let src_tex = src_img.texture();
        let dst_img = live_mut(&mut self.images, dst);
        dst_img.resolve_as_target(&mut self.backend)?;
        let dst_tex = dst_img.texture();

        tracing::debug!(dst = dst.0, src = src.0, region = ?opts.region, "draw_image");
        self.backend.draw_image(dst_tex, src_tex, opts)
    }

    /// Submit a triangle mesh targeting `dst`.
    ///
    /// Sources are `input.src` plus every [`Uniform::Image`]; each is resolved keeping its local
    /// copy before `dst` is resolved.
    ///
    /// # Panics
    ///
    /// Panics when any source equals `dst` or the shader has been disposed, before anything is
    /// resolved.
    ///
    /// # Errors
    ///
    /// `Validation` or `OutOfRange` from [`check_mesh`] when the vertex and index slices do not
    /// form whole triangles over existing vertices, checked before the call is deferred.
    pub fn draw_triangles(&mut self, dst: ImageId, input: DrawTriangles<'_>) -> TexstageResult<()> {
        self.entry(dst);
        for src in sources(input.src, input.uniforms) {
            if src == dst {
                panic!("texstage: draw_triangles source image {} is also the destination", dst.0);
            }
            self.entry(src);
        }
        check_mesh(input.vertices, input.indices)?;
        let shader = input.shader.map(Shader::id);

        if self.queue.try_defer(|| DeferredCommand::DrawTriangles {
            dst,
            src: input.src,
            vertices: input.vertices.to_vec(),
            indices: input.indices.to_vec(),
            shader,
            uniforms: input.uniforms.to_vec(),
            opts: input.opts,
        }) {
            return Ok(());
        }
        self.exec_draw_triangles(
            dst,
            input.src,
            input.vertices,
            input.indices,
            shader,
            input.uniforms,
            input.opts,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn exec_draw_triangles(
        &mut self,
        dst: ImageId,
        src: Option<ImageId>,
        vertices: &[f32],
        indices: &[u16],
        shader: Option<ShaderId>,
        uniforms: &[Uniform],
        opts: DrawTrianglesOptions,
    ) -> TexstageResult<()> {
        for id in sources(src, uniforms) {
            live_mut(&mut self.images, id).resolve(&mut self.backend, true)?;
        }
        let dst_img = live_mut(&mut self.images, dst);
        dst_img.resolve_as_target(&mut self.backend)?;
        let dst_tex = dst_img.texture();

        let src_tex = src.map(|id| live(&self.images, id).texture());
        let uniform_values: Vec<UniformValue> = uniforms
            .iter()
            .map(|u| match u {
                Uniform::Float(v) => UniformValue::Float(*v),
                Uniform::Floats(v) => UniformValue::Floats(v.clone()),
                Uniform::Image(id) => UniformValue::Texture(live(&self.images, *id).texture()),
            })
            .collect();

        tracing::debug!(
            dst = dst.0,
            indices = indices.len(),
            custom_shader = shader.is_some(),
            "draw_triangles"
        );
        self.backend.draw_triangles(
            dst_tex,
            TrianglesCall {
                src: src_tex,
                vertices,
                indices,
                shader,
                uniforms: &uniform_values,
                opts,
            },
        )
    }

    /// Push one image's pending writes to the backend.
    ///
    /// # Panics
    ///
    /// Panics when called before the first frame while mutations are still deferred.
    pub fn resolve(&mut self, id: ImageId) -> TexstageResult<()> {
        self.entry(id);
        self.queue.ensure_flushed("resolve");
        live_mut(&mut self.images, id).resolve(&mut self.backend, false)
    }

    /// Drop the image's pending state and release its texture. Further use of `id` panics.
    pub fn mark_disposed(&mut self, id: ImageId) {
        self.entry(id);
        if let Some(e) = self.images.get_mut(id.0 as usize) {
            e.disposed = true;
        }
        if self
            .queue
            .try_defer(|| DeferredCommand::MarkDisposed { image: id })
        {
            return;
        }
        self.release(id);
    }

    fn release(&mut self, id: ImageId) {
        if let Some(mut img) = self.images.get_mut(id.0 as usize).and_then(|e| e.image.take()) {
            img.dispose(&mut self.backend);
            tracing::debug!(image = id.0, "image disposed");
        }
    }

    /// Compile `program` on the backend.
    pub fn new_shader(&mut self, program: &ShaderProgram) -> TexstageResult<Shader> {
        let id = self.backend.compile_shader(program)?;
        tracing::debug!(shader = id.0, name = %program.name, "shader compiled");
        Ok(Shader::new(id))
    }

    /// Release `shader`. The handle panics on further use.
    ///
    /// Before the first frame the backend release is deferred behind any captured draw that uses
    /// the program.
    pub fn dispose_shader(&mut self, shader: &mut Shader) {
        let id = shader.take();
        if self
            .queue
            .try_defer(|| DeferredCommand::DisposeShader { shader: id })
        {
            return;
        }
        self.backend.dispose_shader(id);
    }

    /// Begin a frame. The first frame replays every deferred call, in order, before returning.
    ///
    /// When a replayed call fails the frame stays open, the remaining calls stay queued, and the
    /// next `begin_frame` (after [`Graphics::end_frame`]) resumes the replay.
    ///
    /// # Panics
    ///
    /// Panics when a frame is already open.
    #[tracing::instrument(skip(self), fields(frame = self.frame_count))]
    pub fn begin_frame(&mut self) -> TexstageResult<()> {
        if self.in_frame {
            panic!("texstage: begin_frame called twice without end_frame");
        }
        self.backend.begin_frame()?;
        self.in_frame = true;
        self.frame_count += 1;

        let mut queue = std::mem::take(&mut self.queue);
        let res = queue.flush(|cmd| self.replay(cmd));
        self.queue = queue;
        res
    }

    /// End the current frame.
    ///
    /// # Panics
    ///
    /// Panics when no frame is open.
    #[tracing::instrument(skip(self), fields(frame = self.frame_count))]
    pub fn end_frame(&mut self) -> TexstageResult<()> {
        if !self.in_frame {
            panic!("texstage: end_frame called without begin_frame");
        }
        self.in_frame = false;
        self.backend.end_frame()
    }

    fn replay(&mut self, cmd: &DeferredCommand) -> TexstageResult<()> {
        match cmd {
            DeferredCommand::CreateImage {
                image,
                width,
                height,
                volatile,
            } => self.replay_create(
                *image,
                *width,
                *height,
                ImageKind::Offscreen {
                    volatile: *volatile,
                },
            ),
            DeferredCommand::CreateScreenImage {
                image,
                width,
                height,
            } => self.replay_create(*image, *width, *height, ImageKind::Screen),
            DeferredCommand::Fill { image, color } => {
                live_mut(&mut self.images, *image).fill(*color);
                Ok(())
            }
            DeferredCommand::ReplacePixels {
                image,
                pixels,
                region,
            } => live_mut(&mut self.images, *image).replace_pixels(
                &mut self.backend,
                pixels,
                *region,
            ),
            DeferredCommand::CopyPixels { dst, src, region } => {
                self.exec_copy_pixels(*dst, *src, *region)
            }
            DeferredCommand::DrawImage { dst, src, opts } => self.exec_draw_image(*dst, *src, opts),
            DeferredCommand::DrawTriangles {
                dst,
                src,
                vertices,
                indices,
                shader,
                uniforms,
                opts,
            } => self.exec_draw_triangles(*dst, *src, vertices, indices, *shader, uniforms, *opts),
            DeferredCommand::MarkDisposed { image } => {
                self.release(*image);
                Ok(())
            }
            DeferredCommand::DisposeShader { shader } => {
                self.backend.dispose_shader(*shader);
                Ok(())
            }
        }
    }

    fn replay_create(
        &mut self,
        id: ImageId,
        width: u32,
        height: u32,
        kind: ImageKind,
    ) -> TexstageResult<()> {
        let img = self.alloc_texture(id, width, height, kind)?;
        match self.images.get_mut(id.0 as usize) {
            Some(e) if e.image.is_none() => {
                e.image = Some(img);
                Ok(())
            }
            _ => Err(TexstageError::validation(format!(
                "deferred creation of image {} found no reserved slot",
                id.0
            ))),
        }
    }

    fn entry(&self, id: ImageId) -> &ImageEntry {
        match self.images.get(id.0 as usize) {
            Some(e) if !e.disposed => e,
            Some(_) => panic!("texstage: image {} used after mark_disposed", id.0),
            None => panic!("texstage: unknown image {}", id.0),
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum ImageKind {
    Offscreen { volatile: bool },
    Screen,
}

fn live(images: &[ImageEntry], id: ImageId) -> &BufferedImage {
    match images.get(id.0 as usize).and_then(|e| e.image.as_ref()) {
        Some(img) => img,
        None => panic!("texstage: image {} has no texture", id.0),
    }
}

fn live_mut(images: &mut [ImageEntry], id: ImageId) -> &mut BufferedImage {
    match images.get_mut(id.0 as usize).and_then(|e| e.image.as_mut()) {
        Some(img) => img,
        None => panic!("texstage: image {} has no texture", id.0),
    }
}

fn check_within(region: Region, width: u32, height: u32, op: &str) -> TexstageResult<()> {
    if region.within(width, height) {
        Ok(())
    } else {
        Err(TexstageError::out_of_range(format!(
            "{op} region {region:?} outside {width}x{height}"
        )))
    }
}

fn sources(src: Option<ImageId>, uniforms: &[Uniform]) -> impl Iterator<Item = ImageId> + '_ {
    src.into_iter().chain(uniforms.iter().filter_map(|u| match u {
        Uniform::Image(id) => Some(*id),
        Uniform::Float(_) | Uniform::Floats(_) => None,
    }))
}

#[cfg(test)]
#[path = "../../tests/unit/session/graphics.rs"]
mod tests;
