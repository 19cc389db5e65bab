use crate::buffered::shader::ShaderProgram;
use crate::foundation::core::{Point, Region, Rgba8Premul, rgba_len};
use crate::foundation::error::{TexstageError, TexstageResult};
use crate::render::backend::{
    DrawImageOptions, ShaderId, TextureBackend, TextureId, TrianglesCall, UniformValue,
};
use crate::render::blend::blend;
use crate::render::vertices::{VERTEX_FLOAT_NUM, vertex_count};
use std::collections::HashMap;

/// Options for the CPU reference backend.
#[derive(Debug, Clone, Copy)]
pub struct CpuBackendOpts {
    /// Largest accepted texture side in pixels (capped at `u16::MAX` by the pixmap storage).
    pub max_texture_dim: u32,
    /// Record every resource touch in [`CpuBackend::log`]. Off by default, since the log grows
    /// with every backend call.
    pub record_log: bool,
}

impl Default for CpuBackendOpts {
    fn default() -> Self {
        Self {
            max_texture_dim: u32::from(u16::MAX),
            record_log: false,
        }
    }
}

impl CpuBackendOpts {
    /// Defaults overridden by `TEXSTAGE_CPU_MAX_TEXTURE_DIM` when set to a positive integer.
    pub fn from_env() -> Self {
        let max_texture_dim = std::env::var("TEXSTAGE_CPU_MAX_TEXTURE_DIM")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|&n| n > 0)
            .map(|n| n.min(u32::from(u16::MAX)))
            .unwrap_or(u32::from(u16::MAX));
        Self {
            max_texture_dim,
            ..Self::default()
        }
    }
}

/// Counters for every resource touch, in the order the buffering layer cares about.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BackendStats {
    /// Textures and screen targets allocated.
    pub textures_created: u64,
    /// Textures released.
    pub textures_disposed: u64,
    /// Solid fills pushed.
    pub fills: u64,
    /// Full-size pixel uploads.
    pub uploads: u64,
    /// Pixel readbacks.
    pub readbacks: u64,
    /// `draw_image` submissions.
    pub image_draws: u64,
    /// `draw_triangles` submissions.
    pub triangle_draws: u64,
    /// Shader programs compiled.
    pub shaders_compiled: u64,
    /// Shader programs released.
    pub shaders_disposed: u64,
    /// Frames begun.
    pub frames_begun: u64,
    /// Frames ended.
    pub frames_ended: u64,
}

impl BackendStats {
    /// Operations that push data to, or pull data from, texture memory.
    pub fn gpu_touches(&self) -> u64 {
        self.fills + self.uploads + self.readbacks + self.image_draws + self.triangle_draws
    }
}

/// One recorded resource touch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendOp {
    /// `begin_frame`.
    BeginFrame,
    /// `end_frame`.
    EndFrame,
    /// `create_texture`.
    CreateTexture {
        /// Allocated id.
        texture: TextureId,
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
        /// Volatile hint.
        volatile: bool,
    },
    /// `create_screen_target`.
    CreateScreenTarget {
        /// Allocated id.
        texture: TextureId,
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
    /// `fill`.
    Fill {
        /// Target.
        texture: TextureId,
        /// Fill color.
        color: Rgba8Premul,
    },
    /// `replace_pixels`.
    ReplacePixels {
        /// Target.
        texture: TextureId,
    },
    /// `read_pixels`.
    ReadPixels {
        /// Source.
        texture: TextureId,
        /// Region read.
        region: Region,
    },
    /// `draw_image`.
    DrawImage {
        /// Destination.
        dst: TextureId,
        /// Source.
        src: TextureId,
    },
    /// `draw_triangles`.
    DrawTriangles {
        /// Destination.
        dst: TextureId,
        /// Fixed-function source.
        src: Option<TextureId>,
        /// Number of indices submitted.
        indices: usize,
    },
    /// `dispose_texture`.
    DisposeTexture {
        /// Released id.
        texture: TextureId,
    },
    /// `compile_shader`.
    CompileShader {
        /// Allocated id.
        shader: ShaderId,
    },
    /// `dispose_shader`.
    DisposeShader {
        /// Released id.
        shader: ShaderId,
    },
}

/// Operation kinds that can be made to fail once via [`CpuBackend::fail_next`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailPoint {
    /// `begin_frame`.
    BeginFrame,
    /// `create_texture` / `create_screen_target`.
    CreateTexture,
    /// `fill`.
    Fill,
    /// `replace_pixels`.
    ReplacePixels,
    /// `read_pixels`.
    ReadPixels,
    /// `draw_image`.
    DrawImage,
    /// `draw_triangles`.
    DrawTriangles,
}

struct CpuTexture {
    width: u32,
    height: u32,
    pixmap: vello_cpu::Pixmap,
}

impl CpuTexture {
    fn bytes(&self) -> &[u8] {
        self.pixmap.data_as_u8_slice()
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        self.pixmap.data_as_u8_slice_mut()
    }
}

/// CPU reference implementation of [`TextureBackend`] on `vello_cpu` pixmaps.
///
/// Fills, uploads and readbacks are exact. `draw_image` samples nearest-neighbour regardless of
/// the requested filter. Triangle meshes are validated and recorded but not rasterized.
pub struct CpuBackend {
    opts: CpuBackendOpts,
    textures: HashMap<TextureId, CpuTexture>,
    shaders: HashMap<ShaderId, ShaderProgram>,
    next_texture: u32,
    next_shader: u32,
    stats: BackendStats,
    log: Vec<BackendOp>,
    fail_points: Vec<FailPoint>,
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new(CpuBackendOpts::default())
    }
}

impl CpuBackend {
    /// Backend with default options and the touch log turned on.
    pub fn recording() -> Self {
        Self::new(CpuBackendOpts {
            record_log: true,
            ..CpuBackendOpts::default()
        })
    }

    /// Create an empty backend.
    pub fn new(opts: CpuBackendOpts) -> Self {
        Self {
            opts,
            textures: HashMap::new(),
            shaders: HashMap::new(),
            next_texture: 0,
            next_shader: 0,
            stats: BackendStats::default(),
            log: Vec::new(),
            fail_points: Vec::new(),
        }
    }

    /// Counters since creation.
    pub fn stats(&self) -> BackendStats {
        self.stats
    }

    /// Recorded touches in call order (empty when `record_log` is off).
    pub fn log(&self) -> &[BackendOp] {
        &self.log
    }

    /// Forget recorded touches; counters are kept.
    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Make the next call of kind `point` fail with [`TexstageError::Backend`].
    pub fn fail_next(&mut self, point: FailPoint) {
        self.fail_points.push(point);
    }

    /// Number of live textures.
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Inspect texture memory without counting a readback.
    pub fn texture_bytes(&self, texture: TextureId) -> Option<&[u8]> {
        self.textures.get(&texture).map(CpuTexture::bytes)
    }

    /// Source of a compiled shader, if still alive.
    pub fn shader_program(&self, shader: ShaderId) -> Option<&ShaderProgram> {
        self.shaders.get(&shader)
    }

    fn record(&mut self, op: BackendOp) {
        if self.opts.record_log {
            self.log.push(op);
        }
    }

    fn check_fail(&mut self, point: FailPoint) -> TexstageResult<()> {
        if let Some(pos) = self.fail_points.iter().position(|p| *p == point) {
            self.fail_points.remove(pos);
            return Err(TexstageError::backend(format!(
                "injected failure at {point:?}"
            )));
        }
        Ok(())
    }

    fn texture(&self, id: TextureId) -> TexstageResult<&CpuTexture> {
        self.textures
            .get(&id)
            .ok_or_else(|| TexstageError::backend(format!("unknown texture {}", id.0)))
    }

    fn texture_mut(&mut self, id: TextureId) -> TexstageResult<&mut CpuTexture> {
        self.textures
            .get_mut(&id)
            .ok_or_else(|| TexstageError::backend(format!("unknown texture {}", id.0)))
    }

    fn alloc(&mut self, width: u32, height: u32) -> TexstageResult<TextureId> {
        self.check_fail(FailPoint::CreateTexture)?;
        if width == 0 || height == 0 {
            return Err(TexstageError::backend("texture size must be non-zero"));
        }
        let max = self.opts.max_texture_dim.min(u32::from(u16::MAX));
        if width > max || height > max {
            return Err(TexstageError::backend(format!(
                "texture {width}x{height} exceeds max dimension {max}"
            )));
        }
        let w: u16 = width
            .try_into()
            .map_err(|_| TexstageError::backend("texture width exceeds u16"))?;
        let h: u16 = height
            .try_into()
            .map_err(|_| TexstageError::backend("texture height exceeds u16"))?;

        let id = TextureId(self.next_texture);
        self.next_texture = self
            .next_texture
            .checked_add(1)
            .ok_or_else(|| TexstageError::backend("texture id overflow"))?;
        self.textures.insert(
            id,
            CpuTexture {
                width,
                height,
                pixmap: vello_cpu::Pixmap::new(w, h),
            },
        );
        self.stats.textures_created += 1;
        Ok(id)
    }
}

impl TextureBackend for CpuBackend {
    fn begin_frame(&mut self) -> TexstageResult<()> {
        self.check_fail(FailPoint::BeginFrame)?;
        self.stats.frames_begun += 1;
        self.record(BackendOp::BeginFrame);
        Ok(())
    }

    fn end_frame(&mut self) -> TexstageResult<()> {
        self.stats.frames_ended += 1;
        self.record(BackendOp::EndFrame);
        Ok(())
    }

    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        volatile: bool,
    ) -> TexstageResult<TextureId> {
        let texture = self.alloc(width, height)?;
        self.record(BackendOp::CreateTexture {
            texture,
            width,
            height,
            volatile,
        });
        Ok(texture)
    }

    fn create_screen_target(&mut self, width: u32, height: u32) -> TexstageResult<TextureId> {
        let texture = self.alloc(width, height)?;
        self.record(BackendOp::CreateScreenTarget {
            texture,
            width,
            height,
        });
        Ok(texture)
    }

    fn fill(&mut self, texture: TextureId, color: Rgba8Premul) -> TexstageResult<()> {
        self.check_fail(FailPoint::Fill)?;
        let px = color.to_array();
        for d in self.texture_mut(texture)?.bytes_mut().chunks_exact_mut(4) {
            d.copy_from_slice(&px);
        }
        self.stats.fills += 1;
        self.record(BackendOp::Fill { texture, color });
        Ok(())
    }

    fn replace_pixels(&mut self, texture: TextureId, pixels: &[u8]) -> TexstageResult<()> {
        self.check_fail(FailPoint::ReplacePixels)?;
        let tex = self.texture_mut(texture)?;
        let expected = rgba_len(tex.width, tex.height);
        if pixels.len() != expected {
            return Err(TexstageError::backend(format!(
                "replace_pixels expects {expected} bytes, got {}",
                pixels.len()
            )));
        }
        tex.bytes_mut().copy_from_slice(pixels);
        self.stats.uploads += 1;
        self.record(BackendOp::ReplacePixels { texture });
        Ok(())
    }

    fn read_pixels(&mut self, texture: TextureId, region: Region) -> TexstageResult<Vec<u8>> {
        self.check_fail(FailPoint::ReadPixels)?;
        let tex = self.texture(texture)?;
        if !region.within(tex.width, tex.height) {
            return Err(TexstageError::backend(format!(
                "read_pixels region {region:?} outside {}x{}",
                tex.width, tex.height
            )));
        }

        let stride = tex.width as usize * 4;
        let row_len = region.width as usize * 4;
        let src = tex.bytes();
        let mut out = Vec::with_capacity(region.byte_len());
        for j in 0..region.height as usize {
            let start = (region.y as usize + j) * stride + region.x as usize * 4;
            out.extend_from_slice(&src[start..start + row_len]);
        }

        self.stats.readbacks += 1;
        self.record(BackendOp::ReadPixels { texture, region });
        Ok(out)
    }

    fn draw_image(
        &mut self,
        dst: TextureId,
        src: TextureId,
        opts: &DrawImageOptions,
    ) -> TexstageResult<()> {
        self.check_fail(FailPoint::DrawImage)?;
        if dst == src {
            return Err(TexstageError::backend("draw_image dst and src must differ"));
        }

        let region = opts.region;
        let src_tex = self.texture(src)?;
        if !region.within(src_tex.width, src_tex.height) {
            return Err(TexstageError::backend(format!(
                "draw_image region {region:?} outside source {}x{}",
                src_tex.width, src_tex.height
            )));
        }
        let rw = region.width as usize;
        let rh = region.height as usize;
        let stride = src_tex.width as usize * 4;
        let mut texels = Vec::with_capacity(region.byte_len());
        for j in 0..rh {
            let start = (region.y as usize + j) * stride + region.x as usize * 4;
            texels.extend_from_slice(&src_tex.bytes()[start..start + rw * 4]);
        }

        let det = opts.transform.determinant();
        let dst_tex = self.texture_mut(dst)?;
        if region.is_empty() || !det.is_finite() || det.abs() < f64::EPSILON {
            tracing::debug!(?region, det, "draw_image covers no pixels");
        } else {
            let inv = opts.transform.inverse();
            let dw = dst_tex.width as usize;
            let dh = dst_tex.height as usize;
            let out = dst_tex.bytes_mut();
            for y in 0..dh {
                for x in 0..dw {
                    let p = inv * Point::new(x as f64 + 0.5, y as f64 + 0.5);
                    let (sx, sy) = (p.x.floor(), p.y.floor());
                    if sx < 0.0 || sy < 0.0 || sx >= rw as f64 || sy >= rh as f64 {
                        continue;
                    }
                    let si = ((sy as usize) * rw + sx as usize) * 4;
                    let s = opts.color_matrix.apply_premul([
                        texels[si],
                        texels[si + 1],
                        texels[si + 2],
                        texels[si + 3],
                    ]);
                    let di = (y * dw + x) * 4;
                    let d = [out[di], out[di + 1], out[di + 2], out[di + 3]];
                    out[di..di + 4].copy_from_slice(&blend(d, s, opts.blend));
                }
            }
        }

        self.stats.image_draws += 1;
        self.record(BackendOp::DrawImage { dst, src });
        Ok(())
    }

    fn draw_triangles(&mut self, dst: TextureId, call: TrianglesCall<'_>) -> TexstageResult<()> {
        self.check_fail(FailPoint::DrawTriangles)?;
        self.texture(dst)?;
        if let Some(src) = call.src {
            if src == dst {
                return Err(TexstageError::backend(
                    "draw_triangles dst and src must differ",
                ));
            }
            self.texture(src)?;
        }
        if !call.vertices.len().is_multiple_of(VERTEX_FLOAT_NUM) {
            return Err(TexstageError::backend(format!(
                "vertex buffer length {} is not a multiple of {VERTEX_FLOAT_NUM}",
                call.vertices.len()
            )));
        }
        if !call.indices.len().is_multiple_of(3) {
            return Err(TexstageError::backend(
                "index count must be a multiple of 3",
            ));
        }
        let n = vertex_count(call.vertices);
        if let Some(bad) = call.indices.iter().find(|&&i| usize::from(i) >= n) {
            return Err(TexstageError::backend(format!(
                "index {bad} out of range for {n} vertices"
            )));
        }
        if let Some(shader) = call.shader
            && !self.shaders.contains_key(&shader)
        {
            return Err(TexstageError::backend(format!("unknown shader {}", shader.0)));
        }
        for u in call.uniforms {
            if let UniformValue::Texture(t) = u {
                self.texture(*t)?;
            }
        }

        self.stats.triangle_draws += 1;
        self.record(BackendOp::DrawTriangles {
            dst,
            src: call.src,
            indices: call.indices.len(),
        });
        Ok(())
    }

    fn dispose_texture(&mut self, texture: TextureId) {
        if self.textures.remove(&texture).is_some() {
            self.stats.textures_disposed += 1;
            self.record(BackendOp::DisposeTexture { texture });
        }
    }

    fn compile_shader(&mut self, program: &ShaderProgram) -> TexstageResult<ShaderId> {
        if program.source.trim().is_empty() {
            return Err(TexstageError::backend(format!(
                "shader '{}' has empty source",
                program.name
            )));
        }
        let shader = ShaderId(self.next_shader);
        self.next_shader = self
            .next_shader
            .checked_add(1)
            .ok_or_else(|| TexstageError::backend("shader id overflow"))?;
        self.shaders.insert(shader, program.clone());
        self.stats.shaders_compiled += 1;
        self.record(BackendOp::CompileShader { shader });
        Ok(shader)
    }

    fn dispose_shader(&mut self, shader: ShaderId) {
        if self.shaders.remove(&shader).is_some() {
            self.stats.shaders_disposed += 1;
            self.record(BackendOp::DisposeShader { shader });
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
