use crate::foundation::core::{Region, Rgba8Premul, rgba_len};
use crate::foundation::error::{TexstageError, TexstageResult};
use crate::render::backend::{TextureBackend, TextureId};

/// Write state not yet pushed to (or mirrored from) the texture.
///
/// Exactly one variant holds at a time, so a pending fill and a pending pixel buffer can never
/// coexist.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum PendingState {
    /// The texture holds the truth; nothing is cached locally.
    Resolved,
    /// The texture holds the truth; the buffer is an exact full-size copy of it.
    Mirrored(Vec<u8>),
    /// The whole image should become this color.
    Fill(Rgba8Premul),
    /// This full-size buffer is the truth and has not been uploaded.
    Pixels(Vec<u8>),
}

/// One image's pending-write state machine over a backend texture.
///
/// Writes only touch local state. The backend is reached when a result becomes observable: a
/// read with no local answer, a partial write with no local base buffer, or an explicit
/// [`BufferedImage::resolve`] (issued before the image is drawn or drawn onto).
#[derive(Debug)]
pub(crate) struct BufferedImage {
    texture: TextureId,
    width: u32,
    height: u32,
    state: PendingState,
}

impl BufferedImage {
    pub(crate) fn new(texture: TextureId, width: u32, height: u32) -> Self {
        Self {
            texture,
            width,
            height,
            state: PendingState::Resolved,
        }
    }

    pub(crate) fn texture(&self) -> TextureId {
        self.texture
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> &PendingState {
        &self.state
    }

    /// Drop every piece of local state. All writers that make the cache stale go through here.
    fn invalidate(&mut self) {
        self.state = PendingState::Resolved;
    }

    pub(crate) fn fill(&mut self, color: Rgba8Premul) {
        if let PendingState::Fill(prev) = self.state {
            tracing::trace!(texture = self.texture.0, ?prev, ?color, "fill coalesced");
        }
        self.invalidate();
        self.state = PendingState::Fill(color);
    }

    pub(crate) fn replace_pixels<B: TextureBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        pixels: &[u8],
        region: Region,
    ) -> TexstageResult<()> {
        check_pixel_len(pixels.len(), region);
        if !region.within(self.width, self.height) {
            return Err(TexstageError::out_of_range(format!(
                "replace_pixels region {region:?} outside {}x{}",
                self.width, self.height
            )));
        }

        if region.is_full(self.width, self.height) {
            self.invalidate();
            self.state = PendingState::Pixels(pixels.to_vec());
            return Ok(());
        }
        if region.is_empty() {
            return Ok(());
        }

        let mut base = self.take_full_buffer(backend)?;
        blit(&mut base, self.width, pixels, region);
        tracing::trace!(texture = self.texture.0, ?region, "partial write buffered");
        self.state = PendingState::Pixels(base);
        Ok(())
    }

    /// Move out a full-size buffer equal to the image's current logical content.
    ///
    /// On readback failure the state is left as it was.
    fn take_full_buffer<B: TextureBackend + ?Sized>(
        &mut self,
        backend: &mut B,
    ) -> TexstageResult<Vec<u8>> {
        match std::mem::replace(&mut self.state, PendingState::Resolved) {
            PendingState::Fill(color) => Ok(solid(color, rgba_len(self.width, self.height))),
            PendingState::Pixels(buf) | PendingState::Mirrored(buf) => Ok(buf),
            PendingState::Resolved => self.read_back_full(backend),
        }
    }

    fn read_back_full<B: TextureBackend + ?Sized>(
        &self,
        backend: &mut B,
    ) -> TexstageResult<Vec<u8>> {
        tracing::debug!(texture = self.texture.0, "reading back full image");
        let buf = backend.read_pixels(self.texture, Region::full(self.width, self.height))?;
        let expected = rgba_len(self.width, self.height);
        if buf.len() != expected {
            return Err(TexstageError::backend(format!(
                "readback returned {} bytes, expected {expected}",
                buf.len()
            )));
        }
        Ok(buf)
    }

    /// Push pending state to the texture.
    ///
    /// With `keep_local_copy` an uploaded pixel buffer is retained as a clean mirror. At most one
    /// backend push happens per call. On backend failure the pending state is kept.
    pub(crate) fn resolve<B: TextureBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        keep_local_copy: bool,
    ) -> TexstageResult<()> {
        match std::mem::replace(&mut self.state, PendingState::Resolved) {
            PendingState::Pixels(buf) => {
                if let Err(e) = backend.replace_pixels(self.texture, &buf) {
                    self.state = PendingState::Pixels(buf);
                    return Err(e);
                }
                tracing::debug!(
                    texture = self.texture.0,
                    keep_local_copy,
                    "uploaded pending pixels"
                );
                if keep_local_copy {
                    self.state = PendingState::Mirrored(buf);
                }
            }
            PendingState::Fill(color) => {
                if let Err(e) = backend.fill(self.texture, color) {
                    self.state = PendingState::Fill(color);
                    return Err(e);
                }
                tracing::debug!(texture = self.texture.0, ?color, "pushed pending fill");
            }
            other => self.state = other,
        }
        Ok(())
    }

    /// Resolve before the texture is drawn onto. A kept mirror would go stale, so it is dropped.
    pub(crate) fn resolve_as_target<B: TextureBackend + ?Sized>(
        &mut self,
        backend: &mut B,
    ) -> TexstageResult<()> {
        self.resolve(backend, false)?;
        self.invalidate();
        Ok(())
    }

    pub(crate) fn pixels<B: TextureBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        region: Region,
    ) -> TexstageResult<Vec<u8>> {
        if !region.within(self.width, self.height) {
            return Err(TexstageError::out_of_range(format!(
                "pixels region {region:?} outside {}x{}",
                self.width, self.height
            )));
        }

        // A pending fill answers without a round-trip.
        if let PendingState::Fill(color) = self.state {
            return Ok(solid(color, region.byte_len()));
        }
        if self.state == PendingState::Resolved {
            let full = self.read_back_full(backend)?;
            self.state = PendingState::Mirrored(full);
        }

        match &self.state {
            PendingState::Pixels(buf) | PendingState::Mirrored(buf) => {
                Ok(copy_region(buf, self.width, region))
            }
            PendingState::Resolved | PendingState::Fill(_) => {
                unreachable!("local buffer populated above")
            }
        }
    }

    /// Drop pending state and release the texture.
    pub(crate) fn dispose<B: TextureBackend + ?Sized>(&mut self, backend: &mut B) {
        self.invalidate();
        backend.dispose_texture(self.texture);
    }
}

/// Panic unless `len` is exactly the RGBA8 size of `region`.
pub(crate) fn check_pixel_len(len: usize, region: Region) {
    let expected = region.byte_len();
    if len != expected {
        panic!("texstage: len(pixels) was {len} but must be {expected} for region {region:?}");
    }
}

fn solid(color: Rgba8Premul, len: usize) -> Vec<u8> {
    let px = color.to_array();
    let mut out = vec![0u8; len];
    for d in out.chunks_exact_mut(4) {
        d.copy_from_slice(&px);
    }
    out
}

fn copy_region(src: &[u8], src_width: u32, region: Region) -> Vec<u8> {
    let stride = src_width as usize * 4;
    let row_len = region.width as usize * 4;
    let mut out = Vec::with_capacity(region.byte_len());
    for j in 0..region.height as usize {
        let start = (region.y as usize + j) * stride + region.x as usize * 4;
        out.extend_from_slice(&src[start..start + row_len]);
    }
    out
}

fn blit(dst: &mut [u8], dst_width: u32, src: &[u8], region: Region) {
    let stride = dst_width as usize * 4;
    let row_len = region.width as usize * 4;
    for (j, row) in src.chunks_exact(row_len).enumerate() {
        let start = (region.y as usize + j) * stride + region.x as usize * 4;
        dst[start..start + row_len].copy_from_slice(row);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/buffered/image.rs"]
mod tests;
