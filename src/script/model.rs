use std::collections::BTreeMap;

use crate::foundation::core::{BlendMode, Region, Rgba8Premul};
use crate::foundation::error::{TexstageError, TexstageResult};

/// An operation script: images to create, calls issued before the first frame, and per-frame
/// calls.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    /// Images created up front, in order.
    #[serde(default)]
    pub images: Vec<ImageDecl>,
    /// Calls issued before the first frame; they are deferred and replayed when it begins.
    #[serde(default)]
    pub setup: Vec<ScriptOp>,
    /// Each entry is one frame's calls.
    #[serde(default)]
    pub frames: Vec<Vec<ScriptOp>>,
}

/// One named image.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageDecl {
    /// Name used by ops.
    pub name: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Allocation kind.
    #[serde(default)]
    pub kind: ImageKindDecl,
}

/// How a declared image is allocated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageKindDecl {
    /// Regular offscreen image.
    #[default]
    Offscreen,
    /// Offscreen image whose contents may be discarded between frames.
    Volatile,
    /// Screen framebuffer image.
    Screen,
}

fn one_f64() -> f64 {
    1.0
}

fn one_f32() -> f32 {
    1.0
}

/// One scripted call.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum ScriptOp {
    /// Fill the whole image.
    Fill {
        /// Target image.
        image: String,
        /// Premultiplied color.
        color: Rgba8Premul,
    },
    /// Replace a region with explicit bytes or a solid color.
    ReplacePixels {
        /// Target image.
        image: String,
        /// Target region.
        region: Region,
        /// Row-major premultiplied RGBA8 bytes.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pixels: Option<Vec<u8>>,
        /// Solid color expanded to the region size.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        color: Option<Rgba8Premul>,
    },
    /// Copy a region of `src` to the origin of `dst`.
    CopyPixels {
        /// Destination image.
        dst: String,
        /// Source image.
        src: String,
        /// Source region.
        region: Region,
    },
    /// Composite `src` onto `dst`.
    DrawImage {
        /// Destination image.
        dst: String,
        /// Source image.
        src: String,
        /// Source region; the whole source when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        region: Option<Region>,
        /// Destination offset, applied after scaling.
        #[serde(default)]
        translate: [f64; 2],
        /// Uniform scale.
        #[serde(default = "one_f64")]
        scale: f64,
        /// Compositing operator.
        #[serde(default)]
        blend: BlendMode,
        /// Source opacity in `0..=1`.
        #[serde(default = "one_f32")]
        alpha: f32,
    },
    /// Release an image.
    Dispose {
        /// Released image.
        image: String,
    },
}

impl Script {
    /// Parse a script from JSON text.
    pub fn from_json(s: &str) -> TexstageResult<Self> {
        serde_json::from_str(s).map_err(|e| TexstageError::serde(e.to_string()))
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> TexstageResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| TexstageError::serde(e.to_string()))
    }

    /// Check names, sizes, and per-op arguments without touching any backend.
    ///
    /// Regions are checked against the declared image sizes, so an op naming a region outside
    /// its image is an `OutOfRange` error before any pixel buffer is built.
    pub fn validate(&self) -> TexstageResult<()> {
        let mut live = BTreeMap::new();
        for decl in &self.images {
            if decl.name.trim().is_empty() {
                return Err(TexstageError::validation("image name must be non-empty"));
            }
            if decl.width == 0 || decl.height == 0 {
                return Err(TexstageError::validation(format!(
                    "image '{}' width/height must be > 0",
                    decl.name
                )));
            }
            if live
                .insert(decl.name.as_str(), (decl.width, decl.height))
                .is_some()
            {
                return Err(TexstageError::validation(format!(
                    "image '{}' is declared twice",
                    decl.name
                )));
            }
        }

        let ops = self.setup.iter().chain(self.frames.iter().flatten());
        for op in ops {
            op.validate(&mut live)?;
        }
        Ok(())
    }
}

type LiveImages<'a> = BTreeMap<&'a str, (u32, u32)>;

fn require_live(live: &LiveImages<'_>, name: &str) -> TexstageResult<(u32, u32)> {
    live.get(name).copied().ok_or_else(|| {
        TexstageError::validation(format!("op references unknown or disposed image '{name}'"))
    })
}

fn require_within(region: Region, (width, height): (u32, u32), what: &str) -> TexstageResult<()> {
    if region.within(width, height) {
        Ok(())
    } else {
        Err(TexstageError::out_of_range(format!(
            "{what} region {region:?} outside {width}x{height}"
        )))
    }
}

impl ScriptOp {
    fn validate<'a>(&'a self, live: &mut LiveImages<'a>) -> TexstageResult<()> {
        match self {
            Self::Fill { image, .. } => require_live(live, image).map(|_| ()),
            Self::ReplacePixels {
                image,
                region,
                pixels,
                color,
            } => {
                let size = require_live(live, image)?;
                require_within(*region, size, &format!("replace_pixels on '{image}'"))?;
                match (pixels, color) {
                    (Some(px), None) if px.len() != region.byte_len() => {
                        Err(TexstageError::validation(format!(
                            "replace_pixels on '{image}' has {} bytes, region needs {}",
                            px.len(),
                            region.byte_len()
                        )))
                    }
                    (Some(_), None) | (None, Some(_)) => Ok(()),
                    _ => Err(TexstageError::validation(format!(
                        "replace_pixels on '{image}' needs exactly one of pixels or color"
                    ))),
                }
            }
            Self::CopyPixels { dst, src, .. } | Self::DrawImage { dst, src, .. } => {
                let dst_size = require_live(live, dst)?;
                let src_size = require_live(live, src)?;
                if dst == src {
                    return Err(TexstageError::validation(format!(
                        "op uses image '{dst}' as both source and destination"
                    )));
                }
                if let Self::CopyPixels { region, .. } = self {
                    require_within(*region, src_size, &format!("copy_pixels from '{src}'"))?;
                    let at_origin = Region::new(0, 0, region.width, region.height);
                    require_within(at_origin, dst_size, &format!("copy_pixels to '{dst}'"))?;
                }
                if let Self::DrawImage {
                    region: Some(region),
                    ..
                } = self
                {
                    require_within(*region, src_size, &format!("draw_image from '{src}'"))?;
                }
                if let Self::DrawImage { scale, alpha, .. } = self {
                    if !scale.is_finite() || *scale == 0.0 {
                        return Err(TexstageError::validation(
                            "draw_image scale must be finite and non-zero",
                        ));
                    }
                    if !(0.0..=1.0).contains(alpha) {
                        return Err(TexstageError::validation(
                            "draw_image alpha must be within 0..=1",
                        ));
                    }
                }
                Ok(())
            }
            Self::Dispose { image } => {
                require_live(live, image)?;
                live.remove(image.as_str());
                Ok(())
            }
        }
    }

    /// Pixel bytes for a `replace_pixels` op.
    pub(crate) fn replacement_bytes(
        region: Region,
        pixels: Option<&Vec<u8>>,
        color: Option<Rgba8Premul>,
    ) -> Vec<u8> {
        match (pixels, color) {
            (Some(px), _) => px.clone(),
            (None, Some(c)) => c.to_array().repeat(region.byte_len() / 4),
            (None, None) => Vec::new(),
        }
    }
}
