pub use kurbo::{Affine, Point, Vec2};

/// Premultiplied RGBA8 (r,g,b already multiplied by a).
///
/// Images store and return these bytes verbatim; a pending fill read back through
/// [`crate::Graphics::pixels`] yields exactly `[r, g, b, a]` per pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Rgba8Premul {
    /// Red channel premultiplied by alpha.
    pub r: u8,
    /// Green channel premultiplied by alpha.
    pub g: u8,
    /// Blue channel premultiplied by alpha.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba8Premul {
    /// Build a color from already-premultiplied channels.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Fully transparent black.
    pub const fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Convert straight-alpha RGBA8 into premultiplied RGBA8.
    pub fn from_straight_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        fn premul(c: u8, a: u8) -> u8 {
            let c = u16::from(c);
            let a = u16::from(a);
            (((c * a) + 127) / 255) as u8
        }

        Self {
            r: premul(r, a),
            g: premul(g, a),
            b: premul(b, a),
            a,
        }
    }

    /// Convert back to straight-alpha RGBA8 (rounded), as PNG and most file formats expect.
    pub fn to_straight_rgba(self) -> [u8; 4] {
        if self.a == 0 {
            return [0, 0, 0, 0];
        }
        let unpremul = |c: u8| {
            let v = (u32::from(c) * 255 + u32::from(self.a) / 2) / u32::from(self.a);
            v.min(255) as u8
        };
        [unpremul(self.r), unpremul(self.g), unpremul(self.b), self.a]
    }

    /// Channels in memory order.
    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Build from channels in memory order.
    pub const fn from_array(px: [u8; 4]) -> Self {
        Self::new(px[0], px[1], px[2], px[3])
    }
}

/// Pixel rectangle with a signed origin.
///
/// The origin is signed so that regions computed from untrusted arithmetic can be rejected with
/// [`crate::TexstageError::OutOfRange`] instead of wrapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Region {
    /// Left edge in pixels.
    pub x: i32,
    /// Top edge in pixels.
    pub y: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Region {
    /// Create a region from origin and size.
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Region covering a whole `width x height` image.
    pub const fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Return `true` when the region has no pixels.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Return `true` when the region is exactly `[0,width) x [0,height)`.
    pub fn is_full(self, width: u32, height: u32) -> bool {
        self.x == 0 && self.y == 0 && self.width == width && self.height == height
    }

    /// Return `true` when the region lies inside `[0,width) x [0,height)`.
    pub fn within(self, width: u32, height: u32) -> bool {
        let x1 = i64::from(self.x) + i64::from(self.width);
        let y1 = i64::from(self.y) + i64::from(self.height);
        self.x >= 0 && self.y >= 0 && x1 <= i64::from(width) && y1 <= i64::from(height)
    }

    /// Number of RGBA8 bytes needed to hold the region.
    pub fn byte_len(self) -> usize {
        rgba_len(self.width, self.height)
    }
}

/// Number of bytes in a tightly packed RGBA8 buffer of `width x height`.
pub fn rgba_len(width: u32, height: u32) -> usize {
    (width as usize)
        .saturating_mul(height as usize)
        .saturating_mul(4)
}

/// Porter-Duff compositing operator used when drawing onto an image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    /// Result is transparent.
    Clear,
    /// Source replaces destination.
    Copy,
    /// Destination is kept.
    Destination,
    /// Source over destination.
    #[default]
    SourceOver,
    /// Destination over source.
    DestinationOver,
    /// Source where destination is opaque.
    SourceIn,
    /// Destination where source is opaque.
    DestinationIn,
    /// Source where destination is transparent.
    SourceOut,
    /// Destination where source is transparent.
    DestinationOut,
    /// Source atop destination.
    SourceAtop,
    /// Destination atop source.
    DestinationAtop,
    /// Source and destination where the other is transparent.
    Xor,
    /// Saturating sum of source and destination.
    Lighter,
}

/// Texture sampling filter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    /// Nearest texel.
    #[default]
    Nearest,
    /// Bilinear interpolation.
    Linear,
}

/// Texture addressing outside the source region.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressMode {
    /// No clamping; callers guarantee coordinates stay inside the source.
    #[default]
    Unsafe,
    /// Samples outside the source region are transparent.
    ClampToZero,
    /// Coordinates wrap around the source region.
    Repeat,
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
