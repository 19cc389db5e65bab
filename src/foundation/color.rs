use crate::foundation::math::{premultiply_f32, unpremultiply_f32};

/// 4x5 color transform applied to straight-alpha color in `0.0..=1.0`.
///
/// Row-major; each row is `[r, g, b, a, translate]`:
/// `out.r = m[0]*r + m[1]*g + m[2]*b + m[3]*a + m[4]`, and so on for g, b, a.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ColorMatrix {
    /// Matrix elements, row-major.
    pub m: [f32; 20],
}

impl Default for ColorMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ColorMatrix {
    /// The matrix that leaves colors unchanged.
    pub const IDENTITY: Self = Self {
        m: [
            1.0, 0.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0, 0.0,
        ],
    };

    /// Per-channel scale.
    pub fn scale(r: f32, g: f32, b: f32, a: f32) -> Self {
        let mut out = Self::IDENTITY;
        out.m[0] = r;
        out.m[6] = g;
        out.m[12] = b;
        out.m[18] = a;
        out
    }

    /// Per-channel translation.
    pub fn translate(r: f32, g: f32, b: f32, a: f32) -> Self {
        let mut out = Self::IDENTITY;
        out.m[4] = r;
        out.m[9] = g;
        out.m[14] = b;
        out.m[19] = a;
        out
    }

    /// Return `true` when the matrix is exactly the identity.
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Compose: apply `self` first, then `next`.
    pub fn then(&self, next: &ColorMatrix) -> ColorMatrix {
        let a = &next.m;
        let b = &self.m;
        let mut m = [0.0f32; 20];
        for row in 0..4 {
            for col in 0..5 {
                let mut v = 0.0;
                for k in 0..4 {
                    v += a[row * 5 + k] * b[k * 5 + col];
                }
                if col == 4 {
                    v += a[row * 5 + 4];
                }
                m[row * 5 + col] = v;
            }
        }
        ColorMatrix { m }
    }

    /// Apply to a straight-alpha color.
    pub fn apply(&self, c: [f32; 4]) -> [f32; 4] {
        let m = &self.m;
        let mut out = [0.0f32; 4];
        for (row, o) in out.iter_mut().enumerate() {
            let r = &m[row * 5..row * 5 + 5];
            *o = (r[0] * c[0] + r[1] * c[1] + r[2] * c[2] + r[3] * c[3] + r[4]).clamp(0.0, 1.0);
        }
        out
    }

    /// Apply to a premultiplied RGBA8 pixel.
    pub fn apply_premul(&self, px: [u8; 4]) -> [u8; 4] {
        if self.is_identity() {
            return px;
        }
        premultiply_f32(self.apply(unpremultiply_f32(px)))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/color.rs"]
mod tests;
