use crate::foundation::core::BlendMode;
use crate::foundation::math::mul_div255_u8;

/// One premultiplied RGBA8 pixel in memory order.
pub type PremulRgba8 = [u8; 4];

#[derive(Clone, Copy)]
enum Factor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
}

impl Factor {
    fn weight(self, src_a: u8, dst_a: u8) -> u16 {
        match self {
            Factor::Zero => 0,
            Factor::One => 255,
            Factor::SrcAlpha => u16::from(src_a),
            Factor::OneMinusSrcAlpha => 255 - u16::from(src_a),
            Factor::DstAlpha => u16::from(dst_a),
            Factor::OneMinusDstAlpha => 255 - u16::from(dst_a),
        }
    }
}

fn factors(mode: BlendMode) -> (Factor, Factor) {
    use Factor::*;
    match mode {
        BlendMode::Clear => (Zero, Zero),
        BlendMode::Copy => (One, Zero),
        BlendMode::Destination => (Zero, One),
        BlendMode::SourceOver => (One, OneMinusSrcAlpha),
        BlendMode::DestinationOver => (OneMinusDstAlpha, One),
        BlendMode::SourceIn => (DstAlpha, Zero),
        BlendMode::DestinationIn => (Zero, SrcAlpha),
        BlendMode::SourceOut => (OneMinusDstAlpha, Zero),
        BlendMode::DestinationOut => (Zero, OneMinusSrcAlpha),
        BlendMode::SourceAtop => (DstAlpha, OneMinusSrcAlpha),
        BlendMode::DestinationAtop => (OneMinusDstAlpha, SrcAlpha),
        BlendMode::Xor => (OneMinusDstAlpha, OneMinusSrcAlpha),
        BlendMode::Lighter => (One, One),
    }
}

/// Composite one premultiplied pixel: `out = src * Fs + dst * Fd`.
pub fn blend(dst: PremulRgba8, src: PremulRgba8, mode: BlendMode) -> PremulRgba8 {
    let (fs, fd) = factors(mode);
    let ws = fs.weight(src[3], dst[3]);
    let wd = fd.weight(src[3], dst[3]);

    let mut out = [0u8; 4];
    for i in 0..4 {
        let sc = mul_div255_u8(u16::from(src[i]), ws);
        let dc = mul_div255_u8(u16::from(dst[i]), wd);
        out[i] = sc.saturating_add(dc);
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/render/blend.rs"]
mod tests;
