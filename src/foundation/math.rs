pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y) as u8
}

/// Undo premultiplication, returning straight-alpha channels in `0.0..=1.0`.
pub(crate) fn unpremultiply_f32(px: [u8; 4]) -> [f32; 4] {
    let a = f32::from(px[3]) / 255.0;
    if a <= 0.0 {
        return [0.0; 4];
    }
    [
        (f32::from(px[0]) / 255.0 / a).min(1.0),
        (f32::from(px[1]) / 255.0 / a).min(1.0),
        (f32::from(px[2]) / 255.0 / a).min(1.0),
        a,
    ]
}

/// Premultiply straight-alpha channels in `0.0..=1.0` back into RGBA8.
pub(crate) fn premultiply_f32(c: [f32; 4]) -> [u8; 4] {
    let a = c[3].clamp(0.0, 1.0);
    let to_u8 = |v: f32| ((v.clamp(0.0, 1.0) * a * 255.0).round()) as u8;
    [
        to_u8(c[0]),
        to_u8(c[1]),
        to_u8(c[2]),
        ((a * 255.0).round()) as u8,
    ]
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
