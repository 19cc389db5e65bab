use super::*;

#[test]
fn mul_div255_edges() {
    assert_eq!(mul_div255_u8(255, 255), 255);
    assert_eq!(mul_div255_u8(0, 255), 0);
    assert_eq!(mul_div255_u8(128, 255), 128);
    assert_eq!(mul_div255_u16(255, 128), 128);
}

#[test]
fn premultiply_roundtrip_is_stable_for_opaque() {
    let px = [10, 200, 30, 255];
    assert_eq!(premultiply_f32(unpremultiply_f32(px)), px);
}

#[test]
fn unpremultiply_transparent_is_zero() {
    assert_eq!(unpremultiply_f32([5, 5, 5, 0]), [0.0; 4]);
}
