use super::*;

#[test]
fn identity_is_a_noop() {
    let px = [40, 80, 120, 200];
    assert_eq!(ColorMatrix::IDENTITY.apply_premul(px), px);
    assert!(ColorMatrix::default().is_identity());
}

#[test]
fn alpha_scale_halves_opaque_pixel() {
    let half = ColorMatrix::scale(1.0, 1.0, 1.0, 0.5);
    assert_eq!(half.apply_premul([255, 0, 0, 255]), [128, 0, 0, 128]);
}

#[test]
fn then_applies_in_order() {
    let s = ColorMatrix::scale(0.5, 1.0, 1.0, 1.0);
    let t = ColorMatrix::translate(0.25, 0.0, 0.0, 0.0);

    // scale then translate: 1.0 * 0.5 + 0.25
    let st = s.then(&t).apply([1.0, 0.0, 0.0, 1.0]);
    assert!((st[0] - 0.75).abs() < 1e-6);

    // translate then scale: (1.0 + 0.25) clamps only at the end, 1.25 * 0.5
    let ts = t.then(&s).apply([1.0, 0.0, 0.0, 1.0]);
    assert!((ts[0] - 0.625).abs() < 1e-6);
}
