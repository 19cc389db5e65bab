use super::*;
use crate::render::cpu::{CpuBackend, FailPoint};

const RED: Rgba8Premul = Rgba8Premul::new(255, 0, 0, 255);
const BLUE: Rgba8Premul = Rgba8Premul::new(0, 0, 255, 255);

fn setup(w: u32, h: u32) -> (CpuBackend, BufferedImage) {
    let mut b = CpuBackend::recording();
    let t = b.create_texture(w, h, false).unwrap();
    b.clear_log();
    (b, BufferedImage::new(t, w, h))
}

#[test]
fn fills_coalesce_into_one_push() {
    let (mut b, mut img) = setup(2, 2);
    img.fill(RED);
    img.fill(BLUE);
    assert!(b.log().is_empty());

    img.resolve(&mut b, false).unwrap();
    assert_eq!(b.stats().fills, 1);
    assert_eq!(b.texture_bytes(img.texture()).unwrap(), BLUE.to_array().repeat(4));
    assert_eq!(img.state(), &PendingState::Resolved);
}

#[test]
fn pending_fill_is_read_without_backend() {
    let (mut b, mut img) = setup(3, 2);
    img.fill(RED);
    let px = img.pixels(&mut b, Region::new(1, 0, 2, 2)).unwrap();
    assert_eq!(px, RED.to_array().repeat(4));
    assert_eq!(b.stats().gpu_touches(), 0);
}

#[test]
fn full_replace_then_read_is_local() {
    let (mut b, mut img) = setup(2, 1);
    let buf = [1, 2, 3, 4, 5, 6, 7, 8];
    img.replace_pixels(&mut b, &buf, Region::full(2, 1)).unwrap();
    assert_eq!(img.pixels(&mut b, Region::full(2, 1)).unwrap(), buf);
    assert_eq!(img.pixels(&mut b, Region::new(1, 0, 1, 1)).unwrap(), [5, 6, 7, 8]);
    assert_eq!(b.stats().gpu_touches(), 0);
}

#[test]
fn full_replace_discards_pending_fill() {
    let (mut b, mut img) = setup(1, 1);
    img.fill(RED);
    img.replace_pixels(&mut b, &[9, 9, 9, 9], Region::full(1, 1))
        .unwrap();
    img.resolve(&mut b, false).unwrap();
    assert_eq!(b.stats().fills, 0);
    assert_eq!(b.stats().uploads, 1);
}

#[test]
fn partial_replace_over_fill_synthesizes_base() {
    let (mut b, mut img) = setup(2, 2);
    img.fill(RED);
    img.replace_pixels(&mut b, &BLUE.to_array(), Region::new(1, 1, 1, 1))
        .unwrap();
    assert_eq!(b.stats().gpu_touches(), 0);

    let px = img.pixels(&mut b, Region::full(2, 2)).unwrap();
    let mut want = RED.to_array().repeat(3);
    want.extend_from_slice(&BLUE.to_array());
    assert_eq!(px, want);
}

#[test]
fn partial_replace_on_resolved_reads_back_once() {
    let (mut b, mut img) = setup(2, 2);
    b.fill(img.texture(), RED).unwrap();

    img.replace_pixels(&mut b, &BLUE.to_array(), Region::new(0, 0, 1, 1))
        .unwrap();
    img.replace_pixels(&mut b, &BLUE.to_array(), Region::new(1, 0, 1, 1))
        .unwrap();
    assert_eq!(b.stats().readbacks, 1);

    img.resolve(&mut b, false).unwrap();
    let mut want = BLUE.to_array().repeat(2);
    want.extend(RED.to_array().repeat(2));
    assert_eq!(b.texture_bytes(img.texture()).unwrap(), want);
}

#[test]
fn resolve_with_local_copy_keeps_mirror() {
    let (mut b, mut img) = setup(1, 1);
    img.replace_pixels(&mut b, &[1, 2, 3, 4], Region::full(1, 1))
        .unwrap();
    img.resolve(&mut b, true).unwrap();
    assert_eq!(img.state(), &PendingState::Mirrored(vec![1, 2, 3, 4]));

    assert_eq!(img.pixels(&mut b, Region::full(1, 1)).unwrap(), [1, 2, 3, 4]);
    assert_eq!(b.stats().readbacks, 0);

    img.resolve(&mut b, true).unwrap();
    assert_eq!(b.stats().uploads, 1);
}

#[test]
fn resolved_read_caches_full_image() {
    let (mut b, mut img) = setup(2, 2);
    b.fill(img.texture(), BLUE).unwrap();
    img.pixels(&mut b, Region::new(0, 0, 1, 1)).unwrap();
    img.pixels(&mut b, Region::new(1, 1, 1, 1)).unwrap();
    assert_eq!(b.stats().readbacks, 1);
    assert!(matches!(img.state(), PendingState::Mirrored(_)));
}

#[test]
fn out_of_range_reads_fail_without_backend() {
    let (mut b, mut img) = setup(2, 2);
    for r in [
        Region::new(-1, 0, 1, 1),
        Region::new(0, -1, 1, 1),
        Region::new(1, 0, 2, 1),
        Region::new(0, 2, 1, 1),
    ] {
        let err = img.pixels(&mut b, r).unwrap_err();
        assert!(matches!(err, TexstageError::OutOfRange(_)), "{r:?}");
    }
    assert!(b.log().is_empty());
}

#[test]
fn out_of_range_write_is_rejected() {
    let (mut b, mut img) = setup(2, 2);
    let err = img
        .replace_pixels(&mut b, &[0; 4], Region::new(2, 0, 1, 1))
        .unwrap_err();
    assert!(matches!(err, TexstageError::OutOfRange(_)));
    assert_eq!(img.state(), &PendingState::Resolved);
}

#[test]
#[should_panic(expected = "len(pixels) was 3 but must be 4")]
fn wrong_buffer_length_panics() {
    let (mut b, mut img) = setup(1, 1);
    let _ = img.replace_pixels(&mut b, &[0; 3], Region::full(1, 1));
}

#[test]
fn failed_upload_keeps_pending_pixels() {
    let (mut b, mut img) = setup(1, 1);
    img.replace_pixels(&mut b, &[7, 7, 7, 7], Region::full(1, 1))
        .unwrap();
    b.fail_next(FailPoint::ReplacePixels);
    assert!(img.resolve(&mut b, false).is_err());
    assert_eq!(img.state(), &PendingState::Pixels(vec![7, 7, 7, 7]));

    img.resolve(&mut b, false).unwrap();
    assert_eq!(b.texture_bytes(img.texture()).unwrap(), &[7, 7, 7, 7]);
}

#[test]
fn failed_fill_push_keeps_pending_fill() {
    let (mut b, mut img) = setup(1, 1);
    img.fill(RED);
    b.fail_next(FailPoint::Fill);
    assert!(img.resolve(&mut b, false).is_err());
    assert_eq!(img.state(), &PendingState::Fill(RED));
}

#[test]
fn failed_readback_leaves_state_resolved() {
    let (mut b, mut img) = setup(2, 1);
    b.fail_next(FailPoint::ReadPixels);
    assert!(
        img.replace_pixels(&mut b, &[0; 4], Region::new(0, 0, 1, 1))
            .is_err()
    );
    assert_eq!(img.state(), &PendingState::Resolved);
}

#[test]
fn dispose_releases_texture() {
    let (mut b, mut img) = setup(1, 1);
    img.fill(RED);
    img.dispose(&mut b);
    assert_eq!(b.texture_count(), 0);
    assert_eq!(b.stats().fills, 0);
}

#[test]
fn draw_target_resolve_drops_mirror() {
    let (mut b, mut img) = setup(1, 1);
    img.replace_pixels(&mut b, &[1, 1, 1, 1], Region::full(1, 1))
        .unwrap();
    img.resolve(&mut b, true).unwrap();
    img.resolve_as_target(&mut b).unwrap();
    assert_eq!(img.state(), &PendingState::Resolved);
    assert_eq!(b.stats().uploads, 1);
}
