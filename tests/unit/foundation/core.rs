use super::*;

#[test]
fn region_within_boundaries() {
    assert!(Region::full(4, 4).within(4, 4));
    assert!(Region::new(3, 3, 1, 1).within(4, 4));
    assert!(Region::new(2, 0, 0, 0).within(4, 4));

    assert!(!Region::new(-1, 0, 1, 1).within(4, 4));
    assert!(!Region::new(0, -1, 1, 1).within(4, 4));
    assert!(!Region::new(3, 0, 2, 1).within(4, 4));
    assert!(!Region::new(0, 3, 1, 2).within(4, 4));
}

#[test]
fn region_within_does_not_overflow() {
    let r = Region::new(i32::MAX, 0, u32::MAX, 1);
    assert!(!r.within(u32::MAX, 1));
}

#[test]
fn region_full_and_empty() {
    assert!(Region::full(3, 2).is_full(3, 2));
    assert!(!Region::new(0, 0, 3, 1).is_full(3, 2));
    assert!(Region::new(1, 1, 0, 5).is_empty());
    assert_eq!(Region::full(3, 2).byte_len(), 24);
}

#[test]
fn straight_to_premul_rounds() {
    let c = Rgba8Premul::from_straight_rgba(255, 128, 0, 128);
    assert_eq!(c, Rgba8Premul::new(128, 64, 0, 128));
    assert_eq!(
        Rgba8Premul::from_array(c.to_array()),
        Rgba8Premul::new(128, 64, 0, 128)
    );
}

#[test]
fn blend_mode_serde_is_snake_case() {
    let s = serde_json::to_string(&BlendMode::SourceOver).unwrap();
    assert_eq!(s, "\"source_over\"");
    let m: BlendMode = serde_json::from_str("\"destination_out\"").unwrap();
    assert_eq!(m, BlendMode::DestinationOut);
}

#[test]
fn premul_to_straight_roundtrips_opaque_and_half() {
    assert_eq!(Rgba8Premul::new(10, 20, 30, 255).to_straight_rgba(), [10, 20, 30, 255]);
    assert_eq!(Rgba8Premul::new(64, 0, 128, 128).to_straight_rgba(), [128, 0, 255, 128]);
    assert_eq!(Rgba8Premul::new(5, 5, 5, 0).to_straight_rgba(), [0, 0, 0, 0]);
}
