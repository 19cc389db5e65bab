use super::*;
use crate::foundation::core::Vec2;

#[test]
fn quad_vertices_identity_layout() {
    let vs = quad_vertices(4, 2, Region::new(0, 0, 2, 2), Affine::IDENTITY, [1.0; 4]);
    assert_eq!(vs.len(), 4 * VERTEX_FLOAT_NUM);
    assert_eq!(vertex_count(&vs), 4);

    // top-left
    assert_eq!(&vs[0..4], &[0.0, 0.0, 0.0, 0.0]);
    // bottom-right
    let br = &vs[3 * VERTEX_FLOAT_NUM..4 * VERTEX_FLOAT_NUM];
    assert_eq!(&br[0..4], &[2.0, 2.0, 0.5, 1.0]);
    assert_eq!(&br[4..8], &[0.0, 0.0, 0.5, 1.0]);
    assert_eq!(&br[8..12], &[1.0, 1.0, 1.0, 1.0]);
}

#[test]
fn quad_vertices_applies_transform() {
    let t = Affine::translate(Vec2::new(10.0, 5.0));
    let vs = quad_vertices(8, 8, Region::new(2, 2, 4, 4), t, [1.0; 4]);
    assert_eq!(&vs[0..2], &[10.0, 5.0]);
    assert_eq!(&vs[VERTEX_FLOAT_NUM..VERTEX_FLOAT_NUM + 2], &[14.0, 5.0]);
}

#[test]
fn quad_vertices_empty_region_is_empty() {
    assert!(quad_vertices(4, 4, Region::new(1, 1, 0, 3), Affine::IDENTITY, [1.0; 4]).is_empty());
}

#[test]
fn put_vertex_spans_whole_texture() {
    let mut out = [0.0f32; VERTEX_FLOAT_NUM];
    put_vertex(&mut out, 4, 4, 1.0, 2.0, 2.0, 4.0, [0.5; 4]);
    assert_eq!(&out[..8], &[1.0, 2.0, 0.5, 1.0, 0.0, 0.0, 1.0, 1.0]);
    assert_eq!(&out[8..], &[0.5; 4]);
}

#[test]
fn check_mesh_accepts_quad_and_rejects_bad_counts() {
    let vs = quad_vertices(2, 2, Region::full(2, 2), Affine::IDENTITY, [1.0; 4]);
    check_mesh(&vs, &QUAD_INDICES).unwrap();
    check_mesh(&[], &[]).unwrap();

    assert!(matches!(
        check_mesh(&vs[..VERTEX_FLOAT_NUM + 1], &[]),
        Err(TexstageError::Validation(_))
    ));
    assert!(matches!(
        check_mesh(&vs, &[0, 1]),
        Err(TexstageError::Validation(_))
    ));
    assert!(matches!(
        check_mesh(&vs, &[0, 1, 4]),
        Err(TexstageError::OutOfRange(_))
    ));
}
