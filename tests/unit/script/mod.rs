use super::model::{ImageDecl, ImageKindDecl, Script, ScriptOp};
use super::run::run_script;
use crate::foundation::core::{Region, Rgba8Premul};
use crate::foundation::error::TexstageError;
use crate::render::cpu::CpuBackend;
use crate::session::graphics::{Graphics, GraphicsOpts};

const SCRIPT: &str = r#"{
  "images": [
    { "name": "a", "width": 2, "height": 2 },
    { "name": "b", "width": 4, "height": 4, "kind": "screen" }
  ],
  "setup": [
    { "op": "fill", "image": "a", "color": { "r": 255, "g": 0, "b": 0, "a": 255 } },
    { "op": "fill", "image": "b", "color": { "r": 0, "g": 0, "b": 255, "a": 255 } }
  ],
  "frames": [
    [ { "op": "draw_image", "dst": "b", "src": "a", "translate": [1, 1] } ]
  ]
}"#;

#[test]
fn parses_and_defaults() {
    let s = Script::from_json(SCRIPT).unwrap();
    assert_eq!(s.images[1].kind, ImageKindDecl::Screen);
    assert_eq!(s.images[0].kind, ImageKindDecl::Offscreen);
    match &s.frames[0][0] {
        ScriptOp::DrawImage {
            scale,
            alpha,
            region,
            ..
        } => {
            assert_eq!(*scale, 1.0);
            assert_eq!(*alpha, 1.0);
            assert!(region.is_none());
        }
        other => panic!("unexpected op {other:?}"),
    }
    s.validate().unwrap();
}

#[test]
fn json_roundtrip() {
    let s = Script::from_json(SCRIPT).unwrap();
    let back = Script::from_json(&s.to_json().unwrap()).unwrap();
    assert_eq!(s, back);
}

#[test]
fn unknown_op_is_a_serde_error() {
    let err = Script::from_json(r#"{ "setup": [ { "op": "explode" } ] }"#).unwrap_err();
    assert!(matches!(err, TexstageError::Serde(_)));
}

#[test]
fn validate_rejects_bad_references() {
    let decl = |name: &str| ImageDecl {
        name: name.to_owned(),
        width: 1,
        height: 1,
        kind: ImageKindDecl::Offscreen,
    };
    let fill = |image: &str| ScriptOp::Fill {
        image: image.to_owned(),
        color: Rgba8Premul::transparent(),
    };

    let missing = Script {
        images: vec![decl("a")],
        setup: vec![fill("nope")],
        frames: vec![],
    };
    assert!(matches!(missing.validate(), Err(TexstageError::Validation(_))));

    let dup = Script {
        images: vec![decl("a"), decl("a")],
        ..Script::default()
    };
    assert!(dup.validate().is_err());

    let after_dispose = Script {
        images: vec![decl("a")],
        setup: vec![ScriptOp::Dispose { image: "a".into() }],
        frames: vec![vec![fill("a")]],
    };
    assert!(after_dispose.validate().is_err());

    let bad_len = Script {
        images: vec![decl("a")],
        setup: vec![ScriptOp::ReplacePixels {
            image: "a".into(),
            region: Region::full(1, 1),
            pixels: Some(vec![0; 3]),
            color: None,
        }],
        frames: vec![],
    };
    assert!(bad_len.validate().is_err());
}

#[test]
fn run_script_composites_and_reports_live_images() {
    let mut g = Graphics::new(CpuBackend::default(), GraphicsOpts::default());
    let s = Script::from_json(SCRIPT).unwrap();
    let names = run_script(&mut g, &s).unwrap();
    assert_eq!(names.len(), 2);
    assert_eq!(g.frame_count(), 1);

    let px = g.pixels(names["b"], Region::full(4, 4)).unwrap();
    let at = |x: usize, y: usize| &px[(y * 4 + x) * 4..(y * 4 + x) * 4 + 4];
    assert_eq!(at(0, 0), [0, 0, 255, 255]);
    assert_eq!(at(1, 1), [255, 0, 0, 255]);
    assert_eq!(at(2, 2), [255, 0, 0, 255]);
    assert_eq!(at(3, 3), [0, 0, 255, 255]);
}

#[test]
fn script_without_frames_still_replays_setup() {
    let mut g = Graphics::new(CpuBackend::default(), GraphicsOpts::default());
    let s = Script {
        images: vec![ImageDecl {
            name: "x".into(),
            width: 2,
            height: 1,
            kind: ImageKindDecl::Volatile,
        }],
        setup: vec![ScriptOp::ReplacePixels {
            image: "x".into(),
            region: Region::new(1, 0, 1, 1),
            pixels: None,
            color: Some(Rgba8Premul::new(9, 8, 7, 255)),
        }],
        frames: vec![],
    };
    let names = run_script(&mut g, &s).unwrap();
    assert!(g.queue().is_flushed());
    assert_eq!(
        g.pixels(names["x"], Region::full(2, 1)).unwrap(),
        [0, 0, 0, 0, 9, 8, 7, 255]
    );
}

#[test]
fn oversized_regions_are_range_errors_before_any_buffer_is_built() {
    let huge = Region::new(0, 0, u32::MAX, u32::MAX);
    let s = Script {
        images: vec![ImageDecl {
            name: "a".into(),
            width: 2,
            height: 2,
            kind: ImageKindDecl::Offscreen,
        }],
        setup: vec![ScriptOp::ReplacePixels {
            image: "a".into(),
            region: huge,
            pixels: None,
            color: Some(Rgba8Premul::new(255, 0, 0, 255)),
        }],
        frames: vec![],
    };
    assert!(matches!(s.validate(), Err(TexstageError::OutOfRange(_))));

    let mut g = Graphics::new(CpuBackend::default(), GraphicsOpts::default());
    assert!(matches!(
        run_script(&mut g, &s),
        Err(TexstageError::OutOfRange(_))
    ));
    assert_eq!(g.queue().len(), 0);
}

#[test]
fn copy_and_draw_regions_are_checked_against_declared_sizes() {
    let mut s = Script::from_json(SCRIPT).unwrap();
    s.setup.push(ScriptOp::CopyPixels {
        dst: "a".into(),
        src: "b".into(),
        region: Region::full(4, 4),
    });
    assert!(matches!(s.validate(), Err(TexstageError::OutOfRange(_))));

    let mut s = Script::from_json(SCRIPT).unwrap();
    if let ScriptOp::DrawImage { region, .. } = &mut s.frames[0][0] {
        *region = Some(Region::new(1, 1, 2, 2));
    }
    assert!(matches!(s.validate(), Err(TexstageError::OutOfRange(_))));
}
