use std::collections::BTreeMap;

use crate::foundation::color::ColorMatrix;
use crate::foundation::core::{Affine, Region, Vec2};
use crate::foundation::error::{TexstageError, TexstageResult};
use crate::render::backend::{DrawImageOptions, TextureBackend};
use crate::script::model::{ImageKindDecl, Script, ScriptOp};
use crate::session::graphics::{Graphics, ImageId};

/// Run `script` on `graphics`.
///
/// Images are created and `setup` is issued first; on a deferring session both are captured and
/// replayed by the first frame. Each entry of `frames` then runs between `begin_frame` and
/// `end_frame`. A script without frames still runs one empty frame so that setup is replayed.
///
/// Returns the name of every image still alive at the end.
#[tracing::instrument(skip_all, fields(images = script.images.len(), frames = script.frames.len()))]
pub fn run_script<B: TextureBackend>(
    graphics: &mut Graphics<B>,
    script: &Script,
) -> TexstageResult<BTreeMap<String, ImageId>> {
    script.validate()?;

    let mut names = BTreeMap::new();
    for decl in &script.images {
        let id = match decl.kind {
            ImageKindDecl::Offscreen => graphics.new_image(decl.width, decl.height)?,
            ImageKindDecl::Volatile => graphics.new_volatile_image(decl.width, decl.height)?,
            ImageKindDecl::Screen => graphics.new_screen_image(decl.width, decl.height)?,
        };
        names.insert(decl.name.clone(), id);
    }

    for op in &script.setup {
        apply(graphics, &mut names, op)?;
    }

    let empty = [Vec::new()];
    let frames: &[Vec<ScriptOp>] = if script.frames.is_empty() {
        &empty
    } else {
        &script.frames
    };
    for (i, ops) in frames.iter().enumerate() {
        graphics.begin_frame()?;
        for op in ops {
            apply(graphics, &mut names, op)?;
        }
        graphics.end_frame()?;
        tracing::debug!(frame = i, ops = ops.len(), "script frame done");
    }
    Ok(names)
}

fn lookup(names: &BTreeMap<String, ImageId>, name: &str) -> TexstageResult<ImageId> {
    names
        .get(name)
        .copied()
        .ok_or_else(|| TexstageError::validation(format!("unknown image '{name}'")))
}

fn apply<B: TextureBackend>(
    graphics: &mut Graphics<B>,
    names: &mut BTreeMap<String, ImageId>,
    op: &ScriptOp,
) -> TexstageResult<()> {
    match op {
        ScriptOp::Fill { image, color } => {
            graphics.fill(lookup(names, image)?, *color);
            Ok(())
        }
        ScriptOp::ReplacePixels {
            image,
            region,
            pixels,
            color,
        } => {
            let bytes = ScriptOp::replacement_bytes(*region, pixels.as_ref(), *color);
            graphics.replace_pixels(lookup(names, image)?, &bytes, *region)
        }
        ScriptOp::CopyPixels { dst, src, region } => {
            graphics.copy_pixels(lookup(names, dst)?, lookup(names, src)?, *region)
        }
        ScriptOp::DrawImage {
            dst,
            src,
            region,
            translate,
            scale,
            blend,
            alpha,
        } => {
            let dst = lookup(names, dst)?;
            let src = lookup(names, src)?;
            let region = region.unwrap_or_else(|| {
                let (w, h) = graphics.size(src);
                Region::full(w, h)
            });
            let transform =
                Affine::translate(Vec2::new(translate[0], translate[1])) * Affine::scale(*scale);
            let opts = DrawImageOptions::new(region)
                .with_transform(transform)
                .with_blend(*blend)
                .with_color_matrix(ColorMatrix::scale(1.0, 1.0, 1.0, *alpha));
            graphics.draw_image(dst, src, &opts)
        }
        ScriptOp::Dispose { image } => {
            let id = lookup(names, image)?;
            graphics.mark_disposed(id);
            names.remove(image);
            Ok(())
        }
    }
}
