//! Vertex layout shared by [`crate::Graphics::draw_triangles`] callers and backends.
//!
//! Each vertex is [`VERTEX_FLOAT_NUM`] floats:
//! `dx, dy` (destination position), `sx, sy` (normalized texture coordinate),
//! `sx0, sy0, sx1, sy1` (normalized source region bounds), `r, g, b, a` (vertex color scale).

use crate::foundation::core::{Affine, Point, Region};
use crate::foundation::error::{TexstageError, TexstageResult};

/// Floats per vertex.
pub const VERTEX_FLOAT_NUM: usize = 12;

/// Index list for the two triangles of a quad built by [`quad_vertices`].
pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 1, 2, 3];

/// Build the four vertices of a textured quad covering `region` of a `src_width x src_height`
/// texture, placed into the destination with `transform`.
///
/// Returns an empty vector when `region` is empty.
pub fn quad_vertices(
    src_width: u32,
    src_height: u32,
    region: Region,
    transform: Affine,
    color: [f32; 4],
) -> Vec<f32> {
    if region.is_empty() || src_width == 0 || src_height == 0 {
        return Vec::new();
    }

    let wf = src_width as f32;
    let hf = src_height as f32;
    let u0 = region.x as f32 / wf;
    let v0 = region.y as f32 / hf;
    let u1 = (region.x as f32 + region.width as f32) / wf;
    let v1 = (region.y as f32 + region.height as f32) / hf;
    let w = f64::from(region.width);
    let h = f64::from(region.height);

    let corners = [
        (Point::new(0.0, 0.0), u0, v0),
        (Point::new(w, 0.0), u1, v0),
        (Point::new(0.0, h), u0, v1),
        (Point::new(w, h), u1, v1),
    ];

    let mut out = Vec::with_capacity(4 * VERTEX_FLOAT_NUM);
    for (p, u, v) in corners {
        let d = transform * p;
        out.extend_from_slice(&[
            d.x as f32, d.y as f32, u, v, u0, v0, u1, v1, color[0], color[1], color[2], color[3],
        ]);
    }
    out
}

/// Write one vertex with no source region (`sx0..sy1` span the whole texture).
#[allow(clippy::too_many_arguments)]
pub fn put_vertex(
    out: &mut [f32],
    src_width: u32,
    src_height: u32,
    dx: f32,
    dy: f32,
    sx: f32,
    sy: f32,
    color: [f32; 4],
) {
    let wf = src_width.max(1) as f32;
    let hf = src_height.max(1) as f32;
    out[..VERTEX_FLOAT_NUM].copy_from_slice(&[
        dx,
        dy,
        sx / wf,
        sy / hf,
        0.0,
        0.0,
        1.0,
        1.0,
        color[0],
        color[1],
        color[2],
        color[3],
    ]);
}

/// Number of complete vertices in a packed vertex slice.
pub fn vertex_count(vertices: &[f32]) -> usize {
    vertices.len() / VERTEX_FLOAT_NUM
}

/// Check that `vertices` holds whole vertices, `indices` whole triangles, and every index names
/// an existing vertex.
pub fn check_mesh(vertices: &[f32], indices: &[u16]) -> TexstageResult<()> {
    if !vertices.len().is_multiple_of(VERTEX_FLOAT_NUM) {
        return Err(TexstageError::validation(format!(
            "vertex buffer length {} is not a multiple of {VERTEX_FLOAT_NUM}",
            vertices.len()
        )));
    }
    if !indices.len().is_multiple_of(3) {
        return Err(TexstageError::validation(format!(
            "index count {} is not a multiple of 3",
            indices.len()
        )));
    }
    let n = vertex_count(vertices);
    match indices.iter().find(|&&i| usize::from(i) >= n) {
        Some(bad) => Err(TexstageError::out_of_range(format!(
            "index {bad} out of range for {n} vertices"
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/vertices.rs"]
mod tests;
