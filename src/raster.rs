//! Texel-grid triangle rasterization.
//!
//! Visits every texel of a grid whose center lies inside a 2D triangle and
//! hands the barycentric coordinates of the center to a callback. The caller
//! interpolates whatever attributes it needs (world position, normal) from
//! those coordinates.

use crate::math::{barycentric_is_inside, get_barycentric_coords_2d};
use nalgebra::{Vector2, Vector3};

/// Calls `pixel` for each texel of a `width` x `height` grid covered by the
/// triangle `pts`. Coverage is tested at texel centers. Edge texels shared by
/// two triangles end up in at least one of them; texels missed by both are
/// later filled by the bleed reduction pass.
pub fn rasterize_triangle<F>(pts: [Vector2<f32>; 3], width: usize, height: usize, mut pixel: F)
where
    F: FnMut(usize, usize, Vector3<f32>),
{
    let (min, max) = triangle_bounds(&pts, width, height);

    for y in min.y..max.y {
        for x in min.x..max.x {
            let center = Vector2::new(x as f32 + 0.5, y as f32 + 0.5);
            let bary = get_barycentric_coords_2d(center, pts[0], pts[1], pts[2]);
            if barycentric_is_inside(bary) {
                pixel(x, y, Vector3::new(bary.0, bary.1, bary.2));
            }
        }
    }
}

/// Integer texel bounds of the triangle, clamped to the grid. The returned
/// max is exclusive.
fn triangle_bounds(
    pts: &[Vector2<f32>; 3],
    width: usize,
    height: usize,
) -> (Vector2<usize>, Vector2<usize>) {
    let mut min = Vector2::new(f32::MAX, f32::MAX);
    let mut max = Vector2::new(f32::MIN, f32::MIN);
    for pt in pts {
        min.x = min.x.min(pt.x);
        min.y = min.y.min(pt.y);
        max.x = max.x.max(pt.x);
        max.y = max.y.max(pt.y);
    }
    (
        Vector2::new(
            (min.x.floor().max(0.0) as usize).min(width),
            (min.y.floor().max(0.0) as usize).min(height),
        ),
        Vector2::new(
            (max.x.ceil().max(0.0) as usize + 1).min(width),
            (max.y.ceil().max(0.0) as usize + 1).min(height),
        ),
    )
}
