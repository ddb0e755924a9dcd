//! Math primitives for lightmap generation: planes, rays, bounding volumes
//! and the small set of triangle/barycentric helpers the rasterizer and the
//! partitioner are built on.

#![allow(clippy::many_single_char_names)]

pub mod aabb;
pub mod octree;
pub mod plane;
pub mod ray;

use nalgebra::{Scalar, Vector2, Vector3};
use num_traits::NumAssign;

/// A set of three indices into a vertex buffer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TriangleDefinition(pub [u32; 3]);

impl TriangleDefinition {
    #[inline]
    pub fn indices(&self) -> &[u32; 3] {
        &self.0
    }
}

impl std::ops::Index<usize> for TriangleDefinition {
    type Output = u32;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

/// Axis-aligned rectangle defined by its top-left corner and size.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Rect<T>
where
    T: NumAssign + Scalar + PartialOrd + Copy,
{
    pub position: Vector2<T>,
    pub size: Vector2<T>,
}

impl<T> Rect<T>
where
    T: NumAssign + Scalar + PartialOrd + Copy,
{
    #[inline]
    pub fn new(x: T, y: T, w: T, h: T) -> Self {
        Self {
            position: Vector2::new(x, y),
            size: Vector2::new(w, h),
        }
    }

    #[inline]
    pub fn x(&self) -> T {
        self.position.x
    }

    #[inline]
    pub fn y(&self) -> T {
        self.position.y
    }

    #[inline]
    pub fn w(&self) -> T {
        self.size.x
    }

    #[inline]
    pub fn h(&self) -> T {
        self.size.y
    }
}

pub fn triangle_area(a: Vector3<f32>, b: Vector3<f32>, c: Vector3<f32>) -> f32 {
    0.5 * (b - a).cross(&(c - a)).norm()
}

/// Barycentric coordinates of `p` with respect to triangle `abc`.
pub fn get_barycentric_coords(
    p: &Vector3<f32>,
    a: &Vector3<f32>,
    b: &Vector3<f32>,
    c: &Vector3<f32>,
) -> (f32, f32, f32) {
    let v0 = *b - *a;
    let v1 = *c - *a;
    let v2 = *p - *a;

    let d00 = v0.dot(&v0);
    let d01 = v0.dot(&v1);
    let d11 = v1.dot(&v1);
    let d20 = v2.dot(&v0);
    let d21 = v2.dot(&v1);
    let denom = d00 * d11 - d01.powi(2);

    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    let u = 1.0 - v - w;

    (u, v, w)
}

pub fn get_barycentric_coords_2d(
    p: Vector2<f32>,
    a: Vector2<f32>,
    b: Vector2<f32>,
    c: Vector2<f32>,
) -> (f32, f32, f32) {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;

    let d00 = v0.dot(&v0);
    let d01 = v0.dot(&v1);
    let d11 = v1.dot(&v1);
    let d20 = v2.dot(&v0);
    let d21 = v2.dot(&v1);
    let inv_denom = 1.0 / (d00 * d11 - d01.powi(2));

    let v = (d11 * d20 - d01 * d21) * inv_denom;
    let w = (d00 * d21 - d01 * d20) * inv_denom;
    let u = 1.0 - v - w;

    (u, v, w)
}

pub fn barycentric_is_inside(bary: (f32, f32, f32)) -> bool {
    (bary.1 >= 0.0) && (bary.2 >= 0.0) && (bary.1 + bary.2 <= 1.0)
}

pub fn barycentric_to_world(
    bary: (f32, f32, f32),
    pa: Vector3<f32>,
    pb: Vector3<f32>,
    pc: Vector3<f32>,
) -> Vector3<f32> {
    pa.scale(bary.0) + pb.scale(bary.1) + pc.scale(bary.2)
}

pub fn is_point_inside_triangle(point: &Vector3<f32>, triangle: &[Vector3<f32>; 3]) -> bool {
    let bary = get_barycentric_coords(point, &triangle[0], &triangle[1], &triangle[2]);
    barycentric_is_inside(bary)
}
