use nalgebra::Vector3;

#[derive(Copy, Clone, Debug)]
pub struct Plane {
    pub normal: Vector3<f32>,
    pub d: f32,
}

impl Default for Plane {
    fn default() -> Self {
        Plane {
            normal: Vector3::new(0.0, 1.0, 0.0),
            d: 0.0,
        }
    }
}

impl Plane {
    /// Creates plane from a point and normal vector at that point.
    /// May fail if normal is degenerated vector.
    #[inline]
    pub fn from_normal_and_point(normal: &Vector3<f32>, point: &Vector3<f32>) -> Option<Self> {
        normal
            .try_normalize(f32::EPSILON)
            .map(|normalized_normal| Self {
                normal: normalized_normal,
                d: -point.dot(&normalized_normal),
            })
    }

    /// Creates plane from the three points of a triangle. May fail if the
    /// triangle is degenerate.
    #[inline]
    pub fn from_triangle(
        a: &Vector3<f32>,
        b: &Vector3<f32>,
        c: &Vector3<f32>,
    ) -> Option<Self> {
        Self::from_normal_and_point(&(*b - *a).cross(&(*c - *a)), a)
    }

    #[inline]
    pub fn dot(&self, point: &Vector3<f32>) -> f32 {
        self.normal.dot(point) + self.d
    }

    #[inline]
    pub fn distance(&self, point: &Vector3<f32>) -> f32 {
        self.dot(point).abs()
    }

    /// Checks whether the given point lies on the side the normal points to.
    #[inline]
    pub fn is_point_front_side(&self, point: &Vector3<f32>) -> bool {
        self.dot(point) > 0.0
    }
}
