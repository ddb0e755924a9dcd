//! Input data for the generator.
//!
//! The generator does not crawl a scene graph, instead the caller hands it a
//! flattened snapshot: triangle-soup meshes with world transforms, split into
//! the set that casts shadows and the set that receives baked lighting, plus
//! light source descriptions.

use crate::{
    color::Color,
    error::LightmapGenerationError,
    math::TriangleDefinition,
};
use nalgebra::{Matrix4, Point3, Vector2, Vector3};

/// A single vertex of an input mesh, in mesh-local space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct InputVertex {
    pub position: Vector3<f32>,
    pub normal: Vector3<f32>,
    /// Diffuse texture coordinates, carried through to the baked mesh.
    pub tex_coord: Vector2<f32>,
    /// Vertex color. Alpha is used as surface opacity for shadow rays.
    pub color: Color,
}

/// An indexed triangle soup. Vertices are mesh-local, the owning object
/// supplies the world transform.
#[derive(Clone, Debug, Default)]
pub struct InputMesh {
    pub vertices: Vec<InputVertex>,
    pub triangles: Vec<TriangleDefinition>,
}

impl InputMesh {
    /// Checks that every triangle index points into the vertex buffer.
    pub fn validate(&self) -> Result<(), LightmapGenerationError> {
        let count = self.vertices.len();
        for triangle in self.triangles.iter() {
            for index in triangle.indices() {
                if *index as usize >= count {
                    return Err(LightmapGenerationError::InvalidIndex {
                        index: *index as usize,
                        count,
                    });
                }
            }
        }
        Ok(())
    }

    /// World-space positions of the given triangle.
    pub fn world_triangle(
        &self,
        triangle: &TriangleDefinition,
        transform: &Matrix4<f32>,
    ) -> [Vector3<f32>; 3] {
        let fetch = |i: u32| {
            transform
                .transform_point(&Point3::from(self.vertices[i as usize].position))
                .coords
        };
        [fetch(triangle[0]), fetch(triangle[1]), fetch(triangle[2])]
    }
}

/// A mesh that occludes light. It does not have to receive lighting itself.
#[derive(Clone, Debug)]
pub struct CastShadowObject {
    pub mesh: InputMesh,
    pub transform: Matrix4<f32>,
}

/// A mesh that receives baked lighting.
#[derive(Clone, Debug)]
pub struct GetShadowObject {
    pub mesh: InputMesh,
    pub transform: Matrix4<f32>,
    /// When set, the object is kept as a separate baked mesh (so it can still
    /// be moved, e.g. a door) instead of being merged into the static level
    /// geometry. It still shares the generated lightmap textures.
    pub stay_alone: bool,
    /// Optional per-triangle texel density override. Must be either empty or
    /// one entry per triangle; missing entries fall back to the default
    /// density.
    pub triangle_densities: Vec<f32>,
}

impl GetShadowObject {
    pub fn new(mesh: InputMesh, transform: Matrix4<f32>) -> Self {
        Self {
            mesh,
            transform,
            stay_alone: false,
            triangle_densities: Vec::new(),
        }
    }
}

/// Kind of a light source with its kind-specific parameters.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum LightKind {
    Point,
    Spot {
        /// Full angle (in radians) of the inner cone with no falloff.
        inner_angle: f32,
        /// Full angle (in radians) at which intensity reaches zero.
        outer_angle: f32,
    },
    /// Infinitely distant light with no distance attenuation.
    Directional,
}

/// A snapshot of a scene light source.
#[derive(Clone, Debug)]
pub struct LightSource {
    pub kind: LightKind,
    /// World transform. Translation gives the light position, the rotated
    /// local +Z axis gives the light direction.
    pub transform: Matrix4<f32>,
    pub color: Color,
    /// Constant, linear and quadratic attenuation coefficients. Ignored for
    /// directional lights.
    pub attenuation: (f32, f32, f32),
    /// Invisible lights are skipped silently.
    pub visible: bool,
}

impl LightSource {
    /// World position of the light.
    pub fn position(&self) -> Vector3<f32> {
        self.transform.column(3).xyz()
    }

    /// Normalized world direction of the light (rotated local +Z axis).
    /// Meaningful for spot and directional lights.
    pub fn direction(&self) -> Vector3<f32> {
        self.transform
            .transform_vector(&Vector3::z())
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vector3::z)
    }

    /// Checks light parameters before generation starts.
    pub fn validate(&self, index: usize) -> Result<(), LightmapGenerationError> {
        let invalid = |reason: &str| LightmapGenerationError::InvalidLight {
            index,
            reason: reason.to_string(),
        };

        if !self.transform.iter().all(|v| v.is_finite()) {
            return Err(invalid("transform contains non-finite values"));
        }

        if !matches!(self.kind, LightKind::Directional) {
            let (a0, a1, a2) = self.attenuation;
            if !(a0.is_finite() && a1.is_finite() && a2.is_finite()) {
                return Err(invalid("attenuation coefficients are not finite"));
            }
            if a1 <= 0.0 {
                return Err(invalid("linear attenuation must be positive"));
            }
            if a2 < 0.0 {
                return Err(invalid("quadratic attenuation must not be negative"));
            }
        }

        if let LightKind::Spot {
            inner_angle,
            outer_angle,
        } = self.kind
        {
            if !(inner_angle >= 0.0 && outer_angle > 0.0 && inner_angle <= outer_angle) {
                return Err(invalid("spot cone angles must satisfy 0 <= inner <= outer"));
            }
        }

        Ok(())
    }
}
