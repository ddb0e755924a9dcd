//! Per-texel shading.
//!
//! Shading runs in two phases. First every face rasterizes its triangles into
//! its own texel patch once, interpolating world position and normal per
//! covered texel. Then each light pass walks the prepared texels, evaluates
//! the light intensity, casts a shadow segment toward the light and
//! accumulates the contribution. Faces own their patches exclusively, so the
//! per-light pass parallelizes over faces without any texel locking.

use crate::{
    color::Color,
    input::{CastShadowObject, LightKind},
    light::Light,
    math::{barycentric_to_world, octree::Octree, ray::Ray},
    partition::Partition,
    progress::ProgressData,
    raster::rasterize_triangle,
};
use nalgebra::Vector3;
use rayon::prelude::*;

// Shadow segments start slightly off the surface, and hits within this many
// world units of either segment endpoint are ignored to avoid intersecting
// the receiving geometry or the light's own mesh.
const SELF_SHADOW_BIAS: f32 = 1e-3;

// Directional lights have no position, their shadow segments extend this far
// against the light direction.
const DIRECTIONAL_SHADOW_DISTANCE: f32 = 1000.0;

// Interpolated surface opacity above which a transparent hit still occludes.
const OPACITY_THRESHOLD: f32 = 0.5;

/// One texel of a face patch.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Texel {
    pub world_position: Vector3<f32>,
    pub world_normal: Vector3<f32>,
    /// Set when the texel center lies inside one of the face's triangles.
    /// Uncovered texels are filled by bleed reduction after compositing.
    pub covered: bool,
    /// Accumulated lighting.
    pub color: Color,
    /// Pre-blur snapshot, written when the patch is prepared and after
    /// shading, read by the blur pass.
    pub orig_color: Color,
}

impl Default for Texel {
    fn default() -> Self {
        Self {
            world_position: Vector3::zeros(),
            world_normal: Vector3::z(),
            covered: false,
            color: Color::BLACK,
            orig_color: Color::BLACK,
        }
    }
}

/// World-space cast-shadow geometry behind an octree, queried by shadow
/// segments.
pub(crate) struct ShadowWorld {
    triangles: Vec<[Vector3<f32>; 3]>,
    /// Per-vertex opacity in [0; 1], interpolated at hit points for
    /// transparency-aware occlusion.
    opacities: Vec<[f32; 3]>,
    octree: Octree,
}

impl ShadowWorld {
    pub fn new(objects: &[CastShadowObject]) -> Self {
        let mut triangles = Vec::new();
        let mut opacities = Vec::new();
        for object in objects.iter() {
            for triangle in object.mesh.triangles.iter() {
                triangles.push(object.mesh.world_triangle(triangle, &object.transform));
                opacities.push(std::array::from_fn(|i| {
                    object.mesh.vertices[triangle[i] as usize].color.a as f32 / 255.0
                }));
            }
        }
        let octree = Octree::new(&triangles, 64);
        Self {
            triangles,
            opacities,
            octree,
        }
    }

    /// Checks whether the segment from `from` to `to` is blocked. With
    /// `respect_transparency` a hit only blocks when the interpolated surface
    /// opacity at the hit point is high enough.
    pub fn is_occluded(
        &self,
        from: Vector3<f32>,
        to: Vector3<f32>,
        respect_transparency: bool,
        query_buffer: &mut Vec<u32>,
    ) -> bool {
        let ray = Ray::from_two_points(from, to);
        let length = ray.dir.norm();
        if length <= f32::EPSILON {
            return false;
        }
        self.octree.ray_query(&ray, query_buffer);

        for &index in query_buffer.iter() {
            let vertices = &self.triangles[index as usize];
            if let Some((t, point)) = ray.triangle_intersection(vertices) {
                // t is a segment parameter, the endpoint bias works in world
                // units regardless of segment length.
                let distance = t * length;
                if distance <= SELF_SHADOW_BIAS || distance >= length - SELF_SHADOW_BIAS {
                    continue;
                }
                if respect_transparency {
                    let bary = crate::math::get_barycentric_coords(
                        &point,
                        &vertices[0],
                        &vertices[1],
                        &vertices[2],
                    );
                    let alphas = &self.opacities[index as usize];
                    let opacity =
                        alphas[0] * bary.0 + alphas[1] * bary.1 + alphas[2] * bary.2;
                    if opacity < OPACITY_THRESHOLD {
                        continue;
                    }
                }
                return true;
            }
        }
        false
    }
}

/// Rasterizes every face's triangles into its texel patch, interpolating
/// world position and normal at each covered texel center. Runs once before
/// the light passes.
pub(crate) fn prepare_patches(partition: &mut Partition, progress: &ProgressData) {
    let Partition { models, faces } = partition;
    let models = &*models;

    faces.par_iter_mut().for_each(|face| {
        let width = face.patch_width();
        let height = face.patch_height();
        face.texels = vec![Texel::default(); width * height];

        for &triangle_index in face.triangles.iter() {
            let triangle = &models[face.model].triangles[triangle_index];
            let pts = std::array::from_fn(|i| triangle.vertices[i].patch_coord);
            let positions = triangle.positions();
            let normals =
                std::array::from_fn::<_, 3, _>(|i| triangle.vertices[i].normal);

            rasterize_triangle(pts, width, height, |x, y, bary| {
                let texel = &mut face.texels[y * width + x];
                texel.world_position = barycentric_to_world(
                    (bary.x, bary.y, bary.z),
                    positions[0],
                    positions[1],
                    positions[2],
                );
                texel.world_normal = (normals[0].scale(bary.x)
                    + normals[1].scale(bary.y)
                    + normals[2].scale(bary.z))
                .try_normalize(f32::EPSILON)
                .unwrap_or(triangle.plane.normal);
                texel.covered = true;
            });
        }

        progress.advance_progress(face.triangles.len() as u32);
    });
}

/// Runs one full light pass over all faces. Cancellation is checked by the
/// caller between passes.
pub(crate) fn shade_light_pass(
    partition: &mut Partition,
    light: &Light,
    shadow_world: &ShadowWorld,
    respect_transparency: bool,
    progress: &ProgressData,
) {
    let Partition { models, faces } = partition;
    let models = &*models;

    faces.par_iter_mut().for_each(|face| {
        // A light strictly behind every triangle plane of the face cannot
        // light a single texel of it.
        let visible = face
            .triangles
            .iter()
            .any(|&index| light.sees_triangle(&models[face.model].triangles[index].plane));
        if visible {
            let mut query_buffer = Vec::new();
            for texel in face.texels.iter_mut().filter(|texel| texel.covered) {
                let intensity = light.intensity(texel.world_position, texel.world_normal);
                if intensity <= 0.0 {
                    continue;
                }

                let target = match light.kind {
                    LightKind::Directional => {
                        texel.world_position - light.direction * DIRECTIONAL_SHADOW_DISTANCE
                    }
                    _ => light.position,
                };
                let origin = texel.world_position + texel.world_normal * SELF_SHADOW_BIAS;
                if shadow_world.is_occluded(origin, target, respect_transparency, &mut query_buffer)
                {
                    continue;
                }

                let contribution = Color::from_frgb(light.color.scale(intensity));
                texel.color = texel.color.saturating_add_rgb(contribution);
            }
        }

        progress.advance_progress(face.triangles.len() as u32);
    });
}

/// Refreshes each texel's pre-blur snapshot from its accumulated color. Runs
/// after all light passes, before blur.
pub(crate) fn snapshot_colors(partition: &mut Partition) {
    for face in partition.faces.iter_mut() {
        for texel in face.texels.iter_mut() {
            texel.orig_color = texel.color;
        }
    }
}
