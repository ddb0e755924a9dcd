//! Scene partitioning.
//!
//! Every mesh that receives lighting is cut into faces, groups of
//! edge-adjacent triangles whose geometric normals share one of the six
//! signed principal axes. A face projects onto a single 2D plane without
//! excessive distortion, which makes it the unit of lightmap packing and
//! rasterization. Triangles are duplicated per face (vertices are not shared
//! across faces) so that each face can flatten its UVs independently.

use crate::{
    color::Color,
    input::GetShadowObject,
    log::Log,
    math::{plane::Plane, triangle_area, Rect},
};
use nalgebra::{Matrix3, Matrix4, Vector2, Vector3};

/// One of six signed principal projection axes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Axis {
    XPos,
    XNeg,
    YPos,
    YNeg,
    ZPos,
    ZNeg,
}

pub(crate) const AXES: [Axis; 6] = [
    Axis::XPos,
    Axis::XNeg,
    Axis::YPos,
    Axis::YNeg,
    Axis::ZPos,
    Axis::ZNeg,
];

/// Signed dominant component of the normal.
pub(crate) fn classify_axis(normal: Vector3<f32>) -> Axis {
    let ax = normal.x.abs();
    let ay = normal.y.abs();
    let az = normal.z.abs();
    if ax >= ay && ax >= az {
        if normal.x >= 0.0 {
            Axis::XPos
        } else {
            Axis::XNeg
        }
    } else if ay >= az {
        if normal.y >= 0.0 {
            Axis::YPos
        } else {
            Axis::YNeg
        }
    } else if normal.z >= 0.0 {
        Axis::ZPos
    } else {
        Axis::ZNeg
    }
}

/// Projects a world-space point onto the 2D plane of the given axis. Only the
/// dominant component matters for the projection plane, the sign affects
/// nothing but bucketing.
pub(crate) fn project_point(axis: Axis, p: Vector3<f32>) -> Vector2<f32> {
    match axis {
        Axis::XPos | Axis::XNeg => Vector2::new(p.z, -p.y),
        Axis::YPos | Axis::YNeg => Vector2::new(p.x, -p.z),
        Axis::ZPos | Axis::ZNeg => Vector2::new(p.x, -p.y),
    }
}

/// A triangle vertex, already in world space.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Vertex {
    pub position: Vector3<f32>,
    pub normal: Vector3<f32>,
    /// Diffuse texture coordinates carried through to the baked mesh.
    pub tex_coord: Vector2<f32>,
    /// Texel coordinates local to the owning face's patch, gutter included.
    /// Filled when face sizes are computed.
    pub patch_coord: Vector2<f32>,
    /// Normalized lightmap UV within the final page. Filled by the baker.
    pub lightmap_uv: Vector2<f32>,
    pub color: Color,
}

#[derive(Clone, Debug)]
pub(crate) struct Triangle {
    pub vertices: [Vertex; 3],
    pub plane: Plane,
    pub density: f32,
    /// Index of the source triangle in the input mesh.
    pub source_triangle: usize,
    /// Owning face, an index into [`Partition::faces`].
    pub face: usize,
}

impl Triangle {
    pub fn positions(&self) -> [Vector3<f32>; 3] {
        [
            self.vertices[0].position,
            self.vertices[1].position,
            self.vertices[2].position,
        ]
    }

    // Triangles are adjacent when they share an edge, i.e. at least two
    // matching vertex positions.
    fn is_adjacent(&self, other: &Triangle) -> bool {
        let mut shared = 0;
        for a in self.vertices.iter() {
            for b in other.vertices.iter() {
                if (a.position - b.position).norm_squared() < 1e-10 {
                    shared += 1;
                    break;
                }
            }
        }
        shared >= 2
    }
}

/// A group of adjacent triangles flattened onto one projection plane.
#[derive(Clone, Debug)]
pub(crate) struct Face {
    pub model: usize,
    pub axis: Axis,
    /// Indices into the owning model's triangle list.
    pub triangles: Vec<usize>,
    pub density: f32,
    /// Texture-space size in texels, clamped to fit a page.
    pub size: Vector2<usize>,
    /// Page the face was packed into. Filled by the packer.
    pub page: usize,
    /// Patch placement within the page, gutter ring included. Filled by the
    /// packer.
    pub rect: Rect<i32>,
    /// Patch texel buffer, `patch_width() * patch_height()` entries in row
    /// major order. Filled by the shading stage.
    pub texels: Vec<crate::shade::Texel>,
}

impl Face {
    /// Patch dimensions include a one texel gutter ring around the face.
    pub fn patch_width(&self) -> usize {
        self.size.x + 2
    }

    pub fn patch_height(&self) -> usize {
        self.size.y + 2
    }
}

/// A get-shadow mesh after partitioning. Vertices are stored in world space,
/// so stay-alone meshes are baked with an identity transform as well.
#[derive(Debug)]
pub(crate) struct Model {
    pub stay_alone: bool,
    pub triangles: Vec<Triangle>,
}

#[derive(Debug, Default)]
pub(crate) struct Partition {
    pub models: Vec<Model>,
    pub faces: Vec<Face>,
}

/// Converts get-shadow objects into models and faces. Degenerate triangles
/// are skipped, oversized faces are clamped, so partitioning never fails.
pub(crate) fn partition_scene(
    objects: &[GetShadowObject],
    default_density: f32,
    max_lightmap_size: usize,
) -> Partition {
    let mut partition = Partition::default();

    for (model_index, object) in objects.iter().enumerate() {
        let mut model = Model {
            stay_alone: object.stay_alone,
            triangles: Vec::with_capacity(object.mesh.triangles.len()),
        };

        let normal_matrix = normal_matrix(&object.transform);
        let mut degenerate_count = 0usize;

        for (triangle_index, triangle) in object.mesh.triangles.iter().enumerate() {
            let positions = object.mesh.world_triangle(triangle, &object.transform);

            if triangle_area(positions[0], positions[1], positions[2]) < f32::EPSILON {
                degenerate_count += 1;
                continue;
            }

            let plane = match Plane::from_triangle(&positions[0], &positions[1], &positions[2]) {
                Some(plane) => plane,
                None => {
                    degenerate_count += 1;
                    continue;
                }
            };

            let vertices = std::array::from_fn(|i| {
                let source = &object.mesh.vertices[triangle[i] as usize];
                Vertex {
                    position: positions[i],
                    normal: (normal_matrix * source.normal)
                        .try_normalize(f32::EPSILON)
                        .unwrap_or(plane.normal),
                    tex_coord: source.tex_coord,
                    patch_coord: Vector2::zeros(),
                    lightmap_uv: Vector2::zeros(),
                    color: source.color,
                }
            });

            let density = object
                .triangle_densities
                .get(triangle_index)
                .copied()
                .unwrap_or(default_density);

            model.triangles.push(Triangle {
                vertices,
                plane,
                density,
                source_triangle: triangle_index,
                face: usize::MAX,
            });
        }

        if degenerate_count > 0 {
            Log::warn(format!(
                "Skipped {degenerate_count} degenerate triangles of get-shadow object {model_index}."
            ));
        }

        build_faces(&mut partition, model_index, &mut model, max_lightmap_size);
        partition.models.push(model);
    }

    partition
}

// Normal transform matrix, inverse transpose of the upper-left 3x3 block.
// Falls back to the block itself for non-invertible transforms.
fn normal_matrix(transform: &Matrix4<f32>) -> Matrix3<f32> {
    let basis = transform.fixed_view::<3, 3>(0, 0).into_owned();
    basis
        .try_inverse()
        .map(|inverse| inverse.transpose())
        .unwrap_or(basis)
}

// Groups a model's triangles into faces and computes face metrics.
fn build_faces(
    partition: &mut Partition,
    model_index: usize,
    model: &mut Model,
    max_lightmap_size: usize,
) {
    for axis in AXES {
        let bucket = model
            .triangles
            .iter()
            .enumerate()
            .filter(|(_, triangle)| classify_axis(triangle.plane.normal) == axis)
            .map(|(index, _)| index)
            .collect::<Vec<_>>();

        // Greedy growing: the first adjacent group absorbs the triangle.
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for &triangle_index in bucket.iter() {
            let adjacent_group = groups.iter_mut().find(|group| {
                group.iter().any(|&member| {
                    model.triangles[member].is_adjacent(&model.triangles[triangle_index])
                })
            });
            match adjacent_group {
                Some(group) => group.push(triangle_index),
                None => groups.push(vec![triangle_index]),
            }
        }

        // Merge groups that became mutually adjacent through later triangles,
        // until no merge applies.
        loop {
            let mut merged = None;
            'outer: for a in 0..groups.len() {
                for b in (a + 1)..groups.len() {
                    let adjacent = groups[a].iter().any(|&ta| {
                        groups[b]
                            .iter()
                            .any(|&tb| model.triangles[ta].is_adjacent(&model.triangles[tb]))
                    });
                    if adjacent {
                        merged = Some((a, b));
                        break 'outer;
                    }
                }
            }
            match merged {
                Some((a, b)) => {
                    let moved = groups.swap_remove(b);
                    groups[a].extend(moved);
                }
                None => break,
            }
        }

        for group in groups {
            let face_index = partition.faces.len();
            let density = group
                .iter()
                .map(|&index| model.triangles[index].density)
                .sum::<f32>()
                / group.len() as f32;

            for &triangle_index in group.iter() {
                model.triangles[triangle_index].face = face_index;
            }

            let mut face = Face {
                model: model_index,
                axis,
                triangles: group,
                density,
                size: Vector2::new(1, 1),
                page: 0,
                rect: Rect::new(0, 0, 0, 0),
                texels: Vec::new(),
            };
            compute_face_metrics(&mut face, model, max_lightmap_size);
            partition.faces.push(face);
        }
    }
}

// Projects the face's triangles onto its axis plane, scales by density and
// derives the integer texture-space size. Faces larger than a page interior
// are clamped with an aspect preserving scale.
fn compute_face_metrics(face: &mut Face, model: &mut Model, max_lightmap_size: usize) {
    let mut min = Vector2::new(f32::MAX, f32::MAX);
    let mut max = Vector2::new(f32::MIN, f32::MIN);
    for &triangle_index in face.triangles.iter() {
        for vertex in model.triangles[triangle_index].vertices.iter() {
            let projected = project_point(face.axis, vertex.position) * face.density;
            min.x = min.x.min(projected.x);
            min.y = min.y.min(projected.y);
            max.x = max.x.max(projected.x);
            max.y = max.y.max(projected.y);
        }
    }

    let extent = max - min;
    // The gutter ring takes two texels of the page in each dimension.
    let limit = (max_lightmap_size.saturating_sub(2)) as f32;
    let scale = if extent.x > limit || extent.y > limit {
        let scale = limit / extent.x.max(extent.y);
        Log::warn(format!(
            "Face of {}x{} texels exceeds the lightmap size, scaled down by {scale:.3}.",
            extent.x.ceil(),
            extent.y.ceil(),
        ));
        scale
    } else {
        1.0
    };

    for &triangle_index in face.triangles.iter() {
        for vertex in model.triangles[triangle_index].vertices.iter_mut() {
            let projected = project_point(face.axis, vertex.position) * face.density;
            // +1 puts the face interior inside the gutter ring.
            vertex.patch_coord = (projected - min) * scale + Vector2::new(1.0, 1.0);
        }
    }

    let upper = max_lightmap_size.saturating_sub(2).max(1);
    face.size = Vector2::new(
        ((extent.x * scale).ceil() as usize).clamp(1, upper),
        ((extent.y * scale).ceil() as usize).clamp(1, upper),
    );
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        color::Color,
        input::{GetShadowObject, InputMesh, InputVertex},
        math::TriangleDefinition,
    };
    use nalgebra::{Matrix4, Vector2, Vector3};

    fn vertex(x: f32, y: f32, z: f32) -> InputVertex {
        InputVertex {
            position: Vector3::new(x, y, z),
            normal: Vector3::z(),
            tex_coord: Vector2::zeros(),
            color: Color::WHITE,
        }
    }

    fn quad_mesh(size: f32) -> InputMesh {
        InputMesh {
            vertices: vec![
                vertex(0.0, 0.0, 0.0),
                vertex(size, 0.0, 0.0),
                vertex(size, size, 0.0),
                vertex(0.0, size, 0.0),
            ],
            triangles: vec![
                TriangleDefinition([0, 1, 2]),
                TriangleDefinition([0, 2, 3]),
            ],
        }
    }

    #[test]
    fn axis_classification() {
        assert_eq!(classify_axis(Vector3::new(0.9, 0.1, 0.2)), Axis::XPos);
        assert_eq!(classify_axis(Vector3::new(-0.9, 0.1, 0.2)), Axis::XNeg);
        assert_eq!(classify_axis(Vector3::new(0.1, 0.8, 0.2)), Axis::YPos);
        assert_eq!(classify_axis(Vector3::new(0.1, -0.8, 0.2)), Axis::YNeg);
        assert_eq!(classify_axis(Vector3::new(0.0, 0.0, 1.0)), Axis::ZPos);
        assert_eq!(classify_axis(Vector3::new(0.0, 0.0, -1.0)), Axis::ZNeg);
    }

    #[test]
    fn quad_becomes_single_face() {
        let object = GetShadowObject::new(quad_mesh(2.0), Matrix4::identity());
        let partition = partition_scene(&[object], 10.0, 512);

        assert_eq!(partition.models.len(), 1);
        assert_eq!(partition.faces.len(), 1);

        let face = &partition.faces[0];
        assert_eq!(face.axis, Axis::ZPos);
        assert_eq!(face.triangles.len(), 2);
        // A 2x2 quad at density 10 needs a 20x20 texel face.
        assert_eq!(face.size, Vector2::new(20, 20));

        for triangle in partition.models[0].triangles.iter() {
            assert_eq!(triangle.face, 0);
        }
    }

    #[test]
    fn disconnected_quads_become_separate_faces() {
        let mut mesh = quad_mesh(1.0);
        let far = quad_mesh(1.0);
        let base = mesh.vertices.len() as u32;
        mesh.vertices.extend(far.vertices.iter().map(|v| {
            let mut v = *v;
            v.position.x += 10.0;
            v
        }));
        mesh.triangles.extend(
            far.triangles
                .iter()
                .map(|t| TriangleDefinition([t[0] + base, t[1] + base, t[2] + base])),
        );

        let object = GetShadowObject::new(mesh, Matrix4::identity());
        let partition = partition_scene(&[object], 10.0, 512);
        assert_eq!(partition.faces.len(), 2);
    }

    #[test]
    fn degenerate_triangles_are_skipped() {
        let mut mesh = quad_mesh(1.0);
        // A zero-area triangle.
        mesh.triangles.push(TriangleDefinition([0, 0, 1]));

        let object = GetShadowObject::new(mesh, Matrix4::identity());
        let partition = partition_scene(&[object], 10.0, 512);
        assert_eq!(partition.models[0].triangles.len(), 2);
        assert_eq!(partition.faces.len(), 1);
    }

    #[test]
    fn oversized_face_is_clamped() {
        // A 100x100 quad at density 10 would need 1000 texels per side.
        let object = GetShadowObject::new(quad_mesh(100.0), Matrix4::identity());
        let partition = partition_scene(&[object], 10.0, 128);

        let face = &partition.faces[0];
        assert!(face.size.x <= 126 && face.size.y <= 126);

        // Patch coordinates stay within the clamped patch.
        for triangle in partition.models[0].triangles.iter() {
            for vertex in triangle.vertices.iter() {
                assert!(vertex.patch_coord.x >= 1.0 - 1e-3);
                assert!(vertex.patch_coord.x <= face.size.x as f32 + 1.0 + 1e-3);
                assert!(vertex.patch_coord.y <= face.size.y as f32 + 1.0 + 1e-3);
            }
        }
    }

    #[test]
    fn density_override_is_averaged_per_face() {
        let mut object = GetShadowObject::new(quad_mesh(2.0), Matrix4::identity());
        object.triangle_densities = vec![4.0, 8.0];
        let partition = partition_scene(&[object], 10.0, 512);

        assert_eq!(partition.faces[0].density, 6.0);
        // 2 world units at density 6 gives a 12 texel face.
        assert_eq!(partition.faces[0].size, Vector2::new(12, 12));
    }

    #[test]
    fn transform_is_baked_into_world_positions() {
        let transform = Matrix4::new_translation(&Vector3::new(5.0, 0.0, 0.0));
        let object = GetShadowObject::new(quad_mesh(1.0), transform);
        let partition = partition_scene(&[object], 10.0, 512);

        let first = partition.models[0].triangles[0].vertices[0].position;
        assert!(first.x >= 5.0);
    }
}
