//! Final baking: lightmap textures and render-ready meshes.
//!
//! The baker turns composited pages into plain RGB textures (applying the
//! ambient floor) and rebuilds the scene geometry: meshes that are not
//! stay-alone are merged into a single world mesh with one surface per
//! lightmap page, stay-alone meshes keep their own mesh but reference the
//! same lightmap textures.

use crate::{
    color::Color,
    page::{page_uv, LightmapPage},
    partition::Partition,
    progress::ProgressData,
};
use fxhash::FxHashMap;
use nalgebra::{Vector2, Vector3};

/// A baked lightmap image, tightly packed RGB8 rows. Uploading it to the GPU
/// (and any format conversion) is the caller's business.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Texture {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl Texture {
    /// RGB of the texel at the given coordinates.
    pub fn pixel(&self, x: usize, y: usize) -> (u8, u8, u8) {
        let offset = (y * self.width + x) * 3;
        (self.data[offset], self.data[offset + 1], self.data[offset + 2])
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BakedVertex {
    pub position: Vector3<f32>,
    pub normal: Vector3<f32>,
    /// Diffuse texture coordinates, copied from the input mesh.
    pub tex_coord: Vector2<f32>,
    /// Normalized coordinates into the surface's lightmap texture.
    pub lightmap_uv: Vector2<f32>,
    pub color: Color,
}

/// A triangle list mapped to one lightmap texture. Vertices are not shared
/// between triangles.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BakedSurface {
    /// Index into [`BakedScene::lightmaps`].
    pub lightmap: usize,
    pub vertices: Vec<BakedVertex>,
}

impl BakedSurface {
    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }
}

/// A baked mesh, one surface per referenced lightmap page. All vertices are
/// in world space, the mesh carries no transform of its own.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BakedMesh {
    pub surfaces: Vec<BakedSurface>,
}

/// Everything the generator produces.
#[derive(Debug, Default, PartialEq)]
pub struct BakedScene {
    /// Merged static level geometry.
    pub world: BakedMesh,
    /// Meshes that were requested to stay independently movable. They share
    /// the lightmap textures with the world mesh.
    pub stay_alone: Vec<BakedMesh>,
    pub lightmaps: Vec<Texture>,
}

/// Builds the final scene from composited pages. `ambient` is added to every
/// baked texel, which guarantees no channel ends up below the ambient floor.
pub(crate) fn bake(
    partition: &mut Partition,
    pages: &[LightmapPage],
    ambient: Color,
    progress: &ProgressData,
) -> BakedScene {
    let mut scene = BakedScene::default();

    // Every page owns at least one packed face, so every page becomes a
    // texture, even when none of its faces covered a texel center. Surfaces
    // reference lightmaps by page index.
    for page in pages.iter() {
        scene.lightmaps.push(bake_texture(page, ambient));
    }

    assign_lightmap_uvs(partition, pages);

    let mut world_surfaces: FxHashMap<usize, BakedSurface> = FxHashMap::default();
    for (model_index, model) in partition.models.iter().enumerate() {
        if model.stay_alone {
            let mut surfaces: FxHashMap<usize, BakedSurface> = FxHashMap::default();
            collect_surfaces(&mut surfaces, partition, model_index);
            scene.stay_alone.push(BakedMesh {
                surfaces: into_sorted_surfaces(surfaces),
            });
        } else {
            collect_surfaces(&mut world_surfaces, partition, model_index);
        }
        progress.advance_progress(1);
    }
    scene.world = BakedMesh {
        surfaces: into_sorted_surfaces(world_surfaces),
    };

    scene
}

pub(crate) fn bake_texture(page: &LightmapPage, ambient: Color) -> Texture {
    let mut data = Vec::with_capacity(page.size * page.size * 3);
    for texel in page.texels.iter() {
        data.push(texel.r.saturating_add(ambient.r));
        data.push(texel.g.saturating_add(ambient.g));
        data.push(texel.b.saturating_add(ambient.b));
    }
    Texture {
        width: page.size,
        height: page.size,
        data,
    }
}

// Converts every vertex's patch-local texel coordinate into normalized page
// UV.
fn assign_lightmap_uvs(partition: &mut Partition, pages: &[LightmapPage]) {
    let Partition { models, faces } = partition;
    for model in models.iter_mut() {
        for triangle in model.triangles.iter_mut() {
            let face = &faces[triangle.face];
            let page_size = pages[face.page].size;
            for vertex in triangle.vertices.iter_mut() {
                vertex.lightmap_uv =
                    page_uv(face.rect.position, vertex.patch_coord, page_size);
            }
        }
    }
}

fn collect_surfaces(
    surfaces: &mut FxHashMap<usize, BakedSurface>,
    partition: &Partition,
    model_index: usize,
) {
    for triangle in partition.models[model_index].triangles.iter() {
        let lightmap = partition.faces[triangle.face].page;

        let surface = surfaces.entry(lightmap).or_insert_with(|| BakedSurface {
            lightmap,
            vertices: Vec::new(),
        });
        for vertex in triangle.vertices.iter() {
            surface.vertices.push(BakedVertex {
                position: vertex.position,
                normal: vertex.normal,
                tex_coord: vertex.tex_coord,
                lightmap_uv: vertex.lightmap_uv,
                color: vertex.color,
            });
        }
    }
}

fn into_sorted_surfaces(surfaces: FxHashMap<usize, BakedSurface>) -> Vec<BakedSurface> {
    let mut surfaces = surfaces.into_values().collect::<Vec<_>>();
    surfaces.sort_by_key(|surface| surface.lightmap);
    surfaces
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        input::{GetShadowObject, InputMesh, InputVertex},
        math::TriangleDefinition,
        page::{composite, pack_faces},
        partition::partition_scene,
        shade::prepare_patches,
    };
    use nalgebra::Matrix4;

    fn quad(offset: f32, stay_alone: bool) -> GetShadowObject {
        let vertex = |x: f32, y: f32| InputVertex {
            position: Vector3::new(x + offset, y, 0.0),
            normal: Vector3::z(),
            tex_coord: Vector2::new(x, y),
            color: Color::WHITE,
        };
        let mut object = GetShadowObject::new(
            InputMesh {
                vertices: vec![
                    vertex(0.0, 0.0),
                    vertex(2.0, 0.0),
                    vertex(2.0, 2.0),
                    vertex(0.0, 2.0),
                ],
                triangles: vec![
                    TriangleDefinition([0, 1, 2]),
                    TriangleDefinition([0, 2, 3]),
                ],
            },
            Matrix4::identity(),
        );
        object.stay_alone = stay_alone;
        object
    }

    fn baked_scene(objects: &[GetShadowObject], ambient: Color) -> BakedScene {
        let mut partition = partition_scene(objects, 10.0, 64);
        let progress = ProgressData::default();
        prepare_patches(&mut partition, &progress);
        let mut pages = pack_faces(&mut partition, 64).unwrap();
        composite(&partition, &mut pages);
        bake(&mut partition, &pages, ambient, &progress)
    }

    #[test]
    fn ambient_floor_holds_for_every_texel() {
        let ambient = Color::opaque(20, 30, 40);
        let scene = baked_scene(&[quad(0.0, false)], ambient);

        assert_eq!(scene.lightmaps.len(), 1);
        let texture = &scene.lightmaps[0];
        for y in 0..texture.height {
            for x in 0..texture.width {
                let (r, g, b) = texture.pixel(x, y);
                assert!(r >= 20 && g >= 30 && b >= 40);
            }
        }
    }

    #[test]
    fn world_mesh_merges_models_and_stay_alone_keeps_its_own() {
        let scene = baked_scene(
            &[quad(0.0, false), quad(5.0, false), quad(10.0, true)],
            Color::BLACK,
        );

        // Two merged quads share one surface on the single page.
        assert_eq!(scene.world.surfaces.len(), 1);
        assert_eq!(scene.world.surfaces[0].triangle_count(), 4);

        assert_eq!(scene.stay_alone.len(), 1);
        assert_eq!(scene.stay_alone[0].surfaces[0].triangle_count(), 2);
        assert_eq!(scene.stay_alone[0].surfaces[0].lightmap, 0);
    }

    #[test]
    fn lightmap_uvs_are_normalized_and_distinct_per_face() {
        let scene = baked_scene(&[quad(0.0, false), quad(5.0, false)], Color::BLACK);

        for surface in scene.world.surfaces.iter() {
            for vertex in surface.vertices.iter() {
                assert!(vertex.lightmap_uv.x > 0.0 && vertex.lightmap_uv.x < 1.0);
                assert!(vertex.lightmap_uv.y > 0.0 && vertex.lightmap_uv.y < 1.0);
            }
        }

        // The two quads occupy different page regions.
        let first = scene.world.surfaces[0].vertices[0].lightmap_uv;
        let second = scene.world.surfaces[0].vertices[6].lightmap_uv;
        assert!((first - second).norm() > 1e-3);
    }

    #[test]
    fn sliver_face_without_covered_texels_still_gets_a_texture() {
        let vertex = |x: f32, y: f32| InputVertex {
            position: Vector3::new(x, y, 0.0),
            normal: Vector3::z(),
            tex_coord: Vector2::zeros(),
            color: Color::WHITE,
        };
        // Positive area, but so thin that no texel center falls inside.
        let sliver = InputMesh {
            vertices: vec![vertex(0.0, 0.0), vertex(4.0, 0.0), vertex(4.0, 0.01)],
            triangles: vec![TriangleDefinition([0, 1, 2])],
        };
        let scene = baked_scene(
            &[GetShadowObject::new(sliver, Matrix4::identity())],
            Color::opaque(20, 20, 20),
        );

        assert_eq!(scene.lightmaps.len(), 1);
        let surface = &scene.world.surfaces[0];
        assert!(surface.lightmap < scene.lightmaps.len());
        // Nothing was composited into the page, so it bakes to pure ambient.
        assert!(scene.lightmaps[0].data.iter().all(|&value| value == 20));
    }

    #[test]
    fn diffuse_texcoords_survive_baking() {
        let scene = baked_scene(&[quad(0.0, false)], Color::BLACK);
        let has_nonzero = scene.world.surfaces[0]
            .vertices
            .iter()
            .any(|vertex| vertex.tex_coord.norm() > 0.0);
        assert!(has_nonzero);
    }
}
