//! Lightmap pages and face placement.
//!
//! A page is one fixed-size texel buffer with its own rectangle packer.
//! Faces are placed with their one texel gutter ring included, so no two
//! patches ever touch. Placement tries the current (last) page and allocates
//! a fresh page when it is full.

use crate::{
    color::Color,
    error::LightmapGenerationError,
    log::Log,
    partition::Partition,
    rectpack::RectPacker,
};
use nalgebra::Vector2;

/// One lightmap page.
pub(crate) struct LightmapPage {
    /// Page edge length in texels.
    pub size: usize,
    pub packer: RectPacker<i32>,
    /// Row major RGBA texel buffer.
    pub texels: Vec<Color>,
    /// Texels written by a face's covered patch texels. Everything else is
    /// fair game for bleed reduction.
    pub covered: Vec<bool>,
}

impl LightmapPage {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            packer: RectPacker::new(size as i32, size as i32),
            texels: vec![Color::BLACK; size * size],
            covered: vec![false; size * size],
        }
    }
}

/// Assigns every face a rectangle in some page, allocating pages on demand.
/// Fails only when a face patch cannot fit even an empty page, which the
/// partitioner's clamping is supposed to prevent.
pub(crate) fn pack_faces(
    partition: &mut Partition,
    page_size: usize,
) -> Result<Vec<LightmapPage>, LightmapGenerationError> {
    let mut pages = vec![LightmapPage::new(page_size)];

    for face in partition.faces.iter_mut() {
        let width = face.patch_width() as i32;
        let height = face.patch_height() as i32;

        if width > page_size as i32 || height > page_size as i32 {
            return Err(LightmapGenerationError::OversizedFace {
                width: face.patch_width(),
                height: face.patch_height(),
                page_size,
            });
        }

        // Spare pages are never revisited, faces only go to the newest page.
        let rect = match pages
            .last_mut()
            .and_then(|page| page.packer.find_free(width, height))
        {
            Some(rect) => rect,
            None => {
                let mut page = LightmapPage::new(page_size);
                let rect = page.packer.find_free(width, height).ok_or(
                    LightmapGenerationError::OversizedFace {
                        width: face.patch_width(),
                        height: face.patch_height(),
                        page_size,
                    },
                )?;
                pages.push(page);
                rect
            }
        };

        face.page = pages.len() - 1;
        face.rect = rect;
    }

    Log::info(format!(
        "Packed {} faces into {} lightmap page(s) of {page_size}x{page_size} texels.",
        partition.faces.len(),
        pages.len(),
    ));

    Ok(pages)
}

/// Writes every face's covered patch texels into its page buffer. Uncovered
/// patch texels (the gutter ring and rasterization gaps) are left for bleed
/// reduction.
pub(crate) fn composite(partition: &Partition, pages: &mut [LightmapPage]) {
    for face in partition.faces.iter() {
        let page = &mut pages[face.page];
        let patch_width = face.patch_width();

        for (index, texel) in face.texels.iter().enumerate() {
            if !texel.covered {
                continue;
            }
            let x = face.rect.x() as usize + index % patch_width;
            let y = face.rect.y() as usize + index / patch_width;
            let page_index = y * page.size + x;
            page.texels[page_index] = texel.color;
            page.covered[page_index] = true;
        }
    }
}

/// Normalized page UV of a patch-local texel coordinate.
pub(crate) fn page_uv(
    rect_position: Vector2<i32>,
    patch_coord: Vector2<f32>,
    page_size: usize,
) -> Vector2<f32> {
    Vector2::new(
        (rect_position.x as f32 + patch_coord.x) / page_size as f32,
        (rect_position.y as f32 + patch_coord.y) / page_size as f32,
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        input::{GetShadowObject, InputMesh, InputVertex},
        math::TriangleDefinition,
        partition::partition_scene,
        progress::ProgressData,
        shade::prepare_patches,
    };
    use nalgebra::{Matrix4, Vector3};

    fn quad(size: f32, offset: f32) -> GetShadowObject {
        let vertex = |x: f32, y: f32| InputVertex {
            position: Vector3::new(x + offset, y, 0.0),
            normal: Vector3::z(),
            tex_coord: Vector2::zeros(),
            color: Color::WHITE,
        };
        GetShadowObject::new(
            InputMesh {
                vertices: vec![
                    vertex(0.0, 0.0),
                    vertex(size, 0.0),
                    vertex(size, size),
                    vertex(0.0, size),
                ],
                triangles: vec![
                    TriangleDefinition([0, 1, 2]),
                    TriangleDefinition([0, 2, 3]),
                ],
            },
            Matrix4::identity(),
        )
    }

    #[test]
    fn faces_get_disjoint_in_bounds_rects() {
        // Nine disconnected quads, each a 10x10 face plus gutter.
        let objects = (0..9).map(|i| quad(1.0, i as f32 * 5.0)).collect::<Vec<_>>();
        let mut partition = partition_scene(&objects, 10.0, 64);
        let pages = pack_faces(&mut partition, 64).unwrap();

        for (i, a) in partition.faces.iter().enumerate() {
            assert!(a.rect.x() >= 0 && a.rect.y() >= 0);
            assert!(a.rect.x() + a.rect.w() <= 64);
            assert!(a.rect.y() + a.rect.h() <= 64);

            for b in partition.faces.iter().skip(i + 1) {
                if a.page == b.page {
                    let disjoint = a.rect.x() + a.rect.w() <= b.rect.x()
                        || b.rect.x() + b.rect.w() <= a.rect.x()
                        || a.rect.y() + a.rect.h() <= b.rect.y()
                        || b.rect.y() + b.rect.h() <= a.rect.y();
                    assert!(disjoint, "{:?} overlaps {:?}", a.rect, b.rect);
                }
            }
        }
        assert!(!pages.is_empty());
    }

    #[test]
    fn overflow_allocates_new_page() {
        // Four 30x30 patches cannot share one 32x32 page.
        let objects = (0..4).map(|i| quad(2.8, i as f32 * 10.0)).collect::<Vec<_>>();
        let mut partition = partition_scene(&objects, 10.0, 32);
        let pages = pack_faces(&mut partition, 32).unwrap();
        assert_eq!(pages.len(), 4);

        let used_pages = partition
            .faces
            .iter()
            .map(|face| face.page)
            .collect::<std::collections::HashSet<_>>();
        assert_eq!(used_pages.len(), 4);
    }

    #[test]
    fn composite_writes_covered_texels_only() {
        let mut partition = partition_scene(&[quad(2.0, 0.0)], 10.0, 64);
        prepare_patches(&mut partition, &ProgressData::default());
        for face in partition.faces.iter_mut() {
            for texel in face.texels.iter_mut().filter(|t| t.covered) {
                texel.color = Color::opaque(50, 60, 70);
            }
        }

        let mut pages = pack_faces(&mut partition, 64).unwrap();
        composite(&partition, &mut pages);

        let page = &pages[0];
        let covered = page.covered.iter().filter(|&&c| c).count();
        assert!(covered > 0);
        for (index, &is_covered) in page.covered.iter().enumerate() {
            if is_covered {
                assert_eq!(page.texels[index], Color::opaque(50, 60, 70));
            } else {
                assert_eq!(page.texels[index], Color::BLACK);
            }
        }
    }

    #[test]
    fn page_uv_is_normalized() {
        let uv = page_uv(Vector2::new(16, 32), Vector2::new(1.5, 2.5), 64);
        assert!((uv.x - (17.5 / 64.0)).abs() < 1e-6);
        assert!((uv.y - (34.5 / 64.0)).abs() < 1e-6);
    }
}
